//! PDF output through an external rendering utility.
//!
//! ## Strategies
//!
//! * [`PdfStrategy::HtmlIntermediate`]: paragraphs are rendered into a
//!   temporary HTML page (progress per paragraph), which the configured HTML
//!   renderer turns into a PDF.
//! * [`PdfStrategy::NativeConversion`]: the source document goes straight to
//!   an office converter running headless; one progress event of 100 is sent
//!   once the PDF is in place.
//!
//! Both run the tool against a [`Staging`] directory, so the intermediate
//! HTML page and any half-written PDF disappear whether the tool succeeds,
//! fails, or is missing altogether.
//!
//! The tool call is the only long suspension point. There is no timeout: a
//! renderer that hangs keeps its conversion in `Running` until it exits.

use crate::config::{ConverterConfig, PdfStrategy, ToolCommand};
use crate::error::ConvertError;
use crate::pipeline::blocking;
use crate::pipeline::docx::Document;
use crate::pipeline::html;
use crate::pipeline::input::resolve_source;
use crate::pipeline::output::Staging;
use crate::progress::ProgressReporter;
use crate::request::ConversionRequest;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Produce `request.output_path()` as a PDF using the configured strategy.
pub async fn convert(
    request: &ConversionRequest,
    config: &ConverterConfig,
    progress: &ProgressReporter,
) -> Result<PathBuf, ConvertError> {
    match config.pdf_strategy {
        PdfStrategy::HtmlIntermediate => via_html(request, &config.html_renderer, progress).await,
        PdfStrategy::NativeConversion => native(request, &config.office_converter, progress).await,
    }
}

async fn via_html(
    request: &ConversionRequest,
    renderer: &ToolCommand,
    progress: &ProgressReporter,
) -> Result<PathBuf, ConvertError> {
    let source = request.source_path().to_path_buf();
    let destination = request.output_path();
    let reporter = progress.clone();

    // Parsing, HTML assembly and the staging writes are all blocking I/O.
    let (staging, html_path) = blocking(move || {
        let doc = Document::open(&source)?;
        let title = file_stem(&source);
        let page = html::render_document(&title, doc.paragraphs(), &reporter);

        let staging = Staging::for_destination(&destination)?;
        let html_path = staging.file(format!("{title}.html"));
        std::fs::write(&html_path, page).map_err(|e| ConvertError::write(&destination, e))?;
        debug!("Wrote intermediate HTML {}", html_path.display());
        Ok((staging, html_path))
    })
    .await?;

    let staged_pdf = staging.staged_output();
    run_tool(renderer, &[html_path.as_os_str(), staged_pdf.as_os_str()]).await?;

    let published = blocking(move || staging.publish(&staged_pdf)).await?;
    info!("Rendered {} via {}", published.display(), renderer.display_name());
    Ok(published)
}

async fn native(
    request: &ConversionRequest,
    converter: &ToolCommand,
    progress: &ProgressReporter,
) -> Result<PathBuf, ConvertError> {
    let source = request.source_path().to_path_buf();
    let destination = request.output_path();

    let (source, staging) = blocking(move || {
        let source = resolve_source(&source)?;
        let staging = Staging::for_destination(&destination)?;
        Ok((source, staging))
    })
    .await?;

    run_tool(
        converter,
        &[
            OsStr::new("--headless"),
            OsStr::new("--convert-to"),
            OsStr::new("pdf"),
            OsStr::new("--outdir"),
            staging.path().as_os_str(),
            source.as_os_str(),
        ],
    )
    .await?;

    // The converter names its output after the source stem, which is exactly
    // the destination file name.
    let staged_pdf = staging.staged_output();
    let published = blocking(move || staging.publish(&staged_pdf)).await?;
    progress.report(100);
    info!("Converted {} via {}", published.display(), converter.display_name());
    Ok(published)
}

/// Run an external tool to completion, mapping absence and non-zero exit to
/// [`ConvertError::ExternalTool`] with the tool's own error text.
pub async fn run_tool(tool: &ToolCommand, extra_args: &[&OsStr]) -> Result<(), ConvertError> {
    let name = tool.display_name();
    let mut cmd = Command::new(&tool.program);
    cmd.args(&tool.args)
        .args(extra_args)
        .stdin(Stdio::null())
        .kill_on_drop(true);
    debug!("Running {:?}", cmd.as_std());

    let output = cmd.output().await.map_err(|e| ConvertError::ExternalTool {
        tool: name.clone(),
        detail: if e.kind() == std::io::ErrorKind::NotFound {
            "program not found; install it or configure its path".to_string()
        } else {
            e.to_string()
        },
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = stderr.trim();
        warn!("{} exited with {}: {}", name, output.status, stderr);
        return Err(ConvertError::ExternalTool {
            tool: name,
            detail: if stderr.is_empty() {
                output.status.to_string()
            } else {
                format!("{}: {}", output.status, stderr)
            },
        });
    }
    Ok(())
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[tokio::test]
    async fn missing_tool_is_external_tool_error() {
        let tool = ToolCommand::new("/definitely/not/a/renderer");
        let err = run_tool(&tool, &[]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExternalTool);
        assert!(err.to_string().contains("program not found"));
        assert!(err.to_string().contains("/definitely/not/a/renderer"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_tool_reports_stderr() {
        let tool = ToolCommand::new("/bin/sh")
            .arg("-c")
            .arg("echo 'render failed: bad page' >&2; exit 3");
        let err = run_tool(&tool, &[]).await.unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("render failed: bad page"), "got: {msg}");
        assert!(msg.contains('3'), "got: {msg}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn successful_tool_receives_arguments_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("args.txt");
        let tool = ToolCommand::new("/bin/sh")
            .arg("-c")
            .arg("printf '%s|%s' \"$1\" \"$2\" > \"$3\"")
            .arg("sh");
        run_tool(
            &tool,
            &[OsStr::new("first"), OsStr::new("second"), out.as_os_str()],
        )
        .await
        .unwrap();
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "first|second");
    }

    #[test]
    fn stem_of_source() {
        assert_eq!(file_stem(Path::new("/a/report.docx")), "report");
        assert_eq!(file_stem(Path::new("/")), "document");
    }
}
