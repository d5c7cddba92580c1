//! Configuration types for document conversion.
//!
//! All conversion behaviour is controlled through [`ConverterConfig`], built
//! via its [`ConverterConfigBuilder`]. A config is shared by every conversion
//! a [`crate::worker::Converter`] runs, so it is cheap to clone and carries no
//! per-job state.

use crate::error::ConvertError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default HTML-to-PDF engine (the one `pdfkit`-style wrappers drive).
pub const DEFAULT_HTML_RENDERER: &str = "wkhtmltopdf";

/// Default native document-to-PDF converter.
pub const DEFAULT_OFFICE_CONVERTER: &str = "soffice";

/// Characters Excel refuses in a worksheet name.
const FORBIDDEN_SHEET_CHARS: &[char] = &['[', ']', ':', '*', '?', '/', '\\'];

/// Configuration for a [`crate::worker::Converter`].
///
/// # Example
/// ```rust
/// use docconv::{ConverterConfig, PdfStrategy, ToolCommand};
///
/// let config = ConverterConfig::builder()
///     .pdf_strategy(PdfStrategy::NativeConversion)
///     .office_converter(ToolCommand::new("/opt/libreoffice/program/soffice"))
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConverterConfig {
    /// How PDF output is produced. Default: [`PdfStrategy::HtmlIntermediate`].
    pub pdf_strategy: PdfStrategy,

    /// HTML-to-PDF renderer, invoked as `<program> <args..> <input.html> <output.pdf>`.
    /// Default: `wkhtmltopdf`.
    pub html_renderer: ToolCommand,

    /// Native converter, invoked as
    /// `<program> <args..> --headless --convert-to pdf --outdir <dir> <source>`.
    /// Default: `soffice`.
    pub office_converter: ToolCommand,

    /// Worksheet name used for XLSX output. Default: `Sheet1`.
    pub sheet_name: String,

    /// Header of the single output column (CSV and XLSX). Default: `Content`.
    pub column_name: String,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            pdf_strategy: PdfStrategy::default(),
            html_renderer: ToolCommand::new(DEFAULT_HTML_RENDERER),
            office_converter: ToolCommand::new(DEFAULT_OFFICE_CONVERTER),
            sheet_name: "Sheet1".to_string(),
            column_name: "Content".to_string(),
        }
    }
}

impl ConverterConfig {
    /// Create a new builder for `ConverterConfig`.
    pub fn builder() -> ConverterConfigBuilder {
        ConverterConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConverterConfig`].
#[derive(Debug)]
pub struct ConverterConfigBuilder {
    config: ConverterConfig,
}

impl ConverterConfigBuilder {
    pub fn pdf_strategy(mut self, strategy: PdfStrategy) -> Self {
        self.config.pdf_strategy = strategy;
        self
    }

    pub fn html_renderer(mut self, tool: ToolCommand) -> Self {
        self.config.html_renderer = tool;
        self
    }

    pub fn office_converter(mut self, tool: ToolCommand) -> Self {
        self.config.office_converter = tool;
        self
    }

    pub fn sheet_name(mut self, name: impl Into<String>) -> Self {
        self.config.sheet_name = name.into();
        self
    }

    pub fn column_name(mut self, name: impl Into<String>) -> Self {
        self.config.column_name = name.into();
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConverterConfig, ConvertError> {
        let c = &self.config;
        for (what, tool) in [
            ("HTML renderer", &c.html_renderer),
            ("office converter", &c.office_converter),
        ] {
            if tool.program.as_os_str().is_empty() {
                return Err(ConvertError::InvalidConfig(format!(
                    "{what} program must not be empty"
                )));
            }
        }

        let sheet_len = c.sheet_name.chars().count();
        if sheet_len == 0 || sheet_len > 31 {
            return Err(ConvertError::InvalidConfig(format!(
                "Sheet name must be 1–31 characters, got {sheet_len}"
            )));
        }
        if let Some(bad) = c.sheet_name.chars().find(|ch| FORBIDDEN_SHEET_CHARS.contains(ch)) {
            return Err(ConvertError::InvalidConfig(format!(
                "Sheet name may not contain '{bad}'"
            )));
        }

        if c.column_name.is_empty() {
            return Err(ConvertError::InvalidConfig(
                "Column name must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How a document is turned into a PDF.
///
/// | Strategy | Progress events |
/// |----------|-----------------|
/// | `HtmlIntermediate` | one per paragraph, ending at 100 |
/// | `NativeConversion` | a single 100 right before success |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PdfStrategy {
    /// Render paragraphs into a temporary HTML file and hand it to
    /// [`ConverterConfig::html_renderer`]. (default)
    #[default]
    HtmlIntermediate,
    /// Hand the source document straight to [`ConverterConfig::office_converter`].
    NativeConversion,
}

/// An external program plus arguments placed before the ones docconv adds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCommand {
    pub program: PathBuf,
    #[serde(default)]
    pub args: Vec<String>,
}

impl ToolCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append a leading argument (e.g. `--quiet` for wkhtmltopdf).
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Program name for log lines and error messages.
    pub fn display_name(&self) -> String {
        self.program.display().to_string()
    }
}
