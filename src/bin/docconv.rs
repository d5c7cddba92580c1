//! CLI binary for docconv.
//!
//! A thin presentation shell over the library: it maps flags to a
//! `ConverterConfig`, starts one conversion and renders the outcome events.

use anyhow::{Context, Result};
use clap::Parser;
use docconv::{
    ConversionOutcome, ConversionRequest, Converter, ConverterConfig, PdfStrategy, TargetFormat,
    ToolCommand,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── Progress bar ─────────────────────────────────────────────────────────────

fn progress_bar(input: &str, format: TargetFormat) -> ProgressBar {
    let bar = ProgressBar::new(100);
    let style = ProgressStyle::with_template(
        "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}%  ⏱ {elapsed_precise}  {msg}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("█▉▊▋▌▍▎▏  ")
    .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
    bar.set_style(style);
    bar.set_prefix(format!("→ {format}"));
    bar.set_message(input.to_string());
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Word document to PDF via an HTML page rendered by wkhtmltopdf
  docconv report.docx

  # Paragraphs as a one-column CSV / spreadsheet
  docconv report.docx --format csv
  docconv report.docx --format xlsx --sheet-name Notes

  # PDF through a headless office suite instead
  docconv report.docx --pdf-strategy native --office /usr/bin/soffice

  # Machine-readable outcome events, one JSON object per line
  docconv report.docx --format csv --json

OUTPUT:
  The output file is written next to the input with the extension replaced
  (report.docx → report.pdf). An existing file at that path is overwritten.

EXTERNAL TOOLS:
  PDF output needs either wkhtmltopdf (html strategy, default) or
  LibreOffice's soffice (native strategy) on PATH or given explicitly.
  CSV and XLSX output need nothing besides this binary.
"#;

/// Convert Word documents (.docx) to PDF, CSV or XLSX.
#[derive(Parser, Debug)]
#[command(
    name = "docconv",
    version,
    about = "Convert Word documents (.docx) to PDF, CSV or XLSX",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Path to the .docx document to convert.
    input: PathBuf,

    /// Target format: pdf, csv or xlsx.
    #[arg(short, long, env = "DOCCONV_FORMAT", default_value = "pdf")]
    format: String,

    /// How PDFs are produced.
    #[arg(long, env = "DOCCONV_PDF_STRATEGY", value_enum, default_value = "html")]
    pdf_strategy: StrategyArg,

    /// HTML → PDF renderer used by the html strategy.
    #[arg(long, env = "DOCCONV_RENDERER")]
    renderer: Option<PathBuf>,

    /// Office suite used by the native strategy.
    #[arg(long, env = "DOCCONV_OFFICE")]
    office: Option<PathBuf>,

    /// Worksheet name for XLSX output.
    #[arg(long, env = "DOCCONV_SHEET_NAME")]
    sheet_name: Option<String>,

    /// Header of the single column in CSV/XLSX output.
    #[arg(long, env = "DOCCONV_COLUMN")]
    column: Option<String>,

    /// Print each outcome event as a JSON line instead of human output.
    #[arg(long, env = "DOCCONV_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "DOCCONV_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DOCCONV_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "DOCCONV_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum StrategyArg {
    Html,
    Native,
}

impl From<StrategyArg> for PdfStrategy {
    fn from(v: StrategyArg) -> Self {
        match v {
            StrategyArg::Html => PdfStrategy::HtmlIntermediate,
            StrategyArg::Native => PdfStrategy::NativeConversion,
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Library INFO logs would fight with the bar for the terminal.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build request and config ─────────────────────────────────────────
    let request = ConversionRequest::parse(&cli.input, &cli.format)
        .context("Invalid conversion request")?;
    let config = build_config(&cli)?;

    // ── Run conversion ───────────────────────────────────────────────────
    let converter = Converter::new(config);
    let mut handle = converter
        .start(request.clone())
        .context("Failed to start conversion")?;

    let bar = show_progress
        .then(|| progress_bar(&cli.input.display().to_string(), request.target_format()));

    let mut terminal = None;
    while let Some(event) = handle.next_event().await {
        if cli.json {
            println!(
                "{}",
                serde_json::to_string(&event).context("Failed to serialise event")?
            );
        }
        match event {
            ConversionOutcome::Progress(p) => {
                if let Some(ref bar) = bar {
                    bar.set_position(u64::from(p));
                }
            }
            outcome => terminal = Some(outcome),
        }
    }
    if let Some(bar) = bar {
        bar.finish_and_clear();
    }

    let exit = match terminal {
        Some(ConversionOutcome::Success(path)) => {
            if !cli.json && !cli.quiet {
                println!(
                    "{} Conversion successful: {}",
                    green("✔"),
                    bold(&path.display().to_string())
                );
            }
            ExitCode::SUCCESS
        }
        Some(ConversionOutcome::Failure(message)) => {
            if !cli.json {
                eprintln!("{} Error: {}", red("✘"), message);
            }
            ExitCode::FAILURE
        }
        _ => {
            eprintln!("{} Error: conversion ended without a result", red("✘"));
            ExitCode::FAILURE
        }
    };
    Ok(exit)
}

/// Map CLI args to `ConverterConfig`.
fn build_config(cli: &Cli) -> Result<ConverterConfig> {
    let mut builder = ConverterConfig::builder().pdf_strategy(cli.pdf_strategy.clone().into());

    if let Some(ref program) = cli.renderer {
        builder = builder.html_renderer(ToolCommand::new(program));
    }
    if let Some(ref program) = cli.office {
        builder = builder.office_converter(ToolCommand::new(program));
    }
    if let Some(ref name) = cli.sheet_name {
        builder = builder.sheet_name(name);
    }
    if let Some(ref name) = cli.column {
        builder = builder.column_name(name);
    }

    builder.build().context("Invalid configuration")
}
