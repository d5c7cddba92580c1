//! # docconv
//!
//! Convert Word documents (`.docx`) to PDF, CSV or XLSX in the background,
//! reporting progress to whoever is watching.
//!
//! The crate is the conversion worker behind a desktop or terminal front end.
//! A front end builds a [`ConversionRequest`], hands it to a [`Converter`] and
//! consumes [`ConversionOutcome`] events from the returned handle; it never
//! touches the conversion pipeline itself.
//!
//! ## Pipeline Overview
//!
//! ```text
//! .docx
//!  │
//!  ├─ 1. Input   validate path, extension and ZIP signature
//!  ├─ 2. Parse   body paragraphs in document order (zip + quick-xml)
//!  ├─ 3. Write   PDF  ─ HTML page → external renderer, or office suite direct
//!  │             CSV  ─ one "Content" column, one row per paragraph
//!  │             XLSX ─ same layout in a single worksheet
//!  └─ 4. Output  staged beside the destination, renamed into place
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docconv::{ConversionOutcome, ConversionRequest, Converter, TargetFormat};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let converter = Converter::default();
//!     let mut handle = converter.start(ConversionRequest::new("report.docx", TargetFormat::Csv))?;
//!     while let Some(event) = handle.next_event().await {
//!         match event {
//!             ConversionOutcome::Progress(p) => eprintln!("{p}%"),
//!             ConversionOutcome::Success(path) => println!("wrote {}", path.display()),
//!             ConversionOutcome::Failure(msg) => eprintln!("{msg}"),
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `docconv` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! docconv = { version = "0.1", default-features = false }
//! ```
//!
//! ## External tools
//!
//! PDF output shells out: `wkhtmltopdf` for the default HTML strategy, or
//! `soffice --headless` for [`PdfStrategy::NativeConversion`]. Both are
//! configurable through [`ConverterConfig`]. CSV and XLSX need no tools.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod pipeline;
pub mod progress;
pub mod request;
pub mod worker;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConverterConfig, ConverterConfigBuilder, PdfStrategy, ToolCommand};
pub use error::{ConvertError, ErrorKind};
pub use progress::{percent_complete, ConversionOutcome};
pub use request::{ConversionRequest, TargetFormat};
pub use worker::{ConversionHandle, Converter, WorkerState};
