//! Error types for the docconv library.
//!
//! One enum, [`ConvertError`], covers every way a conversion can fail. Two
//! variants are returned synchronously by [`crate::worker::Converter::start`]
//! ([`ConvertError::ConversionInProgress`] and, for string-typed requests,
//! [`ConvertError::InvalidFormat`]). Everything else happens on the
//! background task and reaches the caller as the message of a single
//! [`crate::progress::ConversionOutcome::Failure`] event, prefixed with the
//! routine that raised it (`"CSV conversion error: ..."`).

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the docconv library.
#[derive(Debug, Error)]
pub enum ConvertError {
    // ── Request errors ────────────────────────────────────────────────────
    /// The requested target format is not one of PDF, CSV or XLSX.
    #[error("Unsupported target format '{value}' (expected one of: PDF, CSV, XLSX)")]
    InvalidFormat { value: String },

    /// This worker already has a conversion running.
    #[error("A conversion is already in progress on this worker")]
    ConversionInProgress,

    // ── Input errors ──────────────────────────────────────────────────────
    /// Source file missing, unreadable, or not a paragraph document.
    #[error("Cannot read document '{path}': {detail}")]
    SourceRead { path: PathBuf, detail: String },

    // ── External tool errors ──────────────────────────────────────────────
    /// The rendering/conversion utility is absent or exited with an error.
    #[error("External tool '{tool}' failed: {detail}")]
    ExternalTool { tool: String, detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create, write or publish the output file.
    #[error("Failed to write output file '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error (background task panicked, no runtime).
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification of a [`ConvertError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    InvalidFormat,
    ConversionInProgress,
    SourceRead,
    ExternalTool,
    Write,
    InvalidConfig,
    Internal,
}

impl ConvertError {
    /// The taxonomy bucket this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConvertError::InvalidFormat { .. } => ErrorKind::InvalidFormat,
            ConvertError::ConversionInProgress => ErrorKind::ConversionInProgress,
            ConvertError::SourceRead { .. } => ErrorKind::SourceRead,
            ConvertError::ExternalTool { .. } => ErrorKind::ExternalTool,
            ConvertError::Write { .. } => ErrorKind::Write,
            ConvertError::InvalidConfig(_) => ErrorKind::InvalidConfig,
            ConvertError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub(crate) fn source_read(path: impl Into<PathBuf>, detail: impl Into<String>) -> Self {
        ConvertError::SourceRead {
            path: path.into(),
            detail: detail.into(),
        }
    }

    pub(crate) fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConvertError::Write {
            path: path.into(),
            source,
        }
    }
}
