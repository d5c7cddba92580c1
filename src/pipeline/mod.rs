//! Pipeline stages for document conversion.
//!
//! Each submodule implements one step; the worker strings them together per
//! target format.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ docx ──┬──▶ table (CSV / XLSX) ──────────────┐
//! (validate) (paragraphs) │                                  ├──▶ output
//!                  └──▶ html ──▶ pdf (external renderer) ─┘   (atomic publish)
//! ```
//!
//! 1. [`input`]  — check the source exists, is readable and looks like a DOCX
//! 2. [`docx`]   — pull the ordered paragraph texts out of the package
//! 3. [`table`]  — single-column CSV or XLSX
//! 4. [`html`]   — one `<p>` per paragraph, reporting progress as it goes
//! 5. [`pdf`]    — hand HTML (or the source itself) to an external tool
//! 6. [`output`] — stage beside the destination, rename into place

pub mod docx;
pub mod html;
pub mod input;
pub mod output;
pub mod pdf;
pub mod table;

use crate::error::ConvertError;

/// Run blocking work on the blocking pool; a panic becomes an internal error.
pub(crate) async fn blocking<T, F>(f: F) -> Result<T, ConvertError>
where
    F: FnOnce() -> Result<T, ConvertError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ConvertError::Internal(format!("Conversion task panicked: {e}")))?
}
