//! Source resolution: check that a path names a readable `.docx` file.
//!
//! A DOCX file is a ZIP archive, so the first four bytes must be the local
//! file header signature `PK\x03\x04`. Checking this up front gives callers
//! "not a .docx document" instead of a confusing ZIP or XML error later, and
//! it lets the native PDF strategy reject garbage before spawning a heavy
//! external converter.

use crate::error::ConvertError;
use crate::request::has_source_extension;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// ZIP local file header signature.
pub const ZIP_MAGIC: [u8; 4] = *b"PK\x03\x04";

/// Validate a local source path: it must exist, be a readable regular file
/// with a `.docx` extension, and start with the ZIP signature.
pub fn resolve_source(path: &Path) -> Result<PathBuf, ConvertError> {
    if !path.exists() {
        return Err(ConvertError::source_read(path, "file not found"));
    }
    if !path.is_file() {
        return Err(ConvertError::source_read(path, "not a regular file"));
    }
    if !has_source_extension(path) {
        return Err(ConvertError::source_read(
            path,
            "not a .docx document (unrecognised extension)",
        ));
    }

    match std::fs::File::open(path) {
        Ok(mut f) => {
            let mut magic = [0u8; 4];
            if f.read_exact(&mut magic).is_err() || magic != ZIP_MAGIC {
                return Err(ConvertError::source_read(
                    path,
                    format!("not a .docx document (first bytes: {magic:?})"),
                ));
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(ConvertError::source_read(path, "permission denied"));
        }
        Err(e) => {
            return Err(ConvertError::source_read(path, e.to_string()));
        }
    }

    debug!("Resolved source document: {}", path.display());
    Ok(path.to_path_buf())
}
