//! Atomic-or-absent output.
//!
//! Every routine produces its file inside a [`Staging`] directory created next
//! to the destination, then [`Staging::publish`] renames it over the final
//! path. Rename within one directory is atomic, so observers see either the
//! previous file (or nothing) or the complete new file. The staging directory
//! is a [`tempfile::TempDir`]; dropping it on any exit path removes every
//! intermediate file, including a half-written output or the HTML page handed
//! to the PDF renderer.

use crate::error::ConvertError;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

const STAGING_PREFIX: &str = ".docconv-";

/// A private scratch directory beside the destination file.
#[derive(Debug)]
pub struct Staging {
    dir: TempDir,
    destination: PathBuf,
}

impl Staging {
    /// Create the staging directory in the destination's parent directory.
    pub fn for_destination(destination: &Path) -> Result<Self, ConvertError> {
        let parent = match destination.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let dir = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(&parent)
            .map_err(|e| ConvertError::write(destination, e))?;
        debug!("Staging {} in {}", destination.display(), dir.path().display());
        Ok(Self {
            dir,
            destination: destination.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Path for a file named `name` inside the staging directory.
    pub fn file(&self, name: impl AsRef<Path>) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Staged path of the final output (same file name as the destination).
    pub fn staged_output(&self) -> PathBuf {
        match self.destination.file_name() {
            Some(name) => self.file(name),
            None => self.file("output"),
        }
    }

    /// Move `staged` over the destination, replacing any existing file, and
    /// remove the staging directory.
    pub fn publish(self, staged: &Path) -> Result<PathBuf, ConvertError> {
        if !staged.is_file() {
            return Err(ConvertError::write(
                &self.destination,
                std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("staged output {} was not produced", staged.display()),
                ),
            ));
        }
        std::fs::rename(staged, &self.destination)
            .map_err(|e| ConvertError::write(&self.destination, e))?;
        debug!("Published {}", self.destination.display());
        // `self.dir` drops here and takes any leftovers with it
        Ok(self.destination)
    }
}
