//! What to convert and into which format.

use crate::error::ConvertError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Extension a source document must carry (compared case-insensitively).
pub const SOURCE_EXTENSION: &str = "docx";

/// The three supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TargetFormat {
    Pdf,
    Csv,
    Xlsx,
}

impl TargetFormat {
    pub const ALL: [TargetFormat; 3] = [TargetFormat::Pdf, TargetFormat::Csv, TargetFormat::Xlsx];

    /// File extension of the produced file, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            TargetFormat::Pdf => "pdf",
            TargetFormat::Csv => "csv",
            TargetFormat::Xlsx => "xlsx",
        }
    }

    /// Upper-case label used in UI text and failure prefixes.
    pub fn label(self) -> &'static str {
        match self {
            TargetFormat::Pdf => "PDF",
            TargetFormat::Csv => "CSV",
            TargetFormat::Xlsx => "XLSX",
        }
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TargetFormat {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches('.');
        TargetFormat::ALL
            .into_iter()
            .find(|f| f.extension().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| ConvertError::InvalidFormat {
                value: s.to_string(),
            })
    }
}

/// One conversion job: a source document and the format to produce.
///
/// Immutable once handed to [`crate::worker::Converter::start`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionRequest {
    source_path: PathBuf,
    target_format: TargetFormat,
}

impl ConversionRequest {
    pub fn new(source_path: impl Into<PathBuf>, target_format: TargetFormat) -> Self {
        Self {
            source_path: source_path.into(),
            target_format,
        }
    }

    /// Build a request from the string a shell collected for the format
    /// (e.g. the text of a combo box).
    pub fn parse(source_path: impl Into<PathBuf>, target_format: &str) -> Result<Self, ConvertError> {
        Ok(Self::new(source_path, target_format.parse()?))
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn target_format(&self) -> TargetFormat {
        self.target_format
    }

    /// Where the output lands: the source path with its extension swapped.
    ///
    /// `reports/q3.docx` → `reports/q3.csv`. Existing files at this path are
    /// overwritten.
    pub fn output_path(&self) -> PathBuf {
        self.source_path.with_extension(self.target_format.extension())
    }
}

/// `true` when `path` ends in `.docx` (any case).
pub fn has_source_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(SOURCE_EXTENSION))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_formats_case_insensitively() {
        assert_eq!("PDF".parse::<TargetFormat>().unwrap(), TargetFormat::Pdf);
        assert_eq!("csv".parse::<TargetFormat>().unwrap(), TargetFormat::Csv);
        assert_eq!(" Xlsx ".parse::<TargetFormat>().unwrap(), TargetFormat::Xlsx);
        assert_eq!(".xlsx".parse::<TargetFormat>().unwrap(), TargetFormat::Xlsx);
    }

    #[test]
    fn rejects_unknown_format() {
        let err = "odt".parse::<TargetFormat>().unwrap_err();
        assert!(matches!(err, ConvertError::InvalidFormat { ref value } if value == "odt"));
        assert!(ConversionRequest::parse("a.docx", "").is_err());
    }

    #[test]
    fn output_path_replaces_extension_in_same_directory() {
        let req = ConversionRequest::new("/data/reports/report.docx", TargetFormat::Pdf);
        assert_eq!(req.output_path(), PathBuf::from("/data/reports/report.pdf"));

        let req = ConversionRequest::new("notes.DOCX", TargetFormat::Xlsx);
        assert_eq!(req.output_path(), PathBuf::from("notes.xlsx"));
    }

    #[test]
    fn output_path_only_touches_last_extension() {
        // a ".docx" inside a directory name is left alone
        let req = ConversionRequest::new("/tmp/a.docx.backup/b.docx", TargetFormat::Csv);
        assert_eq!(req.output_path(), PathBuf::from("/tmp/a.docx.backup/b.csv"));
    }

    #[test]
    fn source_extension_check() {
        assert!(has_source_extension(Path::new("a.docx")));
        assert!(has_source_extension(Path::new("A.DocX")));
        assert!(!has_source_extension(Path::new("a.doc")));
        assert!(!has_source_extension(Path::new("docx")));
    }

    #[test]
    fn format_labels() {
        assert_eq!(TargetFormat::Csv.to_string(), "CSV");
        assert_eq!(TargetFormat::Pdf.extension(), "pdf");
    }
}
