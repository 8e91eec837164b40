//! Error types for the parsing and structuring pipeline.

use thiserror::Error;

/// Error types that can occur while turning an uploaded document into a
/// structured template.
///
/// Construction-time problems (a malformed structure specification, an
/// unknown checker key) are [`DocStructError::Config`] and indicate a
/// deployment defect, not a per-document issue. Per-document problems are
/// [`DocStructError::Format`] (rejected input, names the extension) and
/// [`DocStructError::Parse`] (malformed archive, names the file).
#[derive(Error, Debug)]
pub enum DocStructError {
    /// Malformed structure specification or unregistered checker key.
    ///
    /// Raised at construction, before any document is processed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Unsupported input format.
    ///
    /// The message names the offending file extension.
    #[error("Unsupported file type: {0}")]
    Format(String),

    /// Malformed source document.
    ///
    /// The message identifies the source file name.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The file-storage collaborator failed to persist extracted media.
    #[error("Storage error: {0}")]
    Storage(String),

    /// File I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Type alias for [`Result<T, DocStructError>`].
pub type Result<T> = std::result::Result<T, DocStructError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_error_names_extension() {
        let error = DocStructError::Format("pdf".to_string());
        assert_eq!(format!("{error}"), "Unsupported file type: pdf");
    }

    #[test]
    fn test_parse_error_names_file() {
        let error = DocStructError::Parse("broken.docx is not a ZIP archive".to_string());
        assert!(format!("{error}").contains("broken.docx"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let error: DocStructError = io.into();
        assert!(matches!(error, DocStructError::Io(_)));
    }
}
