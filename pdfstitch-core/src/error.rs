use thiserror::Error;

#[derive(Error, Debug)]
pub enum PdfError {
    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    #[error("Merge requested with no input documents")]
    EmptyMergeSet,

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    #[error("Render error: {0}")]
    RenderError(String),

    #[error("Compression error: {0}")]
    CompressionError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PdfError>;

impl PdfError {
    /// True for failures caused by the caller's input rather than by the engine.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PdfError::MalformedDocument(_) | PdfError::EmptyMergeSet | PdfError::TemplateNotFound(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error as IoError, ErrorKind};

    #[test]
    fn test_pdf_error_display() {
        let error = PdfError::MalformedDocument("missing trailer".to_string());
        assert_eq!(error.to_string(), "Malformed document: missing trailer");
        assert_eq!(
            PdfError::EmptyMergeSet.to_string(),
            "Merge requested with no input documents"
        );
    }

    #[test]
    fn test_error_chain_display() {
        let errors = [
            (
                "Serialization error: root catalog 1 0 R is absent",
                PdfError::SerializationError("root catalog 1 0 R is absent".to_string()),
            ),
            (
                "Template not found: invoice",
                PdfError::TemplateNotFound("invoice".to_string()),
            ),
            (
                "Render error: not a PDF",
                PdfError::RenderError("not a PDF".to_string()),
            ),
            (
                "Compression error: deflate failed",
                PdfError::CompressionError("deflate failed".to_string()),
            ),
        ];

        for (expected, error) in errors {
            assert_eq!(error.to_string(), expected);
        }
    }

    #[test]
    fn test_io_error_preservation() {
        let original_io_error = IoError::new(ErrorKind::PermissionDenied, "access denied");
        let pdf_error = PdfError::from(original_io_error);

        if let PdfError::Io(io_err) = pdf_error {
            assert_eq!(io_err.kind(), ErrorKind::PermissionDenied);
            assert_eq!(io_err.to_string(), "access denied");
        } else {
            panic!("IO error should be preserved as PdfError::Io");
        }
    }

    #[test]
    fn test_client_error_classification() {
        assert!(PdfError::EmptyMergeSet.is_client_error());
        assert!(PdfError::MalformedDocument("x".to_string()).is_client_error());
        assert!(PdfError::TemplateNotFound("x".to_string()).is_client_error());
        assert!(!PdfError::SerializationError("x".to_string()).is_client_error());
        assert!(!PdfError::RenderError("x".to_string()).is_client_error());
    }

    #[test]
    fn test_error_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PdfError>();
    }
}
