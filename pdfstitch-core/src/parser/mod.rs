//! PDF Parser Module
//!
//! Reads a complete PDF byte stream into a [`Document`]: header, classic
//! cross-reference tables (including incremental updates), trailer and every
//! in-use indirect object. Cross-reference streams and encrypted files are
//! rejected.

pub mod header;
pub mod lexer;
pub mod objects;
pub mod page_tree;
pub mod reader;
pub mod trailer;
pub mod xref;

#[cfg(test)]
pub(crate) mod test_helpers;

use crate::document::Document;
use crate::error::PdfError;

pub use self::header::{PdfHeader, PdfVersion};
pub use self::page_tree::{collect_pages, InheritedAttributes, ParsedPage};
pub use self::reader::PdfReader;

/// Result type for parser operations
pub type ParseResult<T> = Result<T, ParseError>;

/// PDF Parser errors
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Invalid PDF header")]
    InvalidHeader,

    #[error("Unsupported PDF version: {0}")]
    UnsupportedVersion(String),

    #[error("Syntax error at position {position}: {message}")]
    SyntaxError { position: usize, message: String },

    #[error("Unexpected token: expected {expected}, found {found}")]
    UnexpectedToken { expected: String, found: String },

    #[error("Invalid object reference: {0} {1} R")]
    InvalidReference(u32, u16),

    #[error("Object {expected} not found at its xref offset (found {found})")]
    ObjectMismatch { expected: String, found: String },

    #[error("Missing required key: {0}")]
    MissingKey(String),

    #[error("Invalid xref table: {0}")]
    InvalidXRef(String),

    #[error("Invalid trailer: {0}")]
    InvalidTrailer(String),

    #[error("Invalid page tree: {0}")]
    InvalidPageTree(String),

    #[error("Circular reference detected at {0}")]
    CircularReference(String),

    #[error("Cross-reference streams are not supported")]
    XRefStreamNotSupported,

    #[error("Encryption not supported")]
    EncryptionNotSupported,
}

impl From<ParseError> for PdfError {
    fn from(err: ParseError) -> Self {
        PdfError::MalformedDocument(err.to_string())
    }
}

/// Parse a complete PDF file into an in-memory document.
///
/// Fails with [`PdfError::MalformedDocument`] when the header, xref,
/// trailer or root catalog cannot be read, or when any reference dangles.
pub fn parse_document(data: &[u8]) -> crate::Result<Document> {
    let _span = tracing::debug_span!("parse_document", bytes = data.len()).entered();
    let document = PdfReader::new(data)?.into_document()?;
    tracing::debug!(
        objects = document.len(),
        version = %document.version(),
        "parsed document"
    );
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_becomes_malformed_document() {
        let err: PdfError = ParseError::InvalidXRef("bad entry".to_string()).into();
        match err {
            PdfError::MalformedDocument(message) => {
                assert_eq!(message, "Invalid xref table: bad entry")
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_parse_minimal_document() {
        let doc = parse_document(&test_helpers::create_minimal_pdf()).unwrap();
        assert_eq!(doc.len(), 2);
        assert_eq!(doc.version().to_string(), "1.4");
        assert!(doc.catalog().is_some());
    }

    #[test]
    fn test_garbage_is_malformed() {
        let result = parse_document(b"this is not a pdf at all");
        assert!(matches!(result, Err(PdfError::MalformedDocument(_))));
    }
}
