//! PDF Trailer Parser
//!
//! Parses PDF trailer according to ISO 32000-1 Section 7.5.5

use super::{ParseError, ParseResult};
use crate::objects::{Dictionary, Object, ObjectId};

/// PDF Trailer information
#[derive(Debug, Clone)]
pub struct PdfTrailer {
    /// The trailer dictionary
    pub dict: Dictionary,
    /// Byte offset of previous xref section (if any)
    pub prev: Option<u64>,
    /// Byte offset of this xref section
    pub xref_offset: u64,
}

impl PdfTrailer {
    /// Parse trailer from a dictionary
    pub fn from_dict(dict: Dictionary, xref_offset: u64) -> ParseResult<Self> {
        let prev = match dict.get("Prev") {
            None => None,
            Some(Object::Integer(offset)) if *offset >= 0 => Some(*offset as u64),
            Some(other) => {
                return Err(ParseError::InvalidTrailer(format!(
                    "/Prev must be a non-negative integer, found {other:?}"
                )))
            }
        };

        Ok(PdfTrailer {
            dict,
            prev,
            xref_offset,
        })
    }

    /// Get the size (number of entries in xref table)
    pub fn size(&self) -> ParseResult<u32> {
        self.dict
            .get("Size")
            .and_then(|obj| obj.as_integer())
            .and_then(|i| u32::try_from(i).ok())
            .ok_or_else(|| ParseError::MissingKey("Size".to_string()))
    }

    /// Get the root object reference (document catalog)
    pub fn root(&self) -> ParseResult<ObjectId> {
        self.dict
            .get("Root")
            .and_then(|obj| obj.as_reference())
            .ok_or_else(|| ParseError::MissingKey("Root".to_string()))
    }

    /// Get the info object reference (document information dictionary)
    pub fn info(&self) -> Option<ObjectId> {
        self.dict.get("Info").and_then(|obj| obj.as_reference())
    }

    /// Check if this PDF is encrypted
    pub fn is_encrypted(&self) -> bool {
        self.dict.contains_key("Encrypt")
    }

    /// Hybrid files point at an extra cross-reference stream
    pub fn has_xref_stream(&self) -> bool {
        self.dict.contains_key("XRefStm")
    }

    /// Validate the newest trailer of a file
    pub fn validate(&self) -> ParseResult<()> {
        if self.is_encrypted() {
            return Err(ParseError::EncryptionNotSupported);
        }
        if self.has_xref_stream() {
            return Err(ParseError::XRefStreamNotSupported);
        }
        self.root()?;
        Ok(())
    }
}
