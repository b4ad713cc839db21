//! PDF Cross-Reference Table Parser
//!
//! Parses classic xref tables according to ISO 32000-1 Section 7.5.4 and
//! follows `/Prev` links through incremental updates.

use super::lexer::{is_whitespace, rfind_bytes, Token};
use super::objects::ObjectParser;
use super::trailer::PdfTrailer;
use super::{ParseError, ParseResult};
use crate::objects::Object;
use std::collections::{BTreeMap, HashSet};

/// `startxref` must appear within this many bytes of the end of the file
const STARTXREF_SEARCH_WINDOW: usize = 1024;

/// Cross-reference entry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct XRefEntry {
    /// Byte offset in the file (for in-use entries)
    pub offset: u64,
    /// Generation number
    pub generation: u16,
    /// Whether this entry is in use
    pub in_use: bool,
}

/// Merged view of every xref section in a file, newest entries winning
#[derive(Debug, Clone, Default)]
pub struct XRefTable {
    entries: BTreeMap<u32, XRefEntry>,
}

impl XRefTable {
    /// Create a new empty xref table
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the xref chain of a file.
    ///
    /// `base` is the byte offset of the `%PDF-` header. Offsets in the file
    /// are tried relative to it first and as absolute offsets second.
    /// Returns the merged table and the newest trailer.
    pub fn load(data: &[u8], base: usize) -> ParseResult<(Self, PdfTrailer)> {
        let mut table = Self::new();
        let mut visited = HashSet::new();
        let mut newest: Option<PdfTrailer> = None;
        let mut next = Some(Self::find_startxref(data)?);

        while let Some(offset) = next {
            if !visited.insert(offset) {
                return Err(ParseError::CircularReference(format!(
                    "xref /Prev chain revisits offset {offset}"
                )));
            }

            let position = Self::locate_section(data, base, offset)?;
            let (entries, trailer_dict) = Self::parse_section(data, position)?;
            let trailer = PdfTrailer::from_dict(trailer_dict, offset)?;
            tracing::trace!(offset, entries = entries.len(), "read xref section");

            for (number, entry) in entries {
                table.entries.entry(number).or_insert(entry);
            }

            next = trailer.prev;
            if newest.is_none() {
                newest = Some(trailer);
            } else if trailer.is_encrypted() {
                return Err(ParseError::EncryptionNotSupported);
            }
        }

        let trailer = newest.ok_or_else(|| ParseError::InvalidXRef("no xref section".into()))?;
        Ok((table, trailer))
    }

    /// Find the offset named by the last `startxref` keyword
    pub fn find_startxref(data: &[u8]) -> ParseResult<u64> {
        let window_start = data.len().saturating_sub(STARTXREF_SEARCH_WINDOW);
        let keyword = rfind_bytes(&data[window_start..], b"startxref")
            .map(|pos| pos + window_start)
            .ok_or_else(|| ParseError::InvalidXRef("startxref not found".to_string()))?;

        let mut parser = ObjectParser::new(data, keyword + b"startxref".len());
        match parser.next_token()? {
            Token::Integer(offset) if offset >= 0 => Ok(offset as u64),
            other => Err(ParseError::InvalidXRef(format!(
                "startxref is followed by {other:?}"
            ))),
        }
    }

    /// Resolve a recorded offset to the position of an `xref` keyword
    fn locate_section(data: &[u8], base: usize, offset: u64) -> ParseResult<usize> {
        let offset = usize::try_from(offset)
            .map_err(|_| ParseError::InvalidXRef(format!("offset {offset} out of range")))?;
        let mut candidates = vec![base.saturating_add(offset)];
        if base != 0 {
            candidates.push(offset);
        }

        for &candidate in &candidates {
            if candidate >= data.len() {
                continue;
            }
            let mut pos = candidate;
            while pos < data.len() && is_whitespace(data[pos]) {
                pos += 1;
            }
            if data[pos..].starts_with(b"xref") {
                return Ok(pos);
            }
        }

        // An `n g obj` at the offset means a cross-reference stream
        for &candidate in &candidates {
            if candidate < data.len() {
                let mut parser = ObjectParser::new(data, candidate);
                if let Ok((_, Object::Stream(stream))) = parser.parse_indirect_object() {
                    if stream.dictionary().get_type() == Some("XRef") {
                        return Err(ParseError::XRefStreamNotSupported);
                    }
                }
            }
        }

        Err(ParseError::InvalidXRef(format!(
            "no xref table at offset {offset}"
        )))
    }

    /// Parse one `xref ... trailer << >>` section starting at `position`
    fn parse_section(
        data: &[u8],
        position: usize,
    ) -> ParseResult<(Vec<(u32, XRefEntry)>, crate::objects::Dictionary)> {
        let mut parser = ObjectParser::new(data, position);
        match parser.next_token()? {
            Token::XRef => {}
            other => return Err(ParseError::InvalidXRef(format!("expected xref, found {other:?}"))),
        }

        let mut entries = Vec::new();
        loop {
            match parser.next_token()? {
                Token::Trailer => break,
                Token::Integer(first) => {
                    let count = match parser.next_token()? {
                        Token::Integer(count) => count,
                        other => {
                            return Err(ParseError::InvalidXRef(format!(
                                "bad subsection header: {first} {other:?}"
                            )))
                        }
                    };
                    let (first, count) = match (u32::try_from(first), u32::try_from(count)) {
                        (Ok(first), Ok(count)) => (first, count),
                        _ => {
                            return Err(ParseError::InvalidXRef(format!(
                                "subsection {first} {count} out of range"
                            )))
                        }
                    };
                    for i in 0..count {
                        let number = first.checked_add(i).ok_or_else(|| {
                            ParseError::InvalidXRef("object number overflow".to_string())
                        })?;
                        entries.push((number, Self::parse_entry(&mut parser)?));
                    }
                }
                other => {
                    return Err(ParseError::InvalidXRef(format!(
                        "expected subsection or trailer, found {other:?}"
                    )))
                }
            }
        }

        match parser.parse_object()? {
            Object::Dictionary(dict) => Ok((entries, dict)),
            other => Err(ParseError::InvalidTrailer(format!(
                "trailer is not a dictionary: {other:?}"
            ))),
        }
    }

    /// `nnnnnnnnnn ggggg n` or `... f`
    fn parse_entry(parser: &mut ObjectParser<'_, '_>) -> ParseResult<XRefEntry> {
        let offset = parser.next_token()?;
        let generation = parser.next_token()?;
        let kind = parser.next_token()?;

        match (offset, generation, kind) {
            (Token::Integer(offset), Token::Integer(generation), Token::Keyword(kind))
                if offset >= 0 && (0..=i64::from(u16::MAX)).contains(&generation) =>
            {
                let in_use = match kind.as_str() {
                    "n" => true,
                    "f" => false,
                    _ => {
                        return Err(ParseError::InvalidXRef(format!(
                            "entry type must be n or f, found {kind}"
                        )))
                    }
                };
                Ok(XRefEntry {
                    offset: offset as u64,
                    generation: generation as u16,
                    in_use,
                })
            }
            (o, g, k) => Err(ParseError::InvalidXRef(format!(
                "malformed entry {o:?} {g:?} {k:?}"
            ))),
        }
    }

    pub fn get(&self, number: u32) -> Option<&XRefEntry> {
        self.entries.get(&number)
    }

    /// In-use entries in ascending object number, skipping object 0
    pub fn in_use(&self) -> impl Iterator<Item = (u32, &XRefEntry)> {
        self.entries
            .iter()
            .filter(|(number, entry)| **number != 0 && entry.in_use)
            .map(|(number, entry)| (*number, entry))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
