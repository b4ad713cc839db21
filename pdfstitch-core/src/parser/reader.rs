//! High-level PDF Reader
//!
//! Combines header, xref and object parsing into a [`Document`].

use super::header::PdfHeader;
use super::objects::ObjectParser;
use super::trailer::PdfTrailer;
use super::xref::{XRefEntry, XRefTable};
use super::{ParseError, ParseResult};
use crate::document::Document;
use crate::objects::{Object, ObjectId};
use std::collections::BTreeMap;

/// PDF reader over an in-memory file
pub struct PdfReader<'a> {
    data: &'a [u8],
    header: PdfHeader,
    xref: XRefTable,
    trailer: PdfTrailer,
}

impl<'a> PdfReader<'a> {
    /// Read the header, xref chain and trailer of `data`
    pub fn new(data: &'a [u8]) -> ParseResult<Self> {
        let header = PdfHeader::parse(data)?;
        let (xref, trailer) = XRefTable::load(data, header.offset)?;
        trailer.validate()?;

        Ok(Self {
            data,
            header,
            xref,
            trailer,
        })
    }

    pub fn header(&self) -> &PdfHeader {
        &self.header
    }

    pub fn trailer(&self) -> &PdfTrailer {
        &self.trailer
    }

    pub fn xref(&self) -> &XRefTable {
        &self.xref
    }

    /// Candidate file positions for an xref offset
    fn candidates(&self, offset: u64) -> impl Iterator<Item = usize> + '_ {
        let offset = usize::try_from(offset).unwrap_or(usize::MAX);
        let base = self.header.offset;
        let relative = base.checked_add(offset);
        let absolute = (base != 0).then_some(offset);
        relative
            .into_iter()
            .chain(absolute)
            .filter(move |&pos| pos < self.data.len())
    }

    /// Parse the object an xref entry points at.
    ///
    /// The `n g obj` header found at the offset must name the same object.
    pub fn read_object(&self, number: u32, entry: &XRefEntry) -> ParseResult<(ObjectId, Object)> {
        let expected = ObjectId::new(number, entry.generation);
        let lookup = |id: ObjectId| self.resolve_length(id, number);
        let mut last_error = None;

        for position in self.candidates(entry.offset) {
            let mut parser = ObjectParser::new(self.data, position).with_length_lookup(&lookup);
            match parser.parse_indirect_object() {
                Ok((id, object)) if id == expected => return Ok((id, object)),
                Ok((id, _)) => {
                    last_error = Some(ParseError::ObjectMismatch {
                        expected: expected.to_string(),
                        found: id.to_string(),
                    })
                }
                Err(err) => last_error = Some(err),
            }
        }

        Err(last_error.unwrap_or_else(|| {
            ParseError::InvalidXRef(format!(
                "offset {} of object {expected} is outside the file",
                entry.offset
            ))
        }))
    }

    /// Value of an indirect `/Length`. `requester` guards against a stream
    /// naming itself as its own length.
    fn resolve_length(&self, id: ObjectId, requester: u32) -> Option<i64> {
        if id.number() == requester {
            return None;
        }
        let entry = self.xref.get(id.number()).filter(|e| e.in_use)?;
        for position in self.candidates(entry.offset) {
            let mut parser = ObjectParser::new(self.data, position);
            if let Ok((found, Object::Integer(length))) = parser.parse_indirect_object() {
                if found == id {
                    return Some(length);
                }
            }
        }
        None
    }

    /// Load every in-use object and check the graph is closed
    pub fn into_document(self) -> ParseResult<Document> {
        let mut objects = BTreeMap::new();
        for (number, entry) in self.xref.in_use() {
            let (id, object) = self.read_object(number, entry)?;
            objects.insert(id, object);
        }

        let root = self.trailer.root()?;
        let info = match self.trailer.info() {
            Some(id) if objects.contains_key(&id) => Some(id),
            Some(id) => {
                tracing::warn!(%id, "trailer /Info points at a missing object, ignoring it");
                None
            }
            None => None,
        };

        let document = Document::from_parts(self.header.version, objects, root, info);

        if let Some((from, to)) = document.dangling_references().into_iter().next() {
            tracing::debug!(%from, %to, "dangling reference");
            return Err(ParseError::InvalidReference(to.number(), to.generation()));
        }

        let catalog = document.catalog().ok_or_else(|| {
            ParseError::InvalidTrailer(format!("root {root} is not a catalog dictionary"))
        })?;
        let pages = catalog
            .get("Pages")
            .ok_or_else(|| ParseError::MissingKey("Pages".to_string()))?;
        if document.resolve(pages).and_then(|p| p.as_dict()).is_none() {
            return Err(ParseError::InvalidPageTree(
                "catalog /Pages is not a dictionary".to_string(),
            ));
        }

        Ok(document)
    }
}
