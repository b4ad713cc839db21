//! Page Tree Traversal
//!
//! Flattens the page tree into leaf pages in document order, resolving the
//! attributes a leaf inherits from its ancestors (ISO 32000-1 Section 7.7.3.4).

use super::{ParseError, ParseResult};
use crate::document::Document;
use crate::objects::{Dictionary, Object, ObjectId};
use std::collections::HashSet;

/// Page trees nested deeper than this are rejected
const MAX_TREE_DEPTH: usize = 64;

/// US Letter, used when no MediaBox is found on a page or its ancestors
pub const DEFAULT_MEDIA_BOX: [f64; 4] = [0.0, 0.0, 612.0, 792.0];

/// Inheritable page attributes, as stored (references are not resolved)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InheritedAttributes {
    pub resources: Option<Object>,
    pub media_box: Option<Object>,
    pub crop_box: Option<Object>,
    pub rotate: Option<Object>,
}

impl InheritedAttributes {
    pub const KEYS: [&'static str; 4] = ["Resources", "MediaBox", "CropBox", "Rotate"];

    /// Attributes in effect below `node`: its own entries win
    fn overridden_by(&self, node: &Dictionary) -> Self {
        let pick = |key: &str, inherited: &Option<Object>| {
            node.get(key).cloned().or_else(|| inherited.clone())
        };
        Self {
            resources: pick("Resources", &self.resources),
            media_box: pick("MediaBox", &self.media_box),
            crop_box: pick("CropBox", &self.crop_box),
            rotate: pick("Rotate", &self.rotate),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Object> {
        match key {
            "Resources" => self.resources.as_ref(),
            "MediaBox" => self.media_box.as_ref(),
            "CropBox" => self.crop_box.as_ref(),
            "Rotate" => self.rotate.as_ref(),
            _ => None,
        }
    }
}

/// A leaf of the page tree
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedPage {
    /// The Page object
    pub id: ObjectId,
    /// Effective inheritable attributes, including the page's own
    pub attributes: InheritedAttributes,
    /// Effective MediaBox as `[llx lly urx ury]`, normalized so `ll <= ur`
    pub media_box: [f64; 4],
    /// Effective CropBox, if one is set
    pub crop_box: Option<[f64; 4]>,
    /// Effective rotation in degrees
    pub rotation: i64,
}

impl ParsedPage {
    /// The visible region: the CropBox when present, else the MediaBox
    pub fn visible_box(&self) -> [f64; 4] {
        self.crop_box.unwrap_or(self.media_box)
    }

    pub fn width(&self) -> f64 {
        self.media_box[2] - self.media_box[0]
    }

    pub fn height(&self) -> f64 {
        self.media_box[3] - self.media_box[1]
    }
}

/// All leaf pages of `doc` in traversal order
pub fn collect_pages(doc: &Document) -> ParseResult<Vec<ParsedPage>> {
    let catalog = doc
        .catalog()
        .ok_or_else(|| ParseError::InvalidTrailer(format!("root {} is not a dictionary", doc.root())))?;
    let root = catalog
        .get("Pages")
        .ok_or_else(|| ParseError::MissingKey("Pages".to_string()))?
        .as_reference()
        .ok_or_else(|| ParseError::InvalidPageTree("catalog /Pages must be a reference".into()))?;

    let mut walker = Walker {
        doc,
        visited: HashSet::new(),
        pages: Vec::new(),
    };
    walker.visit(root, &InheritedAttributes::default(), 0)?;
    Ok(walker.pages)
}

struct Walker<'d> {
    doc: &'d Document,
    visited: HashSet<ObjectId>,
    pages: Vec<ParsedPage>,
}

impl Walker<'_> {
    fn visit(&mut self, id: ObjectId, inherited: &InheritedAttributes, depth: usize) -> ParseResult<()> {
        if depth > MAX_TREE_DEPTH {
            return Err(ParseError::InvalidPageTree(format!(
                "page tree deeper than {MAX_TREE_DEPTH} levels"
            )));
        }
        if !self.visited.insert(id) {
            return Err(ParseError::CircularReference(format!("page tree node {id}")));
        }

        let node = match self.doc.get(id) {
            Some(Object::Dictionary(dict)) => dict,
            Some(_) => {
                return Err(ParseError::InvalidPageTree(format!(
                    "node {id} is not a dictionary"
                )))
            }
            None => return Err(ParseError::InvalidReference(id.number(), id.generation())),
        };
        let attributes = inherited.overridden_by(node);

        let is_pages = match node.get_type() {
            Some("Pages") => true,
            Some("Page") => false,
            other => {
                tracing::warn!(%id, node_type = ?other, "page tree node without a usable /Type");
                node.contains_key("Kids")
            }
        };

        if is_pages {
            let kids = node
                .get("Kids")
                .and_then(|kids| self.doc.resolve(kids))
                .and_then(|kids| kids.as_array())
                .ok_or_else(|| ParseError::InvalidPageTree(format!("node {id} has no /Kids array")))?;
            for kid in kids {
                let kid_id = kid.as_reference().ok_or_else(|| {
                    ParseError::InvalidPageTree(format!("node {id} has a direct object in /Kids"))
                })?;
                self.visit(kid_id, &attributes, depth + 1)?;
            }
        } else {
            let page = self.leaf(id, attributes);
            self.pages.push(page);
        }
        Ok(())
    }

    fn leaf(&self, id: ObjectId, attributes: InheritedAttributes) -> ParsedPage {
        let media_box = attributes
            .media_box
            .as_ref()
            .and_then(|b| self.rectangle(b))
            .unwrap_or(DEFAULT_MEDIA_BOX);
        let crop_box = attributes.crop_box.as_ref().and_then(|b| self.rectangle(b));
        let rotation = attributes
            .rotate
            .as_ref()
            .and_then(|r| self.doc.resolve(r))
            .and_then(|r| r.as_integer())
            .unwrap_or(0);

        ParsedPage {
            id,
            attributes,
            media_box,
            crop_box,
            rotation,
        }
    }

    fn rectangle(&self, object: &Object) -> Option<[f64; 4]> {
        let items = self.doc.resolve(object)?.as_array()?;
        if items.len() != 4 {
            return None;
        }
        let mut values = [0.0; 4];
        for (slot, item) in values.iter_mut().zip(items) {
            *slot = self.doc.resolve(item)?.as_real()?;
        }
        Some([
            values[0].min(values[2]),
            values[1].min(values[3]),
            values[0].max(values[2]),
            values[1].max(values[3]),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_helpers;
    use super::*;
    use crate::parser::parse_document;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_flat_tree_order() {
        let doc = parse_document(&test_helpers::create_pdf_with_pages(3, "P")).unwrap();
        let pages = collect_pages(&doc).unwrap();
        let ids: Vec<u32> = pages.iter().map(|p| p.id.number()).collect();
        assert_eq!(ids, vec![4, 6, 8]);
        assert!(pages.iter().all(|p| p.media_box == DEFAULT_MEDIA_BOX));
    }

    #[test]
    fn test_nested_tree_inheritance() {
        let doc = parse_document(&test_helpers::create_nested_pdf()).unwrap();
        let pages = collect_pages(&doc).unwrap();
        assert_eq!(pages.len(), 3);

        let ids: Vec<u32> = pages.iter().map(|p| p.id.number()).collect();
        assert_eq!(ids, vec![4, 5, 6]);

        // Inherited from the root
        assert_eq!(pages[0].media_box, [0.0, 0.0, 595.0, 842.0]);
        assert_eq!(pages[0].rotation, 90);
        assert_eq!(
            pages[0].attributes.resources,
            Some(Object::Reference(ObjectId::new(9, 0)))
        );
        // Inherited from the intermediate node
        assert_eq!(pages[1].crop_box, Some([10.0, 10.0, 585.0, 832.0]));
        assert_eq!(pages[1].visible_box(), [10.0, 10.0, 585.0, 832.0]);

        // The last leaf overrides MediaBox and Rotate, and sits outside the
        // intermediate node so it has no CropBox
        assert_eq!(pages[2].media_box, [0.0, 0.0, 200.0, 300.0]);
        assert_eq!(pages[2].rotation, 0);
        assert_eq!(pages[2].crop_box, None);
        assert_eq!(pages[2].width(), 200.0);
        assert_eq!(pages[2].height(), 300.0);
    }

    #[test]
    fn test_cycle_is_detected() {
        let pdf = test_helpers::create_pdf_with_page_cycle();
        let doc = crate::parser::PdfReader::new(&pdf)
            .unwrap()
            .into_document()
            .unwrap();
        assert!(matches!(
            collect_pages(&doc),
            Err(ParseError::CircularReference(_))
        ));
    }

    #[test]
    fn test_missing_media_box_defaults_to_letter() {
        let mut doc = Document::new();
        let mut page = Dictionary::typed("Page");
        page.set("Parent", ObjectId::new(2, 0));
        let page_id = doc.add_object(page);
        let pages = doc.get_mut(ObjectId::new(2, 0)).unwrap().as_dict_mut().unwrap();
        pages.set("Kids", vec![Object::Reference(page_id)]);
        pages.set("Count", 1);

        let leaves = collect_pages(&doc).unwrap();
        assert_eq!(leaves[0].media_box, DEFAULT_MEDIA_BOX);
        assert_eq!(leaves[0].visible_box(), DEFAULT_MEDIA_BOX);
    }

    #[test]
    fn test_inverted_box_is_normalized() {
        let mut doc = Document::new();
        let page = doc.add_page([612.0, 792.0, 0.0, 0.0], b"").unwrap();
        let leaves = collect_pages(&doc).unwrap();
        assert_eq!(leaves[0].id, page);
        assert_eq!(leaves[0].media_box, [0.0, 0.0, 612.0, 792.0]);
    }

    #[test]
    fn test_direct_kid_is_rejected() {
        let mut doc = Document::new();
        let pages = doc.get_mut(ObjectId::new(2, 0)).unwrap().as_dict_mut().unwrap();
        pages.set("Kids", vec![Object::Dictionary(Dictionary::typed("Page"))]);
        assert!(matches!(
            collect_pages(&doc),
            Err(ParseError::InvalidPageTree(_))
        ));
    }
}
