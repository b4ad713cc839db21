use crate::error::{PdfError, Result};
use crate::objects::{Dictionary, Object, ObjectId, Stream};
use crate::parser::page_tree::{collect_pages, ParsedPage};
use crate::parser::PdfVersion;
use crate::writer::PdfWriter;
use std::collections::{BTreeMap, BTreeSet};

/// Reference chains longer than this are treated as unresolvable
const MAX_RESOLVE_HOPS: usize = 32;

/// A PDF document held as an arena of indirect objects.
///
/// Objects are keyed by [`ObjectId`] and iterate in ascending order. Objects
/// refer to each other only through [`Object::Reference`], so the graph may
/// contain cycles (pages point back at their parent) without shared
/// ownership.
///
/// # Example
///
/// ```rust
/// use pdfstitch::Document;
///
/// let mut doc = Document::new();
/// doc.add_page([0.0, 0.0, 612.0, 792.0], b"BT /F1 12 Tf (Hi) Tj ET").unwrap();
/// assert_eq!(doc.page_count().unwrap(), 1);
///
/// let bytes = doc.to_bytes().unwrap();
/// assert!(bytes.starts_with(b"%PDF-1.7"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    version: PdfVersion,
    objects: BTreeMap<ObjectId, Object>,
    root: ObjectId,
    info: Option<ObjectId>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// An empty document: a Catalog (1 0) and a Pages node (2 0) with no kids.
    pub fn new() -> Self {
        let root = ObjectId::new(1, 0);
        let pages = ObjectId::new(2, 0);

        let mut catalog = Dictionary::typed("Catalog");
        catalog.set("Pages", pages);
        let mut pages_dict = Dictionary::typed("Pages");
        pages_dict.set("Kids", Object::Array(Vec::new()));
        pages_dict.set("Count", 0);

        let mut objects = BTreeMap::new();
        objects.insert(root, Object::Dictionary(catalog));
        objects.insert(pages, Object::Dictionary(pages_dict));

        Self::from_parts(PdfVersion::default(), objects, root, None)
    }

    pub fn from_parts(
        version: PdfVersion,
        objects: BTreeMap<ObjectId, Object>,
        root: ObjectId,
        info: Option<ObjectId>,
    ) -> Self {
        Self {
            version,
            objects,
            root,
            info,
        }
    }

    pub fn version(&self) -> PdfVersion {
        self.version
    }

    /// Header version, raised by the Catalog's `/Version` when that is later
    pub fn effective_version(&self) -> PdfVersion {
        self.catalog()
            .and_then(|catalog| catalog.get("Version"))
            .and_then(|version| self.resolve(version))
            .and_then(|version| version.as_name())
            .and_then(PdfVersion::from_name)
            .map_or(self.version, |declared| declared.max(self.version))
    }

    pub fn set_version(&mut self, version: PdfVersion) {
        self.version = version;
    }

    /// Identifier of the root Catalog
    pub fn root(&self) -> ObjectId {
        self.root
    }

    pub fn set_root(&mut self, root: ObjectId) {
        self.root = root;
    }

    /// Identifier of the document information dictionary
    pub fn info(&self) -> Option<ObjectId> {
        self.info
    }

    pub fn set_info(&mut self, info: Option<ObjectId>) {
        self.info = info;
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// All objects in ascending identifier order
    pub fn objects(&self) -> &BTreeMap<ObjectId, Object> {
        &self.objects
    }

    pub(crate) fn into_objects(self) -> BTreeMap<ObjectId, Object> {
        self.objects
    }

    pub fn get(&self, id: ObjectId) -> Option<&Object> {
        self.objects.get(&id)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut Object> {
        self.objects.get_mut(&id)
    }

    pub fn insert(&mut self, id: ObjectId, object: impl Into<Object>) -> Option<Object> {
        self.objects.insert(id, object.into())
    }

    pub fn remove(&mut self, id: ObjectId) -> Option<Object> {
        self.objects.remove(&id)
    }

    /// Highest object number in use, 0 for an empty arena
    pub fn max_object_number(&self) -> u32 {
        self.objects
            .keys()
            .next_back()
            .map(|id| id.number())
            .unwrap_or(0)
    }

    /// Store `object` under the next free object number
    pub fn add_object(&mut self, object: impl Into<Object>) -> ObjectId {
        let id = ObjectId::new(self.max_object_number() + 1, 0);
        self.objects.insert(id, object.into());
        id
    }

    /// Follow references until a direct object is reached
    pub fn resolve<'a>(&'a self, object: &'a Object) -> Option<&'a Object> {
        let mut current = object;
        for _ in 0..MAX_RESOLVE_HOPS {
            match current {
                Object::Reference(id) => current = self.objects.get(id)?,
                direct => return Some(direct),
            }
        }
        None
    }

    /// Resolve to a dictionary (stream dictionaries included)
    pub fn resolve_dict<'a>(&'a self, object: &'a Object) -> Option<&'a Dictionary> {
        self.resolve(object).and_then(|obj| obj.as_dict())
    }

    /// The root Catalog dictionary
    pub fn catalog(&self) -> Option<&Dictionary> {
        match self.objects.get(&self.root)? {
            Object::Dictionary(dict) => Some(dict),
            _ => None,
        }
    }

    /// Identifier of the page tree root named by the Catalog
    pub fn pages_root(&self) -> Option<ObjectId> {
        self.catalog()?.get("Pages")?.as_reference()
    }

    /// The document information dictionary, if any
    pub fn info_dictionary(&self) -> Option<&Dictionary> {
        self.info
            .and_then(|id| self.objects.get(&id))
            .and_then(|obj| obj.as_dict())
    }

    /// Every `(referrer, target)` pair whose target is absent
    pub fn dangling_references(&self) -> Vec<(ObjectId, ObjectId)> {
        let mut dangling = Vec::new();
        for (id, object) in &self.objects {
            object.for_each_reference(&mut |target| {
                if !self.objects.contains_key(&target) {
                    dangling.push((*id, target));
                }
            });
        }
        dangling
    }

    /// Objects reachable from the root Catalog and the info dictionary
    pub fn reachable_objects(&self) -> BTreeSet<ObjectId> {
        let mut seen = BTreeSet::new();
        let mut stack: Vec<ObjectId> = std::iter::once(self.root).chain(self.info).collect();

        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            if let Some(object) = self.objects.get(&id) {
                object.for_each_reference(&mut |target| {
                    if !seen.contains(&target) {
                        stack.push(target);
                    }
                });
            }
        }
        seen
    }

    /// Drop every object not reachable from the Catalog or `/Info`.
    /// Returns the number of objects removed.
    pub fn prune_unreachable(&mut self) -> usize {
        let reachable = self.reachable_objects();
        let before = self.objects.len();
        self.objects.retain(|id, _| reachable.contains(id));
        let removed = before - self.objects.len();
        if removed > 0 {
            tracing::debug!(removed, "pruned unreachable objects");
        }
        removed
    }

    /// Leaf pages in document order
    pub fn pages(&self) -> Result<Vec<ParsedPage>> {
        Ok(collect_pages(self)?)
    }

    pub fn page_count(&self) -> Result<usize> {
        Ok(self.pages()?.len())
    }

    /// Decoded content of a page: every content stream in order, joined by
    /// newlines.
    pub fn page_content(&self, page: ObjectId) -> Result<Vec<u8>> {
        let dict = self
            .get(page)
            .and_then(|obj| obj.as_dict())
            .ok_or_else(|| PdfError::MalformedDocument(format!("page {page} not found")))?;

        let contents = match dict.get("Contents").and_then(|c| self.resolve(c)) {
            None | Some(Object::Null) => return Ok(Vec::new()),
            Some(Object::Array(items)) => items.clone(),
            Some(_) => vec![dict.get("Contents").cloned().unwrap_or(Object::Null)],
        };

        let mut content = Vec::new();
        for item in &contents {
            let stream = self
                .resolve(item)
                .and_then(|obj| obj.as_stream())
                .ok_or_else(|| {
                    PdfError::MalformedDocument(format!("page {page} content is not a stream"))
                })?;
            if !content.is_empty() {
                content.push(b'\n');
            }
            content.extend_from_slice(&stream.decoded_data()?);
        }
        Ok(content)
    }

    /// Append a page with one content stream and empty resources under the
    /// page tree root.
    pub fn add_page(&mut self, media_box: [f64; 4], content: &[u8]) -> Result<ObjectId> {
        let pages_id = self
            .pages_root()
            .ok_or_else(|| PdfError::MalformedDocument("catalog has no /Pages".to_string()))?;

        let contents_id = self.add_object(Stream::new(content.to_vec()));
        let mut page = Dictionary::typed("Page");
        page.set("Parent", pages_id);
        page.set(
            "MediaBox",
            Object::Array(media_box.iter().map(|&v| number(v)).collect()),
        );
        page.set("Resources", Dictionary::new());
        page.set("Contents", contents_id);
        let page_id = self.add_object(page);

        let pages = self
            .get_mut(pages_id)
            .and_then(|obj| obj.as_dict_mut())
            .ok_or_else(|| PdfError::MalformedDocument(format!("{pages_id} is not a Pages node")))?;
        let count = pages.get("Count").and_then(|c| c.as_integer()).unwrap_or(0);
        match pages.get_mut("Kids").and_then(|k| k.as_array_mut()) {
            Some(kids) => kids.push(Object::Reference(page_id)),
            None => pages.set("Kids", vec![Object::Reference(page_id)]),
        }
        pages.set("Count", count + 1);

        Ok(page_id)
    }

    /// Serialize the document
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        PdfWriter::new(&mut buffer).write_document(self)?;
        Ok(buffer)
    }
}

/// Integral values are written as integers
pub(crate) fn number(value: f64) -> Object {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Object::Integer(value as i64)
    } else {
        Object::Real(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_new_document_structure() {
        let doc = Document::new();
        assert_eq!(doc.len(), 2);
        assert_eq!(doc.catalog().unwrap().get_type(), Some("Catalog"));
        assert_eq!(doc.pages_root(), Some(ObjectId::new(2, 0)));
        assert_eq!(doc.page_count().unwrap(), 0);
    }

    #[test]
    fn test_add_object_uses_next_number() {
        let mut doc = Document::new();
        let id = doc.add_object(Object::Integer(5));
        assert_eq!(id, ObjectId::new(3, 0));
        doc.insert(ObjectId::new(10, 0), Object::Null);
        assert_eq!(doc.add_object(Object::Null), ObjectId::new(11, 0));
        assert_eq!(doc.max_object_number(), 11);
    }

    #[test]
    fn test_add_page_updates_tree() {
        let mut doc = Document::new();
        let first = doc.add_page([0.0, 0.0, 612.0, 792.0], b"0 0 m").unwrap();
        let second = doc.add_page([0.0, 0.0, 595.5, 842.0], b"1 1 m").unwrap();

        let pages = doc.pages().unwrap();
        let ids: Vec<ObjectId> = pages.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![first, second]);
        assert_eq!(pages[1].media_box, [0.0, 0.0, 595.5, 842.0]);

        let root = doc.get(doc.pages_root().unwrap()).unwrap().as_dict().unwrap();
        assert_eq!(root.get("Count"), Some(&Object::Integer(2)));
        assert_eq!(doc.page_content(second).unwrap(), b"1 1 m");
    }

    #[test]
    fn test_resolve_follows_chains_and_stops_on_cycles() {
        let mut doc = Document::new();
        doc.insert(ObjectId::new(10, 0), Object::Reference(ObjectId::new(11, 0)));
        doc.insert(ObjectId::new(11, 0), Object::Integer(7));
        doc.insert(ObjectId::new(12, 0), Object::Reference(ObjectId::new(12, 0)));

        let chained = Object::Reference(ObjectId::new(10, 0));
        assert_eq!(doc.resolve(&chained), Some(&Object::Integer(7)));
        let cyclic = Object::Reference(ObjectId::new(12, 0));
        assert_eq!(doc.resolve(&cyclic), None);
        let missing = Object::Reference(ObjectId::new(99, 0));
        assert_eq!(doc.resolve(&missing), None);
    }

    #[test]
    fn test_dangling_references() {
        let mut doc = Document::new();
        assert!(doc.dangling_references().is_empty());

        let mut dict = Dictionary::new();
        dict.set("Missing", ObjectId::new(40, 0));
        let holder = doc.add_object(dict);
        assert_eq!(
            doc.dangling_references(),
            vec![(holder, ObjectId::new(40, 0))]
        );
    }

    #[test]
    fn test_prune_unreachable_keeps_info() {
        let mut doc = Document::new();
        doc.add_page([0.0, 0.0, 100.0, 100.0], b"").unwrap();
        let orphan = doc.add_object(Object::Integer(1));
        let mut info = Dictionary::new();
        info.set("Title", Object::String(b"kept".to_vec()));
        let info_id = doc.add_object(info);
        doc.set_info(Some(info_id));

        assert_eq!(doc.prune_unreachable(), 1);
        assert!(doc.get(orphan).is_none());
        assert!(doc.info_dictionary().is_some());
        assert_eq!(doc.page_count().unwrap(), 1);
    }

    #[test]
    fn test_page_content_joins_streams() {
        let mut doc = Document::new();
        let page = doc.add_page([0.0, 0.0, 10.0, 10.0], b"first").unwrap();
        let second = doc.add_object(Stream::new(b"second".to_vec()));
        let first = doc.get(page).unwrap().as_dict().unwrap().get("Contents").cloned().unwrap();
        doc.get_mut(page)
            .unwrap()
            .as_dict_mut()
            .unwrap()
            .set("Contents", vec![first, Object::Reference(second)]);

        assert_eq!(doc.page_content(page).unwrap(), b"first\nsecond");
    }

    #[test]
    fn test_number_formatting() {
        assert_eq!(number(612.0), Object::Integer(612));
        assert_eq!(number(595.5), Object::Real(595.5));
    }
}
