//! PDF merging functionality
//!
//! Combines the object graphs of several documents into one. Every input
//! gets its own block of object numbers, the leaves of every page tree are
//! collected under a single new Pages node, and a new Catalog replaces the
//! inputs' own.

use crate::document::{number, Document};
use crate::error::{PdfError, Result};
use crate::objects::{Dictionary, Object, ObjectId};
use crate::parser::{parse_document, InheritedAttributes, PdfVersion};
use crate::writer::format_pdf_date;
use chrono::Utc;
use std::collections::BTreeMap;

/// Options for PDF merging
#[derive(Debug, Clone, Default)]
pub struct MergeOptions {
    /// How to handle metadata
    pub metadata: MetadataMode,
}

/// How to handle metadata when merging
#[derive(Debug, Clone, Default, PartialEq)]
pub enum MetadataMode {
    /// Use the information dictionary of the first document
    #[default]
    FromFirst,
    /// Use custom metadata
    Custom {
        title: Option<String>,
        author: Option<String>,
        subject: Option<String>,
        keywords: Option<String>,
    },
    /// Don't set any metadata
    None,
}

/// Maps `(document index, original id)` to the id used in the merged graph.
///
/// Document `i` owns the numbers `offset(i) + 1 ..= offset(i) + max(i)`,
/// where `offset(i)` is the sum of the highest object numbers of the
/// documents before it. Generations are reset to 0.
#[derive(Debug, Clone, PartialEq)]
pub struct IdRemapper {
    offsets: Vec<u32>,
    total: u32,
}

impl IdRemapper {
    pub fn for_documents(documents: &[Document]) -> Result<Self> {
        let mut offsets = Vec::with_capacity(documents.len());
        let mut total: u32 = 0;
        for doc in documents {
            offsets.push(total);
            total = total.checked_add(doc.max_object_number()).ok_or_else(|| {
                PdfError::SerializationError("merged object numbers overflow".to_string())
            })?;
        }
        Ok(Self { offsets, total })
    }

    /// New identifier of `id` from document `doc_index`
    pub fn map(&self, doc_index: usize, id: ObjectId) -> ObjectId {
        ObjectId::new(self.offsets[doc_index] + id.number(), 0)
    }

    /// First object number not claimed by any input
    pub fn next_free(&self) -> u32 {
        self.total + 1
    }
}

/// PDF merger
pub struct PdfMerger {
    options: MergeOptions,
}

impl PdfMerger {
    /// Create a new PDF merger
    pub fn new(options: MergeOptions) -> Self {
        Self { options }
    }

    /// Parse each input and merge the results.
    ///
    /// The first input that fails to parse aborts the merge.
    pub fn merge_bytes<B: AsRef<[u8]>>(&self, inputs: &[B]) -> Result<Document> {
        if inputs.is_empty() {
            return Err(PdfError::EmptyMergeSet);
        }
        let documents = inputs
            .iter()
            .enumerate()
            .map(|(index, bytes)| {
                parse_document(bytes.as_ref()).map_err(|err| match err {
                    PdfError::MalformedDocument(message) => {
                        PdfError::MalformedDocument(format!("input {}: {message}", index + 1))
                    }
                    other => other,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        self.merge(documents)
    }

    /// Merge documents in order; page order is the concatenation of the
    /// inputs' page orders.
    pub fn merge(&self, documents: Vec<Document>) -> Result<Document> {
        if documents.is_empty() {
            return Err(PdfError::EmptyMergeSet);
        }
        let _span = tracing::debug_span!("merge", inputs = documents.len()).entered();

        let remapper = IdRemapper::for_documents(&documents)?;
        let pages_id = ObjectId::new(remapper.next_free(), 0);
        let catalog_id = ObjectId::new(remapper.next_free() + 1, 0);

        let mut version = PdfVersion::new(1, 0);
        let mut objects: BTreeMap<ObjectId, Object> = BTreeMap::new();
        let mut kids = Vec::new();
        let mut info = None;

        for (index, doc) in documents.into_iter().enumerate() {
            let pages = doc.pages()?;
            version = version.max(doc.effective_version());
            if index == 0 && self.options.metadata == MetadataMode::FromFirst {
                info = doc.info().map(|id| remapper.map(0, id));
            }
            tracing::debug!(index, pages = pages.len(), objects = doc.len(), "adding input");

            let remap = |id: ObjectId| remapper.map(index, id);
            for (id, mut object) in doc.into_objects() {
                object.remap_references(&remap);
                objects.insert(remap(id), object);
            }

            for page in pages {
                let leaf_id = remap(page.id);
                let leaf = objects
                    .get_mut(&leaf_id)
                    .and_then(|obj| obj.as_dict_mut())
                    .ok_or_else(|| {
                        PdfError::MalformedDocument(format!("page {} is not a dictionary", page.id))
                    })?;
                promote_inherited(leaf, &page.attributes, &remap);
                if !leaf.contains_key("MediaBox") {
                    let media_box: Vec<Object> = page.media_box.iter().map(|&v| number(v)).collect();
                    leaf.set("MediaBox", media_box);
                }
                leaf.set("Parent", pages_id);
                kids.push(Object::Reference(leaf_id));
            }
        }

        let mut pages = Dictionary::typed("Pages");
        pages.set("Count", kids.len() as i64);
        pages.set("Kids", kids);
        objects.insert(pages_id, Object::Dictionary(pages));

        let mut catalog = Dictionary::typed("Catalog");
        catalog.set("Pages", pages_id);
        objects.insert(catalog_id, Object::Dictionary(catalog));

        let mut merged = Document::from_parts(version, objects, catalog_id, info);
        if let MetadataMode::Custom {
            title,
            author,
            subject,
            keywords,
        } = &self.options.metadata
        {
            let info = custom_info(title, author, subject, keywords);
            let info_id = merged.add_object(info);
            merged.set_info(Some(info_id));
        }

        merged.prune_unreachable();
        tracing::debug!(
            objects = merged.len(),
            version = %merged.version(),
            "merged documents"
        );
        Ok(merged)
    }
}

/// Copy inherited attributes onto a leaf that no longer has its ancestors
fn promote_inherited(
    leaf: &mut Dictionary,
    attributes: &InheritedAttributes,
    remap: &impl Fn(ObjectId) -> ObjectId,
) {
    for key in InheritedAttributes::KEYS {
        if leaf.contains_key(key) {
            continue;
        }
        if let Some(value) = attributes.get(key) {
            let mut value = value.clone();
            value.remap_references(remap);
            leaf.set(key, value);
        }
    }
}

fn custom_info(
    title: &Option<String>,
    author: &Option<String>,
    subject: &Option<String>,
    keywords: &Option<String>,
) -> Dictionary {
    let mut info = Dictionary::new();
    let fields = [
        ("Title", title),
        ("Author", author),
        ("Subject", subject),
        ("Keywords", keywords),
    ];
    for (key, value) in fields {
        if let Some(value) = value {
            info.set(key, text_string(value));
        }
    }
    info.set("Producer", text_string(&format!("pdfstitch {}", crate::VERSION)));
    let now = format_pdf_date(Utc::now());
    info.set("CreationDate", Object::String(now.clone().into_bytes()));
    info.set("ModDate", Object::String(now.into_bytes()));
    info
}

/// PDF text string: ASCII as is, anything else as UTF-16BE with a BOM
pub(crate) fn text_string(text: &str) -> Object {
    if text.is_ascii() {
        Object::String(text.as_bytes().to_vec())
    } else {
        let mut bytes = vec![0xFE, 0xFF];
        for unit in text.encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        Object::String(bytes)
    }
}

/// Merge serialized PDFs into one serialized PDF
pub fn merge_pdfs<B: AsRef<[u8]>>(inputs: &[B], options: MergeOptions) -> Result<Vec<u8>> {
    PdfMerger::new(options).merge_bytes(inputs)?.to_bytes()
}
