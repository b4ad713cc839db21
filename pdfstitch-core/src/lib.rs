//! # pdfstitch
//!
//! Merge independently produced PDF files into one structurally consistent
//! document and stamp sequential page numbers across the result, without
//! disturbing the content already on each page.
//!
//! ## Features
//!
//! - **Object model**: arena-style [`Document`] keyed by [`ObjectId`], with
//!   order-preserving dictionaries and raw stream bytes
//! - **Parsing**: classic cross-reference tables, incremental updates,
//!   indirect stream lengths and page tree inheritance
//! - **Merging**: collision-free object renumbering and page tree flattening
//! - **Stamping**: "page {i} of {N}" overlays (or any template) drawn on top
//!   of existing content, with an optional header line
//! - **Serialization**: deterministic output with a valid xref table
//!
//! ## Quick Start
//!
//! ### Merging and numbering
//!
//! ```rust,no_run
//! use pdfstitch::{merge_documents, stamp_page_numbers, Result};
//!
//! # fn main() -> Result<()> {
//! let cover = std::fs::read("cover.pdf")?;
//! let body = std::fs::read("body.pdf")?;
//!
//! let merged = merge_documents(&[cover, body])?;
//! let numbered = stamp_page_numbers(&merged)?;
//! std::fs::write("combined.pdf", numbered)?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Working with the object graph
//!
//! ```rust
//! use pdfstitch::operations::{PageStamper, StampOptions};
//! use pdfstitch::{parse_document, Document, Result};
//!
//! # fn main() -> Result<()> {
//! let mut doc = Document::new();
//! doc.add_page([0.0, 0.0, 612.0, 792.0], b"0 0 1 rg 72 72 200 200 re f")?;
//! doc.add_page([0.0, 0.0, 595.0, 842.0], b"")?;
//!
//! let stamped = PageStamper::new(StampOptions::default()).stamp(&mut doc)?;
//! assert_eq!(stamped, 2);
//!
//! let reparsed = parse_document(&doc.to_bytes()?)?;
//! assert_eq!(reparsed.page_count()?, 2);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`objects`] - PDF object types
//! - [`parser`] - Reading PDF bytes into a [`Document`]
//! - [`document`] - The object graph and page access
//! - [`operations`] - Merging and stamping
//! - [`writer`] - Serializing a [`Document`]
//! - [`text`] - Standard-14 fonts, metrics and WinAnsi encoding
//! - [`render`] - Rendering adapters and the generation pipeline
//! - [`storage`] - Saving output files

pub mod document;
pub mod error;
pub mod objects;
pub mod operations;
pub mod parser;
pub mod render;
pub mod storage;
pub mod text;
pub mod writer;

pub use document::Document;
pub use error::{PdfError, Result};
pub use objects::{Dictionary, Object, ObjectId, Stream};
pub use parser::{parse_document, ParsedPage, PdfReader, PdfVersion};

pub use operations::{
    merge_pdfs, stamp_pdf, MergeOptions, MetadataMode, OverlayTemplate, PageStamper, PdfMerger,
    StampOptions, StampPosition,
};
pub use render::{generate_pdf, GenerateOptions, RenderingAdapter, TemplateDirectory};
pub use storage::save_output;
pub use text::StandardFont;
pub use writer::PdfWriter;

/// Current version of pdfstitch
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Merge PDF byte streams in order with default options.
///
/// Fails with [`PdfError::EmptyMergeSet`] when `inputs` is empty and with
/// [`PdfError::MalformedDocument`] when any input cannot be parsed. No output
/// is produced unless every input is merged.
pub fn merge_documents<B: AsRef<[u8]>>(inputs: &[B]) -> Result<Vec<u8>> {
    let _span = tracing::info_span!("merge_documents", inputs = inputs.len()).entered();
    merge_pdfs(inputs, MergeOptions::default())
}

/// Stamp "page {i} of {N}" at the bottom center of every page
pub fn stamp_page_numbers(pdf: &[u8]) -> Result<Vec<u8>> {
    stamp_page_numbers_with(pdf, StampOptions::default())
}

/// Stamp every page using custom options
pub fn stamp_page_numbers_with(pdf: &[u8], options: StampOptions) -> Result<Vec<u8>> {
    let _span = tracing::info_span!("stamp_page_numbers", bytes = pdf.len()).entered();
    stamp_pdf(pdf, options)
}

/// Supported PDF versions
pub mod pdf_version {
    /// Versions accepted by the parser
    pub const SUPPORTED_VERSIONS: &[&str] =
        &["1.0", "1.1", "1.2", "1.3", "1.4", "1.5", "1.6", "1.7", "2.0"];
}
