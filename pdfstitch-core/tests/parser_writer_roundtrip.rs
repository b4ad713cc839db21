//! Parser → Document → Writer roundtrip integration tests
//!
//! Serialized documents must parse back into the same page sequence, with
//! the same effective boxes, and survive a trip through the file system.

use pdfstitch::error::Result;
use pdfstitch::operations::{MergeOptions, MetadataMode, PdfMerger};
use pdfstitch::{parse_document, save_output, Document, Object, PdfVersion};
use pretty_assertions::assert_eq;
use std::fs;
use tempfile::TempDir;

fn sample_document() -> Result<Document> {
    let mut doc = Document::new();
    doc.add_page([0.0, 0.0, 612.0, 792.0], b"BT /F1 12 Tf 72 720 Td (one) Tj ET")?;
    doc.add_page([0.0, 0.0, 842.0, 595.0], b"0 0 1 rg 10 10 100 100 re f")?;
    doc.add_page([0.0, 0.0, 200.5, 300.25], b"")?;
    Ok(doc)
}

#[test]
fn test_roundtrip_preserves_pages() -> Result<()> {
    let doc = sample_document()?;
    let parsed = parse_document(&doc.to_bytes()?)?;

    assert_eq!(parsed.page_count()?, 3);
    let original: Vec<[f64; 4]> = doc.pages()?.iter().map(|p| p.media_box).collect();
    let reparsed: Vec<[f64; 4]> = parsed.pages()?.iter().map(|p| p.media_box).collect();
    assert_eq!(original, reparsed);

    for (before, after) in doc.pages()?.iter().zip(parsed.pages()?.iter()) {
        assert_eq!(doc.page_content(before.id)?, parsed.page_content(after.id)?);
    }
    Ok(())
}

#[test]
fn test_second_roundtrip_is_byte_identical() -> Result<()> {
    let first = sample_document()?.to_bytes()?;
    let second = parse_document(&first)?.to_bytes()?;
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn test_version_survives_roundtrip() -> Result<()> {
    let mut doc = sample_document()?;
    doc.set_version(PdfVersion::new(1, 4));
    let bytes = doc.to_bytes()?;
    assert!(bytes.starts_with(b"%PDF-1.4\n"));
    assert_eq!(parse_document(&bytes)?.version(), PdfVersion::new(1, 4));
    Ok(())
}

#[test]
fn test_custom_metadata_roundtrip() -> Result<()> {
    let merger = PdfMerger::new(MergeOptions {
        metadata: MetadataMode::Custom {
            title: Some("Annual report".to_string()),
            author: Some("Finance".to_string()),
            subject: None,
            keywords: None,
        },
    });
    let merged = merger.merge(vec![sample_document()?, sample_document()?])?;
    let parsed = parse_document(&merged.to_bytes()?)?;

    assert_eq!(parsed.page_count()?, 6);
    let info = parsed.info_dictionary().expect("info dictionary");
    assert_eq!(
        info.get("Title"),
        Some(&Object::String(b"Annual report".to_vec()))
    );
    assert!(info.get("Producer").is_some());
    assert!(info.get("Subject").is_none());
    Ok(())
}

#[test]
fn test_saved_output_parses() -> Result<()> {
    let temp_dir = TempDir::new().unwrap();
    let bytes = sample_document()?.to_bytes()?;

    let path = save_output(temp_dir.path().join("out"), Some("sample.pdf"), &bytes)?;
    let from_disk = fs::read(&path)?;
    assert_eq!(from_disk, bytes);
    assert_eq!(parse_document(&from_disk)?.page_count()?, 3);
    Ok(())
}

#[test]
fn test_dangling_reference_is_not_serialized() {
    let mut doc = Document::new();
    let page = doc.add_page([0.0, 0.0, 612.0, 792.0], b"").unwrap();
    doc.get_mut(page)
        .and_then(|o| o.as_dict_mut())
        .unwrap()
        .set("Annots", Object::Reference(pdfstitch::ObjectId::new(99, 0)));

    assert!(matches!(
        doc.to_bytes(),
        Err(pdfstitch::PdfError::SerializationError(_))
    ));
}
