//! Generate Test PDFs
//!
//! Writes the valid and invalid fixture sets under `test-suite/fixtures/`.

use anyhow::Result;
use pdfstitch_test_suite::generators::{invalid_pdfs, PdfVersion, TestPdfBuilder};
use pdfstitch_test_suite::utils::fixtures_dir;
use std::fs;

fn main() -> Result<()> {
    let fixtures = fixtures_dir();

    let valid_dir = fixtures.join("valid");
    fs::create_dir_all(&valid_dir)?;
    println!("Generating valid PDFs in {}...", valid_dir.display());
    for version in PdfVersion::ALL {
        let pdf = TestPdfBuilder::labelled("Page ", 3)
            .with_version(version)
            .with_title(&format!("PDF {version} sample"))
            .build();
        fs::write(valid_dir.join(format!("labelled_{version}.pdf")), pdf)?;
    }
    let nested = TestPdfBuilder::labelled("Nested ", 7)
        .with_nested_tree(3)
        .with_inherited_media_box(true)
        .build();
    fs::write(valid_dir.join("nested_tree.pdf"), nested)?;
    let offset = TestPdfBuilder::labelled("Offset ", 2)
        .with_first_object_number(40)
        .build();
    fs::write(valid_dir.join("high_object_numbers.pdf"), offset)?;

    let invalid_dir = fixtures.join("invalid");
    println!("Generating invalid PDFs in {}...", invalid_dir.display());
    invalid_pdfs::generate_all(&invalid_dir)?;

    println!("Test PDF generation complete!");
    Ok(())
}
