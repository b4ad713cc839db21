//! Invalid PDF Generators
//!
//! Deliberately broken inputs that the engine must reject as malformed.

use super::test_pdf_builder::TestPdfBuilder;
use anyhow::Result;
use std::fs;
use std::path::Path;

/// One invalid input and why it is invalid
#[derive(Debug, Clone)]
pub struct InvalidPdf {
    pub name: &'static str,
    pub bytes: Vec<u8>,
}

/// Every invalid sample, in a stable order
pub fn all() -> Vec<InvalidPdf> {
    vec![
        InvalidPdf {
            name: "not_a_pdf",
            bytes: b"Hello, this is a plain text file.".to_vec(),
        },
        InvalidPdf {
            name: "empty",
            bytes: Vec::new(),
        },
        InvalidPdf {
            name: "truncated",
            bytes: truncated(),
        },
        InvalidPdf {
            name: "no_startxref",
            bytes: no_startxref(),
        },
        InvalidPdf {
            name: "bad_xref_offset",
            bytes: bad_xref_offset(),
        },
        InvalidPdf {
            name: "missing_root",
            bytes: missing_root(),
        },
        InvalidPdf {
            name: "encrypted",
            bytes: encrypted(),
        },
        InvalidPdf {
            name: "xref_stream",
            bytes: xref_stream(),
        },
    ]
}

/// Write every sample to `output_dir/<name>.pdf`
pub fn generate_all<P: AsRef<Path>>(output_dir: P) -> Result<()> {
    let output_dir = output_dir.as_ref();
    fs::create_dir_all(output_dir)?;
    for sample in all() {
        fs::write(output_dir.join(format!("{}.pdf", sample.name)), &sample.bytes)?;
    }
    Ok(())
}

/// A valid file cut in half
pub fn truncated() -> Vec<u8> {
    let mut pdf = TestPdfBuilder::labelled("T", 3).build();
    pdf.truncate(pdf.len() / 2);
    pdf
}

/// Minimal file without the binary comment, so it can be edited as text
fn ascii_minimal() -> Vec<u8> {
    TestPdfBuilder::minimal().with_binary_marker(false).build()
}

pub fn no_startxref() -> Vec<u8> {
    let pdf = ascii_minimal();
    let text = String::from_utf8_lossy(&pdf).replace("startxref", "startxxxx");
    text.into_bytes()
}

/// startxref points into the middle of an object
pub fn bad_xref_offset() -> Vec<u8> {
    let pdf = ascii_minimal();
    let text = String::from_utf8_lossy(&pdf);
    let Some(at) = text.rfind("startxref\n") else {
        return pdf;
    };
    format!("{}startxref\n17\n%%EOF\n", &text[..at]).into_bytes()
}

/// Trailer without /Root
pub fn missing_root() -> Vec<u8> {
    let pdf = ascii_minimal();
    let text = String::from_utf8_lossy(&pdf);
    let Some(at) = text.find("/Root ") else {
        return pdf;
    };
    // "/Root 1 0 R" becomes "/Roo_ 1 0 R", keeping every offset intact
    let mut bytes = pdf.clone();
    bytes[at + 4] = b'_';
    bytes
}

pub fn encrypted() -> Vec<u8> {
    let pdf = ascii_minimal();
    String::from_utf8_lossy(&pdf)
        .replace(
            " >>\nstartxref",
            " /Encrypt << /Filter /Standard /V 1 /R 2 >> >>\nstartxref",
        )
        .into_bytes()
}

/// startxref points at a cross-reference stream object
pub fn xref_stream() -> Vec<u8> {
    let mut pdf = b"%PDF-1.5\n1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n".to_vec();
    let xref_offset = pdf.len();
    pdf.extend_from_slice(
        b"3 0 obj\n<< /Type /XRef /Size 4 /W [1 2 1] /Root 1 0 R /Length 4 >>\nstream\n\x01\x00\x09\x00\nendstream\nendobj\n",
    );
    pdf.extend_from_slice(format!("startxref\n{xref_offset}\n%%EOF\n").as_bytes());
    pdf
}
