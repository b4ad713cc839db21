//! Helper functions for creating valid test PDFs with correct offsets

use super::xref::XRefTable;
use crate::document::Document;
use crate::objects::{Object, ObjectId};

/// Assembles a classic PDF file object by object, computing xref offsets
pub struct FixtureBuilder {
    bytes: Vec<u8>,
    offsets: Vec<(u32, usize)>,
}

impl FixtureBuilder {
    pub fn new(version: &str) -> Self {
        Self {
            bytes: format!("%PDF-{version}\n").into_bytes(),
            offsets: Vec::new(),
        }
    }

    /// Prepend arbitrary bytes before the header
    pub fn with_prefix(prefix: &[u8], version: &str) -> Self {
        let mut builder = Self::new(version);
        let mut bytes = prefix.to_vec();
        bytes.extend_from_slice(&builder.bytes);
        builder.bytes = bytes;
        builder
    }

    pub fn object(self, number: u32, body: &str) -> Self {
        self.raw_object(number, body.as_bytes())
    }

    pub fn raw_object(mut self, number: u32, body: &[u8]) -> Self {
        self.offsets.push((number, self.bytes.len()));
        self.bytes
            .extend_from_slice(format!("{number} 0 obj\n").as_bytes());
        self.bytes.extend_from_slice(body);
        self.bytes.extend_from_slice(b"\nendobj\n");
        self
    }

    /// Object whose body is a stream with a correct `/Length`
    pub fn stream_object(self, number: u32, extra_dict: &str, data: &[u8]) -> Self {
        let mut body = format!("<< /Length {} {extra_dict} >>\nstream\n", data.len()).into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(b"\nendstream");
        self.raw_object(number, &body)
    }

    /// Offset of an object relative to the header
    fn relative(&self, offset: usize, base: usize) -> usize {
        offset - base
    }

    /// Write one xref section for every object added so far
    pub fn finish(self, trailer_extra: &str) -> Vec<u8> {
        let base = header_offset(&self.bytes);
        let max = self.offsets.iter().map(|(n, _)| *n).max().unwrap_or(0);
        let xref_offset = self.relative(self.bytes.len(), base);
        let mut out = self.bytes.clone();

        out.extend_from_slice(format!("xref\n0 {}\n", max + 1).as_bytes());
        out.extend_from_slice(b"0000000000 65535 f \n");
        for number in 1..=max {
            match self.offsets.iter().rev().find(|(n, _)| *n == number) {
                Some((_, offset)) => out.extend_from_slice(
                    format!("{:010} 00000 n \n", self.relative(*offset, base)).as_bytes(),
                ),
                None => out.extend_from_slice(b"0000000000 65535 f \n"),
            }
        }
        out.extend_from_slice(
            format!(
                "trailer\n<< /Size {} {trailer_extra} >>\nstartxref\n{xref_offset}\n%%EOF\n",
                max + 1
            )
            .as_bytes(),
        );
        out
    }
}

fn header_offset(bytes: &[u8]) -> usize {
    bytes
        .windows(5)
        .position(|w| w == b"%PDF-")
        .unwrap_or(0)
}

/// Append an incremental update that (re)defines `objects`
pub fn append_update(base: Vec<u8>, objects: &[(u32, &str)], trailer_extra: &str) -> Vec<u8> {
    let prev = XRefTable::find_startxref(&base).unwrap();
    let mut out = base;
    let mut entries = Vec::new();
    for (number, body) in objects {
        entries.push((*number, out.len()));
        out.extend_from_slice(format!("{number} 0 obj\n{body}\nendobj\n").as_bytes());
    }

    let xref_offset = out.len();
    out.extend_from_slice(b"xref\n");
    for (number, offset) in &entries {
        out.extend_from_slice(format!("{number} 1\n{offset:010} 00000 n \n").as_bytes());
    }
    let size = entries.iter().map(|(n, _)| n + 1).max().unwrap_or(1);
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {size} /Prev {prev} {trailer_extra} >>\nstartxref\n{xref_offset}\n%%EOF\n"
        )
        .as_bytes(),
    );
    out
}

/// Creates a minimal valid PDF with correct xref offsets
pub fn create_minimal_pdf() -> Vec<u8> {
    FixtureBuilder::new("1.4")
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(2, "<< /Type /Pages /Kids [] /Count 0 >>")
        .finish("/Root 1 0 R")
}

/// Flat page tree with `pages` pages. Page `i` draws `({label}{i})`.
pub fn create_pdf_with_pages(pages: u32, label: &str) -> Vec<u8> {
    let kids: Vec<String> = (0..pages).map(|i| format!("{} 0 R", 4 + i * 2)).collect();
    let mut builder = FixtureBuilder::new("1.4")
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(
            2,
            &format!(
                "<< /Type /Pages /Kids [{}] /Count {pages} /MediaBox [0 0 612 792] >>",
                kids.join(" ")
            ),
        )
        .object(
            3,
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>",
        );
    for i in 0..pages {
        let page = 4 + i * 2;
        let content = format!("BT /F1 12 Tf 72 720 Td ({label}{}) Tj ET", i + 1);
        builder = builder
            .object(
                page,
                &format!(
                    "<< /Type /Page /Parent 2 0 R /Resources << /Font << /F1 3 0 R >> >> /Contents {} 0 R >>",
                    page + 1
                ),
            )
            .stream_object(page + 1, "", content.as_bytes());
    }
    builder.finish("/Root 1 0 R")
}

/// Two-level page tree. The root carries MediaBox, Resources and Rotate
/// that the leaves inherit; the last leaf overrides MediaBox.
pub fn create_nested_pdf() -> Vec<u8> {
    FixtureBuilder::new("1.5")
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(
            2,
            "<< /Type /Pages /Kids [3 0 R 6 0 R] /Count 3 /MediaBox [0 0 595 842] /Resources 9 0 R /Rotate 90 >>",
        )
        .object(3, "<< /Type /Pages /Parent 2 0 R /Kids [4 0 R 5 0 R] /Count 2 /CropBox [10 10 585 832] >>")
        .object(4, "<< /Type /Page /Parent 3 0 R /Contents 7 0 R >>")
        .object(5, "<< /Type /Page /Parent 3 0 R /Contents 8 0 R >>")
        .object(
            6,
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 200 300] /Rotate 0 >>",
        )
        .stream_object(7, "", b"BT /F1 12 Tf (N1) Tj ET")
        .stream_object(8, "", b"BT /F1 12 Tf (N2) Tj ET")
        .object(9, "<< /Font << /F1 10 0 R >> >>")
        .object(10, "<< /Type /Font /Subtype /Type1 /BaseFont /Times-Roman >>")
        .finish("/Root 1 0 R")
}

/// A one-page file followed by an update that replaces the page content and
/// adds a second page.
pub fn create_incrementally_updated_pdf() -> Vec<u8> {
    let base = FixtureBuilder::new("1.4")
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>")
        .object(3, "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R >>")
        .stream_object(4, "", b"BT (old) Tj ET")
        .finish("/Root 1 0 R");

    append_update(
        base,
        &[
            (2, "<< /Type /Pages /Kids [3 0 R 5 0 R] /Count 2 >>"),
            (3, "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R /Rotate 180 >>"),
            (5, "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 300 300] >>"),
        ],
        "/Root 1 0 R",
    )
}

/// An update whose /Prev points back at itself
pub fn create_pdf_with_prev_loop() -> Vec<u8> {
    let mut pdf = create_minimal_pdf();
    let xref_offset = pdf.len();
    pdf.extend_from_slice(
        format!(
            "xref\n0 1\n0000000000 65535 f \ntrailer\n<< /Size 3 /Root 1 0 R /Prev {xref_offset} >>\nstartxref\n{xref_offset}\n%%EOF\n"
        )
        .as_bytes(),
    );
    pdf
}

/// A file whose startxref points at a cross-reference stream object
pub fn create_pdf_with_xref_stream() -> Vec<u8> {
    let mut pdf = b"%PDF-1.5\n1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n".to_vec();
    let xref_offset = pdf.len();
    pdf.extend_from_slice(
        b"3 0 obj\n<< /Type /XRef /Size 4 /W [1 2 1] /Root 1 0 R /Length 4 >>\nstream\n\x01\x00\x09\x00\nendstream\nendobj\n",
    );
    pdf.extend_from_slice(format!("startxref\n{xref_offset}\n%%EOF\n").as_bytes());
    pdf
}

/// A page references object 9, which does not exist
pub fn create_pdf_with_dangling_reference() -> Vec<u8> {
    FixtureBuilder::new("1.4")
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>")
        .object(3, "<< /Type /Page /Parent 2 0 R /Contents 9 0 R >>")
        .finish("/Root 1 0 R")
}

/// A Pages node that lists its own ancestor as a kid
pub fn create_pdf_with_page_cycle() -> Vec<u8> {
    FixtureBuilder::new("1.4")
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>")
        .object(3, "<< /Type /Pages /Parent 2 0 R /Kids [2 0 R] /Count 1 >>")
        .finish("/Root 1 0 R")
}

/// Two pages pointing at one indirect Resources dictionary that already
/// uses the stamper's reserved font name.
pub fn create_pdf_with_shared_resources() -> Vec<u8> {
    FixtureBuilder::new("1.4")
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(2, "<< /Type /Pages /Kids [3 0 R 4 0 R] /Count 2 >>")
        .object(3, "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Resources 5 0 R /Contents 7 0 R >>")
        .object(4, "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Resources 5 0 R /Contents [7 0 R 8 0 R] >>")
        .object(5, "<< /Font 6 0 R /ProcSet [/PDF /Text] >>")
        .object(6, "<< /PdfStitchF1 9 0 R >>")
        .stream_object(7, "", b"BT /PdfStitchF1 12 Tf (shared) Tj ET")
        .stream_object(8, "", b"0 0 1 rg 10 10 50 50 re f")
        .object(9, "<< /Type /Font /Subtype /Type1 /BaseFont /Courier >>")
        .finish("/Root 1 0 R")
}

/// Trailer names an /Encrypt dictionary
pub fn create_encrypted_pdf() -> Vec<u8> {
    FixtureBuilder::new("1.4")
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(2, "<< /Type /Pages /Kids [] /Count 0 >>")
        .object(3, "<< /Filter /Standard /V 1 /R 2 >>")
        .finish("/Root 1 0 R /Encrypt 3 0 R")
}

/// A document whose first page references object `10 1`
pub fn document_with_reused_number() -> Document {
    let mut doc = Document::new();
    let page = doc
        .add_page([0.0, 0.0, 612.0, 792.0], b"0 0 m")
        .unwrap();
    let reused = ObjectId::new(10, 1);
    doc.insert(reused, Object::Integer(42));
    doc.get_mut(page)
        .and_then(|p| p.as_dict_mut())
        .unwrap()
        .set("PieceInfo", reused);
    doc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_pdf_structure() {
        let pdf = create_minimal_pdf();
        assert!(pdf.starts_with(b"%PDF-1.4\n"));
        assert!(pdf.ends_with(b"%%EOF\n"));

        let offset = XRefTable::find_startxref(&pdf).unwrap() as usize;
        assert!(pdf[offset..].starts_with(b"xref"));
    }

    #[test]
    fn test_fixture_offsets_point_at_objects() {
        let pdf = create_nested_pdf();
        let (table, _) = XRefTable::load(&pdf, 0).unwrap();
        for (number, entry) in table.in_use() {
            let at = entry.offset as usize;
            assert!(pdf[at..].starts_with(format!("{number} 0 obj").as_bytes()));
        }
    }

    #[test]
    fn test_prefixed_fixture_uses_header_relative_offsets() {
        let pdf = FixtureBuilder::with_prefix(b"garbage\n", "1.4")
            .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
            .object(2, "<< /Type /Pages /Kids [] /Count 0 >>")
            .finish("/Root 1 0 R");
        let offset = XRefTable::find_startxref(&pdf).unwrap() as usize;
        assert!(pdf[offset + 8..].starts_with(b"xref"));
    }
}
