//! Test PDF Builder
//!
//! Writes PDFs byte by byte the way an independent producer would, so the
//! parser and merger are exercised on files they did not write themselves.

use std::fmt::Write as _;

/// PDF version to generate
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub enum PdfVersion {
    V1_0,
    V1_1,
    V1_2,
    V1_3,
    V1_4,
    V1_5,
    V1_6,
    V1_7,
    V2_0,
}

impl PdfVersion {
    pub const ALL: [PdfVersion; 9] = [
        PdfVersion::V1_0,
        PdfVersion::V1_1,
        PdfVersion::V1_2,
        PdfVersion::V1_3,
        PdfVersion::V1_4,
        PdfVersion::V1_5,
        PdfVersion::V1_6,
        PdfVersion::V1_7,
        PdfVersion::V2_0,
    ];
}

impl std::fmt::Display for PdfVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let version = match self {
            PdfVersion::V1_0 => "1.0",
            PdfVersion::V1_1 => "1.1",
            PdfVersion::V1_2 => "1.2",
            PdfVersion::V1_3 => "1.3",
            PdfVersion::V1_4 => "1.4",
            PdfVersion::V1_5 => "1.5",
            PdfVersion::V1_6 => "1.6",
            PdfVersion::V1_7 => "1.7",
            PdfVersion::V2_0 => "2.0",
        };
        write!(f, "{version}")
    }
}

#[derive(Debug, Clone)]
struct PageContent {
    width: f32,
    height: f32,
    content_stream: String,
}

/// Builder for creating test PDFs
#[derive(Debug, Clone)]
pub struct TestPdfBuilder {
    version: PdfVersion,
    pages: Vec<PageContent>,
    info: Vec<(String, String)>,
    include_binary_marker: bool,
    first_object: u32,
    kids_per_node: Option<usize>,
    inherit_media_box: bool,
    prefix: Vec<u8>,
}

impl TestPdfBuilder {
    /// Create a new PDF builder with default settings
    pub fn new() -> Self {
        Self {
            version: PdfVersion::V1_4,
            pages: Vec::new(),
            info: Vec::new(),
            include_binary_marker: true,
            first_object: 1,
            kids_per_node: None,
            inherit_media_box: false,
            prefix: Vec::new(),
        }
    }

    /// Create a minimal valid PDF
    pub fn minimal() -> Self {
        let mut builder = Self::new();
        builder.add_empty_page(612.0, 792.0);
        builder
    }

    /// `pages` text pages showing `{label}{i}` for i in 1..=pages
    pub fn labelled(label: &str, pages: usize) -> Self {
        let mut builder = Self::new();
        for i in 1..=pages {
            builder.add_text_page(&format!("{label}{i}"), 12.0);
        }
        builder
    }

    /// Set PDF version
    pub fn with_version(mut self, version: PdfVersion) -> Self {
        self.version = version;
        self
    }

    /// Add document info
    pub fn with_info(mut self, key: &str, value: &str) -> Self {
        self.info.push((key.to_string(), value.to_string()));
        self
    }

    /// Add title
    pub fn with_title(self, title: &str) -> Self {
        self.with_info("Title", title)
    }

    /// Add author
    pub fn with_author(self, author: &str) -> Self {
        self.with_info("Author", author)
    }

    /// Number the first object `first` instead of 1; lower numbers are free
    pub fn with_first_object_number(mut self, first: u32) -> Self {
        self.first_object = first.max(1);
        self
    }

    /// Group leaves under intermediate Pages nodes of `kids` pages each
    pub fn with_nested_tree(mut self, kids: usize) -> Self {
        self.kids_per_node = Some(kids.max(1));
        self
    }

    /// Put the first page's MediaBox on the root Pages node instead of on
    /// each leaf
    pub fn with_inherited_media_box(mut self, inherit: bool) -> Self {
        self.inherit_media_box = inherit;
        self
    }

    /// Bytes written before the `%PDF-` header
    pub fn with_prefix(mut self, prefix: &[u8]) -> Self {
        self.prefix = prefix.to_vec();
        self
    }

    pub fn with_binary_marker(mut self, include: bool) -> Self {
        self.include_binary_marker = include;
        self
    }

    /// Add an empty page
    pub fn add_empty_page(&mut self, width: f32, height: f32) -> &mut Self {
        self.pages.push(PageContent {
            width,
            height,
            content_stream: String::new(),
        });
        self
    }

    /// Add a page with text
    pub fn add_text_page(&mut self, text: &str, font_size: f32) -> &mut Self {
        let content = format!(
            "BT\n/F1 {} Tf\n100 700 Td\n({}) Tj\nET",
            font_size,
            escape_pdf_string(text)
        );
        self.pages.push(PageContent {
            width: 612.0,
            height: 792.0,
            content_stream: content,
        });
        self
    }

    /// Add a page with graphics
    pub fn add_graphics_page(&mut self) -> &mut Self {
        let content = "q\n\
                      1 0 0 RG\n\
                      2 w\n\
                      100 100 400 600 re\n\
                      S\n\
                      0 0 1 RG\n\
                      200 200 200 200 re\n\
                      f\n\
                      Q"
        .to_string();

        self.pages.push(PageContent {
            width: 612.0,
            height: 792.0,
            content_stream: content,
        });
        self
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Build the PDF
    pub fn build(&self) -> Vec<u8> {
        let mut next = self.first_object;
        let mut allocate = || {
            let id = next;
            next += 1;
            id
        };

        let catalog_obj = allocate();
        let pages_obj = allocate();
        let font_obj = allocate();

        // Intermediate nodes, each owning a run of leaves
        let groups: Vec<(Option<u32>, std::ops::Range<usize>)> = match self.kids_per_node {
            Some(kids) if !self.pages.is_empty() => (0..self.pages.len())
                .step_by(kids)
                .map(|start| (Some(allocate()), start..(start + kids).min(self.pages.len())))
                .collect(),
            _ => vec![(None, 0..self.pages.len())],
        };
        let page_objs: Vec<u32> = self.pages.iter().map(|_| allocate()).collect();
        let content_objs: Vec<Option<u32>> = self
            .pages
            .iter()
            .map(|p| (!p.content_stream.is_empty()).then(&mut allocate))
            .collect();
        let info_obj = (!self.info.is_empty()).then(&mut allocate);

        let mut objects: Vec<(u32, Vec<u8>)> = Vec::new();
        objects.push((
            catalog_obj,
            format!("<< /Type /Catalog /Pages {pages_obj} 0 R >>").into_bytes(),
        ));

        let root_kids: Vec<u32> = groups
            .iter()
            .flat_map(|(node, range)| match node {
                Some(id) => vec![*id],
                None => page_objs[range.clone()].to_vec(),
            })
            .collect();
        let mut root = format!(
            "<< /Type /Pages /Kids [{}] /Count {}",
            refs(&root_kids),
            self.pages.len()
        );
        let inherited = self.inherit_media_box.then(|| self.pages.first()).flatten();
        if let Some(first) = inherited {
            let _ = write!(root, " /MediaBox [0 0 {} {}]", first.width, first.height);
        }
        root.push_str(" >>");
        objects.push((pages_obj, root.into_bytes()));

        objects.push((
            font_obj,
            b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_vec(),
        ));

        let mut parents = vec![pages_obj; self.pages.len()];
        for (node, range) in &groups {
            if let Some(node) = node {
                for index in range.clone() {
                    parents[index] = *node;
                }
                objects.push((
                    *node,
                    format!(
                        "<< /Type /Pages /Parent {pages_obj} 0 R /Kids [{}] /Count {} >>",
                        refs(&page_objs[range.clone()]),
                        range.len()
                    )
                    .into_bytes(),
                ));
            }
        }

        for (i, page) in self.pages.iter().enumerate() {
            let mut dict = format!("<< /Type /Page /Parent {} 0 R", parents[i]);
            if inherited.is_none() {
                let _ = write!(dict, " /MediaBox [0 0 {} {}]", page.width, page.height);
            }
            let _ = write!(dict, " /Resources << /Font << /F1 {font_obj} 0 R >> >>");
            if let Some(content) = content_objs[i] {
                let _ = write!(dict, " /Contents {content} 0 R");
            }
            dict.push_str(" >>");
            objects.push((page_objs[i], dict.into_bytes()));

            if let Some(content) = content_objs[i] {
                let mut body =
                    format!("<< /Length {} >>\nstream\n", page.content_stream.len()).into_bytes();
                body.extend_from_slice(page.content_stream.as_bytes());
                body.extend_from_slice(b"\nendstream");
                objects.push((content, body));
            }
        }

        if let Some(info) = info_obj {
            let mut dict = "<< ".to_string();
            for (key, value) in &self.info {
                let _ = write!(dict, "/{} ({}) ", key, escape_pdf_string(value));
            }
            dict.push_str(">>");
            objects.push((info, dict.into_bytes()));
        }

        self.assemble(objects, catalog_obj, info_obj)
    }

    fn assemble(&self, mut objects: Vec<(u32, Vec<u8>)>, root: u32, info: Option<u32>) -> Vec<u8> {
        objects.sort_by_key(|(number, _)| *number);

        let mut pdf = self.prefix.clone();
        let base = pdf.len();
        pdf.extend_from_slice(format!("%PDF-{}\n", self.version).as_bytes());
        if self.include_binary_marker {
            pdf.extend_from_slice(b"%\xE2\xE3\xCF\xD3\n");
        }

        let mut offsets = Vec::new();
        for (number, body) in &objects {
            offsets.push((*number, pdf.len() - base));
            pdf.extend_from_slice(format!("{number} 0 obj\n").as_bytes());
            pdf.extend_from_slice(body);
            pdf.extend_from_slice(b"\nendobj\n");
        }

        let size = objects.last().map(|(n, _)| n + 1).unwrap_or(1);
        let xref_offset = pdf.len() - base;
        self.write_traditional_xref(&mut pdf, &offsets, size);

        let mut trailer = format!("<< /Size {size} /Root {root} 0 R");
        if let Some(info) = info {
            let _ = write!(trailer, " /Info {info} 0 R");
        }
        trailer.push_str(" >>");
        pdf.extend_from_slice(
            format!("trailer\n{trailer}\nstartxref\n{xref_offset}\n%%EOF\n").as_bytes(),
        );
        pdf
    }

    /// Single-subsection table; numbers without an object are free
    fn write_traditional_xref(&self, pdf: &mut Vec<u8>, offsets: &[(u32, usize)], size: u32) {
        pdf.extend_from_slice(b"xref\n");
        pdf.extend_from_slice(format!("0 {size}\n").as_bytes());
        pdf.extend_from_slice(b"0000000000 65535 f \n");

        for number in 1..size {
            match offsets.iter().find(|(n, _)| *n == number) {
                Some((_, offset)) => {
                    pdf.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes())
                }
                None => pdf.extend_from_slice(b"0000000000 00001 f \n"),
            }
        }
    }
}

fn refs(ids: &[u32]) -> String {
    ids.iter()
        .map(|id| format!("{id} 0 R"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Escape special characters in PDF strings
fn escape_pdf_string(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '(' => "\\(".to_string(),
            ')' => "\\)".to_string(),
            '\\' => "\\\\".to_string(),
            '\n' => "\\n".to_string(),
            '\r' => "\\r".to_string(),
            '\t' => "\\t".to_string(),
            _ => c.to_string(),
        })
        .collect()
}

impl Default for TestPdfBuilder {
    fn default() -> Self {
        Self::new()
    }
}
