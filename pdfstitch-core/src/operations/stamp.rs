//! Page number stamping
//!
//! Draws a text overlay on every page without touching existing content
//! streams. Each page gets a shared `q` stream in front of its content and a
//! new overlay stream after it; the overlay begins with `Q`, so whatever
//! graphics state the page content leaves behind is discarded before the
//! stamp is drawn.

use crate::document::Document;
use crate::error::{PdfError, Result};
use crate::objects::{Dictionary, Object, ObjectId, Stream};
use crate::parser::{parse_document, ParsedPage};
use crate::text::{encode_win_ansi, measure_text, StandardFont};
use std::fmt;
use std::str::FromStr;

/// Resource name the stamper registers its font under. A numeric suffix is
/// bumped when a page already uses the name.
pub const RESERVED_FONT_PREFIX: &str = "PdfStitchF";

/// Where the stamp is anchored on the page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StampPosition {
    BottomLeft,
    #[default]
    BottomCenter,
    BottomRight,
    TopLeft,
    TopCenter,
    TopRight,
}

impl StampPosition {
    fn is_top(&self) -> bool {
        matches!(
            self,
            StampPosition::TopLeft | StampPosition::TopCenter | StampPosition::TopRight
        )
    }
}

impl FromStr for StampPosition {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bottom-left" => Ok(StampPosition::BottomLeft),
            "bottom-center" | "bottom" => Ok(StampPosition::BottomCenter),
            "bottom-right" => Ok(StampPosition::BottomRight),
            "top-left" => Ok(StampPosition::TopLeft),
            "top-center" | "top" => Ok(StampPosition::TopCenter),
            "top-right" => Ok(StampPosition::TopRight),
            other => Err(format!("unknown stamp position '{other}'")),
        }
    }
}

impl fmt::Display for StampPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StampPosition::BottomLeft => "bottom-left",
            StampPosition::BottomCenter => "bottom-center",
            StampPosition::BottomRight => "bottom-right",
            StampPosition::TopLeft => "top-left",
            StampPosition::TopCenter => "top-center",
            StampPosition::TopRight => "top-right",
        };
        f.write_str(name)
    }
}

/// Text and placement of the page number line.
///
/// `format` may contain `{page}` (1-based position) and `{total}`.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayTemplate {
    pub format: String,
    pub position: StampPosition,
    /// Distance from the page edge in points
    pub margin: f64,
    pub font_size: f64,
    pub font: StandardFont,
}

impl Default for OverlayTemplate {
    fn default() -> Self {
        Self {
            format: "page {page} of {total}".to_string(),
            position: StampPosition::default(),
            margin: 20.0,
            font_size: 10.0,
            font: StandardFont::default(),
        }
    }
}

impl OverlayTemplate {
    pub fn new(format: impl Into<String>) -> Self {
        Self {
            format: format.into(),
            ..Self::default()
        }
    }

    pub fn render(&self, page: usize, total: usize) -> String {
        self.format
            .replace("{page}", &page.to_string())
            .replace("{total}", &total.to_string())
    }
}

/// Options for [`PageStamper`]
#[derive(Debug, Clone, PartialEq)]
pub struct StampOptions {
    pub template: OverlayTemplate,
    /// Draw the page number line
    pub page_numbers: bool,
    /// Optional line drawn at the top center of every page
    pub header_text: Option<String>,
    /// Flate-compress overlay streams
    pub compress: bool,
}

impl Default for StampOptions {
    fn default() -> Self {
        Self {
            template: OverlayTemplate::default(),
            page_numbers: true,
            header_text: None,
            compress: true,
        }
    }
}

/// Adds page overlays to every leaf page of a document
pub struct PageStamper {
    options: StampOptions,
}

impl PageStamper {
    pub fn new(options: StampOptions) -> Self {
        Self { options }
    }

    /// Stamp every page in leaf order and return the number of pages stamped.
    ///
    /// Calling this twice appends a second overlay to every page.
    pub fn stamp(&self, doc: &mut Document) -> Result<usize> {
        let header = self.options.header_text.as_deref().filter(|h| !h.is_empty());
        if !self.options.page_numbers && header.is_none() {
            return Ok(0);
        }

        let pages = doc.pages()?;
        let total = pages.len();
        let _span = tracing::debug_span!("stamp", pages = total).entered();
        if total == 0 {
            return Ok(0);
        }

        let font_id = doc.add_object(self.font_dictionary());
        let open_id = doc.add_object(Stream::new(b"q\n".to_vec()));

        for (index, page) in pages.iter().enumerate() {
            let number_line = self
                .options
                .page_numbers
                .then(|| self.options.template.render(index + 1, total));
            self.stamp_page(doc, page, font_id, open_id, number_line.as_deref(), header)?;
        }

        tracing::debug!(pages = total, "stamped pages");
        Ok(total)
    }

    fn font_dictionary(&self) -> Dictionary {
        let mut font = Dictionary::typed("Font");
        font.set("Subtype", Object::name("Type1"));
        font.set("BaseFont", Object::name(self.options.template.font.pdf_name()));
        font.set("Encoding", Object::name("WinAnsiEncoding"));
        font
    }

    fn stamp_page(
        &self,
        doc: &mut Document,
        page: &ParsedPage,
        font_id: ObjectId,
        open_id: ObjectId,
        number_line: Option<&str>,
        header: Option<&str>,
    ) -> Result<()> {
        // Copy the effective resources so shared dictionaries stay untouched
        let mut resources = page
            .attributes
            .resources
            .as_ref()
            .and_then(|r| doc.resolve_dict(r))
            .cloned()
            .unwrap_or_default();
        let mut fonts = resources
            .get("Font")
            .and_then(|f| doc.resolve_dict(f))
            .cloned()
            .unwrap_or_default();
        let font_name = reserve_font_name(&fonts);
        fonts.set(font_name.clone(), font_id);
        resources.set("Font", fonts);

        let page_dict = doc
            .get(page.id)
            .and_then(|obj| obj.as_dict())
            .ok_or_else(|| PdfError::MalformedDocument(format!("page {} not found", page.id)))?;
        let mut contents = vec![Object::Reference(open_id)];
        match page_dict.get("Contents") {
            None | Some(Object::Null) => {}
            Some(Object::Array(items)) => contents.extend(items.iter().cloned()),
            Some(reference @ Object::Reference(_)) => match doc.resolve(reference) {
                Some(Object::Array(items)) => contents.extend(items.iter().cloned()),
                _ => contents.push(reference.clone()),
            },
            Some(other) => {
                return Err(PdfError::MalformedDocument(format!(
                    "page {} has /Contents of unexpected kind {other:?}",
                    page.id
                )))
            }
        }

        let overlay = self.overlay_content(page.visible_box(), &font_name, number_line, header);
        let mut stream = Stream::new(overlay);
        #[cfg(feature = "compression")]
        if self.options.compress {
            stream.compress_flate()?;
        }
        let overlay_id = doc.add_object(stream);
        contents.push(Object::Reference(overlay_id));

        let page_dict = doc
            .get_mut(page.id)
            .and_then(|obj| obj.as_dict_mut())
            .ok_or_else(|| PdfError::MalformedDocument(format!("page {} not found", page.id)))?;
        page_dict.set("Resources", resources);
        page_dict.set("Contents", contents);
        Ok(())
    }

    fn overlay_content(
        &self,
        bbox: [f64; 4],
        font_name: &str,
        number_line: Option<&str>,
        header: Option<&str>,
    ) -> Vec<u8> {
        let template = &self.options.template;
        let size = template.font_size;
        let [llx, lly, urx, ury] = bbox;

        let mut content = b"Q\nq\n0 g\n".to_vec();

        if let Some(header) = header {
            let width = measure_text(header, template.font, size);
            let x = (llx + urx) / 2.0 - width / 2.0;
            let y = ury - template.margin - size;
            show_text(&mut content, font_name, size, x, y, header);
        }

        if let Some(text) = number_line {
            let width = measure_text(text, template.font, size);
            let x = match template.position {
                StampPosition::BottomLeft | StampPosition::TopLeft => llx + template.margin,
                StampPosition::BottomCenter | StampPosition::TopCenter => {
                    (llx + urx) / 2.0 - width / 2.0
                }
                StampPosition::BottomRight | StampPosition::TopRight => {
                    urx - template.margin - width
                }
            };
            let y = if template.position.is_top() {
                // Keep clear of the header line
                let offset = if header.is_some() { size * 1.5 } else { 0.0 };
                ury - template.margin - size - offset
            } else {
                lly + template.margin
            };
            show_text(&mut content, font_name, size, x, y, text);
        }

        content.extend_from_slice(b"Q\n");
        content
    }
}

/// First `PdfStitchF<n>` name not present in `fonts`
fn reserve_font_name(fonts: &Dictionary) -> String {
    (1..)
        .map(|n| format!("{RESERVED_FONT_PREFIX}{n}"))
        .find(|name| !fonts.contains_key(name))
        .unwrap_or_else(|| RESERVED_FONT_PREFIX.to_string())
}

fn show_text(content: &mut Vec<u8>, font_name: &str, size: f64, x: f64, y: f64, text: &str) {
    content.extend_from_slice(
        format!(
            "BT\n/{font_name} {} Tf\n{} {} Td\n(",
            fmt_number(size),
            fmt_number(x),
            fmt_number(y)
        )
        .as_bytes(),
    );
    for byte in encode_win_ansi(text) {
        match byte {
            b'(' | b')' | b'\\' => {
                content.push(b'\\');
                content.push(byte);
            }
            b'\n' | b'\r' => content.push(b' '),
            _ => content.push(byte),
        }
    }
    content.extend_from_slice(b") Tj\nET\n");
}

fn fmt_number(value: f64) -> String {
    let formatted = format!("{value:.2}");
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    match trimmed {
        "-0" | "" => "0".to_string(),
        other => other.to_string(),
    }
}

/// Parse, stamp and serialize a PDF
pub fn stamp_pdf(bytes: &[u8], options: StampOptions) -> Result<Vec<u8>> {
    let mut doc = parse_document(bytes)?;
    PageStamper::new(options).stamp(&mut doc)?;
    doc.to_bytes()
}
