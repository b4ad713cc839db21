//! Rendering adapters
//!
//! A [`RenderingAdapter`] turns a template identifier and a data object into
//! the bytes of one PDF. The engine never lays out content itself; whatever
//! the adapter returns is parsed, optionally stamped and serialized again by
//! [`generate_pdf`].

use crate::error::{PdfError, Result};
use crate::operations::{OverlayTemplate, PageStamper, StampOptions};
use crate::parser::parse_document;
use serde_json::Value;
use std::path::{Component, Path, PathBuf};

/// Produces raw PDF bytes for a template
pub trait RenderingAdapter {
    fn render(&self, template_id: &str, data: &Value) -> Result<Vec<u8>>;
}

impl<A: RenderingAdapter + ?Sized> RenderingAdapter for &A {
    fn render(&self, template_id: &str, data: &Value) -> Result<Vec<u8>> {
        (**self).render(template_id, data)
    }
}

/// Serves pre-rendered PDF templates stored as `<dir>/<template_id>.pdf`.
///
/// The data object is ignored; binding data to a layout belongs to an
/// external renderer.
#[derive(Debug, Clone)]
pub struct TemplateDirectory {
    root: PathBuf,
}

impl TemplateDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of a template inside the directory, or `None` when the id would
    /// leave it
    pub fn template_path(&self, template_id: &str) -> Option<PathBuf> {
        let relative = Path::new(template_id);
        let confined = !template_id.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !confined {
            return None;
        }

        let mut path = self.root.join(relative);
        let has_pdf_extension = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("pdf"))
            .unwrap_or(false);
        if !has_pdf_extension {
            let mut name = path.file_name()?.to_os_string();
            name.push(".pdf");
            path.set_file_name(name);
        }
        Some(path)
    }
}

impl RenderingAdapter for TemplateDirectory {
    fn render(&self, template_id: &str, _data: &Value) -> Result<Vec<u8>> {
        let path = self
            .template_path(template_id)
            .ok_or_else(|| PdfError::TemplateNotFound(template_id.to_string()))?;

        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PdfError::TemplateNotFound(template_id.to_string()))
            }
            Err(e) => {
                return Err(PdfError::RenderError(format!(
                    "reading {}: {e}",
                    path.display()
                )))
            }
        };

        let head = &bytes[..bytes.len().min(1024)];
        if !head.windows(5).any(|w| w == b"%PDF-") {
            return Err(PdfError::RenderError(format!(
                "template '{template_id}' is not a PDF"
            )));
        }
        tracing::debug!(template = template_id, bytes = bytes.len(), "rendered template");
        Ok(bytes)
    }
}

/// Options for [`generate_pdf`]
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateOptions {
    pub header_text: Option<String>,
    pub page_numbers: bool,
    pub template: OverlayTemplate,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            header_text: None,
            page_numbers: true,
            template: OverlayTemplate::default(),
        }
    }
}

impl GenerateOptions {
    fn stamp_options(&self) -> StampOptions {
        StampOptions {
            template: self.template.clone(),
            page_numbers: self.page_numbers,
            header_text: self.header_text.clone(),
            ..StampOptions::default()
        }
    }
}

/// Render a template, stamp it and serialize the result
pub fn generate_pdf(
    adapter: &dyn RenderingAdapter,
    template_id: &str,
    data: &Value,
    options: &GenerateOptions,
) -> Result<Vec<u8>> {
    let _span = tracing::info_span!("generate", template = template_id).entered();
    let rendered = adapter.render(template_id, data)?;
    let mut doc = parse_document(&rendered)?;
    let stamped = PageStamper::new(options.stamp_options()).stamp(&mut doc)?;
    tracing::debug!(pages = stamped, "stamped generated document");
    doc.to_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::test_helpers;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    struct FixedAdapter(Vec<u8>);

    impl RenderingAdapter for FixedAdapter {
        fn render(&self, _template_id: &str, _data: &Value) -> Result<Vec<u8>> {
            Ok(self.0.clone())
        }
    }

    struct FailingAdapter;

    impl RenderingAdapter for FailingAdapter {
        fn render(&self, template_id: &str, _data: &Value) -> Result<Vec<u8>> {
            Err(PdfError::TemplateNotFound(template_id.to_string()))
        }
    }

    fn template_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("greeting-template.pdf"),
            test_helpers::create_pdf_with_pages(2, "Hi"),
        )
        .unwrap();
        fs::write(dir.path().join("notes.pdf"), b"just some text").unwrap();
        dir
    }

    #[test]
    fn test_template_path_appends_extension() {
        let templates = TemplateDirectory::new("/srv/templates");
        assert_eq!(
            templates.template_path("invoice"),
            Some(PathBuf::from("/srv/templates/invoice.pdf"))
        );
        assert_eq!(
            templates.template_path("nested/invoice.PDF"),
            Some(PathBuf::from("/srv/templates/nested/invoice.PDF"))
        );
    }

    #[test]
    fn test_template_path_rejects_escapes() {
        let templates = TemplateDirectory::new("/srv/templates");
        assert_eq!(templates.template_path("../secret"), None);
        assert_eq!(templates.template_path("/etc/passwd"), None);
        assert_eq!(templates.template_path(""), None);
    }

    #[test]
    fn test_render_reads_template() {
        let dir = template_dir();
        let templates = TemplateDirectory::new(dir.path());
        let bytes = templates.render("greeting-template", &json!({})).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.4"));
    }

    #[test]
    fn test_render_missing_template() {
        let dir = template_dir();
        let templates = TemplateDirectory::new(dir.path());
        assert!(matches!(
            templates.render("missing", &json!({})),
            Err(PdfError::TemplateNotFound(id)) if id == "missing"
        ));
        assert!(matches!(
            templates.render("../greeting-template", &json!({})),
            Err(PdfError::TemplateNotFound(_))
        ));
    }

    #[test]
    fn test_render_rejects_non_pdf() {
        let dir = template_dir();
        let templates = TemplateDirectory::new(dir.path());
        assert!(matches!(
            templates.render("notes", &json!({})),
            Err(PdfError::RenderError(_))
        ));
    }

    #[test]
    fn test_generate_stamps_pages() {
        let adapter = FixedAdapter(test_helpers::create_pdf_with_pages(3, "G"));
        let options = GenerateOptions {
            header_text: Some("Report".to_string()),
            ..GenerateOptions::default()
        };
        let bytes = generate_pdf(&adapter, "any", &json!({"name": "x"}), &options).unwrap();

        let doc = parse_document(&bytes).unwrap();
        let pages = doc.pages().unwrap();
        assert_eq!(pages.len(), 3);
        let content = String::from_utf8_lossy(&doc.page_content(pages[1].id).unwrap()).into_owned();
        assert!(content.contains("(G2) Tj"));
        assert!(content.contains("(Report) Tj"));
        assert!(content.contains("(page 2 of 3) Tj"));
    }

    #[test]
    fn test_generate_without_numbering_keeps_pages() {
        let adapter = FixedAdapter(test_helpers::create_pdf_with_pages(1, "G"));
        let options = GenerateOptions {
            page_numbers: false,
            ..GenerateOptions::default()
        };
        let bytes = generate_pdf(&adapter, "any", &Value::Null, &options).unwrap();
        let doc = parse_document(&bytes).unwrap();
        let content = doc.page_content(doc.pages().unwrap()[0].id).unwrap();
        assert_eq!(content, b"BT /F1 12 Tf 72 720 Td (G1) Tj ET".to_vec());
    }

    #[test]
    fn test_generate_propagates_adapter_errors() {
        let result = generate_pdf(&FailingAdapter, "gone", &Value::Null, &GenerateOptions::default());
        assert!(matches!(result, Err(PdfError::TemplateNotFound(_))));

        let garbage = FixedAdapter(b"%PDF-1.4\nnot really".to_vec());
        let result = generate_pdf(&garbage, "bad", &Value::Null, &GenerateOptions::default());
        assert!(matches!(result, Err(PdfError::MalformedDocument(_))));
    }
}
