use std::panic::{self, AssertUnwindSafe};

use lopdf::{Document, Object};

use super::errors::CoreError;

/// Text and link annotations decoded from one binary document.
#[derive(Debug, Clone, Default)]
pub struct DecodedDocument {
    pub pages: Vec<String>,
    pub annotations: Vec<String>,
}

impl DecodedDocument {
    pub fn body_text(&self) -> String {
        self.pages
            .iter()
            .filter(|page| !page.trim().is_empty())
            .cloned()
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone, Default)]
pub struct PdfTextExtractor;

impl PdfTextExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn decode(&self, data: &[u8]) -> Result<DecodedDocument, CoreError> {
        let document = Document::load_mem(data);
        let annotations = match &document {
            Ok(document) => collect_link_annotations(document),
            Err(_) => Vec::new(),
        };

        match self.extract_pdf_pages(data) {
            Ok(pages) if pages.iter().any(|page| !page.trim().is_empty()) => {
                return Ok(DecodedDocument {
                    pages: pages.iter().map(|page| normalize_page_text(page)).collect(),
                    annotations,
                });
            }
            Ok(_) => tracing::warn!("pdf-extract returned no text, retrying page by page"),
            Err(err) => tracing::warn!(error = %err, "pdf-extract failed, retrying page by page"),
        }

        let document =
            document.map_err(|err| CoreError::document_read(format!("invalid PDF: {err}")))?;
        let pages = extract_pages(&document);

        Ok(DecodedDocument { pages, annotations })
    }

    fn extract_pdf_pages(&self, data: &[u8]) -> Result<Vec<String>, String> {
        // pdf-extract panics on some malformed inputs instead of returning an error.
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem_by_pages(data)
        }));

        match result {
            Ok(Ok(pages)) => Ok(pages),
            Ok(Err(err)) => Err(err.to_string()),
            Err(_) => Err("decoder panicked".to_string()),
        }
    }
}

/// Page-by-page decode. Undecodable pages stay in place as blank pages so the
/// page count matches the document.
fn extract_pages(document: &Document) -> Vec<String> {
    document
        .get_pages()
        .keys()
        .map(|page_number| match document.extract_text(&[*page_number]) {
            Ok(text) => normalize_page_text(&text),
            Err(err) => {
                tracing::warn!(page = page_number, error = %err, "skipping undecodable page");
                String::new()
            }
        })
        .collect()
}

fn collect_link_annotations(document: &Document) -> Vec<String> {
    let mut uris = Vec::new();

    for page_id in document.get_pages().values() {
        let Ok(page) = document.get_dictionary(*page_id) else {
            continue;
        };
        let Some(Object::Array(annots)) = page
            .get(b"Annots")
            .ok()
            .and_then(|annots| resolve(document, annots))
        else {
            continue;
        };

        for annot in annots {
            let Some(Object::Dictionary(annot)) = resolve(document, annot) else {
                continue;
            };
            if let Ok(Object::Name(subtype)) = annot.get(b"Subtype") {
                if subtype.as_slice() != b"Link" {
                    continue;
                }
            }
            let Some(Object::Dictionary(action)) = annot
                .get(b"A")
                .ok()
                .and_then(|action| resolve(document, action))
            else {
                continue;
            };
            if let Ok(Object::String(uri, _)) = action.get(b"URI") {
                let uri = String::from_utf8_lossy(uri).trim().to_string();
                if !uri.is_empty() {
                    uris.push(uri);
                }
            }
        }
    }

    uris
}

fn resolve<'a>(document: &'a Document, object: &'a Object) -> Option<&'a Object> {
    match object {
        Object::Reference(id) => document.get_object(*id).ok(),
        other => Some(other),
    }
}

/// Collapses whitespace runs inside each line and drops blank lines.
pub fn normalize_page_text(raw: &str) -> String {
    raw.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
