use std::io::{Cursor, Read};

use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::Event;
use quick_xml::Reader;

use super::errors::CoreError;
use super::link_extractor;
use super::models::{DocumentExtraction, DocumentFormat};
use super::pdf::{DecodedDocument, PdfTextExtractor};

const HYPERLINK_REL_SUFFIX: &str = "/relationships/hyperlink";

pub struct DocumentTextExtractor {
    pdf_text_extractor: PdfTextExtractor,
}

impl DocumentTextExtractor {
    pub fn new(pdf_text_extractor: PdfTextExtractor) -> Self {
        Self { pdf_text_extractor }
    }

    /// Decodes a résumé into body text plus the profile links found in it.
    /// Documents without any extractable text are an error, never an empty success.
    pub fn extract(
        &self,
        file_name: Option<&str>,
        data: &[u8],
    ) -> Result<DocumentExtraction, CoreError> {
        let format = detect_format(file_name, data);
        let decoded = match format {
            DocumentFormat::Pdf => self.pdf_text_extractor.decode(data)?,
            DocumentFormat::Docx => decode_docx(data)
                .map_err(|err| CoreError::document_read(format!("invalid DOCX: {err}")))?,
        };

        let body_text = decoded.body_text();
        if body_text.trim().is_empty() {
            return Err(CoreError::document_read("document contains no extractable text"));
        }

        let links = link_extractor::extract_links(&body_text, &decoded.annotations);
        tracing::info!(
            format = ?format,
            pages = decoded.pages.len(),
            chars = body_text.len(),
            links = links.len(),
            "extracted document text"
        );

        Ok(DocumentExtraction {
            body_text,
            links,
            page_count: decoded.pages.len(),
            format,
        })
    }
}

fn detect_format(file_name: Option<&str>, data: &[u8]) -> DocumentFormat {
    let extension = file_name
        .and_then(|name| std::path::Path::new(name).extension())
        .and_then(|v| v.to_str())
        .map(|v| v.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "pdf" => DocumentFormat::Pdf,
        "docx" => DocumentFormat::Docx,
        _ if data.starts_with(b"PK\x03\x04") => DocumentFormat::Docx,
        _ => DocumentFormat::Pdf,
    }
}

fn decode_docx(data: &[u8]) -> anyhow::Result<DecodedDocument> {
    let cursor = Cursor::new(data);
    let mut archive = zip::ZipArchive::new(cursor)?;

    let mut xml = String::new();
    archive
        .by_name("word/document.xml")?
        .read_to_string(&mut xml)?;

    let mut rels = String::new();
    if let Ok(mut rels_file) = archive.by_name("word/_rels/document.xml.rels") {
        rels_file.read_to_string(&mut rels)?;
    }

    Ok(DecodedDocument {
        pages: vec![docx_paragraphs(&xml)?.join("\n")],
        annotations: docx_hyperlinks(&rels)?,
    })
}

fn docx_paragraphs(xml: &str) -> anyhow::Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);

    let mut buf = Vec::new();
    let mut current = String::new();
    let mut lines = Vec::new();
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"w:p" => current.clear(),
                b"w:t" => in_text = true,
                _ => {}
            },
            Ok(Event::Empty(e)) => {
                if matches!(e.name().as_ref(), b"w:tab" | b"w:br") {
                    current.push(' ');
                }
            }
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:p" => {
                    let line = current.split_whitespace().collect::<Vec<_>>().join(" ");
                    if !line.is_empty() {
                        lines.push(line);
                    }
                    current.clear();
                }
                b"w:t" => in_text = false,
                _ => {}
            },
            Ok(Event::Text(e)) => {
                if in_text {
                    current.push_str(&e.xml_content()?);
                }
            }
            Ok(Event::GeneralRef(e)) => {
                if in_text {
                    if let Some(ch) = e.resolve_char_ref()? {
                        current.push(ch);
                    } else if let Some(text) =
                        resolve_predefined_entity(&String::from_utf8_lossy(&e))
                    {
                        current.push_str(text);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(err) => return Err(err.into()),
            _ => {}
        }

        buf.clear();
    }

    Ok(lines)
}

fn docx_hyperlinks(rels: &str) -> anyhow::Result<Vec<String>> {
    if rels.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut reader = Reader::from_str(rels);
    let mut buf = Vec::new();
    let mut targets = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(e)) | Ok(Event::Start(e)) => {
                if e.local_name().as_ref() != b"Relationship" {
                    buf.clear();
                    continue;
                }

                let mut rel_type = String::new();
                let mut target = String::new();
                for attr in e.attributes().flatten() {
                    let value = attr
                        .decode_and_unescape_value(reader.decoder())?
                        .into_owned();
                    match attr.key.as_ref() {
                        b"Type" => rel_type = value,
                        b"Target" => target = value,
                        _ => {}
                    }
                }

                if rel_type.ends_with(HYPERLINK_REL_SUFFIX) && !target.is_empty() {
                    targets.push(target);
                }
            }
            Ok(Event::Eof) => break,
            Err(err) => return Err(err.into()),
            _ => {}
        }

        buf.clear();
    }

    Ok(targets)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_format_prefers_extension_then_magic_bytes() {
        assert_eq!(detect_format(Some("cv.PDF"), b"PK\x03\x04"), DocumentFormat::Pdf);
        assert_eq!(detect_format(Some("cv.docx"), b"%PDF-1.7"), DocumentFormat::Docx);
        assert_eq!(detect_format(None, b"PK\x03\x04rest"), DocumentFormat::Docx);
        assert_eq!(detect_format(Some("cv.bin"), b"%PDF-1.7"), DocumentFormat::Pdf);
    }

    #[test]
    fn docx_paragraphs_join_runs_and_resolve_entities() {
        let xml = r#"<w:document><w:body>
            <w:p><w:r><w:t>Jane</w:t></w:r><w:r><w:t xml:space="preserve"> Doe</w:t></w:r></w:p>
            <w:p><w:r><w:t>R&amp;D</w:t><w:tab/><w:t>Engineer&#x2014;Rust</w:t></w:r></w:p>
            <w:p></w:p>
        </w:body></w:document>"#;
        let lines = docx_paragraphs(xml).unwrap();
        assert_eq!(lines, vec!["Jane Doe", "R&D Engineer\u{2014}Rust"]);
    }

    #[test]
    fn docx_hyperlinks_keep_only_external_hyperlinks() {
        let rels = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="https://github.com/janedoe?tab=repositories&amp;q=rust" TargetMode="External"/>
  <Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="https://leetcode.com/u/jane?a=1&#38;b=2" TargetMode="External"/>
</Relationships>"#;
        let links = docx_hyperlinks(rels).unwrap();
        assert_eq!(
            links,
            vec![
                "https://github.com/janedoe?tab=repositories&q=rust",
                "https://leetcode.com/u/jane?a=1&b=2",
            ]
        );
    }

    #[test]
    fn extract_fails_on_corrupt_docx() {
        let extractor = DocumentTextExtractor::new(PdfTextExtractor::new());
        let err = extractor
            .extract(Some("resume.docx"), b"PK\x03\x04garbage")
            .unwrap_err();
        assert!(matches!(err, CoreError::DocumentRead(_)));
    }
}
