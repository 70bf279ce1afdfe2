use std::io::{Cursor, Write};

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use zip::write::SimpleFileOptions;

use resume_intake_lib::core::document_parser::DocumentTextExtractor;
use resume_intake_lib::core::errors::CoreError;
use resume_intake_lib::core::models::{DocumentFormat, ExtractionSettings, LinkPlatform};
use resume_intake_lib::core::pdf::PdfTextExtractor;
use resume_intake_lib::core::service::CoreService;
use resume_intake_lib::core::settings_store::SettingsStore;

const RESUME_LINES: [&str; 4] = [
    "Jane Doe",
    "Senior Rust Engineer",
    "Email: jane.doe@example.com",
    "GitHub: github.com/janedoe",
];

fn build_pdf(lines: &[&str], link_uri: Option<&str>) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut operations = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), 12.into()]),
        Operation::new("TL", vec![16.into()]),
        Operation::new("Td", vec![72.into(), 720.into()]),
    ];
    for line in lines {
        operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
        operations.push(Operation::new("T*", vec![]));
    }
    operations.push(Operation::new("ET", vec![]));

    let content = Content { operations };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));

    let mut page = dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    };
    if let Some(uri) = link_uri {
        let annot_id = doc.add_object(dictionary! {
            "Type" => "Annot",
            "Subtype" => "Link",
            "Rect" => vec![72.into(), 700.into(), 300.into(), 720.into()],
            "A" => dictionary! {
                "S" => "URI",
                "URI" => Object::string_literal(uri),
            },
        });
        page.set("Annots", vec![Object::Reference(annot_id)]);
    }
    let page_id = doc.add_object(page);

    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![page_id.into()],
        "Count" => 1,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

fn build_docx(document_xml: &str, rels_xml: &str) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);

    writer.start_file("word/document.xml", options).unwrap();
    writer.write_all(document_xml.as_bytes()).unwrap();
    writer
        .start_file("word/_rels/document.xml.rels", options)
        .unwrap();
    writer.write_all(rels_xml.as_bytes()).unwrap();

    writer.finish().unwrap().into_inner()
}

fn extractor() -> DocumentTextExtractor {
    DocumentTextExtractor::new(PdfTextExtractor::new())
}

#[test]
fn pdf_text_and_link_annotations_are_extracted() {
    let pdf = build_pdf(&RESUME_LINES, Some("https://www.linkedin.com/in/janedoe"));
    let extraction = extractor().extract(Some("resume.pdf"), &pdf).unwrap();

    assert_eq!(extraction.format, DocumentFormat::Pdf);
    assert_eq!(extraction.page_count, 1);
    assert!(extraction.body_text.contains("Jane Doe"));
    assert!(extraction.body_text.contains("Senior Rust Engineer"));

    let linkedin = extraction.first_link(LinkPlatform::LinkedIn).unwrap();
    assert_eq!(linkedin.url, "https://www.linkedin.com/in/janedoe");
    assert_eq!(
        extraction.first_link(LinkPlatform::GitHub).map(|l| l.url.as_str()),
        Some("https://github.com/janedoe")
    );
    assert!(extraction.first_link(LinkPlatform::Email).is_some());
}

#[test]
fn docx_paragraphs_and_hyperlinks_are_extracted() {
    let document_xml = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>
<w:p><w:r><w:t>Arjun Mehta</w:t></w:r></w:p>
<w:p><w:r><w:t>Backend Engineer</w:t></w:r></w:p>
<w:p><w:hyperlink r:id="rId5"><w:r><w:t>My LeetCode</w:t></w:r></w:hyperlink></w:p>
</w:body></w:document>"#;
    let rels_xml = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId5" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="https://leetcode.com/u/arjunm/" TargetMode="External"/>
</Relationships>"#;

    let docx = build_docx(document_xml, rels_xml);
    let extraction = extractor().extract(Some("resume.docx"), &docx).unwrap();

    assert_eq!(extraction.format, DocumentFormat::Docx);
    assert_eq!(
        extraction.body_text,
        "Arjun Mehta\nBackend Engineer\nMy LeetCode"
    );
    assert_eq!(
        extraction.first_link(LinkPlatform::LeetCode).map(|l| l.url.as_str()),
        Some("https://leetcode.com/u/arjunm")
    );
}

#[test]
fn documents_without_text_are_errors() {
    let blank = build_pdf(&[], None);
    let err = extractor().extract(Some("blank.pdf"), &blank).unwrap_err();
    assert!(matches!(err, CoreError::DocumentRead(_)));

    let err = extractor()
        .extract(Some("resume.pdf"), b"%PDF-1.7 truncated")
        .unwrap_err();
    assert!(matches!(err, CoreError::DocumentRead(_)));
}

#[tokio::test]
async fn analyze_resume_merges_ai_response_with_document() {
    let dir = tempfile::tempdir().unwrap();
    let core = CoreService::with_store(
        SettingsStore::new_with_path(dir.path().join("settings.json")),
        ExtractionSettings::default(),
    );
    let pdf = build_pdf(&RESUME_LINES, Some("https://www.linkedin.com/in/janedoe"));
    let ai_response = "```json\n{\"candidateName\": \"\", \"skills\": [\"Rust\", \"Tokio\"], \"contact\": {\"github\": \"https://github.com/jdoe-ai\"}}\n```";

    let analysis = core
        .analyze_resume(Some("resume.pdf"), &pdf, ai_response)
        .await
        .unwrap();

    assert_eq!(analysis.candidate_name, "Jane Doe");
    assert_eq!(analysis.skills, vec!["Rust", "Tokio"]);
    assert_eq!(analysis.contact.linkedin, "https://www.linkedin.com/in/janedoe");
    assert_eq!(analysis.contact.github, "https://github.com/jdoe-ai");
    assert!(analysis.raw_text.contains("Senior Rust Engineer"));
    assert!(!analysis.extracted_links.is_empty());
}

#[tokio::test]
async fn analyze_resume_rejects_non_json_responses() {
    let dir = tempfile::tempdir().unwrap();
    let core = CoreService::with_store(
        SettingsStore::new_with_path(dir.path().join("settings.json")),
        ExtractionSettings::default(),
    );
    let pdf = build_pdf(&RESUME_LINES, None);

    let err = core
        .analyze_resume(Some("resume.pdf"), &pdf, "Sorry, I cannot help with that.")
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::SchemaParse { .. }));
    assert_eq!(
        err.raw_snippet().as_deref(),
        Some("Sorry, I cannot help with that.")
    );
}
