//! Integration tests for document extraction
//!
//! Builds real files on disk with tempfile and runs them through the
//! extractor.

use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use grantbloom::error::ExtractError;
use grantbloom::extract::{extract_bytes, extract_file, DocumentKind};

/// Minimal WordprocessingML package holding `body` as the document part.
fn docx_bytes(body: &str) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

    writer.start_file("[Content_Types].xml", options).unwrap();
    writer
        .write_all(br#"<?xml version="1.0"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"/>"#)
        .unwrap();

    writer.start_file("word/document.xml", options).unwrap();
    writer
        .write_all(
            format!(
                r#"<?xml version="1.0" encoding="UTF-8"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
                body
            )
            .as_bytes(),
        )
        .unwrap();

    writer.finish().unwrap().into_inner()
}

/// PDF with one Helvetica text line per page, xref offsets computed.
fn pdf_bytes(pages: &[&str]) -> Vec<u8> {
    let font_id = 3 + 2 * pages.len();
    let kids: Vec<String> = (0..pages.len()).map(|i| format!("{} 0 R", 3 + 2 * i)).collect();

    let mut objects = vec![
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids.join(" "),
            pages.len()
        ),
    ];
    for (i, text) in pages.iter().enumerate() {
        let content = format!("BT /F1 24 Tf 72 720 Td ({}) Tj ET", text);
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
             /Resources << /Font << /F1 {} 0 R >> >> /Contents {} 0 R >>",
            font_id,
            4 + 2 * i
        ));
        objects.push(format!(
            "<< /Length {} >>\nstream\n{}\nendstream",
            content.len(),
            content
        ));
    }
    objects.push("<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string());

    let mut pdf = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::new();
    for (i, body) in objects.iter().enumerate() {
        offsets.push(pdf.len());
        pdf.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
    }

    let xref_start = pdf.len();
    let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
    for offset in offsets {
        xref.push_str(&format!("{:010} 00000 n \n", offset));
    }
    xref.push_str(&format!(
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
        objects.len() + 1,
        xref_start
    ));
    pdf.extend_from_slice(xref.as_bytes());
    pdf
}

#[cfg(test)]
mod docx_tests {
    use super::*;

    #[tokio::test]
    async fn test_docx_paragraphs_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Proposal.docx");
        std::fs::write(
            &path,
            docx_bytes(
                r#"<w:p><w:r><w:rPr><w:b/></w:rPr><w:t>Need</w:t></w:r><w:r><w:t xml:space="preserve"> statement</w:t></w:r></w:p><w:p><w:r><w:t>Budget &amp; timeline</w:t></w:r></w:p>"#,
            ),
        )
        .unwrap();

        let document = extract_file(&path).await.unwrap();
        assert_eq!(document.kind, DocumentKind::Docx);
        assert_eq!(document.file_name, "Proposal.docx");
        assert_eq!(document.title_stem(), "Proposal");
        assert_eq!(document.text, "Need statement\nBudget & timeline");
    }

    #[test]
    fn test_docx_tabs_and_breaks() {
        let bytes = docx_bytes(
            r#"<w:p><w:r><w:t>Col A</w:t><w:tab/><w:t>Col B</w:t><w:br/><w:t>Next line</w:t></w:r></w:p>"#,
        );
        let document = extract_bytes("table.docx", None, &bytes).unwrap();
        assert_eq!(document.text, "Col A\tCol B\nNext line");
        assert_eq!(document.normalized_text(), "Col A Col B Next line");
    }

    #[test]
    fn test_docx_media_type_wins_over_extension() {
        let bytes = docx_bytes("<w:p><w:r><w:t>Hello</w:t></w:r></w:p>");
        let document = extract_bytes(
            "upload.bin",
            Some("application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
            &bytes,
        )
        .unwrap();
        assert_eq!(document.text, "Hello");
    }

    #[test]
    fn test_zip_without_document_part_fails() {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("other.xml", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"<x/>").unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        let err = extract_bytes("broken.docx", None, &bytes).unwrap_err();
        assert!(matches!(err, ExtractError::Docx { .. }));
    }

    #[test]
    fn test_garbage_docx_fails() {
        let err = extract_bytes("broken.docx", None, b"not a zip").unwrap_err();
        assert!(matches!(err, ExtractError::Docx { .. }));
    }
}

#[cfg(test)]
mod format_tests {
    use super::*;

    #[tokio::test]
    async fn test_plain_text_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.TXT");
        std::fs::write(&path, "Line one\nLine two").unwrap();

        let document = extract_file(&path).await.unwrap();
        assert_eq!(document.kind, DocumentKind::PlainText);
        assert_eq!(document.text, "Line one\nLine two");
    }

    #[tokio::test]
    async fn test_unsupported_extension_is_rejected_before_reading() {
        // The file does not exist; rejection happens on the name alone.
        let err = extract_file("/nonexistent/picture.png").await.unwrap_err();
        match err {
            ExtractError::UnsupportedFormat { file_name } => assert_eq!(file_name, "picture.png"),
            other => panic!("Expected UnsupportedFormat, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_supported_file_is_io_error() {
        let err = extract_file("/nonexistent/notes.txt").await.unwrap_err();
        assert!(matches!(err, ExtractError::Io(_)));
    }

    #[tokio::test]
    async fn test_pdf_pages_are_newline_separated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Annual Report.pdf");
        std::fs::write(&path, pdf_bytes(&["PageOne", "PageTwo"])).unwrap();

        let document = extract_file(&path).await.unwrap();
        assert_eq!(document.kind, DocumentKind::Pdf);
        assert_eq!(document.text, "PageOne\nPageTwo");
        assert_eq!(document.normalized_text(), "PageOne PageTwo");
    }

    #[test]
    fn test_pdf_page_order_is_preserved() {
        let bytes = pdf_bytes(&["First", "Second", "Third"]);
        let document = extract_bytes("upload", Some("application/pdf"), &bytes).unwrap();
        assert_eq!(document.text, "First\nSecond\nThird");
    }

    #[test]
    fn test_docx_numeric_character_references() {
        let bytes = docx_bytes("<w:p><w:r><w:t>We&#x2019;re&#160;ready</w:t></w:r></w:p>");
        let document = extract_bytes("refs.docx", None, &bytes).unwrap();
        assert_eq!(document.text, "We\u{2019}re\u{a0}ready");
    }

    #[test]
    fn test_invalid_pdf_fails() {
        let err = extract_bytes("report.pdf", None, b"%PDF-garbage").unwrap_err();
        assert!(matches!(err, ExtractError::Pdf { .. }));
    }
}
