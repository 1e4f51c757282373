//! Plain-text extraction from uploaded documents.
//!
//! Supports PDF, Word (`.docx`) packages, and plain/rich text. Kind detection
//! trusts the declared media type first and falls back to the file extension.

use std::io::{Cursor, Read};
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use crate::error::{ExtractError, ExtractResult};

const DOCX_MEDIA_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
const DOCX_BODY_PART: &str = "word/document.xml";

/// Document formats the extractor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// `application/pdf` or `.pdf`
    Pdf,
    /// Word 2007+ (`.docx`)
    Docx,
    /// `.txt` and `.rtf`, read as UTF-8 as is
    PlainText,
}

impl DocumentKind {
    /// Detect the kind from an optional media type and the file name.
    pub fn detect(file_name: &str, media_type: Option<&str>) -> Option<Self> {
        match media_type.map(|m| m.trim().to_lowercase()).as_deref() {
            Some("application/pdf") => return Some(DocumentKind::Pdf),
            Some(DOCX_MEDIA_TYPE) => return Some(DocumentKind::Docx),
            Some("text/plain") | Some("text/rtf") | Some("application/rtf") => {
                return Some(DocumentKind::PlainText)
            }
            _ => {}
        }

        let extension = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());

        match extension.as_deref() {
            Some("pdf") => Some(DocumentKind::Pdf),
            Some("docx") => Some(DocumentKind::Docx),
            Some("txt") | Some("rtf") => Some(DocumentKind::PlainText),
            _ => None,
        }
    }
}

/// Text pulled out of one uploaded file.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedDocument {
    /// Base name of the source file
    pub file_name: String,
    /// Detected format
    pub kind: DocumentKind,
    /// Extracted text, line structure kept
    pub text: String,
}

impl ExtractedDocument {
    /// File name without its final extension, used as a default title.
    pub fn title_stem(&self) -> String {
        match self.file_name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem.to_string(),
            _ => self.file_name.clone(),
        }
    }

    /// Text with whitespace runs collapsed to single spaces.
    pub fn normalized_text(&self) -> String {
        collapse_whitespace(&self.text)
    }
}

/// Read a file from disk and extract its text.
///
/// PDF and DOCX parsing run on the blocking pool.
pub async fn extract_file(path: impl AsRef<Path>) -> ExtractResult<ExtractedDocument> {
    let path = path.as_ref();
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();

    // Reject before touching the file so unsupported uploads fail fast.
    if DocumentKind::detect(&file_name, None).is_none() {
        return Err(ExtractError::UnsupportedFormat { file_name });
    }

    let bytes = tokio::fs::read(path).await?;
    tokio::task::spawn_blocking(move || extract_bytes(&file_name, None, &bytes))
        .await
        .map_err(|e| ExtractError::Io(std::io::Error::other(e)))?
}

/// Extract text from an in-memory upload.
pub fn extract_bytes(
    file_name: &str,
    media_type: Option<&str>,
    bytes: &[u8],
) -> ExtractResult<ExtractedDocument> {
    let kind = DocumentKind::detect(file_name, media_type).ok_or_else(|| {
        ExtractError::UnsupportedFormat {
            file_name: file_name.to_string(),
        }
    })?;

    let text = match kind {
        DocumentKind::Pdf => extract_pdf(bytes)?,
        DocumentKind::Docx => extract_docx(bytes)?,
        DocumentKind::PlainText => String::from_utf8_lossy(bytes).into_owned(),
    };

    debug!(file = %file_name, kind = ?kind, chars = text.chars().count(), "Extracted document text");

    Ok(ExtractedDocument {
        file_name: file_name.to_string(),
        kind,
        text,
    })
}

fn extract_pdf(bytes: &[u8]) -> ExtractResult<String> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes).map_err(|e| ExtractError::Pdf {
        message: e.to_string(),
    })?;

    // Each page comes back with leading blank lines; one newline per page break.
    let pages: Vec<&str> = pages.iter().map(|page| page.trim_matches('\n')).collect();
    Ok(pages.join("\n"))
}

fn extract_docx(bytes: &[u8]) -> ExtractResult<String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| ExtractError::Docx {
        message: e.to_string(),
    })?;

    let mut xml = String::new();
    archive
        .by_name(DOCX_BODY_PART)
        .map_err(|e| ExtractError::Docx {
            message: format!("{}: {}", DOCX_BODY_PART, e),
        })?
        .read_to_string(&mut xml)?;

    Ok(docx_paragraphs(&xml).join("\n"))
}

fn docx_token_regex() -> &'static Regex {
    static TOKENS: OnceLock<Regex> = OnceLock::new();
    TOKENS.get_or_init(|| {
        Regex::new(r"<w:t(?:\s[^>]*)?>([^<]*)</w:t>|<w:tab/>|<w:br/>|</w:p>")
            .expect("static regex is valid")
    })
}

/// Paragraph texts from a WordprocessingML body, formatting discarded.
fn docx_paragraphs(xml: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current = String::new();

    for caps in docx_token_regex().captures_iter(xml) {
        match (caps.get(0).map(|m| m.as_str()), caps.get(1)) {
            (_, Some(run)) => current.push_str(&decode_xml_entities(run.as_str())),
            (Some("<w:tab/>"), None) => current.push('\t'),
            (Some("<w:br/>"), None) => current.push('\n'),
            _ => paragraphs.push(std::mem::take(&mut current)),
        }
    }
    if !current.is_empty() {
        paragraphs.push(current);
    }
    paragraphs
}

fn xml_entity_regex() -> &'static Regex {
    static ENTITIES: OnceLock<Regex> = OnceLock::new();
    ENTITIES.get_or_init(|| {
        Regex::new(r"&(#[xX][0-9a-fA-F]+|#[0-9]+|lt|gt|quot|apos|amp);")
            .expect("static regex is valid")
    })
}

/// Decode named and numeric character references in one pass.
///
/// References that do not name a valid character are kept verbatim.
fn decode_xml_entities(raw: &str) -> String {
    xml_entity_regex()
        .replace_all(raw, |caps: &regex::Captures<'_>| {
            let entity = &caps[1];
            let decoded = match entity {
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "amp" => Some('&'),
                _ => {
                    let code = match entity.strip_prefix("#x").or_else(|| entity.strip_prefix("#X")) {
                        Some(hex) => u32::from_str_radix(hex, 16).ok(),
                        None => entity[1..].parse::<u32>().ok(),
                    };
                    code.and_then(char::from_u32)
                }
            };
            match decoded {
                Some(c) => c.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Collapse whitespace runs to single spaces and trim.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
