use std::io::{Read, Seek};
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::ExtractionError;
use crate::extract::{display_name, DocumentType, TextExtractor};

pub struct DocxExtractor;

impl DocxExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DocxExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl TextExtractor for DocxExtractor {
    fn extract(&self, path: &Path) -> Result<String, ExtractionError> {
        let _span = tracing::info_span!("extract.docx", file = %display_name(path)).entered();

        let file = std::fs::File::open(path).map_err(|e| ExtractionError::ReadDocument {
            path: path.to_path_buf(),
            source: e,
        })?;

        let mut archive = zip::ZipArchive::new(file)
            .map_err(|e| ExtractionError::Docx(format!("Failed to open DOCX: {}", e)))?;

        extract_docx_text(&mut archive)
    }

    fn supports(&self, document_type: DocumentType) -> bool {
        matches!(document_type, DocumentType::Docx)
    }
}

fn extract_docx_text<R: Read + Seek>(
    archive: &mut zip::ZipArchive<R>,
) -> Result<String, ExtractionError> {
    let mut document_xml = archive
        .by_name("word/document.xml")
        .map_err(|e| ExtractionError::Docx(format!("Failed to find document.xml: {}", e)))?;

    let mut xml_content = String::new();
    document_xml
        .read_to_string(&mut xml_content)
        .map_err(|e| ExtractionError::Docx(format!("Failed to read document.xml: {}", e)))?;

    parse_docx_xml(&xml_content)
}

/// Paragraph text in document order, one paragraph per line.
fn parse_docx_xml(xml: &str) -> Result<String, ExtractionError> {
    let mut reader = Reader::from_str(xml);

    let mut text = String::new();
    let mut paragraph = String::new();
    let mut in_text_element = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                if e.local_name().as_ref() == b"t" {
                    in_text_element = true;
                }
            }
            Ok(Event::Empty(ref e)) => match e.local_name().as_ref() {
                b"tab" => paragraph.push('\t'),
                b"br" | b"cr" => paragraph.push('\n'),
                // Self-closing empty paragraph
                b"p" => text.push('\n'),
                _ => {}
            },
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"t" => in_text_element = false,
                b"p" => {
                    text.push_str(paragraph.trim_end());
                    text.push('\n');
                    paragraph.clear();
                }
                _ => {}
            },
            Ok(Event::Text(e)) => {
                if in_text_element {
                    let decoded = e.unescape().unwrap_or_default();
                    paragraph.push_str(&decoded);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ExtractionError::Docx(format!("XML parsing error: {}", e)));
            }
            _ => {}
        }
    }

    if !paragraph.is_empty() {
        text.push_str(paragraph.trim_end());
    }

    Ok(text)
}
