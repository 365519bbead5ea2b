use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use crate::error::ExtractionError;
use crate::extract::{display_name, DocumentType, TextExtractor};

/// Text-layer yields shorter than this trigger the fallback strategy.
pub const DEFAULT_MIN_TEXT_CHARS: usize = 100;

pub struct PdfExtractor {
    min_text_chars: usize,
}

impl PdfExtractor {
    pub fn new(min_text_chars: usize) -> Self {
        Self { min_text_chars }
    }
}

impl Default for PdfExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_TEXT_CHARS)
    }
}

impl TextExtractor for PdfExtractor {
    fn extract(&self, path: &Path) -> Result<String, ExtractionError> {
        let _span = tracing::info_span!("extract.pdf", file = %display_name(path)).entered();

        let pdf_bytes = std::fs::read(path).map_err(|e| ExtractionError::ReadDocument {
            path: path.to_path_buf(),
            source: e,
        })?;

        extract_from_bytes(&pdf_bytes, self.min_text_chars)
    }

    fn supports(&self, document_type: DocumentType) -> bool {
        matches!(document_type, DocumentType::Pdf)
    }
}

pub(crate) fn extract_from_bytes(
    pdf_bytes: &[u8],
    min_text_chars: usize,
) -> Result<String, ExtractionError> {
    let primary = guarded("lopdf", || extract_with_lopdf(pdf_bytes));

    let primary_chars = primary
        .as_ref()
        .map(|text| text.trim().chars().count())
        .unwrap_or(0);
    if primary_chars >= min_text_chars {
        return primary;
    }

    tracing::debug!(
        primary_chars,
        min_text_chars,
        "Text layer below floor, trying pdf-extract"
    );
    let fallback = guarded("pdf-extract", || {
        pdf_extract::extract_text_from_mem(pdf_bytes)
            .map_err(|e| ExtractionError::Pdf(format!("pdf-extract failed: {}", e)))
    });

    match (primary, fallback) {
        (Ok(primary), Ok(fallback)) => {
            if fallback.trim().chars().count() > primary_chars {
                Ok(fallback.trim().to_string())
            } else {
                Ok(primary)
            }
        }
        (Ok(text), Err(e)) | (Err(e), Ok(text)) => {
            tracing::debug!("One PDF strategy failed: {}", e);
            Ok(text.trim().to_string())
        }
        (Err(primary_err), Err(fallback_err)) => Err(ExtractionError::Pdf(format!(
            "{}; {}",
            primary_err, fallback_err
        ))),
    }
}

fn extract_with_lopdf(pdf_bytes: &[u8]) -> Result<String, ExtractionError> {
    let doc = lopdf::Document::load_mem(pdf_bytes)
        .map_err(|e| ExtractionError::Pdf(format!("Failed to load PDF: {}", e)))?;

    let mut text = String::new();
    for (page_num, _) in doc.get_pages() {
        if let Ok(page_text) = doc.extract_text(&[page_num]) {
            text.push_str(&page_text);
            text.push('\n');
        }
    }

    Ok(text.trim().to_string())
}

/// Runs one strategy, turning a panic inside the PDF library into an error.
fn guarded<F>(strategy: &'static str, run: F) -> Result<String, ExtractionError>
where
    F: FnOnce() -> Result<String, ExtractionError>,
{
    match panic::catch_unwind(AssertUnwindSafe(run)) {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(strategy, "PDF extraction strategy panicked");
            Err(ExtractionError::Pdf(format!("{} panicked", strategy)))
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use lopdf::{dictionary, Document, Object, Stream};
    use tempfile::NamedTempFile;

    /// Builds a single-page PDF with one `Tj` per line.
    pub(crate) fn build_pdf(lines: &[&str]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.new_object_id();
        let resources_id = doc.new_object_id();
        let content_id = doc.new_object_id();
        let page_id = doc.new_object_id();

        doc.objects.insert(
            font_id,
            Object::Dictionary(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => "Courier",
            }),
        );

        doc.objects.insert(
            resources_id,
            Object::Dictionary(dictionary! {
                "Font" => dictionary! {
                    "F1" => font_id,
                },
            }),
        );

        let mut content = String::from("BT /F1 12 Tf 50 750 Td 14 TL\n");
        for line in lines {
            content.push_str(&format!("({}) Tj T*\n", line));
        }
        content.push_str("ET");
        let content_stream = Stream::new(dictionary! {}, content.into_bytes());
        doc.objects
            .insert(content_id, Object::Stream(content_stream));

        doc.objects.insert(
            page_id,
            Object::Dictionary(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                "Resources" => resources_id,
                "Contents" => content_id,
            }),
        );

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut pdf_bytes = Vec::new();
        doc.save_to(&mut pdf_bytes).unwrap();
        pdf_bytes
    }

    #[test]
    fn test_supports_pdf_only() {
        let extractor = PdfExtractor::default();
        assert!(extractor.supports(DocumentType::Pdf));
        assert!(!extractor.supports(DocumentType::Docx));
    }

    #[test]
    fn test_extract_embedded_text() {
        let pdf_bytes = build_pdf(&["Jane Doe", "jane.doe@example.com"]);
        let mut temp_file = NamedTempFile::with_suffix(".pdf").unwrap();
        std::io::Write::write_all(&mut temp_file, &pdf_bytes).unwrap();

        let text = PdfExtractor::default().extract(temp_file.path()).unwrap();
        assert!(text.contains("Jane Doe"), "got: {:?}", text);
    }

    #[test]
    fn test_short_yield_keeps_primary_when_fallback_is_not_longer() {
        // Well under the floor, so the fallback runs; the result must still
        // contain the text layer.
        let pdf_bytes = build_pdf(&["Short CV"]);
        let text = extract_from_bytes(&pdf_bytes, 1000).unwrap();
        assert!(text.contains("Short CV"), "got: {:?}", text);
    }

    #[test]
    fn test_corrupted_pdf_error() {
        let result = extract_from_bytes(b"not a valid pdf content", DEFAULT_MIN_TEXT_CHARS);
        match result {
            Err(ExtractionError::Pdf(msg)) => {
                assert!(msg.contains("Failed to load PDF"), "got: {}", msg);
            }
            other => panic!("Expected Pdf error, got {:?}", other),
        }
    }

    #[test]
    fn test_pdf_file_not_found_error() {
        let result = PdfExtractor::default().extract(Path::new("/nonexistent/file.pdf"));
        match result {
            Err(ExtractionError::ReadDocument { path, .. }) => {
                assert_eq!(path.to_str().unwrap(), "/nonexistent/file.pdf");
            }
            other => panic!("Expected ReadDocument error, got {:?}", other),
        }
    }
}
