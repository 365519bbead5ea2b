pub mod docx;
pub mod pdf;

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ExtractionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    Pdf,
    Docx,
}

impl DocumentType {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_lowercase().as_str() {
            "pdf" => Some(DocumentType::Pdf),
            "docx" => Some(DocumentType::Docx),
            _ => None,
        }
    }

    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or("").trim();
        match essence {
            "application/pdf" => Some(DocumentType::Pdf),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
                Some(DocumentType::Docx)
            }
            _ => None,
        }
    }

    /// Detects the type from the file extension, falling back to the MIME
    /// type guessed from the path.
    pub fn from_path(path: &Path) -> Result<Self, ExtractionError> {
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        if let Some(document_type) = Self::from_extension(extension) {
            return Ok(document_type);
        }

        mime_guess::from_path(path)
            .iter()
            .find_map(|mime| Self::from_mime(mime.essence_str()))
            .ok_or_else(|| ExtractionError::UnsupportedFormat(extension.to_string()))
    }

    /// Accepts either a bare extension (`pdf`) or a MIME type.
    pub fn from_declared(declared: &str) -> Result<Self, ExtractionError> {
        Self::from_extension(declared)
            .or_else(|| Self::from_mime(declared))
            .ok_or_else(|| ExtractionError::UnsupportedFormat(declared.to_string()))
    }

    pub fn extension(&self) -> &'static str {
        match self {
            DocumentType::Pdf => "pdf",
            DocumentType::Docx => "docx",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

pub trait TextExtractor: Send + Sync {
    fn extract(&self, path: &Path) -> Result<String, ExtractionError>;
    fn supports(&self, document_type: DocumentType) -> bool;
}

pub struct ExtractorRegistry {
    extractors: Vec<Box<dyn TextExtractor>>,
}

impl ExtractorRegistry {
    pub fn new(min_pdf_text_chars: usize) -> Self {
        Self {
            extractors: vec![
                Box::new(pdf::PdfExtractor::new(min_pdf_text_chars)),
                Box::new(docx::DocxExtractor::new()),
            ],
        }
    }

    /// A registry over caller-supplied extractors.
    pub fn with_extractors(extractors: Vec<Box<dyn TextExtractor>>) -> Self {
        Self { extractors }
    }

    pub fn extract(&self, path: &Path, declared: DocumentType) -> Result<String, ExtractionError> {
        let extractor = self
            .extractors
            .iter()
            .find(|extractor| extractor.supports(declared))
            .ok_or_else(|| ExtractionError::UnsupportedFormat(declared.to_string()))?;

        let text = extractor.extract(path)?;
        if text.trim().is_empty() {
            return Err(ExtractionError::EmptyText {
                path: path.to_path_buf(),
            });
        }

        Ok(text)
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::new(pdf::DEFAULT_MIN_TEXT_CHARS)
    }
}

/// File name only, so logs never carry full upload paths.
pub(crate) fn display_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<unknown>")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    struct FixedExtractor(&'static str);

    impl TextExtractor for FixedExtractor {
        fn extract(&self, _path: &Path) -> Result<String, ExtractionError> {
            Ok(self.0.to_string())
        }

        fn supports(&self, document_type: DocumentType) -> bool {
            document_type == DocumentType::Pdf
        }
    }

    #[test]
    fn test_document_type_from_extension() {
        assert_eq!(DocumentType::from_extension("PDF"), Some(DocumentType::Pdf));
        assert_eq!(DocumentType::from_extension(".docx"), Some(DocumentType::Docx));
        assert_eq!(DocumentType::from_extension("doc"), None);
        assert_eq!(DocumentType::from_extension("txt"), None);
    }

    #[test]
    fn test_document_type_from_mime() {
        assert_eq!(
            DocumentType::from_mime("application/pdf; charset=binary"),
            Some(DocumentType::Pdf)
        );
        assert_eq!(
            DocumentType::from_mime(
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            ),
            Some(DocumentType::Docx)
        );
        assert_eq!(DocumentType::from_mime("text/plain"), None);
    }

    #[test]
    fn test_document_type_from_path() {
        assert_eq!(
            DocumentType::from_path(Path::new("/uploads/cv.Pdf")).unwrap(),
            DocumentType::Pdf
        );

        match DocumentType::from_path(Path::new("/uploads/notes.txt")) {
            Err(ExtractionError::UnsupportedFormat(ext)) => assert_eq!(ext, "txt"),
            other => panic!("Expected UnsupportedFormat, got {:?}", other),
        }
    }

    #[test]
    fn test_from_declared_accepts_extension_and_mime() {
        assert_eq!(DocumentType::from_declared("pdf").unwrap(), DocumentType::Pdf);
        assert_eq!(
            DocumentType::from_declared("application/pdf").unwrap(),
            DocumentType::Pdf
        );
        assert!(DocumentType::from_declared("image/png").is_err());
    }

    #[test]
    fn test_registry_routes_by_declared_type() {
        let registry = ExtractorRegistry::with_extractors(vec![Box::new(FixedExtractor(
            "Jane Doe\nSkills\nRust",
        ))]);

        let text = registry
            .extract(Path::new("ignored.pdf"), DocumentType::Pdf)
            .unwrap();
        assert!(text.contains("Jane Doe"));

        let result = registry.extract(Path::new("ignored.docx"), DocumentType::Docx);
        assert!(matches!(result, Err(ExtractionError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_registry_rejects_blank_text() {
        let registry =
            ExtractorRegistry::with_extractors(vec![Box::new(FixedExtractor("  \n\t "))]);

        match registry.extract(Path::new("/tmp/blank.pdf"), DocumentType::Pdf) {
            Err(ExtractionError::EmptyText { path }) => {
                assert_eq!(path, PathBuf::from("/tmp/blank.pdf"));
            }
            other => panic!("Expected EmptyText, got {:?}", other),
        }
    }

    #[test]
    fn test_display_name_strips_directories() {
        assert_eq!(display_name(Path::new("/home/alice/cv.pdf")), "cv.pdf");
    }
}
