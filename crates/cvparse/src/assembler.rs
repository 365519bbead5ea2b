use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info_span, warn};

use crate::error::{ExtractionError, ParseFieldError};
use crate::extract::{display_name, DocumentType, ExtractorRegistry};
use crate::parser::{self, EntityTagger};
use crate::record::{PersonalInfo, Record};

/// Turns a document into a [`Record`] by running every field parser over its text.
pub struct RecordAssembler {
    registry: ExtractorRegistry,
    tagger: Option<Arc<dyn EntityTagger>>,
}

impl RecordAssembler {
    pub fn new(registry: ExtractorRegistry, tagger: Option<Arc<dyn EntityTagger>>) -> Self {
        Self { registry, tagger }
    }

    pub fn assemble(
        &self,
        path: &Path,
        document_type: DocumentType,
    ) -> Result<Record, ExtractionError> {
        let _span = info_span!("assemble",
            file = %display_name(path),
            document_type = %document_type,
        )
        .entered();

        let text = self.registry.extract(path, document_type)?;
        debug!(chars = text.len(), "Extracted text");

        Ok(self.assemble_text(&text))
    }

    pub fn assemble_text(&self, text: &str) -> Record {
        self.assemble_text_with_warnings(text).0
    }

    /// Like [`assemble_text`](Self::assemble_text), also returning the fields
    /// whose parser failed and were left at their defaults.
    pub fn assemble_text_with_warnings(&self, text: &str) -> (Record, Vec<ParseFieldError>) {
        let mut warnings = Vec::new();
        let tagger = self.tagger.as_deref();

        let personal_info = PersonalInfo {
            name: guard("name", &mut warnings, || parser::extract_name(text, tagger)),
            email: guard("email", &mut warnings, || parser::extract_email(text)),
            phone: guard("phone", &mut warnings, || parser::extract_phone(text)),
            address: guard("address", &mut warnings, || parser::extract_address(text)),
            github: guard("github", &mut warnings, || parser::extract_github(text)),
            linkedin: guard("linkedin", &mut warnings, || parser::extract_linkedin(text)),
            age: guard("age", &mut warnings, || parser::extract_age(text)),
            nationality: guard("nationality", &mut warnings, || {
                parser::extract_nationality(text)
            }),
        };

        let record = Record {
            personal_info,
            education: guard("education", &mut warnings, || parser::extract_education(text)),
            experience: guard("experience", &mut warnings, || parser::extract_experience(text)),
            skills: guard("skills", &mut warnings, || parser::extract_skills(text)),
            languages: guard("languages", &mut warnings, || parser::extract_languages(text)),
            certifications: guard("certifications", &mut warnings, || {
                parser::extract_certifications(text)
            }),
            projects: guard("projects", &mut warnings, || parser::extract_projects(text)),
            achievements: guard("achievements", &mut warnings, || {
                parser::extract_achievements(text)
            }),
            assets: guard("assets", &mut warnings, || parser::extract_assets(text)),
            references: guard("references", &mut warnings, || parser::extract_references(text)),
            raw_text: text.to_string(),
        };

        (record, warnings)
    }
}

impl Default for RecordAssembler {
    fn default() -> Self {
        Self::new(ExtractorRegistry::default(), None)
    }
}

/// Runs one field parser; a panic is logged and the field falls back to its default.
fn guard<T, F>(field: &'static str, warnings: &mut Vec<ParseFieldError>, parse: F) -> T
where
    T: Default,
    F: FnOnce() -> T,
{
    match panic::catch_unwind(AssertUnwindSafe(parse)) {
        Ok(value) => value,
        Err(payload) => {
            let error = ParseFieldError {
                field,
                message: panic_message(payload.as_ref()),
            };
            warn!(field, error = %error, "Field parser failed, using default");
            warnings.push(error);
            T::default()
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
