use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ExtractionError;
use crate::extract::{display_name, DocumentType};
use crate::record::ProcessedRecord;

/// Priority given to jobs submitted as part of a batch. Lower runs first.
pub const DEFAULT_BATCH_PRIORITY: u32 = 1;

/// A document offered to the queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedFile {
    pub path: PathBuf,
    pub document_type: DocumentType,
}

impl SubmittedFile {
    pub fn new(path: impl Into<PathBuf>, document_type: DocumentType) -> Self {
        Self {
            path: path.into(),
            document_type,
        }
    }

    /// Detects the document type from the path.
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self, ExtractionError> {
        let path = path.into();
        let document_type = DocumentType::from_path(&path)?;
        Ok(Self {
            path,
            document_type,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Queued,
    Active,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingJob {
    pub job_id: String,
    pub batch_id: String,
    pub filename: String,
    pub source_path: PathBuf,
    pub document_type: DocumentType,
    pub priority: u32,
    /// Failed processing attempts so far. Demotions do not count.
    pub attempts: u32,
    pub max_attempts: u32,
    /// Times the job was pushed back because resources were unavailable.
    pub demotions: u32,
    pub created_at: DateTime<Utc>,
    pub state: JobState,
}

impl ProcessingJob {
    pub fn new(batch_id: &str, file: SubmittedFile, priority: u32, max_attempts: u32) -> Self {
        Self {
            job_id: uuid::Uuid::new_v4().to_string(),
            batch_id: batch_id.to_string(),
            filename: display_name(&file.path),
            source_path: file.path,
            document_type: file.document_type,
            priority,
            attempts: 0,
            max_attempts,
            demotions: 0,
            created_at: Utc::now(),
            state: JobState::Queued,
        }
    }

    /// Whether another attempt is allowed after the ones already made.
    pub fn can_retry(&self) -> bool {
        self.attempts < self.max_attempts
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedJob {
    pub job: ProcessingJob,
    pub result: ProcessedRecord,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedJob {
    pub job: ProcessingJob,
    pub error: String,
    pub failed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_job_defaults() {
        let file = SubmittedFile::new("/uploads/batch-7/jane_doe.pdf", DocumentType::Pdf);
        let job = ProcessingJob::new("batch-7", file, DEFAULT_BATCH_PRIORITY, 3);

        assert_eq!(job.batch_id, "batch-7");
        assert_eq!(job.filename, "jane_doe.pdf");
        assert_eq!(job.priority, 1);
        assert_eq!(job.attempts, 0);
        assert_eq!(job.demotions, 0);
        assert_eq!(job.state, JobState::Queued);
        assert!(job.can_retry());
        assert_eq!(uuid::Uuid::parse_str(&job.job_id).unwrap().get_version_num(), 4);
    }

    #[test]
    fn test_job_ids_are_unique() {
        let a = ProcessingJob::new("b", SubmittedFile::new("a.pdf", DocumentType::Pdf), 1, 3);
        let b = ProcessingJob::new("b", SubmittedFile::new("a.pdf", DocumentType::Pdf), 1, 3);
        assert_ne!(a.job_id, b.job_id);
    }

    #[test]
    fn test_can_retry_until_max_attempts() {
        let file = SubmittedFile::new("a.docx", DocumentType::Docx);
        let mut job = ProcessingJob::new("b", file, 1, 2);
        job.attempts = 1;
        assert!(job.can_retry());
        job.attempts = 2;
        assert!(!job.can_retry());
    }

    #[test]
    fn test_submitted_file_detects_type() {
        let file = SubmittedFile::from_path("cv/Jane.DOCX").unwrap();
        assert_eq!(file.document_type, DocumentType::Docx);
        assert!(SubmittedFile::from_path("cv/notes.txt").is_err());
    }
}
