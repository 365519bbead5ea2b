use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CvError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Job error: {0}")]
    Job(#[from] JobError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Invalid value '{value}' for environment variable {name}")]
    InvalidEnv { name: String, value: String },

    #[error("Config validation failed: {message}")]
    Validation { message: String },
}

/// The document could not be turned into text. Fatal for that document.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Unsupported document format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to read document '{path}': {source}")]
    ReadDocument {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to process PDF: {0}")]
    Pdf(String),

    #[error("Failed to process DOCX: {0}")]
    Docx(String),

    #[error("No text could be extracted from '{path}'")]
    EmptyText { path: PathBuf },
}

/// A single field parser panicked. The assembler substitutes the field's default.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Parser for field '{field}' failed: {message}")]
pub struct ParseFieldError {
    pub field: &'static str,
    pub message: String,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResourceUnavailable {
    #[error("Memory usage ({used_mb}MB) exceeds limit ({limit_mb}MB)")]
    Memory { used_mb: u64, limit_mb: u64 },

    #[error("CPU usage ({percent:.1}%) exceeds limit ({limit:.1}%)")]
    Cpu { percent: f32, limit: f32 },

    #[error("Error checking resources: {0}")]
    Probe(String),
}

#[derive(Error, Debug)]
pub enum JobError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error("No valid CV data extracted - possibly not a CV")]
    NotAResume,

    #[error("Job exceeded its time limit ({elapsed:?} > {limit:?})")]
    Timeout { elapsed: Duration, limit: Duration },

    #[error("Processing failed: {0}")]
    Processing(String),

    #[error("Batch was cancelled")]
    Cancelled,
}

impl JobError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, JobError::Timeout { .. } | JobError::Processing(_))
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    #[error("Queue is full ({capacity} jobs waiting)")]
    QueueFull { capacity: usize },

    #[error("Queue has been shut down")]
    ShutDown,

    #[error("Failed to spawn worker: {0}")]
    SpawnFailed(String),
}

pub type Result<T> = std::result::Result<T, CvError>;
