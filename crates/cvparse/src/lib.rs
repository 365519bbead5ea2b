pub mod assembler;
pub mod config;
pub mod error;
pub mod extract;
pub mod monitor;
pub mod parser;
pub mod queue;
pub mod record;

pub use assembler::RecordAssembler;
pub use config::{load_config, resolve_config, Config, ProcessingMode};
pub use error::{
    ConfigError, CvError, ExtractionError, JobError, ParseFieldError, QueueError, Result,
    ResourceUnavailable,
};
pub use extract::{DocumentType, ExtractorRegistry, TextExtractor};
pub use monitor::{AdmissionCheck, AlwaysAvailable, ResourceMonitor, ResourceStats};
pub use parser::EntityTagger;
pub use queue::{
    BatchStatus, JobProcessor, JobQueue, ProcessingJob, RecordProcessor, RecordSink,
    SubmittedFile,
};
pub use record::{ProcessedRecord, Record};
