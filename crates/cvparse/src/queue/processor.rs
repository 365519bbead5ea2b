use std::io::Write;
use std::sync::Mutex;
use std::time::Instant;

use chrono::Utc;

use crate::assembler::RecordAssembler;
use crate::config::Config;
use crate::error::JobError;
use crate::extract::ExtractorRegistry;
use crate::parser::{estimate_years_experience, generate_content_hash};
use crate::queue::job::ProcessingJob;
use crate::record::ProcessedRecord;

/// Work done for one job by a queue worker.
pub trait JobProcessor: Send + Sync {
    fn process(&self, job: &ProcessingJob) -> Result<ProcessedRecord, JobError>;
}

/// Parses the job's document into a record and attaches queue metadata.
pub struct RecordProcessor {
    assembler: RecordAssembler,
}

impl RecordProcessor {
    pub fn new(assembler: RecordAssembler) -> Self {
        Self { assembler }
    }

    pub fn from_config(config: &Config) -> Self {
        let registry = ExtractorRegistry::new(config.min_pdf_text_chars);
        Self::new(RecordAssembler::new(registry, None))
    }
}

impl JobProcessor for RecordProcessor {
    fn process(&self, job: &ProcessingJob) -> Result<ProcessedRecord, JobError> {
        let started = Instant::now();

        let record = self.assembler.assemble(&job.source_path, job.document_type)?;
        if !record.has_name() {
            return Err(JobError::NotAResume);
        }

        Ok(ProcessedRecord {
            content_hash: generate_content_hash(&record),
            years_experience: estimate_years_experience(&record.experience),
            filename: job.filename.clone(),
            job_id: job.job_id.clone(),
            batch_id: job.batch_id.clone(),
            processing_time_ms: started.elapsed().as_millis() as u64,
            processed_at: Utc::now(),
            record,
        })
    }
}

/// Receives every successfully processed record, e.g. for storage or indexing.
pub trait RecordSink: Send + Sync {
    fn deliver(&self, record: &ProcessedRecord) -> std::io::Result<()>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl RecordSink for NoopSink {
    fn deliver(&self, _record: &ProcessedRecord) -> std::io::Result<()> {
        Ok(())
    }
}

/// Writes each record as one line of JSON.
pub struct JsonLinesSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        match self.writer.into_inner() {
            Ok(writer) => writer,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<W: Write + Send> RecordSink for JsonLinesSink<W> {
    fn deliver(&self, record: &ProcessedRecord) -> std::io::Result<()> {
        let line = serde_json::to_string(record)?;
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| std::io::Error::other("record writer lock poisoned"))?;
        writeln!(writer, "{}", line)?;
        writer.flush()
    }
}
