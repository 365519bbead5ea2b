//! Bulk processing: a bounded priority queue of parsing jobs served by a
//! fixed pool of worker threads.

pub mod job;
pub mod pool;
pub mod processor;
pub mod status;

pub use job::{
    CompletedJob, FailedJob, JobState, ProcessingJob, SubmittedFile, DEFAULT_BATCH_PRIORITY,
};
pub use pool::JobQueue;
pub use processor::{JobProcessor, JsonLinesSink, NoopSink, RecordProcessor, RecordSink};
pub use status::{BatchResults, BatchState, BatchStatus, QueueStatus};
