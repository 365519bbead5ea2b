//! Test doubles for the job queue's seams.

#![allow(dead_code)]

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use crossbeam_channel::{Receiver, Sender};

use cvparse::error::{JobError, ResourceUnavailable};
use cvparse::queue::{JobProcessor, JobQueue, NoopSink, ProcessingJob, RecordSink};
use cvparse::{AdmissionCheck, AlwaysAvailable, Config, ProcessedRecord};

/// A record that carries only the job's identifiers.
pub fn placeholder_record(job: &ProcessingJob) -> ProcessedRecord {
    ProcessedRecord {
        record: Default::default(),
        filename: job.filename.clone(),
        job_id: job.job_id.clone(),
        batch_id: job.batch_id.clone(),
        content_hash: String::new(),
        years_experience: None,
        processing_time_ms: 0,
        processed_at: Utc::now(),
    }
}

/// What a processor saw for one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seen {
    pub filename: String,
    pub attempts: u32,
    pub demotions: u32,
    pub priority: u32,
}

/// Succeeds or fails every call and records what it was given.
pub struct ScriptedProcessor {
    outcome: fn(&ProcessingJob) -> Result<(), JobError>,
    pub seen: Mutex<Vec<Seen>>,
}

impl ScriptedProcessor {
    pub fn succeeding() -> Self {
        Self {
            outcome: |_| Ok(()),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            outcome: |_| Err(JobError::Processing("always fails".to_string())),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Fails non-retryably for files whose name starts with `bad`.
    pub fn rejecting_bad_files() -> Self {
        Self {
            outcome: |job| {
                if job.filename.starts_with("bad") {
                    Err(JobError::NotAResume)
                } else {
                    Ok(())
                }
            },
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Like [`rejecting_bad_files`](Self::rejecting_bad_files), taking a few
    /// milliseconds per job.
    pub fn slow_rejecting_bad_files() -> Self {
        Self {
            outcome: |job| {
                std::thread::sleep(Duration::from_millis(3));
                if job.filename.starts_with("bad") {
                    Err(JobError::NotAResume)
                } else {
                    Ok(())
                }
            },
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub fn seen(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }
}

impl JobProcessor for ScriptedProcessor {
    fn process(&self, job: &ProcessingJob) -> Result<ProcessedRecord, JobError> {
        self.seen.lock().unwrap().push(Seen {
            filename: job.filename.clone(),
            attempts: job.attempts,
            demotions: job.demotions,
            priority: job.priority,
        });
        (self.outcome)(job).map(|()| placeholder_record(job))
    }
}

/// Blocks every job until released, announcing each start.
///
/// Dropping the release sender (via [`GatedProcessor::open`]) lets every
/// current and future job through.
pub struct GatedProcessor {
    started: Sender<String>,
    release: Receiver<()>,
}

pub struct Gate {
    pub started: Receiver<String>,
    release: Mutex<Option<Sender<()>>>,
}

impl Gate {
    /// Waits for the next job to start and returns its file name.
    pub fn next_started(&self) -> String {
        self.started
            .recv_timeout(Duration::from_secs(10))
            .expect("No job started in time")
    }

    pub fn open(&self) {
        self.release.lock().unwrap().take();
    }
}

impl GatedProcessor {
    pub fn new() -> (Self, Gate) {
        let (started_tx, started_rx) = crossbeam_channel::unbounded();
        let (release_tx, release_rx) = crossbeam_channel::unbounded();
        (
            Self {
                started: started_tx,
                release: release_rx,
            },
            Gate {
                started: started_rx,
                release: Mutex::new(Some(release_tx)),
            },
        )
    }
}

impl JobProcessor for GatedProcessor {
    fn process(&self, job: &ProcessingJob) -> Result<ProcessedRecord, JobError> {
        let _ = self.started.send(job.filename.clone());
        let _ = self.release.recv_timeout(Duration::from_secs(10));
        Ok(placeholder_record(job))
    }
}

/// Reports resource pressure for the first `rejections` checks.
pub struct FlakyAdmission {
    remaining: AtomicUsize,
}

impl FlakyAdmission {
    pub fn rejecting(rejections: usize) -> Self {
        Self {
            remaining: AtomicUsize::new(rejections),
        }
    }
}

impl AdmissionCheck for FlakyAdmission {
    fn check_availability(&self) -> Result<(), ResourceUnavailable> {
        let rejected = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if rejected {
            Err(ResourceUnavailable::Memory {
                used_mb: 9000,
                limit_mb: 4096,
            })
        } else {
            Ok(())
        }
    }
}

/// `Write` target that can be inspected while a sink still owns a handle.
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).expect("Sink wrote invalid UTF-8")
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Builds a queue around `processor` with no resource gating and no sink.
pub fn queue_with(config: &Config, processor: Arc<dyn JobProcessor>) -> JobQueue {
    JobQueue::new(
        config,
        processor,
        Arc::new(AlwaysAvailable),
        Arc::new(NoopSink),
    )
    .expect("Failed to start job queue")
}

pub fn queue_with_sink(
    config: &Config,
    processor: Arc<dyn JobProcessor>,
    sink: Arc<dyn RecordSink>,
) -> JobQueue {
    JobQueue::new(config, processor, Arc::new(AlwaysAvailable), sink)
        .expect("Failed to start job queue")
}
