use std::cmp::Ordering as CmpOrdering;
use std::collections::{BinaryHeap, HashMap};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{JobError, QueueError};
use crate::monitor::{AdmissionCheck, ResourceMonitor};
use crate::queue::job::{
    CompletedJob, FailedJob, JobState, ProcessingJob, SubmittedFile, DEFAULT_BATCH_PRIORITY,
};
use crate::queue::processor::{JobProcessor, RecordProcessor, RecordSink};
use crate::queue::status::{BatchResults, BatchStatus, QueueStatus};
use crate::record::ProcessedRecord;

/// Heap entry ordered so the lowest `(priority, seq)` pops first.
struct QueuedJob {
    priority: u32,
    seq: u64,
    job: ProcessingJob,
}

impl PartialEq for QueuedJob {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}

impl Eq for QueuedJob {}

impl PartialOrd for QueuedJob {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedJob {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        (other.priority, other.seq).cmp(&(self.priority, self.seq))
    }
}

#[derive(Default)]
struct QueueState {
    queued: BinaryHeap<QueuedJob>,
    next_seq: u64,
    active: HashMap<String, ProcessingJob>,
    completed: HashMap<String, CompletedJob>,
    failed: HashMap<String, FailedJob>,
    /// Known batches and whether they were cancelled.
    batches: HashMap<String, bool>,
}

impl QueueState {
    fn push(&mut self, mut job: ProcessingJob) {
        job.state = JobState::Queued;
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queued.push(QueuedJob {
            priority: job.priority,
            seq,
            job,
        });
    }

    fn is_cancelled(&self, batch_id: &str) -> bool {
        self.batches.get(batch_id).copied().unwrap_or(false)
    }

    fn fail(&mut self, mut job: ProcessingJob, error: String) {
        job.state = JobState::Failed;
        self.failed.insert(
            job.job_id.clone(),
            FailedJob {
                job,
                error,
                failed_at: Utc::now(),
            },
        );
    }

    fn batch_status(&self, batch_id: &str) -> Option<BatchStatus> {
        let cancelled = *self.batches.get(batch_id)?;

        let queued = self
            .queued
            .iter()
            .filter(|entry| entry.job.batch_id == batch_id)
            .count();
        let active = self
            .active
            .values()
            .filter(|job| job.batch_id == batch_id)
            .count();
        let completed = self
            .completed
            .values()
            .filter(|done| done.job.batch_id == batch_id)
            .count();
        let failed = self
            .failed
            .values()
            .filter(|failure| failure.job.batch_id == batch_id)
            .count();

        Some(BatchStatus::from_counts(
            batch_id, completed, failed, active, queued, cancelled,
        ))
    }
}

/// State shared between the queue handle and its workers.
struct Shared {
    state: Mutex<QueueState>,
    /// Signalled when a job is queued or on shutdown.
    work_available: Condvar,
    /// Signalled whenever a job reaches a terminal state, and on shutdown.
    progress: Condvar,
    shutdown: AtomicBool,
    /// Set once a drain starts; new submissions are refused from then on.
    draining: AtomicBool,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("Queue state lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    fn is_accepting(&self) -> bool {
        !self.is_shutdown() && !self.draining.load(Ordering::Relaxed)
    }

    /// Waits up to `poll` for a job and moves it to active in the same
    /// critical section. Queued jobs of cancelled batches are failed here.
    fn next_job(&self, poll: Duration) -> Option<ProcessingJob> {
        let mut state = self.lock();
        let deadline = Instant::now() + poll;

        loop {
            if self.is_shutdown() {
                return None;
            }

            if let Some(entry) = state.queued.pop() {
                let mut job = entry.job;
                if state.is_cancelled(&job.batch_id) {
                    state.fail(job, JobError::Cancelled.to_string());
                    self.progress.notify_all();
                    continue;
                }
                job.state = JobState::Active;
                state.active.insert(job.job_id.clone(), job.clone());
                return Some(job);
            }

            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            state = match self.work_available.wait_timeout(state, deadline - now) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
    }

    /// Puts an active job back at `priority + 1` without counting an attempt.
    fn demote(&self, job_id: &str) {
        let mut state = self.lock();
        let Some(mut job) = state.active.remove(job_id) else {
            return;
        };

        if state.is_cancelled(&job.batch_id) {
            state.fail(job, JobError::Cancelled.to_string());
            self.progress.notify_all();
            return;
        }

        job.demotions += 1;
        job.priority = job.priority.saturating_add(1);
        state.push(job);
        self.work_available.notify_one();
    }

    fn complete(&self, job_id: &str, result: ProcessedRecord) {
        let mut state = self.lock();
        let Some(mut job) = state.active.remove(job_id) else {
            return;
        };

        job.state = JobState::Completed;
        state.completed.insert(
            job.job_id.clone(),
            CompletedJob {
                job,
                result,
                completed_at: Utc::now(),
            },
        );
        self.progress.notify_all();
    }

    /// Records a failed attempt: requeue at `priority + attempts` while the
    /// error is retryable and attempts remain, otherwise fail permanently.
    fn fail_attempt(&self, job_id: &str, error: JobError) {
        let mut state = self.lock();
        let Some(mut job) = state.active.remove(job_id) else {
            return;
        };

        job.attempts += 1;
        warn!(
            "Job {} ({}) failed (attempt {}/{}): {}",
            job.job_id, job.filename, job.attempts, job.max_attempts, error
        );

        if error.is_retryable() && job.can_retry() && !state.is_cancelled(&job.batch_id) {
            job.priority = job.priority.saturating_add(job.attempts);
            state.push(job);
            self.work_available.notify_one();
            return;
        }

        state.fail(job, error.to_string());
        self.progress.notify_all();
    }

    /// Sleeps for `duration` unless shutdown is requested first.
    fn backoff(&self, duration: Duration) {
        let deadline = Instant::now() + duration;
        let mut state = self.lock();
        while !self.is_shutdown() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            // Waits on `progress` so job wakeups on `work_available` reach idle workers.
            state = match self.progress.wait_timeout(state, deadline - now) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
    }
}

/// Settings each worker needs, copied out of [`Config`].
#[derive(Clone, Copy)]
struct WorkerSettings {
    poll_interval: Duration,
    job_timeout: Duration,
    demotion_backoff: Duration,
}

/// Bounded priority queue of parsing jobs served by a fixed worker pool.
pub struct JobQueue {
    shared: Arc<Shared>,
    admission: Arc<dyn AdmissionCheck>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    worker_count: usize,
    capacity: usize,
    max_attempts: u32,
}

impl JobQueue {
    /// Starts `config.worker_count()` workers immediately.
    pub fn new(
        config: &Config,
        processor: Arc<dyn JobProcessor>,
        admission: Arc<dyn AdmissionCheck>,
        sink: Arc<dyn RecordSink>,
    ) -> Result<Self, QueueError> {
        let worker_count = config.worker_count();
        let settings = WorkerSettings {
            poll_interval: config.poll_interval(),
            job_timeout: config.job_timeout(),
            demotion_backoff: config.demotion_backoff(),
        };

        let shared = Arc::new(Shared {
            state: Mutex::new(QueueState::default()),
            work_available: Condvar::new(),
            progress: Condvar::new(),
            shutdown: AtomicBool::new(false),
            draining: AtomicBool::new(false),
        });

        let mut workers = Vec::with_capacity(worker_count);
        for worker_id in 0..worker_count {
            let worker_shared = Arc::clone(&shared);
            let worker_processor = Arc::clone(&processor);
            let worker_admission = Arc::clone(&admission);
            let worker_sink = Arc::clone(&sink);

            let spawned = thread::Builder::new()
                .name(format!("cvparse-worker-{}", worker_id))
                .spawn(move || {
                    run_worker(
                        worker_id,
                        worker_shared,
                        worker_processor,
                        worker_admission,
                        worker_sink,
                        settings,
                    );
                });

            match spawned {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    shared.shutdown.store(true, Ordering::Relaxed);
                    shared.work_available.notify_all();
                    for handle in workers {
                        let _ = handle.join();
                    }
                    return Err(QueueError::SpawnFailed(e.to_string()));
                }
            }
        }

        info!("Started {} workers", worker_count);

        Ok(Self {
            shared,
            admission,
            workers: Mutex::new(workers),
            worker_count,
            capacity: config.queue_capacity(),
            max_attempts: config.max_attempts,
        })
    }

    /// Production wiring: a [`RecordProcessor`] gated by a running
    /// [`ResourceMonitor`].
    pub fn from_config(config: &Config, sink: Arc<dyn RecordSink>) -> Result<Self, QueueError> {
        let monitor = ResourceMonitor::from_config(config);
        monitor
            .start()
            .map_err(|e| QueueError::SpawnFailed(e.to_string()))?;

        Self::new(
            config,
            Arc::new(RecordProcessor::from_config(config)),
            Arc::new(monitor),
            sink,
        )
    }

    /// Submits `files` as one batch at the default batch priority.
    /// Returns how many were accepted; submission stops at the first
    /// file that does not fit.
    pub fn submit(&self, batch_id: &str, files: Vec<SubmittedFile>) -> usize {
        self.submit_with_priority(batch_id, files, DEFAULT_BATCH_PRIORITY)
    }

    pub fn submit_with_priority(
        &self,
        batch_id: &str,
        files: Vec<SubmittedFile>,
        priority: u32,
    ) -> usize {
        if !self.shared.is_accepting() {
            return 0;
        }

        let requested = files.len();
        let mut state = self.shared.lock();
        let mut accepted = 0;

        for file in files {
            if state.queued.len() >= self.capacity {
                break;
            }
            let job = ProcessingJob::new(batch_id, file, priority, self.max_attempts);
            state.batches.entry(job.batch_id.clone()).or_insert(false);
            state.push(job);
            accepted += 1;
        }
        drop(state);

        if accepted > 0 {
            self.shared.work_available.notify_all();
        }
        if accepted < requested {
            warn!(
                "Batch {}: queue full, accepted {} of {} files",
                batch_id, accepted, requested
            );
        } else {
            info!("Batch {}: queued {} files", batch_id, accepted);
        }
        accepted
    }

    /// Queues a single prepared job.
    pub fn submit_job(&self, job: ProcessingJob) -> Result<(), QueueError> {
        if !self.shared.is_accepting() {
            return Err(QueueError::ShutDown);
        }

        let mut state = self.shared.lock();
        if state.queued.len() >= self.capacity {
            return Err(QueueError::QueueFull {
                capacity: self.capacity,
            });
        }
        state.batches.entry(job.batch_id.clone()).or_insert(false);
        state.push(job);
        drop(state);

        self.shared.work_available.notify_one();
        Ok(())
    }

    pub fn get_batch_status(&self, batch_id: &str) -> Option<BatchStatus> {
        self.shared.lock().batch_status(batch_id)
    }

    pub fn get_queue_status(&self) -> QueueStatus {
        let state = self.shared.lock();
        QueueStatus {
            queue_size: state.queued.len(),
            active: state.active.len(),
            completed: state.completed.len(),
            failed: state.failed.len(),
            max_queue_size: self.capacity,
            worker_count: self.worker_count,
            resource_stats: self.admission.stats(),
        }
    }

    /// Cancels a batch. Its queued jobs fail immediately with a cancellation
    /// reason; active jobs run to completion but are not retried. Returns the
    /// number of queued jobs cancelled, or `None` for an unknown batch.
    pub fn cancel_batch(&self, batch_id: &str) -> Option<usize> {
        let mut state = self.shared.lock();
        *state.batches.get_mut(batch_id)? = true;

        let (cancelled, kept): (Vec<QueuedJob>, Vec<QueuedJob>) =
            std::mem::take(&mut state.queued)
                .into_iter()
                .partition(|entry| entry.job.batch_id == batch_id);
        state.queued = kept.into_iter().collect();

        let count = cancelled.len();
        for entry in cancelled {
            state.fail(entry.job, JobError::Cancelled.to_string());
        }
        drop(state);

        self.shared.progress.notify_all();
        info!("Batch {}: cancelled {} queued jobs", batch_id, count);
        Some(count)
    }

    pub fn failed_job(&self, job_id: &str) -> Option<FailedJob> {
        self.shared.lock().failed.get(job_id).cloned()
    }

    /// Finished records and failures of a batch, oldest first.
    pub fn batch_results(&self, batch_id: &str) -> Option<BatchResults> {
        let state = self.shared.lock();
        if !state.batches.contains_key(batch_id) {
            return None;
        }

        let mut completed: Vec<&CompletedJob> = state
            .completed
            .values()
            .filter(|done| done.job.batch_id == batch_id)
            .collect();
        completed.sort_by_key(|done| done.completed_at);

        let mut failures: Vec<FailedJob> = state
            .failed
            .values()
            .filter(|failure| failure.job.batch_id == batch_id)
            .cloned()
            .collect();
        failures.sort_by_key(|failure| failure.failed_at);

        Some(BatchResults {
            batch_id: batch_id.to_string(),
            records: completed.into_iter().map(|done| done.result.clone()).collect(),
            failures,
        })
    }

    /// Drops completed and failed jobs that finished more than `max_age`
    /// ago, and batches left with no jobs. Returns the number of jobs removed.
    pub fn cleanup_old_jobs(&self, max_age: Duration) -> usize {
        let cutoff: Option<DateTime<Utc>> = chrono::Duration::from_std(max_age)
            .ok()
            .and_then(|age| Utc::now().checked_sub_signed(age));
        let Some(cutoff) = cutoff else {
            return 0;
        };

        let mut state = self.shared.lock();
        let before = state.completed.len() + state.failed.len();
        state.completed.retain(|_, done| done.completed_at > cutoff);
        state.failed.retain(|_, failure| failure.failed_at > cutoff);
        let removed = before - (state.completed.len() + state.failed.len());

        let QueueState {
            queued,
            active,
            completed,
            failed,
            batches,
            ..
        } = &mut *state;
        batches.retain(|batch_id, _| {
            queued.iter().any(|entry| &entry.job.batch_id == batch_id)
                || active.values().any(|job| &job.batch_id == batch_id)
                || completed.values().any(|done| &done.job.batch_id == batch_id)
                || failed.values().any(|failure| &failure.job.batch_id == batch_id)
        });

        if removed > 0 {
            info!("Cleaned up {} finished jobs", removed);
        }
        removed
    }

    /// Blocks until every job of the batch is finished or `timeout` passes.
    /// Returns the last observed status, or `None` for an unknown batch.
    pub fn wait_for_batch(&self, batch_id: &str, timeout: Duration) -> Option<BatchStatus> {
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.lock();

        loop {
            let status = state.batch_status(batch_id)?;
            let now = Instant::now();
            if status.is_done() || now >= deadline || self.shared.is_shutdown() {
                return Some(status);
            }
            state = match self.shared.progress.wait_timeout(state, deadline - now) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    pub fn is_shutdown(&self) -> bool {
        self.shared.is_shutdown()
    }

    pub fn is_draining(&self) -> bool {
        self.shared.draining.load(Ordering::Relaxed)
    }

    /// Refuses new submissions, waits up to `timeout` for every queued and
    /// active job to reach a terminal state, then calls [`Self::shutdown`].
    /// Returns true if nothing was left unfinished.
    pub fn shutdown_after_drain(&self, timeout: Duration) -> bool {
        self.shared.draining.store(true, Ordering::Relaxed);
        info!("Draining job queue...");

        let deadline = Instant::now() + timeout;
        let drained = {
            let mut state = self.shared.lock();
            loop {
                if state.queued.is_empty() && state.active.is_empty() {
                    break true;
                }
                let now = Instant::now();
                if now >= deadline || self.shared.is_shutdown() {
                    warn!(
                        "Stopping with {} queued and {} active jobs unfinished",
                        state.queued.len(),
                        state.active.len()
                    );
                    break false;
                }
                state = match self.shared.progress.wait_timeout(state, deadline - now) {
                    Ok((guard, _)) => guard,
                    Err(poisoned) => poisoned.into_inner().0,
                };
            }
        };

        self.shutdown();
        drained
    }

    /// Stops the workers after their current job, stops the admission
    /// check's background sampling and joins every thread. Queued jobs stay
    /// queued; see [`Self::shutdown_after_drain`] to finish them first.
    /// Idempotent.
    pub fn shutdown(&self) {
        if self.shared.shutdown.swap(true, Ordering::Relaxed) {
            return;
        }
        info!("Shutting down job queue...");

        // Take the lock so no worker misses the wakeup between its check and its wait.
        drop(self.shared.lock());
        self.shared.work_available.notify_all();
        self.shared.progress.notify_all();

        let workers = match self.workers.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };
        for (i, worker) in workers.into_iter().enumerate() {
            if let Err(e) = worker.join() {
                error!("Worker {} panicked: {:?}", i, e);
            } else {
                debug!("Worker {} finished", i);
            }
        }

        self.admission.stop();
        info!("All workers have stopped");
    }
}

impl Drop for JobQueue {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_worker(
    worker_id: usize,
    shared: Arc<Shared>,
    processor: Arc<dyn JobProcessor>,
    admission: Arc<dyn AdmissionCheck>,
    sink: Arc<dyn RecordSink>,
    settings: WorkerSettings,
) {
    debug!("Worker {} started", worker_id);

    loop {
        if shared.is_shutdown() {
            debug!("Worker {} received shutdown signal", worker_id);
            break;
        }

        let Some(job) = shared.next_job(settings.poll_interval) else {
            continue;
        };

        if let Err(reason) = admission.check_availability() {
            info!("Deferring job {}: {}", job.job_id, reason);
            shared.demote(&job.job_id);
            shared.backoff(settings.demotion_backoff);
            continue;
        }

        debug!("Worker {} processing job {} ({})", worker_id, job.job_id, job.filename);
        match run_job(processor.as_ref(), &job, settings.job_timeout) {
            Ok(record) => {
                if let Err(e) = sink.deliver(&record) {
                    error!("Record sink failed for job {}: {}", job.job_id, e);
                }
                info!("Completed job {}: {}", job.job_id, job.filename);
                shared.complete(&job.job_id, record);
            }
            Err(e) => shared.fail_attempt(&job.job_id, e),
        }
    }

    debug!("Worker {} stopped", worker_id);
}

/// Runs the processor with panics contained and the time limit applied.
fn run_job(
    processor: &dyn JobProcessor,
    job: &ProcessingJob,
    limit: Duration,
) -> Result<ProcessedRecord, JobError> {
    let started = Instant::now();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| processor.process(job)));
    let elapsed = started.elapsed();

    match outcome {
        Ok(_) if elapsed > limit => Err(JobError::Timeout { elapsed, limit }),
        Ok(result) => result,
        Err(_) => Err(JobError::Processing("processor panicked".to_string())),
    }
}
