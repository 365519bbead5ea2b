use serde::{Deserialize, Serialize};

use crate::monitor::ResourceStats;
use crate::queue::job::FailedJob;
use crate::record::ProcessedRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchState {
    Processing,
    Completed,
    Cancelled,
}

/// Per-batch counts. `completed + failed + active + queued == total` holds
/// for every value the queue hands out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchStatus {
    pub batch_id: String,
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub active: usize,
    pub queued: usize,
    pub progress_percentage: f64,
    pub status: BatchState,
}

impl BatchStatus {
    pub(crate) fn from_counts(
        batch_id: &str,
        completed: usize,
        failed: usize,
        active: usize,
        queued: usize,
        cancelled: bool,
    ) -> Self {
        let total = completed + failed + active + queued;
        let done = completed + failed == total;

        let status = if done {
            BatchState::Completed
        } else if cancelled {
            BatchState::Cancelled
        } else {
            BatchState::Processing
        };

        let progress_percentage = if total > 0 {
            completed as f64 / total as f64 * 100.0
        } else {
            0.0
        };

        Self {
            batch_id: batch_id.to_string(),
            total,
            completed,
            failed,
            active,
            queued,
            progress_percentage,
            status,
        }
    }

    /// No job of the batch is queued or running.
    pub fn is_done(&self) -> bool {
        self.completed + self.failed == self.total
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueStatus {
    pub queue_size: usize,
    pub active: usize,
    pub completed: usize,
    pub failed: usize,
    pub max_queue_size: usize,
    pub worker_count: usize,
    pub resource_stats: Option<ResourceStats>,
}

/// Everything a batch produced so far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResults {
    pub batch_id: String,
    pub records: Vec<ProcessedRecord>,
    pub failures: Vec<FailedJob>,
}
