use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Rough per-document memory footprint used to vet bulk uploads.
pub const ESTIMATED_MB_PER_DOCUMENT: u64 = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_max_concurrent_extractions")]
    pub max_concurrent_extractions: usize,
    #[serde(default = "default_max_files_per_upload")]
    pub max_files_per_upload: usize,
    /// Defaults to twice `max_files_per_upload` when absent.
    #[serde(default)]
    pub max_queue_size: Option<usize>,
    #[serde(default = "default_bulk_processing_threshold")]
    pub bulk_processing_threshold: usize,
    #[serde(default = "default_max_memory_mb")]
    pub max_memory_mb: u64,
    #[serde(default = "default_max_cpu_percent")]
    pub max_cpu_percent: f32,
    #[serde(default = "default_monitor_interval_secs")]
    pub monitor_interval_secs: u64,
    #[serde(default = "default_job_timeout_secs")]
    pub job_timeout_secs: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_demotion_backoff_ms")]
    pub demotion_backoff_ms: u64,
    #[serde(default = "default_job_ttl_hours")]
    pub job_ttl_hours: u64,
    #[serde(default = "default_min_pdf_text_chars")]
    pub min_pdf_text_chars: usize,
}

fn default_max_concurrent_extractions() -> usize {
    8
}

fn default_max_files_per_upload() -> usize {
    1000
}

fn default_bulk_processing_threshold() -> usize {
    100
}

fn default_max_memory_mb() -> u64 {
    4096
}

fn default_max_cpu_percent() -> f32 {
    80.0
}

fn default_monitor_interval_secs() -> u64 {
    5
}

fn default_job_timeout_secs() -> u64 {
    300
}

fn default_max_attempts() -> u32 {
    3
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_demotion_backoff_ms() -> u64 {
    5000
}

fn default_job_ttl_hours() -> u64 {
    24
}

fn default_min_pdf_text_chars() -> usize {
    100
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_concurrent_extractions: default_max_concurrent_extractions(),
            max_files_per_upload: default_max_files_per_upload(),
            max_queue_size: None,
            bulk_processing_threshold: default_bulk_processing_threshold(),
            max_memory_mb: default_max_memory_mb(),
            max_cpu_percent: default_max_cpu_percent(),
            monitor_interval_secs: default_monitor_interval_secs(),
            job_timeout_secs: default_job_timeout_secs(),
            max_attempts: default_max_attempts(),
            poll_interval_ms: default_poll_interval_ms(),
            demotion_backoff_ms: default_demotion_backoff_ms(),
            job_ttl_hours: default_job_ttl_hours(),
            min_pdf_text_chars: default_min_pdf_text_chars(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingMode {
    Synchronous,
    Asynchronous,
}

impl Config {
    /// Worker threads to start: capped by configuration, at least two, and
    /// leaving one CPU for the rest of the process.
    pub fn worker_count(&self) -> usize {
        let cpus = num_cpus::get();
        self.max_concurrent_extractions
            .min(cpus.saturating_sub(1).max(2))
            .max(1)
    }

    pub fn queue_capacity(&self) -> usize {
        self.max_queue_size
            .unwrap_or(self.max_files_per_upload.saturating_mul(2))
    }

    pub fn job_timeout(&self) -> Duration {
        Duration::from_secs(self.job_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn demotion_backoff(&self) -> Duration {
        Duration::from_millis(self.demotion_backoff_ms)
    }

    pub fn monitor_interval(&self) -> Duration {
        Duration::from_secs(self.monitor_interval_secs)
    }

    pub fn job_ttl(&self) -> Duration {
        Duration::from_secs(self.job_ttl_hours * 3600)
    }

    /// Checks whether an upload of `file_count` documents may be accepted at all.
    pub fn validate_bulk_upload_request(&self, file_count: usize) -> Result<(), ConfigError> {
        if file_count == 0 {
            return Err(ConfigError::Validation {
                message: "No files to process".to_string(),
            });
        }

        if file_count > self.max_files_per_upload {
            return Err(ConfigError::Validation {
                message: format!(
                    "Too many files. Maximum {} allowed",
                    self.max_files_per_upload
                ),
            });
        }

        let estimated_mb = file_count as u64 * ESTIMATED_MB_PER_DOCUMENT;
        if estimated_mb > self.max_memory_mb {
            return Err(ConfigError::Validation {
                message: format!(
                    "Estimated memory usage ({}MB) exceeds limit ({}MB)",
                    estimated_mb, self.max_memory_mb
                ),
            });
        }

        Ok(())
    }

    pub fn processing_mode(&self, file_count: usize) -> ProcessingMode {
        if file_count <= self.bulk_processing_threshold {
            ProcessingMode::Synchronous
        } else {
            ProcessingMode::Asynchronous
        }
    }
}
