//! System memory and CPU sampling for bulk processing.
//!
//! A background thread samples every `monitor_interval` and keeps peak and
//! running-average statistics. Admission checks read memory through a
//! separate `System` and reuse its last CPU reading until a fresh one is due,
//! so a check never sleeps.

use std::sync::{Arc, Mutex, RwLock};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use crossbeam_channel::{bounded, select, tick, Sender};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use sysinfo::{System, MINIMUM_CPU_UPDATE_INTERVAL};

use crate::config::Config;
use crate::error::ResourceUnavailable;

/// Fraction of the memory ceiling above which a sample counts as memory pressure.
pub const MEMORY_PRESSURE_RATIO: f64 = 0.8;

const BYTES_PER_MB: u64 = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceLimits {
    pub max_memory_mb: u64,
    pub max_cpu_percent: f32,
}

impl ResourceLimits {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_memory_mb: config.max_memory_mb,
            max_cpu_percent: config.max_cpu_percent,
        }
    }

    /// Checks a snapshot against the limits; memory is checked first.
    pub fn evaluate(&self, snapshot: &ResourceSnapshot) -> Result<(), ResourceUnavailable> {
        if snapshot.memory_used_mb > self.max_memory_mb {
            return Err(ResourceUnavailable::Memory {
                used_mb: snapshot.memory_used_mb,
                limit_mb: self.max_memory_mb,
            });
        }
        if snapshot.cpu_percent > self.max_cpu_percent {
            return Err(ResourceUnavailable::Cpu {
                percent: snapshot.cpu_percent,
                limit: self.max_cpu_percent,
            });
        }
        Ok(())
    }

    fn under_pressure(&self, snapshot: &ResourceSnapshot) -> bool {
        snapshot.memory_used_mb as f64 > self.max_memory_mb as f64 * MEMORY_PRESSURE_RATIO
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    pub memory_used_mb: u64,
    pub cpu_percent: f32,
    pub taken_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceStats {
    pub peak_memory_mb: u64,
    pub peak_cpu_percent: f32,
    pub average_memory_mb: f64,
    pub average_cpu_percent: f64,
    pub sample_count: u64,
    pub pressure_events: u64,
    pub last: Option<ResourceSnapshot>,
}

impl ResourceStats {
    /// Folds one sample into the statistics. Returns true if the sample
    /// was above the memory-pressure threshold.
    pub fn record(&mut self, snapshot: ResourceSnapshot, limits: &ResourceLimits) -> bool {
        self.sample_count += 1;
        self.peak_memory_mb = self.peak_memory_mb.max(snapshot.memory_used_mb);
        self.peak_cpu_percent = self.peak_cpu_percent.max(snapshot.cpu_percent);

        let n = self.sample_count as f64;
        self.average_memory_mb += (snapshot.memory_used_mb as f64 - self.average_memory_mb) / n;
        self.average_cpu_percent += (snapshot.cpu_percent as f64 - self.average_cpu_percent) / n;
        self.last = Some(snapshot);

        let pressure = limits.under_pressure(&snapshot);
        if pressure {
            self.pressure_events += 1;
        }
        pressure
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorState {
    Stopped,
    Monitoring,
}

/// Gate consulted by queue workers before processing a job.
pub trait AdmissionCheck: Send + Sync {
    fn check_availability(&self) -> Result<(), ResourceUnavailable>;

    /// Latest statistics, if this check keeps any.
    fn stats(&self) -> Option<ResourceStats> {
        None
    }

    /// Stops any background sampling. Called when the queue shuts down.
    fn stop(&self) {}
}

/// Admits everything. Used when resource gating is not wanted.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysAvailable;

impl AdmissionCheck for AlwaysAvailable {
    fn check_availability(&self) -> Result<(), ResourceUnavailable> {
        Ok(())
    }
}

/// One `sysinfo::System` plus its last CPU reading. CPU usage is a delta
/// between two refreshes at least `MINIMUM_CPU_UPDATE_INTERVAL` apart; a
/// reading younger than that is reused.
struct Sampler {
    system: System,
    cpu_percent: Option<f32>,
    cpu_refreshed_at: Instant,
}

impl Sampler {
    fn new() -> Self {
        let mut system = System::new();
        system.refresh_cpu_usage();
        Self {
            system,
            cpu_percent: None,
            cpu_refreshed_at: Instant::now(),
        }
    }

    /// Waits out the first CPU interval. Only for a thread that owns its sampler.
    fn warm_up(&mut self) {
        if self.cpu_percent.is_none() {
            let elapsed = self.cpu_refreshed_at.elapsed();
            thread::sleep(MINIMUM_CPU_UPDATE_INTERVAL.saturating_sub(elapsed));
        }
    }

    /// Never sleeps. Until the first CPU delta exists the reading falls back
    /// to `cpu_fallback`, then to zero.
    fn sample(
        &mut self,
        cpu_fallback: Option<f32>,
    ) -> Result<ResourceSnapshot, ResourceUnavailable> {
        self.system.refresh_memory();
        if self.system.total_memory() == 0 {
            return Err(ResourceUnavailable::Probe(
                "memory information unavailable".to_string(),
            ));
        }

        if self.cpu_refreshed_at.elapsed() >= MINIMUM_CPU_UPDATE_INTERVAL {
            self.system.refresh_cpu_usage();
            self.cpu_refreshed_at = Instant::now();
            self.cpu_percent = Some(self.system.global_cpu_usage());
        }

        Ok(ResourceSnapshot {
            memory_used_mb: self.system.used_memory() / BYTES_PER_MB,
            cpu_percent: self.cpu_percent.or(cpu_fallback).unwrap_or(0.0),
            taken_at: Utc::now(),
        })
    }
}

struct Running {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

pub struct ResourceMonitor {
    limits: ResourceLimits,
    interval: Duration,
    stats: Arc<RwLock<ResourceStats>>,
    admission: Mutex<Sampler>,
    running: Mutex<Option<Running>>,
}

impl ResourceMonitor {
    pub fn new(limits: ResourceLimits, interval: Duration) -> Self {
        Self {
            limits,
            interval,
            stats: Arc::new(RwLock::new(ResourceStats::default())),
            admission: Mutex::new(Sampler::new()),
            running: Mutex::new(None),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(ResourceLimits::from_config(config), config.monitor_interval())
    }

    pub fn limits(&self) -> ResourceLimits {
        self.limits
    }

    /// Starts the sampling thread. Calling it while already monitoring is a no-op.
    pub fn start(&self) -> std::io::Result<()> {
        let mut running = self.lock_running();
        if running.is_some() {
            return Ok(());
        }

        let (stop_tx, stop_rx) = bounded::<()>(1);
        let stats = Arc::clone(&self.stats);
        let limits = self.limits;
        let interval = self.interval;

        let handle = thread::Builder::new()
            .name("resource-monitor".to_string())
            .spawn(move || {
                let mut sampler = Sampler::new();
                sampler.warm_up();
                let ticker = tick(interval);
                debug!("Resource monitor started (interval {:?})", interval);

                sample_into(&mut sampler, &stats, &limits);
                loop {
                    select! {
                        recv(stop_rx) -> _ => break,
                        recv(ticker) -> _ => sample_into(&mut sampler, &stats, &limits),
                    }
                }

                debug!("Resource monitor stopped");
            })?;

        *running = Some(Running {
            stop: stop_tx,
            handle,
        });
        info!(
            "Resource monitoring started (memory limit {}MB, CPU limit {:.1}%)",
            self.limits.max_memory_mb, self.limits.max_cpu_percent
        );
        Ok(())
    }

    /// Stops and joins the sampling thread. Stopping a stopped monitor is a no-op.
    pub fn stop(&self) {
        let Some(running) = self.lock_running().take() else {
            return;
        };

        // The receiver may already be gone if the thread exited on its own.
        let _ = running.stop.send(());
        if running.handle.join().is_err() {
            error!("Resource monitor thread panicked");
        }
        info!("Resource monitoring stopped");
    }

    pub fn state(&self) -> MonitorState {
        if self.lock_running().is_some() {
            MonitorState::Monitoring
        } else {
            MonitorState::Stopped
        }
    }

    pub fn stats(&self) -> ResourceStats {
        match self.stats.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => {
                warn!("Resource stats lock was poisoned, recovering");
                poisoned.into_inner().clone()
            }
        }
    }

    /// Samples memory and checks it, with the latest CPU reading, against
    /// the limits. The lock covers only the refresh itself.
    pub fn check_availability(&self) -> Result<(), ResourceUnavailable> {
        let cpu_fallback = self.stats().last.map(|last| last.cpu_percent);
        let snapshot = {
            let mut sampler = self
                .admission
                .lock()
                .map_err(|_| ResourceUnavailable::Probe("admission sampler poisoned".to_string()))?;
            sampler.sample(cpu_fallback)?
        };
        self.limits.evaluate(&snapshot)
    }

    fn lock_running(&self) -> std::sync::MutexGuard<'_, Option<Running>> {
        match self.running.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("Resource monitor state lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}

impl AdmissionCheck for ResourceMonitor {
    fn check_availability(&self) -> Result<(), ResourceUnavailable> {
        ResourceMonitor::check_availability(self)
    }

    fn stats(&self) -> Option<ResourceStats> {
        Some(ResourceMonitor::stats(self))
    }

    fn stop(&self) {
        ResourceMonitor::stop(self)
    }
}

impl Drop for ResourceMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

fn sample_into(sampler: &mut Sampler, stats: &RwLock<ResourceStats>, limits: &ResourceLimits) {
    let snapshot = match sampler.sample(None) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            warn!("Resource sample failed: {}", e);
            return;
        }
    };

    let pressure = match stats.write() {
        Ok(mut guard) => guard.record(snapshot, limits),
        Err(poisoned) => poisoned.into_inner().record(snapshot, limits),
    };
    if pressure {
        warn!(
            "Memory pressure: {}MB used of {}MB limit",
            snapshot.memory_used_mb, limits.max_memory_mb
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(memory_used_mb: u64, cpu_percent: f32) -> ResourceSnapshot {
        ResourceSnapshot {
            memory_used_mb,
            cpu_percent,
            taken_at: Utc::now(),
        }
    }

    fn limits() -> ResourceLimits {
        ResourceLimits {
            max_memory_mb: 1000,
            max_cpu_percent: 80.0,
        }
    }

    #[test]
    fn test_evaluate_names_exceeded_limit() {
        assert_eq!(limits().evaluate(&snapshot(500, 10.0)), Ok(()));
        assert_eq!(
            limits().evaluate(&snapshot(1500, 95.0)),
            Err(ResourceUnavailable::Memory {
                used_mb: 1500,
                limit_mb: 1000
            })
        );
        assert_eq!(
            limits().evaluate(&snapshot(500, 95.0)),
            Err(ResourceUnavailable::Cpu {
                percent: 95.0,
                limit: 80.0
            })
        );
    }

    #[test]
    fn test_stats_peaks_and_averages() {
        let mut stats = ResourceStats::default();
        assert!(!stats.record(snapshot(200, 10.0), &limits()));
        assert!(!stats.record(snapshot(400, 30.0), &limits()));
        assert!(stats.record(snapshot(900, 20.0), &limits()));

        assert_eq!(stats.sample_count, 3);
        assert_eq!(stats.peak_memory_mb, 900);
        assert_eq!(stats.peak_cpu_percent, 30.0);
        assert!((stats.average_memory_mb - 500.0).abs() < 1e-9);
        assert!((stats.average_cpu_percent - 20.0).abs() < 1e-6);
        assert_eq!(stats.pressure_events, 1);
        assert_eq!(stats.last.map(|s| s.memory_used_mb), Some(900));
    }

    #[test]
    fn test_start_stop_state_machine() {
        let monitor = ResourceMonitor::new(limits(), Duration::from_millis(50));
        assert_eq!(monitor.state(), MonitorState::Stopped);

        monitor.start().unwrap();
        monitor.start().unwrap();
        assert_eq!(monitor.state(), MonitorState::Monitoring);

        // The first sample is taken as soon as the thread starts.
        let deadline = Instant::now() + Duration::from_secs(5);
        while monitor.stats().sample_count == 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(20));
        }
        assert!(monitor.stats().sample_count >= 1);

        monitor.stop();
        assert_eq!(monitor.state(), MonitorState::Stopped);
        monitor.stop();
    }

    #[test]
    fn test_check_availability_against_live_system() {
        let generous = ResourceMonitor::new(
            ResourceLimits {
                max_memory_mb: u64::MAX,
                max_cpu_percent: 101.0,
            },
            Duration::from_secs(5),
        );
        assert_eq!(generous.check_availability(), Ok(()));

        let starved = ResourceMonitor::new(
            ResourceLimits {
                max_memory_mb: 0,
                max_cpu_percent: 101.0,
            },
            Duration::from_secs(5),
        );
        assert!(matches!(
            starved.check_availability(),
            Err(ResourceUnavailable::Memory { limit_mb: 0, .. })
        ));
    }

    #[test]
    fn test_concurrent_admission_checks_do_not_queue_behind_each_other() {
        let monitor = Arc::new(ResourceMonitor::new(
            ResourceLimits {
                max_memory_mb: u64::MAX,
                max_cpu_percent: 101.0,
            },
            Duration::from_secs(5),
        ));

        let started = Instant::now();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let monitor = Arc::clone(&monitor);
                thread::spawn(move || {
                    for _ in 0..5 {
                        assert_eq!(monitor.check_availability(), Ok(()));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        // Forty checks serialised behind a CPU wait would take seconds.
        assert!(
            started.elapsed() < Duration::from_secs(1),
            "checks took {:?}",
            started.elapsed()
        );
    }

    #[test]
    fn test_cpu_reading_refreshes_after_minimum_interval() {
        let mut sampler = Sampler::new();
        assert_eq!(sampler.sample(Some(42.0)).unwrap().cpu_percent, 42.0);
        assert_eq!(sampler.sample(None).unwrap().cpu_percent, 0.0);

        sampler.warm_up();
        thread::sleep(Duration::from_millis(5));
        let first = sampler.sample(Some(42.0)).unwrap();
        assert_eq!(sampler.cpu_percent, Some(first.cpu_percent));

        let refreshed_at = sampler.cpu_refreshed_at;
        sampler.sample(None).unwrap();
        assert_eq!(sampler.cpu_refreshed_at, refreshed_at);
    }

    #[test]
    fn test_always_available() {
        assert_eq!(AlwaysAvailable.check_availability(), Ok(()));
        assert!(AlwaysAvailable.stats().is_none());
    }
}
