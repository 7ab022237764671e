//! Job definitions and per-job runtime state

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use cron::Schedule;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Task function executed on each firing of a job
pub type JobTask =
    Arc<dyn Fn() -> Pin<Box<dyn Future<Output = Result<(), String>> + Send>> + Send + Sync>;

/// Options controlling how a job is scheduled and retried
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobOptions {
    /// Timezone for evaluating the cron expression. Falls back to the
    /// scheduler-wide timezone when absent.
    pub timezone: Option<String>,

    /// Start the job immediately after registration
    pub start_now: bool,

    /// Extra attempts after a failed execution
    pub max_retries: u32,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            timezone: None,
            start_now: false,
            max_retries: 3,
        }
    }
}

/// Counters and timestamps tracked per job
#[derive(Debug, Clone, Default)]
pub(crate) struct JobRuntime {
    /// Whether the job is scheduled to fire
    pub running: bool,

    /// Number of completed (successful) executions
    pub execution_count: u64,

    /// When the job was last triggered
    pub last_fire_time: Option<DateTime<Utc>>,

    /// When the scheduler will trigger the job next
    pub next_fire_time: Option<DateTime<Utc>>,

    /// When the job last completed successfully
    pub last_run: Option<DateTime<Utc>>,

    /// Error message of the most recent failed execution, cleared when a
    /// later execution succeeds
    pub last_error: Option<String>,

    /// Running mean duration of successful executions, in milliseconds
    pub avg_duration_ms: f64,
}

impl JobRuntime {
    /// Fold a successful execution into the counters
    pub fn record_success(&mut self, duration_ms: f64) {
        self.execution_count += 1;
        self.avg_duration_ms = ((self.avg_duration_ms * (self.execution_count - 1) as f64)
            + duration_ms)
            / self.execution_count as f64;
        self.last_run = Some(Utc::now());
        self.last_error = None;
    }
}

/// A registered job and everything its ticker needs
pub(crate) struct JobEntry {
    pub name: String,
    pub pattern: String,
    pub schedule: Schedule,
    pub timezone: Tz,
    pub options: JobOptions,
    pub task: JobTask,
    pub runtime: RwLock<JobRuntime>,

    /// Serializes executions so the same job never overlaps itself
    pub exec_guard: tokio::sync::Mutex<()>,

    /// Signal channel telling the ticker to stop, present while scheduled
    pub stop: Mutex<Option<watch::Sender<bool>>>,

    /// Handle of the ticker task, present after the job was started
    pub ticker: Mutex<Option<JoinHandle<()>>>,

    /// Bumped on every start; a superseded ticker must not touch the
    /// runtime state on its way out
    pub generation: AtomicU64,
}

impl JobEntry {
    pub fn new(
        name: &str,
        pattern: &str,
        schedule: Schedule,
        timezone: Tz,
        options: JobOptions,
        task: JobTask,
    ) -> Self {
        Self {
            name: name.to_string(),
            pattern: pattern.to_string(),
            schedule,
            timezone,
            options,
            task,
            runtime: RwLock::new(JobRuntime::default()),
            exec_guard: tokio::sync::Mutex::new(()),
            stop: Mutex::new(None),
            ticker: Mutex::new(None),
            generation: AtomicU64::new(0),
        }
    }

    /// Point-in-time view of this job
    pub fn status(&self) -> JobStatus {
        let runtime = self.runtime.read();
        JobStatus {
            name: self.name.clone(),
            pattern: self.pattern.clone(),
            running: runtime.running,
            next_fire_time: runtime.next_fire_time,
            last_fire_time: runtime.last_fire_time,
            execution_count: runtime.execution_count,
            last_run: runtime.last_run,
            last_error: runtime.last_error.clone(),
            average_execution_time_ms: runtime.avg_duration_ms,
        }
    }
}

/// Snapshot of a job's schedule and execution history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatus {
    /// Job name, unique within the scheduler
    pub name: String,

    /// Cron expression as registered
    pub pattern: String,

    /// Whether the job is scheduled to fire
    pub running: bool,

    /// Next scheduled trigger time
    pub next_fire_time: Option<DateTime<Utc>>,

    /// Most recent trigger time
    pub last_fire_time: Option<DateTime<Utc>>,

    /// Number of completed executions
    pub execution_count: u64,

    /// When the job last completed successfully
    pub last_run: Option<DateTime<Utc>>,

    /// Error of the most recent failed execution, cleared when a later
    /// execution succeeds
    pub last_error: Option<String>,

    /// Mean duration of successful executions, in milliseconds
    pub average_execution_time_ms: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = JobOptions::default();
        assert_eq!(options.timezone, None);
        assert!(!options.start_now);
        assert_eq!(options.max_retries, 3);
    }

    #[test]
    fn test_record_success_updates_running_mean() {
        let mut runtime = JobRuntime::default();
        runtime.record_success(100.0);
        runtime.record_success(200.0);

        assert_eq!(runtime.execution_count, 2);
        assert!((runtime.avg_duration_ms - 150.0).abs() < f64::EPSILON);
        assert!(runtime.last_run.is_some());
    }

    #[test]
    fn test_success_clears_last_error() {
        let mut runtime = JobRuntime {
            last_error: Some("boom".to_string()),
            ..JobRuntime::default()
        };
        runtime.record_success(10.0);
        assert_eq!(runtime.last_error, None);
    }
}
