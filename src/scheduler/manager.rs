//! Scheduler manager: cron job registry and per-job tickers

use std::future::Future;
use std::str::FromStr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use chrono_tz::Tz;
use cron::Schedule;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::config::SchedulerConfig;
use super::error::{SchedulerError, SchedulerResult};
use super::job::{JobEntry, JobOptions, JobStatus, JobTask};
use super::retry::run_with_retry;
use super::tasks;
use crate::metrics::BACKPLANE_METRICS;

/// How long shutdown waits for in-flight executions before aborting them
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Point-in-time scheduler statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerMetrics {
    pub enabled: bool,
    pub total_jobs: usize,
    pub running_jobs: usize,
    pub total_executions: u64,
    pub jobs: Vec<JobMetrics>,
}

/// Per-job statistics entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobMetrics {
    pub name: String,
    pub running: bool,
    pub executions: u64,
    pub last_run: Option<chrono::DateTime<Utc>>,
    pub next_run: Option<chrono::DateTime<Utc>>,
}

/// Cron job registry with one ticker task per started job.
///
/// Jobs are keyed by name; registering a name that already exists replaces
/// the previous job. A job never overlaps itself: the ticker awaits each
/// execution (including its retries) before computing the next fire time,
/// and fire times that pass while an execution drags are skipped.
pub struct SchedulerManager {
    config: SchedulerConfig,
    jobs: Arc<DashMap<String, Arc<JobEntry>>>,
}

impl SchedulerManager {
    /// Create a new scheduler manager with an empty registry.
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            jobs: Arc::new(DashMap::new()),
        }
    }

    /// Register and start the configured default jobs.
    pub async fn initialize(&self) -> SchedulerResult<()> {
        if !self.config.enabled {
            info!("Scheduler manager disabled");
            return Ok(());
        }

        tasks::mark_started();

        let defaults = self.config.jobs.clone();
        if defaults.health_check.enabled {
            self.add_job(
                "health_check",
                &defaults.health_check.schedule,
                JobOptions {
                    start_now: true,
                    ..JobOptions::default()
                },
                tasks::health_check,
            )?;
        }

        info!(jobs = self.jobs.len(), "Scheduler manager initialized");
        Ok(())
    }

    /// Stop all jobs, waiting briefly for in-flight executions, then clear
    /// the registry. Best-effort; never fails.
    pub async fn shutdown(&self) {
        let entries: Vec<Arc<JobEntry>> = self
            .jobs
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        let mut handles = Vec::new();
        for entry in &entries {
            if let Some(stop) = entry.stop.lock().take() {
                let _ = stop.send(true);
            }
            if let Some(handle) = entry.ticker.lock().take() {
                handles.push(handle);
            }
            entry.runtime.write().running = false;
        }

        if !handles.is_empty() {
            let aborts: Vec<_> = handles.iter().map(|handle| handle.abort_handle()).collect();
            let drained = tokio::time::timeout(SHUTDOWN_GRACE, futures::future::join_all(handles));
            if drained.await.is_err() {
                warn!("Graceful scheduler shutdown timed out, aborting remaining tickers");
                for abort in aborts {
                    abort.abort();
                }
            }
        }

        self.jobs.clear();
        info!("Scheduler manager shut down");
    }

    /// Register a job under a unique name. A job with the same name is
    /// stopped and replaced. The cron expression and timezone are validated
    /// here; the job stays stopped unless `start_now` is set.
    pub fn add_job<F, Fut>(
        &self,
        name: &str,
        pattern: &str,
        options: JobOptions,
        task: F,
    ) -> SchedulerResult<()>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), String>> + Send + 'static,
    {
        if !self.config.enabled {
            warn!(job = %name, "Scheduler disabled, job not registered");
            return Ok(());
        }

        let schedule = parse_schedule(pattern)?;
        let timezone = options
            .timezone
            .as_deref()
            .unwrap_or(&self.config.timezone)
            .parse::<Tz>()
            .map_err(|err| {
                SchedulerError::InvalidTimezone(format!(
                    "{}: {}",
                    options.timezone.as_deref().unwrap_or(&self.config.timezone),
                    err
                ))
            })?;

        if self.remove_job(name) {
            info!(job = %name, "Replacing existing job");
        }

        let start_now = options.start_now;
        let task: JobTask = Arc::new(move || Box::pin(task()));
        let entry = Arc::new(JobEntry::new(
            name, pattern, schedule, timezone, options, task,
        ));
        self.jobs.insert(name.to_string(), Arc::clone(&entry));

        info!(job = %name, pattern = %pattern, start_now, "Job registered");

        if start_now {
            Self::start_entry(&entry);
        }
        Ok(())
    }

    /// Remove a job. A running ticker is signalled to stop; an in-flight
    /// execution finishes on its own. Returns false for an unknown name.
    pub fn remove_job(&self, name: &str) -> bool {
        match self.jobs.remove(name) {
            Some((_, entry)) => {
                if let Some(stop) = entry.stop.lock().take() {
                    let _ = stop.send(true);
                }
                entry.runtime.write().running = false;
                info!(job = %name, "Job removed");
                true
            }
            None => false,
        }
    }

    /// Start a registered job. Idempotent for a job that is already
    /// running. Returns false for an unknown name.
    pub fn start_job(&self, name: &str) -> bool {
        match self.jobs.get(name) {
            Some(entry) => {
                let entry = Arc::clone(entry.value());
                if entry.runtime.read().running {
                    debug!(job = %name, "Job already running");
                    return true;
                }
                Self::start_entry(&entry);
                info!(job = %name, "Job started");
                true
            }
            None => false,
        }
    }

    /// Stop a job without removing it. No further firings start; an
    /// in-flight execution (including retries) completes. Returns false for
    /// an unknown name.
    pub fn stop_job(&self, name: &str) -> bool {
        match self.jobs.get(name) {
            Some(entry) => {
                if let Some(stop) = entry.stop.lock().take() {
                    let _ = stop.send(true);
                    info!(job = %name, "Job stopped");
                }
                let mut runtime = entry.runtime.write();
                runtime.running = false;
                runtime.next_fire_time = None;
                true
            }
            None => false,
        }
    }

    /// Trigger one execution immediately, going through the same guard as
    /// scheduled firings so the job still never overlaps itself. Exhausted
    /// retries surface as [`SchedulerError::ExecutionFailed`].
    pub async fn run_job_now(&self, name: &str) -> SchedulerResult<()> {
        let entry = self
            .jobs
            .get(name)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| SchedulerError::JobNotFound(name.to_string()))?;

        info!(job = %name, "Manual job trigger");
        Self::execute_entry(&entry)
            .await
            .map_err(SchedulerError::ExecutionFailed)
    }

    /// Status of one job, `None` for an unknown name.
    pub fn job_status(&self, name: &str) -> Option<JobStatus> {
        self.jobs.get(name).map(|entry| entry.value().status())
    }

    /// Statuses of all registered jobs, ordered by name.
    pub fn all_job_statuses(&self) -> Vec<JobStatus> {
        let mut statuses: Vec<JobStatus> = self
            .jobs
            .iter()
            .map(|entry| entry.value().status())
            .collect();
        statuses.sort_by(|a, b| a.name.cmp(&b.name));
        statuses
    }

    /// Names of all registered jobs.
    pub fn job_names(&self) -> Vec<String> {
        self.jobs.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Whether a job exists and is scheduled to fire.
    pub fn is_job_running(&self, name: &str) -> bool {
        self.jobs
            .get(name)
            .map(|entry| entry.value().runtime.read().running)
            .unwrap_or(false)
    }

    /// Snapshot of job counts and per-job execution history.
    pub fn metrics(&self) -> SchedulerMetrics {
        let statuses = self.all_job_statuses();
        SchedulerMetrics {
            enabled: self.config.enabled,
            total_jobs: statuses.len(),
            running_jobs: statuses.iter().filter(|s| s.running).count(),
            total_executions: statuses.iter().map(|s| s.execution_count).sum(),
            jobs: statuses
                .into_iter()
                .map(|status| JobMetrics {
                    name: status.name,
                    running: status.running,
                    executions: status.execution_count,
                    last_run: status.last_run,
                    next_run: status.next_fire_time,
                })
                .collect(),
        }
    }

    /// Spawn the ticker task for a job and mark it running. A superseded
    /// ticker is drained before the new one begins, so executions stay
    /// serialized and shutdown keeps a handle covering both.
    fn start_entry(entry: &Arc<JobEntry>) {
        let (stop_tx, stop_rx) = watch::channel(false);
        *entry.stop.lock() = Some(stop_tx);
        entry.runtime.write().running = true;

        let generation = entry.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let previous = entry.ticker.lock().take();
        let handle = tokio::spawn({
            let entry = Arc::clone(entry);
            async move {
                if let Some(previous) = previous {
                    let _ = previous.await;
                }
                Self::ticker_loop(entry, stop_rx, generation).await;
            }
        });
        *entry.ticker.lock() = Some(handle);
    }

    /// Sleep-until-fire loop for one job. Executions run inline so a slow
    /// run delays the next fire instead of overlapping it; fire times that
    /// passed during the run are skipped.
    async fn ticker_loop(
        entry: Arc<JobEntry>,
        mut stop_rx: watch::Receiver<bool>,
        generation: u64,
    ) {
        debug!(job = %entry.name, "Job ticker started");
        loop {
            let next_fire = entry.schedule.upcoming(entry.timezone).next();
            let Some(next_fire) = next_fire else {
                info!(job = %entry.name, "Schedule has no further fire times, stopping job");
                break;
            };

            let next_utc = next_fire.with_timezone(&Utc);
            entry.runtime.write().next_fire_time = Some(next_utc);

            let wait = (next_utc - Utc::now()).to_std().unwrap_or(Duration::ZERO);
            tokio::select! {
                _ = stop_rx.changed() => break,
                _ = tokio::time::sleep(wait) => {}
            }

            let _ = Self::execute_entry(&entry).await;

            if *stop_rx.borrow() {
                break;
            }
        }

        // A newer ticker may already own this job; only the current one may
        // mark it stopped.
        if entry.generation.load(Ordering::SeqCst) == generation {
            let mut runtime = entry.runtime.write();
            runtime.running = false;
            runtime.next_fire_time = None;
        }
        debug!(job = %entry.name, "Job ticker stopped");
    }

    /// Run one guarded execution: take the job's execution lock, run the
    /// task through the retry wrapper, record the outcome.
    async fn execute_entry(entry: &Arc<JobEntry>) -> Result<(), String> {
        let _guard = entry.exec_guard.lock().await;

        entry.runtime.write().last_fire_time = Some(Utc::now());
        debug!(job = %entry.name, "Executing job");

        let outcome = run_with_retry(&entry.name, entry.options.max_retries, &entry.task).await;
        match outcome {
            Ok(duration) => {
                let duration_ms = duration.as_secs_f64() * 1000.0;
                entry.runtime.write().record_success(duration_ms);
                BACKPLANE_METRICS.record_job_execution(
                    &entry.name,
                    true,
                    duration.as_secs_f64(),
                );
                info!(
                    job = %entry.name,
                    duration_ms = duration.as_millis() as u64,
                    "Job executed successfully"
                );
                Ok(())
            }
            Err(err) => {
                entry.runtime.write().last_error = Some(err.clone());
                BACKPLANE_METRICS.record_job_execution(&entry.name, false, 0.0);
                error!(job = %entry.name, error = %err, "Job execution failed");
                Err(err)
            }
        }
    }
}

/// Parse a cron expression, accepting both the classic five-field form and
/// the six/seven-field form with a seconds column.
fn parse_schedule(pattern: &str) -> SchedulerResult<Schedule> {
    let trimmed = pattern.trim();
    let normalized = if trimmed.split_whitespace().count() == 5 {
        format!("0 {}", trimmed)
    } else {
        trimmed.to_string()
    };
    Schedule::from_str(&normalized)
        .map_err(|err| SchedulerError::InvalidCronExpression(format!("{}: {}", pattern, err)))
}
