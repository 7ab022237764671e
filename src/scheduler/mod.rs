//! Cron scheduling with per-job tickers and retries
//!
//! This module runs named cron jobs on dedicated ticker tasks. The cron
//! expression is parsed once at registration; each started job sleeps until
//! its next fire time, executes inline and only then computes the following
//! fire, so a job never overlaps itself.
//!
//! # Features
//!
//! - **Cron Expressions**: Classic five-field syntax plus an optional seconds column
//! - **Per-Job Timezones**: Any IANA timezone, defaulting to the scheduler timezone
//! - **Retry with Backoff**: Failed executions retry with exponential delays
//! - **Lifecycle Control**: Start, stop, replace and manually trigger jobs by name
//! - **Execution History**: Run counters, last error and mean duration per job
//!
//! # Example
//!
//! ```no_run
//! use backplane::scheduler::{JobOptions, SchedulerConfig, SchedulerManager};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let scheduler = SchedulerManager::new(SchedulerConfig::default());
//!     scheduler.initialize().await?;
//!
//!     scheduler.add_job(
//!         "heartbeat",
//!         "*/30 * * * * *",
//!         JobOptions { start_now: true, ..JobOptions::default() },
//!         || async { Ok(()) },
//!     )?;
//!
//!     tokio::time::sleep(std::time::Duration::from_secs(90)).await;
//!     scheduler.shutdown().await;
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod job;
mod manager;
mod retry;
mod tasks;

pub use config::{JobConfig, JobsConfig, SchedulerConfig, SchedulerConfigBuilder};
pub use error::{SchedulerError, SchedulerResult};
pub use job::{JobOptions, JobStatus};
pub use manager::{JobMetrics, SchedulerManager, SchedulerMetrics};
pub use tasks::health_check;
