//! Retry wrapper for job execution

use std::time::{Duration, Instant};

use tracing::warn;

use super::job::JobTask;

/// Base delay before the first retry, doubled after every further failure
const BASE_RETRY_DELAY_MS: u64 = 1000;

/// Run a task, retrying failures with exponential backoff.
///
/// The first attempt runs immediately. After the n-th failure the next
/// attempt waits `2^n * 1000` ms, up to `max_retries` extra attempts.
/// Returns the duration of the successful attempt, or the final error once
/// retries are exhausted.
pub(crate) async fn run_with_retry(
    name: &str,
    max_retries: u32,
    task: &JobTask,
) -> Result<Duration, String> {
    let mut failures = 0u32;
    loop {
        let start = Instant::now();
        match (task)().await {
            Ok(()) => return Ok(start.elapsed()),
            Err(err) => {
                failures += 1;
                if failures > max_retries {
                    return Err(err);
                }

                let delay = BASE_RETRY_DELAY_MS * 2_u64.pow(failures);
                warn!(
                    job = %name,
                    failed_attempts = failures,
                    retry_in_ms = delay,
                    error = %err,
                    "Job attempt failed, retrying"
                );
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
        }
    }
}
