//! Error types for the scheduler module

/// Result type for scheduler operations
pub type SchedulerResult<T> = std::result::Result<T, SchedulerError>;

/// Errors that can occur in scheduler operations
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// Invalid cron expression
    #[error("Invalid cron expression: {0}")]
    InvalidCronExpression(String),

    /// Invalid timezone name
    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    /// Job not found
    #[error("Job not found: {0}")]
    JobNotFound(String),

    /// Job execution failed after exhausting retries
    #[error("Job execution failed: {0}")]
    ExecutionFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SchedulerError::InvalidCronExpression("bogus".to_string());
        assert_eq!(err.to_string(), "Invalid cron expression: bogus");

        let err = SchedulerError::JobNotFound("sync".to_string());
        assert_eq!(err.to_string(), "Job not found: sync");
    }
}
