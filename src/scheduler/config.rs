//! Configuration for the scheduler module

use serde::{Deserialize, Serialize};

/// Configuration for the scheduler manager
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Whether the scheduler is enabled
    pub enabled: bool,

    /// Default timezone for cron expressions (e.g., "UTC", "America/New_York")
    pub timezone: String,

    /// Predefined jobs registered during initialization
    pub jobs: JobsConfig,
}

/// Configuration for predefined scheduled jobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobsConfig {
    /// Periodic liveness log
    pub health_check: JobConfig,

    /// Periodic cache expiry sweep
    pub cache_cleanup: JobConfig,
}

/// Configuration for a single scheduled job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    /// Whether this job is registered
    pub enabled: bool,

    /// Cron expression for scheduling
    pub schedule: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timezone: "UTC".to_string(),
            jobs: JobsConfig::default(),
        }
    }
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            health_check: JobConfig {
                enabled: true,
                schedule: "*/5 * * * *".to_string(), // Every 5 minutes
            },
            cache_cleanup: JobConfig {
                enabled: true,
                schedule: "*/10 * * * *".to_string(), // Every 10 minutes
            },
        }
    }
}

/// Builder for SchedulerConfig
pub struct SchedulerConfigBuilder {
    config: SchedulerConfig,
}

impl SchedulerConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: SchedulerConfig::default(),
        }
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.config.enabled = enabled;
        self
    }

    pub fn timezone(mut self, timezone: impl Into<String>) -> Self {
        self.config.timezone = timezone.into();
        self
    }

    pub fn jobs(mut self, jobs: JobsConfig) -> Self {
        self.config.jobs = jobs;
        self
    }

    pub fn build(self) -> SchedulerConfig {
        self.config
    }
}

impl Default for SchedulerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SchedulerConfig::default();
        assert!(config.enabled);
        assert_eq!(config.timezone, "UTC");
        assert!(config.jobs.health_check.enabled);
    }

    #[test]
    fn test_builder() {
        let config = SchedulerConfigBuilder::new()
            .enabled(false)
            .timezone("Europe/Berlin")
            .build();
        assert!(!config.enabled);
        assert_eq!(config.timezone, "Europe/Berlin");
    }
}
