//! Scheduler configuration
//!
//! Settings are plain serde data so a host can keep them next to its own
//! preferences and hand them back as JSON.

pub mod builder;

pub use builder::SchedulerConfigBuilder;

use crate::error::{SchedulerError, SchedulerResult};
use crate::logger::LogLevel;
use crate::yielding::DEFAULT_YIELD_INTERVAL;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_PIPELINE_NAME: &str = "pipeline";

/// Scheduler configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SchedulerConfig {
    /// Pause before every looper iteration and every stage decision
    pub yield_interval_ms: u64,

    /// Name used in logs, events and results
    pub pipeline_name: String,

    /// Level passed to `init_logging`
    pub log_level: LogLevel,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            yield_interval_ms: DEFAULT_YIELD_INTERVAL.as_millis() as u64,
            pipeline_name: DEFAULT_PIPELINE_NAME.to_string(),
            log_level: LogLevel::default(),
        }
    }
}

impl SchedulerConfig {
    /// Create a new builder
    pub fn builder() -> SchedulerConfigBuilder {
        SchedulerConfigBuilder::new()
    }

    pub fn yield_interval(&self) -> Duration {
        Duration::from_millis(self.yield_interval_ms)
    }

    /// Parse and validate a JSON document; missing fields take defaults
    pub fn from_json(json: &str) -> SchedulerResult<Self> {
        let config: SchedulerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> SchedulerResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check the invariants the builder enforces
    pub fn validate(&self) -> SchedulerResult<()> {
        if self.yield_interval_ms == 0 {
            return Err(SchedulerError::ConfigError(
                "yieldIntervalMs must be greater than zero".to_string(),
            ));
        }
        if self.pipeline_name.trim().is_empty() {
            return Err(SchedulerError::ConfigError(
                "pipelineName must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SchedulerConfig::default();
        assert_eq!(config.yield_interval(), Duration::from_millis(20));
        assert_eq!(config.pipeline_name, "pipeline");
        assert_eq!(config.log_level, LogLevel::Info);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json_partial() {
        let config = SchedulerConfig::from_json(r#"{ "yieldIntervalMs": 5 }"#).unwrap();
        assert_eq!(config.yield_interval_ms, 5);
        assert_eq!(config.pipeline_name, DEFAULT_PIPELINE_NAME);
    }

    #[test]
    fn test_from_json_rejects_zero_interval() {
        let err = SchedulerConfig::from_json(r#"{ "yieldIntervalMs": 0 }"#).unwrap_err();
        assert!(matches!(err, SchedulerError::ConfigError(_)));
    }

    #[test]
    fn test_from_json_malformed() {
        let err = SchedulerConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, SchedulerError::Json(_)));
    }

    #[test]
    fn test_json_round_trip() {
        let config = SchedulerConfig {
            yield_interval_ms: 16,
            pipeline_name: "thumbnails".to_string(),
            log_level: LogLevel::Debug,
        };
        let json = config.to_json().unwrap();
        assert!(json.contains("\"logLevel\": \"debug\""));
        assert_eq!(SchedulerConfig::from_json(&json).unwrap(), config);
    }
}
