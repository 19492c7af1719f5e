use super::{SchedulerConfig, DEFAULT_PIPELINE_NAME};
use crate::error::{SchedulerError, SchedulerResult};
use crate::logger::LogLevel;
use crate::yielding::DEFAULT_YIELD_INTERVAL;
use std::time::Duration;

/// Builder for constructing SchedulerConfig instances with a fluent API
///
/// # Example
/// ```
/// use chunkflow::config::SchedulerConfigBuilder;
/// use chunkflow::logger::LogLevel;
/// use std::time::Duration;
///
/// let config = SchedulerConfigBuilder::new()
///     .yield_interval(Duration::from_millis(16))
///     .pipeline_name("resize-images")
///     .log_level(LogLevel::Debug)
///     .build()
///     .unwrap();
///
/// assert_eq!(config.yield_interval_ms, 16);
/// ```
#[derive(Debug)]
pub struct SchedulerConfigBuilder {
    yield_interval: Option<Duration>,
    pipeline_name: Option<String>,
    log_level: LogLevel,
}

impl SchedulerConfigBuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self {
            yield_interval: None,
            pipeline_name: None,
            log_level: LogLevel::default(),
        }
    }

    /// Set the pause inserted before every chunk of work
    pub fn yield_interval(mut self, interval: Duration) -> Self {
        self.yield_interval = Some(interval);
        self
    }

    /// Set the pause in milliseconds
    pub fn yield_interval_ms(mut self, millis: u64) -> Self {
        self.yield_interval = Some(Duration::from_millis(millis));
        self
    }

    /// Set the pipeline name used in logs and events
    pub fn pipeline_name(mut self, name: impl Into<String>) -> Self {
        self.pipeline_name = Some(name.into());
        self
    }

    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }

    /// Build the SchedulerConfig instance
    ///
    /// # Errors
    /// Returns `SchedulerError::BuilderError` if the interval rounds to zero
    /// milliseconds or the name is blank
    pub fn build(self) -> SchedulerResult<SchedulerConfig> {
        let interval = self.yield_interval.unwrap_or(DEFAULT_YIELD_INTERVAL);
        let yield_interval_ms = interval.as_millis() as u64;
        if yield_interval_ms == 0 {
            return Err(SchedulerError::BuilderError(format!(
                "yield interval must be at least 1ms, got {:?}",
                interval
            )));
        }

        let pipeline_name = self
            .pipeline_name
            .unwrap_or_else(|| DEFAULT_PIPELINE_NAME.to_string());
        if pipeline_name.trim().is_empty() {
            return Err(SchedulerError::BuilderError(
                "pipeline name must not be empty".to_string(),
            ));
        }

        Ok(SchedulerConfig {
            yield_interval_ms,
            pipeline_name,
            log_level: self.log_level,
        })
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
    fn test_builder_defaults() {
        let config = SchedulerConfigBuilder::new().build().unwrap();
        assert_eq!(config, SchedulerConfig::default());
    }

    #[test]
    fn test_builder_custom_values() {
        let config = SchedulerConfigBuilder::new()
            .yield_interval_ms(5)
            .pipeline_name("import")
            .log_level(LogLevel::Warn)
            .build()
            .unwrap();

        assert_eq!(config.yield_interval_ms, 5);
        assert_eq!(config.pipeline_name, "import");
        assert_eq!(config.log_level, LogLevel::Warn);
    }

    #[test]
    fn test_builder_rejects_sub_millisecond_interval() {
        let result = SchedulerConfigBuilder::new()
            .yield_interval(Duration::from_micros(500))
            .build();

        assert!(matches!(result, Err(SchedulerError::BuilderError(_))));
    }

    #[test]
    fn test_builder_rejects_blank_name() {
        let result = SchedulerConfigBuilder::new().pipeline_name("  ").build();
        assert!(result.is_err());
    }
}
