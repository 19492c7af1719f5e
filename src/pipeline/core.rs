use crate::error::SchedulerError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// One chunk of work in a pipeline
///
/// Each transform reads the value handed over by the previous stage and tells
/// the stage what to forward. It runs on the host loop between two yields, so
/// it should finish quickly; a transform that never returns stalls every
/// stage after it.
///
/// # Example
/// ```
/// use chunkflow::pipeline::{StageOutcome, StageTransform};
///
/// struct Double;
///
/// impl StageTransform<i64> for Double {
///     fn apply(&self, input: &i64) -> StageOutcome<i64> {
///         StageOutcome::Transformed(input * 2)
///     }
///
///     fn name(&self) -> &str {
///         "double"
///     }
/// }
/// ```
pub trait StageTransform<T>: Send + Sync {
    /// Compute this stage's output from its input
    fn apply(&self, input: &T) -> StageOutcome<T>;

    /// Get stage name for logging and progress tracking
    fn name(&self) -> &str;

    /// Get estimated duration for progress tracking
    ///
    /// Returns `None` if duration cannot be estimated.
    fn estimated_duration(&self) -> Option<Duration> {
        None
    }

    /// Check if this stage should be skipped for this input
    ///
    /// A skipped stage still yields and emits; it forwards its input untouched.
    fn should_skip(&self, _input: &T) -> bool {
        false
    }
}

/// What a transform asks its stage to forward
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome<T> {
    /// Forward this new value
    Transformed(T),

    /// Forward the input as it was
    Unchanged,

    /// Stop the pipeline; every later stage short-circuits
    Failed(String),
}

impl<T> From<Option<T>> for StageOutcome<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => StageOutcome::Transformed(v),
            None => StageOutcome::Unchanged,
        }
    }
}

impl<T, E: fmt::Display> From<Result<T, E>> for StageOutcome<T> {
    fn from(value: Result<T, E>) -> Self {
        match value {
            Ok(v) => StageOutcome::Transformed(v),
            Err(e) => StageOutcome::Failed(e.to_string()),
        }
    }
}

/// How a stage ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StageStatus {
    /// The transform produced a new value
    Transformed,

    /// The transform ran and kept the input (explicitly, or by returning a
    /// vacant value)
    Unchanged,

    /// Cancellation was observed; the transform never ran
    Passthrough,

    /// The transform declined this input via `should_skip`
    Skipped,

    /// The transform failed or panicked
    Failed,

    /// An earlier stage failed; this one did nothing but forward the failure
    ShortCircuited,
}

impl StageStatus {
    /// Whether the transform was actually invoked
    pub fn ran_transform(&self) -> bool {
        matches!(
            self,
            StageStatus::Transformed | StageStatus::Unchanged | StageStatus::Failed
        )
    }
}

/// The failure that replaced a pipeline's value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageFailure {
    pub stage_name: String,
    pub stage_index: usize,
    pub reason: String,
}

impl StageFailure {
    pub fn new(stage_name: impl Into<String>, stage_index: usize, reason: impl Into<String>) -> Self {
        Self {
            stage_name: stage_name.into(),
            stage_index,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for StageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "stage '{}' (#{}) failed: {}",
            self.stage_name, self.stage_index, self.reason
        )
    }
}

impl From<StageFailure> for SchedulerError {
    fn from(failure: StageFailure) -> Self {
        SchedulerError::StageFailed {
            stage_name: failure.stage_name,
            stage_index: failure.stage_index,
            reason: failure.reason,
        }
    }
}

/// Result of a pipeline stage execution
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageResult {
    /// Stage name
    pub stage_name: String,

    /// Position in the pipeline
    pub stage_index: usize,

    pub status: StageStatus,

    /// Error message if failed
    pub error: Option<String>,

    /// Time spent deciding and transforming, yield excluded
    pub duration: Duration,
}

impl StageResult {
    pub fn new(
        stage_name: impl Into<String>,
        stage_index: usize,
        status: StageStatus,
        duration: Duration,
    ) -> Self {
        Self {
            stage_name: stage_name.into(),
            stage_index,
            status,
            error: None,
            duration,
        }
    }

    /// Create a failed stage result
    pub fn failure(
        stage_name: impl Into<String>,
        stage_index: usize,
        error: impl Into<String>,
        duration: Duration,
    ) -> Self {
        Self {
            stage_name: stage_name.into(),
            stage_index,
            status: StageStatus::Failed,
            error: Some(error.into()),
            duration,
        }
    }

    /// Create a short-circuited stage result
    pub fn short_circuited(stage_name: impl Into<String>, stage_index: usize) -> Self {
        Self::new(
            stage_name,
            stage_index,
            StageStatus::ShortCircuited,
            Duration::from_secs(0),
        )
    }
}

/// Result of a complete pipeline run
#[derive(Debug, Clone)]
pub struct PipelineResult<T> {
    /// Pipeline name
    pub pipeline_name: String,

    /// Identifies this run in logs and events
    pub run_id: Uuid,

    /// Final value, or the failure that replaced it
    pub output: Result<T, StageFailure>,

    /// Results from each stage, in pipeline order
    pub stage_results: Vec<StageResult>,

    /// Wall-clock time from start to completion
    pub total_duration: Duration,
}

impl<T> PipelineResult<T> {
    pub fn is_success(&self) -> bool {
        self.output.is_ok()
    }

    /// Number of stages whose transform produced a new value
    pub fn transformed_stages(&self) -> usize {
        self.count(StageStatus::Transformed)
    }

    /// Number of stages that passed through because of cancellation
    pub fn passthrough_stages(&self) -> usize {
        self.count(StageStatus::Passthrough)
    }

    /// Get the number of stages that were skipped
    pub fn skipped_stages(&self) -> usize {
        self.count(StageStatus::Skipped)
    }

    /// Get the stage that failed (if any)
    pub fn failed_stage(&self) -> Option<&StageResult> {
        self.stage_results
            .iter()
            .find(|r| r.status == StageStatus::Failed)
    }

    /// Unwrap the output, turning a stage failure into `SchedulerError::StageFailed`
    pub fn into_value(self) -> Result<T, SchedulerError> {
        self.output.map_err(SchedulerError::from)
    }

    fn count(&self, status: StageStatus) -> usize {
        self.stage_results
            .iter()
            .filter(|r| r.status == status)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_result(output: Result<u32, StageFailure>) -> PipelineResult<u32> {
        PipelineResult {
            pipeline_name: "Test Pipeline".to_string(),
            run_id: Uuid::new_v4(),
            output,
            stage_results: vec![
                StageResult::new("Stage 1", 0, StageStatus::Transformed, Duration::from_millis(1)),
                StageResult::new("Stage 2", 1, StageStatus::Passthrough, Duration::ZERO),
                StageResult::new("Stage 3", 2, StageStatus::Skipped, Duration::ZERO),
            ],
            total_duration: Duration::from_millis(60),
        }
    }

    #[test]
    fn test_outcome_from_option() {
        assert_eq!(StageOutcome::from(Some(3)), StageOutcome::Transformed(3));
        assert_eq!(StageOutcome::<i32>::from(None), StageOutcome::Unchanged);
    }

    #[test]
    fn test_outcome_from_result() {
        let ok: Result<i32, String> = Ok(1);
        let err: Result<i32, String> = Err("bad input".to_string());
        assert_eq!(StageOutcome::from(ok), StageOutcome::Transformed(1));
        assert_eq!(
            StageOutcome::from(err),
            StageOutcome::Failed("bad input".to_string())
        );
    }

    #[test]
    fn test_stage_result_failure() {
        let result = StageResult::failure("Test Stage", 4, "Something went wrong", Duration::ZERO);
        assert_eq!(result.status, StageStatus::Failed);
        assert_eq!(result.error, Some("Something went wrong".to_string()));
        assert_eq!(result.stage_index, 4);
    }

    #[test]
    fn test_ran_transform() {
        assert!(StageStatus::Transformed.ran_transform());
        assert!(StageStatus::Unchanged.ran_transform());
        assert!(!StageStatus::Passthrough.ran_transform());
        assert!(!StageStatus::ShortCircuited.ran_transform());
    }

    #[test]
    fn test_pipeline_result_counts() {
        let result = sample_result(Ok(7));

        assert!(result.is_success());
        assert_eq!(result.transformed_stages(), 1);
        assert_eq!(result.passthrough_stages(), 1);
        assert_eq!(result.skipped_stages(), 1);
        assert!(result.failed_stage().is_none());
        assert_eq!(result.into_value().unwrap(), 7);
    }

    #[test]
    fn test_pipeline_result_failure_into_value() {
        let result = sample_result(Err(StageFailure::new("Stage 2", 1, "Failed")));

        assert!(!result.is_success());
        let err = result.into_value().unwrap_err();
        assert!(matches!(
            err,
            SchedulerError::StageFailed { stage_index: 1, .. }
        ));
    }
}
