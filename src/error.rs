use crate::state_machine::StagePhase;
use thiserror::Error;

/// Central error type for the chunkflow scheduler
#[derive(Error, Debug)]
pub enum SchedulerError {
    // ============================================================================
    // Construction Errors
    // ============================================================================
    #[error("Initial value must not be empty")]
    EmptyInitialValue,

    #[error("No async runtime available: {0}")]
    NoRuntime(String),

    // ============================================================================
    // Execution Errors
    // ============================================================================
    #[error("Stage '{stage_name}' (#{stage_index}) failed: {reason}")]
    StageFailed {
        stage_name: String,
        stage_index: usize,
        reason: String,
    },

    #[error("Hand-off point closed before a value was emitted")]
    HandoffClosed,

    #[error("Loop task aborted: {0}")]
    LoopAborted(String),

    #[error("Invalid stage phase transition: {from} -> {to}")]
    InvalidPhaseTransition { from: StagePhase, to: StagePhase },

    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Builder pattern validation error
    #[error("Builder error: {0}")]
    BuilderError(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ============================================================================
    // Logging Errors
    // ============================================================================
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),
}

// Conversion to String for host bindings that only carry messages
impl From<SchedulerError> for String {
    fn from(error: SchedulerError) -> Self {
        error.to_string()
    }
}

// Helper type alias for Results
pub type SchedulerResult<T> = Result<T, SchedulerError>;
