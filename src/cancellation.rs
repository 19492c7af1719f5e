use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Soft cancellation flag shared by every stage of one pipeline run
///
/// The flag starts in the "continue" state. `cancel()` flips it once and there
/// is no way back: a pipeline never resumes transforming after cancellation.
/// Stages poll it right before deciding whether to transform, so a reader may
/// see a stale value for at most one stage transition.
///
/// # Example
/// ```
/// use chunkflow::CancellationFlag;
///
/// let flag = CancellationFlag::new();
/// let ui_handle = flag.clone();
///
/// assert!(flag.should_continue());
/// ui_handle.cancel();
/// assert!(flag.is_cancelled());
/// ```
#[derive(Clone, Debug)]
pub struct CancellationFlag {
    proceed: Arc<AtomicBool>,
}

impl CancellationFlag {
    /// Create a fresh flag in the "continue" state
    pub fn new() -> Self {
        Self {
            proceed: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.proceed.store(false, Ordering::SeqCst);
    }

    /// True until `cancel` has been called on any clone
    pub fn should_continue(&self) -> bool {
        self.proceed.load(Ordering::SeqCst)
    }

    pub fn is_cancelled(&self) -> bool {
        !self.should_continue()
    }

    /// Gate closure reading this flag, as handed to each stage
    pub fn gate(&self) -> impl Fn() -> bool + Send + Sync + 'static {
        let flag = self.clone();
        move || flag.should_continue()
    }
}

impl Default for CancellationFlag {
    fn default() -> Self {
        Self::new()
    }
}
