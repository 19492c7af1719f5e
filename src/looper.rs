//! Single-stage repeating task
//!
//! A looper calls one step function over and over, yielding to the host event
//! loop before every call (the first one included), until the step reports it
//! is done. The final value then goes to a completion callback, exactly once.
//!
//! There is no iteration cap and no timeout. A step that never reports `Done`
//! keeps the looper alive forever, yielding on every iteration; callers that
//! need a hard stop use `LoopHandle::abort`.

use crate::config::SchedulerConfig;
use crate::error::{SchedulerError, SchedulerResult};
use crate::yielding::{SleepYield, Yielder};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, trace};

/// What one step asks the looper to do next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopStep<T> {
    /// Run another iteration with this value
    Continue(T),

    /// Stop and hand this value to the completion callback
    Done(T),
}

impl<T> LoopStep<T> {
    pub fn is_done(&self) -> bool {
        matches!(self, LoopStep::Done(_))
    }

    pub fn into_value(self) -> T {
        match self {
            LoopStep::Continue(value) | LoopStep::Done(value) => value,
        }
    }
}

/// `(continue, value)` pairs, the shape most step functions return
impl<T> From<(bool, T)> for LoopStep<T> {
    fn from((proceed, value): (bool, T)) -> Self {
        if proceed {
            LoopStep::Continue(value)
        } else {
            LoopStep::Done(value)
        }
    }
}

/// Runs step functions in yielded chunks
///
/// # Example
/// ```
/// use chunkflow::looper::Looper;
/// use chunkflow::yielding::CooperativeYield;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let looper = Looper::new("count-up").with_yielder(CooperativeYield);
/// let total = looper.drive(0u32, |n| (n < 10, n + 1)).await;
/// assert_eq!(total, 11);
/// # }
/// ```
#[derive(Clone)]
pub struct Looper {
    name: Arc<str>,
    yielder: Arc<dyn Yielder>,
}

impl Looper {
    /// Create a looper with the default 20ms timed yield
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            yielder: Arc::new(SleepYield::default()),
        }
    }

    /// Take the name and yield interval from a config
    ///
    /// `pipeline_name` names loopers too; it is the label used in logs for
    /// whatever the config drives. Use `with_name` to override it.
    pub fn from_config(config: &SchedulerConfig) -> Self {
        Self {
            name: config.pipeline_name.as_str().into(),
            yielder: Arc::new(SleepYield::new(config.yield_interval())),
        }
    }

    pub fn with_yielder<Y: Yielder + 'static>(mut self, yielder: Y) -> Self {
        self.yielder = Arc::new(yielder);
        self
    }

    pub fn with_name(mut self, name: impl Into<Arc<str>>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the loop inside the current task and return the final value
    pub async fn drive<T, S, R>(&self, initial: T, step: S) -> T
    where
        S: FnMut(T) -> R,
        R: Into<LoopStep<T>>,
    {
        let iterations = AtomicU64::new(0);
        drive_loop(&*self.yielder, &self.name, initial, step, &iterations).await
    }

    /// Spawn the loop as its own task; `on_done` receives the final value
    ///
    /// Fails synchronously if no tokio runtime is running.
    pub fn run<T, S, R, D>(&self, initial: T, step: S, on_done: D) -> SchedulerResult<LoopHandle>
    where
        T: Send + 'static,
        S: FnMut(T) -> R + Send + 'static,
        R: Into<LoopStep<T>>,
        D: FnOnce(T) + Send + 'static,
    {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| SchedulerError::NoRuntime(e.to_string()))?;

        let iterations = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&iterations);
        let yielder = Arc::clone(&self.yielder);
        let name = Arc::clone(&self.name);

        let task = runtime.spawn(async move {
            let value = drive_loop(&*yielder, &name, initial, step, &counter).await;
            on_done(value);
        });

        Ok(LoopHandle {
            task,
            iterations,
            name: Arc::clone(&self.name),
        })
    }
}

async fn drive_loop<T, S, R>(
    yielder: &dyn Yielder,
    name: &str,
    initial: T,
    mut step: S,
    iterations: &AtomicU64,
) -> T
where
    S: FnMut(T) -> R,
    R: Into<LoopStep<T>>,
{
    let mut current = initial;
    loop {
        yielder.pause().await;

        let next = step(current).into();
        let count = iterations.fetch_add(1, Ordering::SeqCst) + 1;
        trace!(target: "looper", looper = name, iteration = count, done = next.is_done());

        match next {
            LoopStep::Continue(value) => current = value,
            LoopStep::Done(value) => {
                info!(
                    target: "looper",
                    looper = name,
                    iterations = count,
                    "Looper '{}' finished",
                    name
                );
                return value;
            }
        }
    }
}

/// Handle to a spawned looper
///
/// Dropping the handle detaches the task; it keeps running.
#[derive(Debug)]
pub struct LoopHandle {
    task: JoinHandle<()>,
    iterations: Arc<AtomicU64>,
    name: Arc<str>,
}

impl LoopHandle {
    /// Step invocations completed so far
    pub fn iterations(&self) -> u64 {
        self.iterations.load(Ordering::SeqCst)
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the task at its next yield; `on_done` is not called
    pub fn abort(&self) {
        self.task.abort();
    }

    /// Wait until `on_done` has run
    ///
    /// Returns `LoopAborted` if the task was aborted or the step panicked.
    pub async fn join(&mut self) -> SchedulerResult<()> {
        (&mut self.task).await.map_err(|e| {
            let reason = if e.is_cancelled() {
                "aborted".to_string()
            } else {
                "step panicked".to_string()
            };
            SchedulerError::LoopAborted(format!("looper '{}' {}", self.name, reason))
        })
    }
}
