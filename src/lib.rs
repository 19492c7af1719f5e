//! Cooperative chunked task scheduling on a single-threaded host loop
//!
//! Long computations are broken into small chunks, each preceded by a short
//! yield so the host stays responsive. Two shapes are provided:
//!
//! - [`Looper`] repeats one step function until it reports it is done.
//! - [`Pipeline`] chains heterogeneous stage transforms through one-shot
//!   hand-off points; a shared [`CancellationFlag`] turns every stage that has
//!   not yet decided into a passthrough.
//!
//! # Example
//!
//! ```
//! use chunkflow::{CancellationFlag, Pipeline};
//! use chunkflow::yielding::CooperativeYield;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> chunkflow::SchedulerResult<()> {
//! let pipeline = Pipeline::<Vec<u32>>::builder("squares")
//!     .yielder(CooperativeYield)
//!     .map("square", |v: &Vec<u32>| v.iter().map(|n| n * n).collect())
//!     .map("drop-odd", |v: &Vec<u32>| v.iter().copied().filter(|n| n % 2 == 0).collect())
//!     .build();
//!
//! let handle = pipeline.start_with_flag(vec![1, 2, 3, 4], CancellationFlag::new())?;
//! assert_eq!(handle.value().await?, vec![4, 16]);
//! # Ok(())
//! # }
//! ```

pub mod cancellation;
pub mod config;
pub mod error;
pub mod events;
pub mod logger;
pub mod looper;
pub mod payload;
pub mod pipeline;
pub mod state_machine;
pub mod yielding;

pub use cancellation::CancellationFlag;
pub use config::SchedulerConfig;
pub use error::{SchedulerError, SchedulerResult};
pub use logger::{init_logging, LogLevel};
pub use looper::{LoopHandle, LoopStep, Looper};
pub use payload::Payload;
pub use pipeline::{
    build, make_stage, CompletionHandle, Pipeline, PipelineBuilder, PipelineResult,
    StageOutcome, StageStatus, StageTransform,
};
pub use yielding::{CooperativeYield, SleepYield, Yielder};
