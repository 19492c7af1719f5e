//! Multi-stage, time-sliced pipelines
//!
//! A pipeline chains stages through single-slot hand-off points. Every stage
//! is its own task: it waits for its input, yields to the host event loop,
//! checks the shared cancellation flag and then either runs its transform or
//! passes the value through. Cancelling never stops a run from completing; it
//! only turns the remaining stages into passthroughs.
//!
//! # Example
//! ```
//! use chunkflow::pipeline::{Pipeline, StageOutcome};
//! use chunkflow::pipeline::stages::FnStage;
//! use chunkflow::yielding::CooperativeYield;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let pipeline = Pipeline::builder("words")
//!     .map("trim", |s: &String| s.trim().to_string())
//!     .add_stage(FnStage::new("shout", |s: &String| {
//!         if s.ends_with('!') {
//!             StageOutcome::Unchanged
//!         } else {
//!             StageOutcome::Transformed(format!("{}!", s.to_uppercase()))
//!         }
//!     }))
//!     .yielder(CooperativeYield)
//!     .build();
//!
//! let handle = pipeline.start("  hello ".to_string()).unwrap();
//! let ui_cancel = handle.cancellation_flag();
//! # drop(ui_cancel);
//! let result = handle.wait().await.unwrap();
//! assert_eq!(result.output.unwrap(), "HELLO!");
//! # }
//! ```

pub mod core;
pub mod executor;
pub mod handoff;
pub mod stage;
pub mod stages;

// Re-export main types
pub use self::core::{
    PipelineResult, StageFailure, StageOutcome, StageResult, StageStatus, StageTransform,
};
pub use executor::{build, CompletionHandle, Pipeline, PipelineBuilder};
pub use handoff::{handoff, HandoffPoint, HandoffSender, Parcel};
pub use stage::{make_stage, Gate, Stage};
