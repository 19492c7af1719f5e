//! Ready-made stage transforms
//!
//! Each adapter turns a closure into a named `StageTransform`:
//! 1. MapStage - always produces a new value
//! 2. TryMapStage - produces a new value or fails the pipeline
//! 3. OptionalStage - produces a new value or leaves the input unchanged
//! 4. FnStage - returns a `StageOutcome` directly

pub mod func;
pub mod map;
pub mod optional;
pub mod try_map;

// Re-export stages
pub use func::FnStage;
pub use map::MapStage;
pub use optional::OptionalStage;
pub use try_map::TryMapStage;
