//! State machine for a single pipeline stage
//!
//! Every stage runs exactly once and walks its phases strictly forward:
//!
//! - `Waiting` - blocked on the upstream hand-off point
//! - `Suspended` - inside the cooperative yield
//! - `Deciding` - reading the cancellation flag
//! - `Transforming` / `Passthrough` - the decision outcome
//! - `Emitting` - sending into the downstream hand-off point
//! - `Terminal` - done
//!
//! A stage whose input already carries a failure short-circuits from
//! `Waiting` straight to `Emitting`.
//!
//! # Example
//!
//! ```
//! use chunkflow::state_machine::{PhaseTracker, StagePhase};
//!
//! let mut tracker = PhaseTracker::new(0);
//! tracker.advance(StagePhase::Suspended).unwrap();
//! tracker.advance(StagePhase::Deciding).unwrap();
//! assert!(tracker.advance(StagePhase::Waiting).is_err());
//! ```

pub mod states;
pub mod transitions;

pub use states::StagePhase;
pub use transitions::PhaseTracker;
