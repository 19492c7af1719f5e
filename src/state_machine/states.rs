//! Phase definitions for the per-stage state machine
//!
//! A stage walks these phases strictly forward. `Transforming` and
//! `Passthrough` are the two outcomes of the `Deciding` phase.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StagePhase {
    /// Blocked on the upstream hand-off point
    #[default]
    Waiting,

    /// Inside the timed yield
    Suspended,

    /// Reading the cancellation flag
    Deciding,

    /// Running the transform
    Transforming,

    /// Cancelled or skipped, forwarding the input untouched
    Passthrough,

    /// Sending into the downstream hand-off point
    Emitting,

    /// Output emitted
    Terminal,
}

impl StagePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            StagePhase::Waiting => "waiting",
            StagePhase::Suspended => "suspended",
            StagePhase::Deciding => "deciding",
            StagePhase::Transforming => "transforming",
            StagePhase::Passthrough => "passthrough",
            StagePhase::Emitting => "emitting",
            StagePhase::Terminal => "terminal",
        }
    }

    /// Whether `next` is a legal successor of this phase
    ///
    /// `Waiting -> Emitting` is the short-circuit edge taken when the
    /// upstream parcel already carries a failure.
    pub fn can_transition_to(&self, next: StagePhase) -> bool {
        use StagePhase::*;
        matches!(
            (self, next),
            (Waiting, Suspended)
                | (Waiting, Emitting)
                | (Suspended, Deciding)
                | (Deciding, Transforming)
                | (Deciding, Passthrough)
                | (Transforming, Emitting)
                | (Passthrough, Emitting)
                | (Emitting, Terminal)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, StagePhase::Terminal)
    }
}

impl fmt::Display for StagePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
