//! Validated phase transitions for a single stage
//!
//! Each advance is checked against `StagePhase::can_transition_to`, so a
//! stage can never move backwards or skip its decision.

use super::states::StagePhase;
use crate::error::{SchedulerError, SchedulerResult};
use tracing::trace;

#[derive(Debug, Clone)]
pub struct PhaseTracker {
    stage_index: usize,
    phase: StagePhase,
    history: Vec<StagePhase>,
}

impl PhaseTracker {
    /// Create a tracker in the `Waiting` phase
    pub fn new(stage_index: usize) -> Self {
        Self {
            stage_index,
            phase: StagePhase::Waiting,
            history: vec![StagePhase::Waiting],
        }
    }

    pub fn phase(&self) -> StagePhase {
        self.phase
    }

    /// Every phase visited so far, in order
    pub fn history(&self) -> &[StagePhase] {
        &self.history
    }

    /// Move to `next`, rejecting anything the state machine does not allow
    pub fn advance(&mut self, next: StagePhase) -> SchedulerResult<StagePhase> {
        if !self.phase.can_transition_to(next) {
            return Err(SchedulerError::InvalidPhaseTransition {
                from: self.phase,
                to: next,
            });
        }

        trace!(
            target: "pipeline::phase",
            stage_index = self.stage_index,
            from = %self.phase,
            to = %next,
            "stage phase transition"
        );

        let previous = self.phase;
        self.phase = next;
        self.history.push(next);
        Ok(previous)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_transform_cycle() {
        let mut tracker = PhaseTracker::new(0);
        tracker.advance(StagePhase::Suspended).unwrap();
        tracker.advance(StagePhase::Deciding).unwrap();
        tracker.advance(StagePhase::Transforming).unwrap();
        tracker.advance(StagePhase::Emitting).unwrap();
        tracker.advance(StagePhase::Terminal).unwrap();

        assert!(tracker.phase().is_terminal());
        assert_eq!(tracker.history().len(), 6);
    }

    #[test]
    fn test_short_circuit_cycle() {
        let mut tracker = PhaseTracker::new(3);
        tracker.advance(StagePhase::Emitting).unwrap();
        tracker.advance(StagePhase::Terminal).unwrap();

        assert_eq!(
            tracker.history(),
            &[StagePhase::Waiting, StagePhase::Emitting, StagePhase::Terminal]
        );
    }

    #[test]
    fn test_backwards_transition_rejected() {
        let mut tracker = PhaseTracker::new(1);
        tracker.advance(StagePhase::Suspended).unwrap();

        let err = tracker.advance(StagePhase::Waiting).unwrap_err();
        assert!(matches!(
            err,
            SchedulerError::InvalidPhaseTransition {
                from: StagePhase::Suspended,
                to: StagePhase::Waiting
            }
        ));
        // Rejected advance leaves the tracker untouched
        assert_eq!(tracker.phase(), StagePhase::Suspended);
    }

    #[test]
    fn test_cannot_skip_yield() {
        let mut tracker = PhaseTracker::new(0);
        assert!(tracker.advance(StagePhase::Deciding).is_err());
    }
}
