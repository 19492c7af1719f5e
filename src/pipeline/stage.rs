//! A single pipeline stage running as its own task
//!
//! The stage waits for its input parcel, yields once, reads the cancellation
//! gate, then either runs its transform or passes the input through, and
//! finally emits exactly one parcel downstream. Cancellation only decides
//! whether the transform runs: the yield and the emission always happen, so a
//! pipeline completes no matter when it is cancelled.

use super::core::{StageFailure, StageOutcome, StageResult, StageStatus, StageTransform};
use super::handoff::{handoff, HandoffPoint, HandoffSender, Parcel};
use crate::error::{SchedulerError, SchedulerResult};
use crate::events::EventEmitter;
use crate::payload::Payload;
use crate::state_machine::{PhaseTracker, StagePhase};
use crate::yielding::{SleepYield, Yielder};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Decides, right before each transform, whether the pipeline may go on
pub type Gate = Arc<dyn Fn() -> bool + Send + Sync>;

pub struct Stage<T> {
    index: usize,
    index_from_trail: bool,
    total_stages: usize,
    transform: Arc<dyn StageTransform<T>>,
    gate: Gate,
    yielder: Arc<dyn Yielder>,
    events: EventEmitter,
}

impl<T: Payload> Stage<T> {
    /// Create a stage with the default timed yield and no event sink
    pub fn new(index: usize, transform: Arc<dyn StageTransform<T>>, gate: Gate) -> Self {
        let events = EventEmitter::detached(transform.name());
        Self {
            index,
            index_from_trail: false,
            total_stages: index + 1,
            transform,
            gate,
            yielder: Arc::new(SleepYield::default()),
            events,
        }
    }

    pub fn with_yielder(mut self, yielder: Arc<dyn Yielder>) -> Self {
        self.yielder = yielder;
        self
    }

    pub fn with_events(mut self, events: EventEmitter) -> Self {
        self.events = events;
        self
    }

    /// Pipeline length, only used for progress reporting
    pub fn with_total_stages(mut self, total_stages: usize) -> Self {
        self.total_stages = total_stages;
        self
    }

    /// Take the index from the input parcel's trail instead of a fixed
    /// position, for stages wired by hand without a pipeline
    pub fn with_index_from_trail(mut self) -> Self {
        self.index_from_trail = true;
        self
    }

    pub fn name(&self) -> &str {
        self.transform.name()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Spawn the stage task fed by `input`; returns its output hand-off point
    ///
    /// Fails with `NoRuntime` outside a tokio runtime.
    pub fn spawn(self, input: HandoffPoint<T>) -> SchedulerResult<HandoffPoint<T>> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| SchedulerError::NoRuntime(e.to_string()))?;
        let (output_tx, output) = handoff();
        runtime.spawn(self.run(input, output_tx));
        Ok(output)
    }

    async fn run(mut self, input: HandoffPoint<T>, output: HandoffSender<T>) {
        if !self.index_from_trail {
            self.announce_waiting();
        }

        let received = input.recv().await;
        if self.index_from_trail {
            if let Ok(parcel) = &received {
                self.index = parcel.trail().len();
                self.total_stages = self.total_stages.max(self.index + 1);
            }
            self.announce_waiting();
        }

        let mut phases = PhaseTracker::new(self.index);
        let parcel = match received {
            Ok(parcel) => match parcel.into_parts() {
                (Ok(value), trail) => self.process(value, trail, &mut phases).await,
                (Err(failure), trail) => self.short_circuit(failure, trail),
            },
            Err(e) => self.lost_input(e.to_string()),
        };

        self.emit(parcel, output, &mut phases);
    }

    async fn process(
        &self,
        input: T,
        mut trail: Vec<StageResult>,
        phases: &mut PhaseTracker,
    ) -> Parcel<T> {
        self.enter(phases, StagePhase::Suspended);
        self.yielder.pause().await;

        self.enter(phases, StagePhase::Deciding);
        let started = Instant::now();

        let (value, status) = if !(self.gate)() {
            self.enter(phases, StagePhase::Passthrough);
            (Ok(input), StageStatus::Passthrough)
        } else if self.transform.should_skip(&input) {
            self.enter(phases, StagePhase::Passthrough);
            (Ok(input), StageStatus::Skipped)
        } else {
            self.enter(phases, StagePhase::Transforming);
            match self.invoke(&input) {
                StageOutcome::Transformed(output) if output.is_vacant() => {
                    debug!(
                        target: "pipeline",
                        stage = self.name(),
                        stage_index = self.index,
                        "transform produced an empty value, keeping input"
                    );
                    (Ok(input), StageStatus::Unchanged)
                }
                StageOutcome::Transformed(output) => (Ok(output), StageStatus::Transformed),
                StageOutcome::Unchanged => (Ok(input), StageStatus::Unchanged),
                StageOutcome::Failed(reason) => (
                    Err(StageFailure::new(self.name(), self.index, reason)),
                    StageStatus::Failed,
                ),
            }
        };

        let duration = started.elapsed();
        let duration_ms = duration.as_millis() as u64;

        match &value {
            Ok(_) => {
                info!(
                    target: "pipeline",
                    run_id = %self.events.run_id(),
                    stage = self.name(),
                    stage_index = self.index,
                    status = ?status,
                    duration_ms,
                    "Stage {}/{} finished",
                    self.index + 1,
                    self.total_stages
                );
                let _ = self.events.stage_completed(
                    self.name(),
                    self.index,
                    self.total_stages,
                    status,
                    duration_ms,
                );
                trail.push(StageResult::new(self.name(), self.index, status, duration));
            }
            Err(failure) => {
                error!(
                    target: "pipeline",
                    run_id = %self.events.run_id(),
                    stage = self.name(),
                    stage_index = self.index,
                    error = %failure.reason,
                    "Stage {}/{} failed",
                    self.index + 1,
                    self.total_stages
                );
                let _ = self
                    .events
                    .stage_failed(self.name(), self.index, &failure.reason);
                trail.push(StageResult::failure(
                    self.name(),
                    self.index,
                    failure.reason.clone(),
                    duration,
                ));
            }
        }

        Parcel::new(value, trail)
    }

    /// Run the transform, turning a panic into a failure
    fn invoke(&self, input: &T) -> StageOutcome<T> {
        panic::catch_unwind(AssertUnwindSafe(|| self.transform.apply(input)))
            .unwrap_or_else(|payload| {
                StageOutcome::Failed(format!("transform panicked: {}", panic_message(&*payload)))
            })
    }

    fn short_circuit(&self, failure: StageFailure, mut trail: Vec<StageResult>) -> Parcel<T> {
        debug!(
            target: "pipeline",
            run_id = %self.events.run_id(),
            stage = self.name(),
            stage_index = self.index,
            failed_stage = %failure.stage_name,
            "upstream failed, forwarding failure"
        );
        trail.push(StageResult::short_circuited(self.name(), self.index));
        Parcel::new(Err(failure), trail)
    }

    fn lost_input(&self, reason: String) -> Parcel<T> {
        warn!(
            target: "pipeline",
            run_id = %self.events.run_id(),
            stage = self.name(),
            stage_index = self.index,
            "upstream stage ended without emitting"
        );
        let reason = format!("input lost: {}", reason);
        let _ = self.events.stage_failed(self.name(), self.index, &reason);
        let failure = StageFailure::new(self.name(), self.index, reason.clone());
        let trail = vec![StageResult::failure(
            self.name(),
            self.index,
            reason,
            Default::default(),
        )];
        Parcel::new(Err(failure), trail)
    }

    fn emit(&self, parcel: Parcel<T>, output: HandoffSender<T>, phases: &mut PhaseTracker) {
        self.enter(phases, StagePhase::Emitting);
        if output.send(parcel).is_err() {
            warn!(
                target: "pipeline",
                run_id = %self.events.run_id(),
                stage = self.name(),
                stage_index = self.index,
                "downstream hand-off dropped, output discarded"
            );
        }
        self.enter(phases, StagePhase::Terminal);
    }

    fn announce_waiting(&self) {
        let _ = self
            .events
            .stage_phase_changed(self.name(), self.index, StagePhase::Waiting);
    }

    fn enter(&self, phases: &mut PhaseTracker, next: StagePhase) {
        match phases.advance(next) {
            Ok(_) => {
                let _ = self.events.stage_phase_changed(self.name(), self.index, next);
            }
            Err(e) => error!(
                target: "pipeline",
                stage = self.name(),
                stage_index = self.index,
                error = %e,
                "stage phase machine violated"
            ),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Wire one stage between `input` and a new output hand-off point
///
/// Uses the default 20ms timed yield and reports no events. The stage's index
/// is the number of stages its input has already passed through. Fails with
/// `NoRuntime` outside a tokio runtime.
pub fn make_stage<T, G, S>(
    should_continue: G,
    input: HandoffPoint<T>,
    transform: S,
) -> SchedulerResult<HandoffPoint<T>>
where
    T: Payload,
    G: Fn() -> bool + Send + Sync + 'static,
    S: StageTransform<T> + 'static,
{
    Stage::new(0, Arc::new(transform), Arc::new(should_continue))
        .with_index_from_trail()
        .spawn(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::stages::{FnStage, MapStage, TryMapStage};
    use crate::yielding::{CooperativeYield, CountingYield};

    fn open_gate() -> Gate {
        Arc::new(|| true)
    }

    fn spawn_seeded<S>(transform: S, gate: Gate, value: i64) -> HandoffPoint<i64>
    where
        S: StageTransform<i64> + 'static,
    {
        let (seed, input) = handoff();
        let output = Stage::new(0, Arc::new(transform), gate)
            .with_yielder(Arc::new(CooperativeYield))
            .spawn(input)
            .unwrap();
        seed.send(Parcel::seed(value)).unwrap();
        output
    }

    #[tokio::test]
    async fn test_stage_transforms_when_gate_open() {
        let output = spawn_seeded(MapStage::new("double", |n: &i64| n * 2), open_gate(), 21);

        let (value, trail) = output.recv().await.unwrap().into_parts();
        assert_eq!(value.unwrap(), 42);
        assert_eq!(trail.len(), 1);
        assert_eq!(trail[0].status, StageStatus::Transformed);
    }

    #[tokio::test]
    async fn test_stage_passes_through_when_gate_closed() {
        let output = spawn_seeded(
            MapStage::new("double", |n: &i64| n * 2),
            Arc::new(|| false),
            21,
        );

        let (value, trail) = output.recv().await.unwrap().into_parts();
        assert_eq!(value.unwrap(), 21);
        assert_eq!(trail[0].status, StageStatus::Passthrough);
    }

    #[tokio::test]
    async fn test_stage_catches_panics() {
        let output = spawn_seeded(
            FnStage::new("explode", |_: &i64| -> StageOutcome<i64> { panic!("chunk exploded") }),
            open_gate(),
            1,
        );

        let (value, trail) = output.recv().await.unwrap().into_parts();
        let failure = value.unwrap_err();
        assert!(failure.reason.contains("chunk exploded"));
        assert_eq!(trail[0].status, StageStatus::Failed);
    }

    #[tokio::test]
    async fn test_stage_short_circuits_failed_parcel() {
        let counting = CountingYield::new(CooperativeYield);
        let pauses = counting.clone();
        let (seed, input) = handoff::<i64>();
        let output = Stage::new(1, Arc::new(MapStage::new("double", |n: &i64| n * 2)), open_gate())
            .with_yielder(Arc::new(counting))
            .spawn(input)
            .unwrap();

        let failure = StageFailure::new("parse", 0, "bad digit");
        seed.send(Parcel::new(Err(failure.clone()), Vec::new()))
            .unwrap();

        let (value, trail) = output.recv().await.unwrap().into_parts();
        assert_eq!(value.unwrap_err(), failure);
        assert_eq!(trail[0].status, StageStatus::ShortCircuited);
        assert_eq!(pauses.count(), 0);
    }

    #[tokio::test]
    async fn test_stage_reports_lost_input() {
        let (seed, input) = handoff::<i64>();
        let output = Stage::new(0, Arc::new(MapStage::new("double", |n: &i64| n * 2)), open_gate())
            .with_yielder(Arc::new(CooperativeYield))
            .spawn(input)
            .unwrap();
        drop(seed);

        let (value, trail) = output.recv().await.unwrap().into_parts();
        assert!(value.unwrap_err().reason.starts_with("input lost"));
        assert_eq!(trail[0].status, StageStatus::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_make_stage_uses_timed_yield() {
        let (seed, input) = handoff::<String>();
        let output = make_stage(
            || true,
            input,
            MapStage::new("shout", |s: &String| s.to_uppercase()),
        )
        .unwrap();
        seed.send(Parcel::seed("quiet".to_string())).unwrap();

        let start = tokio::time::Instant::now();
        let (value, _) = output.recv().await.unwrap().into_parts();
        assert_eq!(value.unwrap(), "QUIET");
        assert!(start.elapsed() >= crate::yielding::DEFAULT_YIELD_INTERVAL);
    }

    #[tokio::test]
    async fn test_vacant_output_keeps_input() {
        let (seed, input) = handoff::<String>();
        let output = Stage::new(
            0,
            Arc::new(MapStage::new("erase", |_: &String| String::new())),
            open_gate(),
        )
        .with_yielder(Arc::new(CooperativeYield))
        .spawn(input)
        .unwrap();
        seed.send(Parcel::seed("keep me".to_string())).unwrap();

        let (value, trail) = output.recv().await.unwrap().into_parts();
        assert_eq!(value.unwrap(), "keep me");
        assert_eq!(trail[0].status, StageStatus::Unchanged);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hand_wired_stages_number_themselves() {
        let (seed, head) = handoff::<i64>();
        let first = make_stage(|| true, head, MapStage::new("double", |n: &i64| n * 2)).unwrap();
        let second = make_stage(
            || true,
            first,
            TryMapStage::new("reject", |_: &i64| Err::<i64, _>("over limit")),
        )
        .unwrap();
        seed.send(Parcel::seed(4)).unwrap();

        let (value, trail) = second.recv().await.unwrap().into_parts();
        let failure = value.unwrap_err();
        assert_eq!(failure.stage_index, 1);
        assert_eq!(trail[0].stage_index, 0);
        assert_eq!(trail[1].stage_index, 1);
    }

    #[test]
    fn test_spawn_outside_runtime_fails_fast() {
        let (_seed, input) = handoff::<i64>();
        let result = make_stage(|| true, input, MapStage::new("double", |n: &i64| n * 2));
        assert!(matches!(result, Err(SchedulerError::NoRuntime(_))));
    }
}
