use super::core::{PipelineResult, StageTransform};
use super::handoff::{handoff, HandoffPoint, Parcel};
use super::stage::{Gate, Stage};
use super::stages::MapStage;
use crate::cancellation::CancellationFlag;
use crate::config::{SchedulerConfig, DEFAULT_PIPELINE_NAME};
use crate::error::{SchedulerError, SchedulerResult};
use crate::events::{EventEmitter, EventSink, TracingSink};
use crate::payload::Payload;
use crate::yielding::{SleepYield, Yielder};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};
use uuid::Uuid;

/// An ordered chain of stages sharing one cancellation flag
///
/// A pipeline is a reusable recipe: every `start` spawns a fresh set of stage
/// tasks wired through single-slot hand-off points and returns a handle to
/// the last one.
///
/// # Example
/// ```
/// use chunkflow::pipeline::Pipeline;
/// use chunkflow::yielding::CooperativeYield;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let pipeline = Pipeline::builder("arithmetic")
///     .map("double", |n: &i64| n * 2)
///     .map("increment", |n: &i64| n + 1)
///     .yielder(CooperativeYield)
///     .build();
///
/// let handle = pipeline.start(3).unwrap();
/// assert_eq!(handle.value().await.unwrap(), 7);
/// # }
/// ```
pub struct Pipeline<T> {
    name: String,
    stages: Vec<Arc<dyn StageTransform<T>>>,
    yielder: Arc<dyn Yielder>,
    sink: Arc<dyn EventSink>,
}

impl<T: Payload> Pipeline<T> {
    /// Create a new pipeline builder
    pub fn builder(name: impl Into<String>) -> PipelineBuilder<T> {
        PipelineBuilder::new(name)
    }

    /// Get the pipeline name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the number of stages
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Start a run with a fresh cancellation flag
    pub fn start(&self, initial: T) -> SchedulerResult<CompletionHandle<T>> {
        self.start_with_flag(initial, CancellationFlag::new())
    }

    /// Start a run gated by a caller-supplied flag
    ///
    /// Fails synchronously, before any task is spawned, if `initial` is
    /// vacant or no tokio runtime is running.
    pub fn start_with_flag(
        &self,
        initial: T,
        flag: CancellationFlag,
    ) -> SchedulerResult<CompletionHandle<T>> {
        if initial.is_vacant() {
            return Err(SchedulerError::EmptyInitialValue);
        }
        tokio::runtime::Handle::try_current()
            .map_err(|e| SchedulerError::NoRuntime(e.to_string()))?;

        let run_id = Uuid::new_v4();
        let events = EventEmitter::new(Arc::clone(&self.sink), run_id, self.name.as_str());
        let total_stages = self.stages.len();

        info!(
            target: "pipeline",
            %run_id,
            "Starting pipeline '{}' with {} stages",
            self.name,
            total_stages
        );
        let _ = events.pipeline_started(total_stages);

        let gate: Gate = Arc::new(flag.gate());
        let (seed, head) = handoff();

        let tail = self
            .stages
            .iter()
            .enumerate()
            .try_fold(head, |input, (index, transform)| {
                Stage::new(index, Arc::clone(transform), Arc::clone(&gate))
                    .with_total_stages(total_stages)
                    .with_yielder(Arc::clone(&self.yielder))
                    .with_events(events.clone())
                    .spawn(input)
            })?;

        // Head is held by the first stage, or is `tail` when there are none
        let _ = seed.send(Parcel::seed(initial));

        Ok(CompletionHandle {
            output: tail,
            flag,
            events,
            started: Instant::now(),
        })
    }

    /// Start a run and wait for its final value
    pub async fn run(&self, initial: T) -> SchedulerResult<T> {
        self.start(initial)?.value().await
    }
}

/// Caller's end of a pipeline run
///
/// Populated exactly once, whether or not the run was cancelled.
pub struct CompletionHandle<T> {
    output: HandoffPoint<T>,
    flag: CancellationFlag,
    events: EventEmitter,
    started: Instant,
}

impl<T> CompletionHandle<T> {
    pub fn run_id(&self) -> Uuid {
        self.events.run_id()
    }

    /// The flag gating this run, for wiring a cancel control
    pub fn cancellation_flag(&self) -> CancellationFlag {
        self.flag.clone()
    }

    /// Request soft cancellation: stages that have not decided yet pass
    /// their input through
    pub fn cancel(&self) {
        self.flag.cancel();
    }

    /// Wait for the run to finish and report every stage
    pub async fn wait(self) -> SchedulerResult<PipelineResult<T>> {
        let pipeline_name = self.events.pipeline_name().to_string();
        let run_id = self.events.run_id();

        let parcel = self.output.recv().await.map_err(|e| {
            error!(target: "pipeline", %run_id, "Pipeline '{}' lost its output", pipeline_name);
            e
        })?;
        let (output, stage_results) = parcel.into_parts();
        let total_duration = self.started.elapsed();

        let result = PipelineResult {
            pipeline_name,
            run_id,
            output,
            stage_results,
            total_duration,
        };

        match &result.output {
            Ok(_) => {
                info!(
                    target: "pipeline",
                    %run_id,
                    transformed = result.transformed_stages(),
                    passthrough = result.passthrough_stages(),
                    "Pipeline '{}' completed in {:.2}s",
                    result.pipeline_name,
                    total_duration.as_secs_f64()
                );
                let _ = self.events.pipeline_completed(
                    total_duration.as_millis() as u64,
                    result.transformed_stages(),
                    result.passthrough_stages(),
                );
            }
            Err(failure) => {
                error!(
                    target: "pipeline",
                    %run_id,
                    "Pipeline '{}' failed: {}",
                    result.pipeline_name,
                    failure
                );
                let _ = self
                    .events
                    .pipeline_failed(&failure.stage_name, &failure.reason);
            }
        }

        Ok(result)
    }

    /// Wait for the final value; a stage failure becomes `StageFailed`
    pub async fn value(self) -> SchedulerResult<T> {
        self.wait().await?.into_value()
    }
}

/// Builder for constructing pipelines
pub struct PipelineBuilder<T> {
    name: String,
    stages: Vec<Arc<dyn StageTransform<T>>>,
    yielder: Arc<dyn Yielder>,
    sink: Arc<dyn EventSink>,
}

impl<T: Payload> PipelineBuilder<T> {
    /// Create a new pipeline builder with the default timed yield and a
    /// tracing event sink
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stages: Vec::new(),
            yielder: Arc::new(SleepYield::default()),
            sink: Arc::new(TracingSink),
        }
    }

    /// Take the name and yield interval from a config
    pub fn config(mut self, config: &SchedulerConfig) -> Self {
        self.name = config.pipeline_name.clone();
        self.yielder = Arc::new(SleepYield::new(config.yield_interval()));
        self
    }

    /// Add a stage to the pipeline
    pub fn add_stage<S: StageTransform<T> + 'static>(mut self, stage: S) -> Self {
        self.stages.push(Arc::new(stage));
        self
    }

    /// Add a shared stage to the pipeline
    pub fn add_shared_stage(mut self, stage: Arc<dyn StageTransform<T>>) -> Self {
        self.stages.push(stage);
        self
    }

    /// Add a stage that always replaces the value with `f(value)`
    pub fn map<F>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&T) -> T + Send + Sync + 'static,
    {
        self.add_stage(MapStage::new(name, f))
    }

    pub fn yielder<Y: Yielder + 'static>(mut self, yielder: Y) -> Self {
        self.yielder = Arc::new(yielder);
        self
    }

    pub fn event_sink<S: EventSink + 'static>(mut self, sink: S) -> Self {
        self.sink = Arc::new(sink);
        self
    }

    /// Build the pipeline
    pub fn build(self) -> Pipeline<T> {
        Pipeline {
            name: self.name,
            stages: self.stages,
            yielder: self.yielder,
            sink: self.sink,
        }
    }
}

/// Build and start a pipeline from an ordered list of transforms
///
/// Omitting `flag` gives the run a fresh one; it is reachable afterwards
/// through `CompletionHandle::cancellation_flag`. With no transforms the
/// handle resolves to `initial` unchanged.
pub fn build<T: Payload>(
    initial: T,
    stages: Vec<Arc<dyn StageTransform<T>>>,
    flag: Option<CancellationFlag>,
) -> SchedulerResult<CompletionHandle<T>> {
    let pipeline = stages
        .into_iter()
        .fold(Pipeline::builder(DEFAULT_PIPELINE_NAME), |builder, stage| {
            builder.add_shared_stage(stage)
        })
        .build();

    pipeline.start_with_flag(initial, flag.unwrap_or_default())
}
