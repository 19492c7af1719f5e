use crate::pipeline::StageStatus;
use crate::state_machine::StagePhase;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info};
use uuid::Uuid;

/// Event names - centralized for consistency
pub mod event_names {
    pub const PIPELINE_STARTED: &str = "pipeline:started";
    pub const PIPELINE_STAGE_PHASE: &str = "pipeline:stage-phase";
    pub const PIPELINE_STAGE_COMPLETED: &str = "pipeline:stage-completed";
    pub const PIPELINE_STAGE_FAILED: &str = "pipeline:stage-failed";
    pub const PIPELINE_COMPLETED: &str = "pipeline:completed";
    pub const PIPELINE_FAILED: &str = "pipeline:failed";
}

/// Pipeline started event
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineStartedEvent {
    pub run_id: Uuid,
    pub pipeline_name: String,
    pub total_stages: usize,
    pub timestamp: String,
}

/// Stage phase changed event (fine-grained progress)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StagePhaseEvent {
    pub run_id: Uuid,
    pub stage_name: String,
    pub stage_index: usize,
    pub phase: StagePhase,
    pub timestamp: String,
}

/// Stage completed event, whatever the stage decided to do
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageCompletedEvent {
    pub run_id: Uuid,
    pub stage_name: String,
    pub stage_index: usize,
    pub total_stages: usize,
    pub status: StageStatus,
    pub duration_ms: u64,
    pub timestamp: String,
}

/// Stage failed event
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageFailedEvent {
    pub run_id: Uuid,
    pub stage_name: String,
    pub stage_index: usize,
    pub error: String,
    pub timestamp: String,
}

/// Pipeline completed event
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineCompletedEvent {
    pub run_id: Uuid,
    pub pipeline_name: String,
    pub total_duration_ms: u64,
    pub stages_transformed: usize,
    pub stages_passed_through: usize,
    pub timestamp: String,
}

/// Pipeline failed event
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineFailedEvent {
    pub run_id: Uuid,
    pub pipeline_name: String,
    pub failed_stage: String,
    pub error: String,
    pub timestamp: String,
}

/// Every event a pipeline run can emit
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload")]
pub enum PipelineEvent {
    #[serde(rename = "pipeline:started")]
    Started(PipelineStartedEvent),
    #[serde(rename = "pipeline:stage-phase")]
    StagePhase(StagePhaseEvent),
    #[serde(rename = "pipeline:stage-completed")]
    StageCompleted(StageCompletedEvent),
    #[serde(rename = "pipeline:stage-failed")]
    StageFailed(StageFailedEvent),
    #[serde(rename = "pipeline:completed")]
    Completed(PipelineCompletedEvent),
    #[serde(rename = "pipeline:failed")]
    Failed(PipelineFailedEvent),
}

impl PipelineEvent {
    pub fn name(&self) -> &'static str {
        match self {
            PipelineEvent::Started(_) => event_names::PIPELINE_STARTED,
            PipelineEvent::StagePhase(_) => event_names::PIPELINE_STAGE_PHASE,
            PipelineEvent::StageCompleted(_) => event_names::PIPELINE_STAGE_COMPLETED,
            PipelineEvent::StageFailed(_) => event_names::PIPELINE_STAGE_FAILED,
            PipelineEvent::Completed(_) => event_names::PIPELINE_COMPLETED,
            PipelineEvent::Failed(_) => event_names::PIPELINE_FAILED,
        }
    }

    pub fn run_id(&self) -> Uuid {
        match self {
            PipelineEvent::Started(e) => e.run_id,
            PipelineEvent::StagePhase(e) => e.run_id,
            PipelineEvent::StageCompleted(e) => e.run_id,
            PipelineEvent::StageFailed(e) => e.run_id,
            PipelineEvent::Completed(e) => e.run_id,
            PipelineEvent::Failed(e) => e.run_id,
        }
    }
}

/// Destination for pipeline events
///
/// A UI collaborator implements this (or uses `ChannelSink`) to drive a
/// progress indicator. Emission errors never affect the pipeline.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: PipelineEvent) -> Result<(), String>;
}

/// Logs every event through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: PipelineEvent) -> Result<(), String> {
        let payload = serde_json::to_string(&event)
            .map_err(|e| format!("Failed to serialize {} event: {}", event.name(), e))?;

        match &event {
            PipelineEvent::StagePhase(_) => {
                debug!(target: "pipeline::events", event = event.name(), %payload)
            }
            PipelineEvent::StageFailed(_) | PipelineEvent::Failed(_) => {
                error!(target: "pipeline::events", event = event.name(), %payload)
            }
            _ => info!(target: "pipeline::events", event = event.name(), %payload),
        }
        Ok(())
    }
}

/// Drops every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: PipelineEvent) -> Result<(), String> {
        Ok(())
    }
}

/// Forwards events into an unbounded tokio channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: mpsc::UnboundedSender<PipelineEvent>,
}

impl ChannelSink {
    /// Create a sink and the receiver a UI task reads progress from
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<PipelineEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: PipelineEvent) -> Result<(), String> {
        let name = event.name();
        self.sender
            .send(event)
            .map_err(|_| format!("Failed to emit {} event: receiver dropped", name))
    }
}

/// Event emitter bound to one pipeline run
#[derive(Clone)]
pub struct EventEmitter {
    sink: Arc<dyn EventSink>,
    run_id: Uuid,
    pipeline_name: Arc<str>,
}

impl fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventEmitter")
            .field("run_id", &self.run_id)
            .field("pipeline_name", &self.pipeline_name)
            .finish()
    }
}

impl EventEmitter {
    pub fn new(sink: Arc<dyn EventSink>, run_id: Uuid, pipeline_name: impl Into<Arc<str>>) -> Self {
        Self {
            sink,
            run_id,
            pipeline_name: pipeline_name.into(),
        }
    }

    /// Emitter that discards everything, for stages built outside a pipeline
    pub fn detached(pipeline_name: impl Into<Arc<str>>) -> Self {
        Self::new(Arc::new(NullSink), Uuid::new_v4(), pipeline_name)
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn pipeline_name(&self) -> &str {
        &self.pipeline_name
    }

    fn timestamp() -> String {
        chrono::Utc::now().to_rfc3339()
    }

    /// Emit pipeline started event
    pub fn pipeline_started(&self, total_stages: usize) -> Result<(), String> {
        self.sink.emit(PipelineEvent::Started(PipelineStartedEvent {
            run_id: self.run_id,
            pipeline_name: self.pipeline_name.to_string(),
            total_stages,
            timestamp: Self::timestamp(),
        }))
    }

    /// Emit stage phase changed event
    pub fn stage_phase_changed(
        &self,
        stage_name: &str,
        stage_index: usize,
        phase: StagePhase,
    ) -> Result<(), String> {
        self.sink.emit(PipelineEvent::StagePhase(StagePhaseEvent {
            run_id: self.run_id,
            stage_name: stage_name.to_string(),
            stage_index,
            phase,
            timestamp: Self::timestamp(),
        }))
    }

    /// Emit stage completed event
    pub fn stage_completed(
        &self,
        stage_name: &str,
        stage_index: usize,
        total_stages: usize,
        status: StageStatus,
        duration_ms: u64,
    ) -> Result<(), String> {
        self.sink.emit(PipelineEvent::StageCompleted(StageCompletedEvent {
            run_id: self.run_id,
            stage_name: stage_name.to_string(),
            stage_index,
            total_stages,
            status,
            duration_ms,
            timestamp: Self::timestamp(),
        }))
    }

    /// Emit stage failed event
    pub fn stage_failed(
        &self,
        stage_name: &str,
        stage_index: usize,
        error: &str,
    ) -> Result<(), String> {
        self.sink.emit(PipelineEvent::StageFailed(StageFailedEvent {
            run_id: self.run_id,
            stage_name: stage_name.to_string(),
            stage_index,
            error: error.to_string(),
            timestamp: Self::timestamp(),
        }))
    }

    /// Emit pipeline completed event
    pub fn pipeline_completed(
        &self,
        total_duration_ms: u64,
        stages_transformed: usize,
        stages_passed_through: usize,
    ) -> Result<(), String> {
        self.sink.emit(PipelineEvent::Completed(PipelineCompletedEvent {
            run_id: self.run_id,
            pipeline_name: self.pipeline_name.to_string(),
            total_duration_ms,
            stages_transformed,
            stages_passed_through,
            timestamp: Self::timestamp(),
        }))
    }

    /// Emit pipeline failed event
    pub fn pipeline_failed(&self, failed_stage: &str, error: &str) -> Result<(), String> {
        self.sink.emit(PipelineEvent::Failed(PipelineFailedEvent {
            run_id: self.run_id,
            pipeline_name: self.pipeline_name.to_string(),
            failed_stage: failed_stage.to_string(),
            error: error.to_string(),
            timestamp: Self::timestamp(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_sink_delivers_in_order() {
        let (sink, mut receiver) = ChannelSink::channel();
        let emitter = EventEmitter::new(Arc::new(sink), Uuid::new_v4(), "test-pipeline");

        emitter.pipeline_started(2).unwrap();
        emitter
            .stage_completed("double", 0, 2, StageStatus::Transformed, 3)
            .unwrap();

        let first = receiver.try_recv().unwrap();
        let second = receiver.try_recv().unwrap();
        assert_eq!(first.name(), event_names::PIPELINE_STARTED);
        assert_eq!(second.name(), event_names::PIPELINE_STAGE_COMPLETED);
        assert_eq!(first.run_id(), emitter.run_id());
    }

    #[test]
    fn test_channel_sink_reports_dropped_receiver() {
        let (sink, receiver) = ChannelSink::channel();
        drop(receiver);
        let emitter = EventEmitter::new(Arc::new(sink), Uuid::new_v4(), "test-pipeline");

        let err = emitter.pipeline_started(1).unwrap_err();
        assert!(err.contains("pipeline:started"));
    }

    #[test]
    fn test_event_serialization_shape() {
        let emitter = EventEmitter::detached("shape");
        let event = PipelineEvent::StagePhase(StagePhaseEvent {
            run_id: emitter.run_id(),
            stage_name: "double".to_string(),
            stage_index: 0,
            phase: StagePhase::Suspended,
            timestamp: "2024-01-01T00:00:00Z".to_string(),
        });

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "pipeline:stage-phase");
        assert_eq!(json["payload"]["stageName"], "double");
        assert_eq!(json["payload"]["phase"], "suspended");
    }

    #[test]
    fn test_tracing_and_null_sinks_accept_events() {
        let emitter = EventEmitter::new(Arc::new(TracingSink), Uuid::new_v4(), "logged");
        assert!(emitter.pipeline_failed("double", "boom").is_ok());

        let detached = EventEmitter::detached("quiet");
        assert!(detached.pipeline_completed(10, 1, 0).is_ok());
    }
}
