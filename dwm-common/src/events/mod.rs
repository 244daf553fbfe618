//! Event types for the DWM event system
//!
//! Provides shared event definitions and the EventBus used to publish
//! workflow progress to observers (SSE clients, logs, tests).

mod workflow_types;

pub use workflow_types::{Operation, PresentationStatus, WorkflowState};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Workflow event types
///
/// Events are broadcast via EventBus and can be serialized for SSE transmission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WorkflowEvent {
    /// Workflow moved between observable states
    StateChanged {
        workflow_id: Uuid,
        old_state: WorkflowState,
        new_state: WorkflowState,
        timestamp: DateTime<Utc>,
    },

    /// Simulated upload progress changed
    UploadProgress {
        workflow_id: Uuid,
        percent: u8,
        timestamp: DateTime<Utc>,
    },

    /// A status query returned and was recorded in the poll log
    PollRecorded {
        workflow_id: Uuid,
        task_id: String,
        sequence: u64,
        backend_status: String,
        progress: u8,
        has_result: bool,
        timestamp: DateTime<Utc>,
    },

    /// Task reached `completed` with a result payload
    TaskCompleted {
        workflow_id: Uuid,
        task_id: String,
        operation: Operation,
        timestamp: DateTime<Utc>,
    },

    /// Task failed (backend-reported or status query failure)
    TaskFailed {
        workflow_id: Uuid,
        task_id: String,
        error: String,
        timestamp: DateTime<Utc>,
    },

    /// Advisory timeout: polling stopped without a terminal status
    ProcessingTimedOut {
        workflow_id: Uuid,
        task_id: String,
        message: String,
        timestamp: DateTime<Utc>,
    },
}

impl WorkflowEvent {
    /// Event name used as the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            WorkflowEvent::StateChanged { .. } => "StateChanged",
            WorkflowEvent::UploadProgress { .. } => "UploadProgress",
            WorkflowEvent::PollRecorded { .. } => "PollRecorded",
            WorkflowEvent::TaskCompleted { .. } => "TaskCompleted",
            WorkflowEvent::TaskFailed { .. } => "TaskFailed",
            WorkflowEvent::ProcessingTimedOut { .. } => "ProcessingTimedOut",
        }
    }

    /// Workflow instance that produced the event
    pub fn workflow_id(&self) -> Uuid {
        match self {
            WorkflowEvent::StateChanged { workflow_id, .. }
            | WorkflowEvent::UploadProgress { workflow_id, .. }
            | WorkflowEvent::PollRecorded { workflow_id, .. }
            | WorkflowEvent::TaskCompleted { workflow_id, .. }
            | WorkflowEvent::TaskFailed { workflow_id, .. }
            | WorkflowEvent::ProcessingTimedOut { workflow_id, .. } => *workflow_id,
        }
    }
}

/// Broadcast bus for workflow events
///
/// Cloning is cheap; all clones share the same channel.
#[derive(Clone, Debug)]
pub struct EventBus {
    tx: broadcast::Sender<WorkflowEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of events to buffer before dropping old events
    ///
    /// # Examples
    ///
    /// ```
    /// use dwm_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(100);
    /// assert_eq!(event_bus.capacity(), 100);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: WorkflowEvent,
    ) -> Result<usize, broadcast::error::SendError<WorkflowEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: WorkflowEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
