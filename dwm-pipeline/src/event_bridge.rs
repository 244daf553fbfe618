//! Bridge from pipeline components to the EventBus
//!
//! Components hold a cloned `EventReporter` tagged with their workflow id and
//! call its typed methods; the reporter builds the `WorkflowEvent` and emits it
//! lossily (no subscribers is not an error).

use crate::models::{Operation, PollLogEntry, WorkflowState};
use dwm_common::events::{EventBus, WorkflowEvent};
use dwm_common::time::now;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct EventReporter {
    bus: EventBus,
    workflow_id: Uuid,
}

impl EventReporter {
    pub fn new(bus: EventBus, workflow_id: Uuid) -> Self {
        Self { bus, workflow_id }
    }

    /// Reporter on a private bus nobody listens to
    pub fn detached() -> Self {
        Self::new(EventBus::new(16), Uuid::new_v4())
    }

    pub fn workflow_id(&self) -> Uuid {
        self.workflow_id
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn state_changed(&self, old_state: WorkflowState, new_state: WorkflowState) {
        if old_state == new_state {
            return;
        }
        tracing::info!(
            workflow_id = %self.workflow_id,
            from = %old_state,
            to = %new_state,
            "Workflow state changed"
        );
        self.bus.emit_lossy(WorkflowEvent::StateChanged {
            workflow_id: self.workflow_id,
            old_state,
            new_state,
            timestamp: now(),
        });
    }

    pub fn upload_progress(&self, percent: u8) {
        self.bus.emit_lossy(WorkflowEvent::UploadProgress {
            workflow_id: self.workflow_id,
            percent,
            timestamp: now(),
        });
    }

    pub fn poll_recorded(&self, task_id: &str, entry: &PollLogEntry, progress: u8) {
        self.bus.emit_lossy(WorkflowEvent::PollRecorded {
            workflow_id: self.workflow_id,
            task_id: task_id.to_string(),
            sequence: entry.sequence,
            backend_status: entry.backend_status.clone(),
            progress,
            has_result: entry.has_result,
            timestamp: entry.polled_at,
        });
    }

    pub fn task_completed(&self, task_id: &str, operation: Operation) {
        self.bus.emit_lossy(WorkflowEvent::TaskCompleted {
            workflow_id: self.workflow_id,
            task_id: task_id.to_string(),
            operation,
            timestamp: now(),
        });
    }

    pub fn task_failed(&self, task_id: &str, error: &str) {
        self.bus.emit_lossy(WorkflowEvent::TaskFailed {
            workflow_id: self.workflow_id,
            task_id: task_id.to_string(),
            error: error.to_string(),
            timestamp: now(),
        });
    }

    pub fn processing_timed_out(&self, task_id: &str, message: &str) {
        self.bus.emit_lossy(WorkflowEvent::ProcessingTimedOut {
            workflow_id: self.workflow_id,
            task_id: task_id.to_string(),
            message: message.to_string(),
            timestamp: now(),
        });
    }
}
