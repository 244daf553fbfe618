//! Workflow type definitions
//!
//! Supporting types for watermark workflow progress tracking, shared between
//! the pipeline and anything consuming its events.

use serde::{Deserialize, Serialize};

/// Externally observable workflow state
///
/// Idle → FileSelected → Uploading → Uploaded → Submitting → Processing →
/// Completed | Failed | TimedOut
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowState {
    /// Nothing selected
    Idle,
    /// A validated file is held, nothing transmitted yet
    FileSelected,
    /// Transport call in flight
    Uploading,
    /// Transport returned a reference
    Uploaded,
    /// Job request in flight
    Submitting,
    /// Polling the backend for the task status
    Processing,
    /// Task finished with a result payload
    Completed,
    /// Task failed or the status query failed
    Failed,
    /// Advisory timeout elapsed before a terminal status
    TimedOut,
}

impl WorkflowState {
    /// Polling no longer continues from this state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WorkflowState::Completed | WorkflowState::Failed | WorkflowState::TimedOut
        )
    }
}

impl std::fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            WorkflowState::Idle => "IDLE",
            WorkflowState::FileSelected => "FILE_SELECTED",
            WorkflowState::Uploading => "UPLOADING",
            WorkflowState::Uploaded => "UPLOADED",
            WorkflowState::Submitting => "SUBMITTING",
            WorkflowState::Processing => "PROCESSING",
            WorkflowState::Completed => "COMPLETED",
            WorkflowState::Failed => "FAILED",
            WorkflowState::TimedOut => "TIMED_OUT",
        };
        f.write_str(s)
    }
}

/// Watermark operation requested from the job backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Embed a watermark and produce a downloadable document
    Embed,
    /// Extract a watermark from a document
    Extract,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Embed => f.write_str("embed"),
            Operation::Extract => f.write_str("extract"),
        }
    }
}

/// Presentation status of a processing task, derived from backend states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresentationStatus {
    Processing,
    Completed,
    Failed,
}
