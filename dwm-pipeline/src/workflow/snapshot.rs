//! Read-only workflow views

use crate::error::ErrorSummary;
use crate::models::{ProcessingTask, SelectedFile, UploadedReference, WorkflowState};
use serde::Serialize;
use uuid::Uuid;

/// Everything the hosting layer needs to render the workflow
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowSnapshot {
    pub workflow_id: Uuid,
    pub state: WorkflowState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<SelectedFile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploaded: Option<UploadedReference>,
    pub upload_progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task: Option<ProcessingTask>,
    pub poll_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_ms: Option<u64>,
    /// Set when the advisory timeout fired
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_notice: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<ErrorSummary>,
}
