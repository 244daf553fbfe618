//! Processing task record
//!
//! Created when the backend returns a task identifier and mutated only by the
//! polling engine. `result` is populated only in `completed`, `error` only in
//! `failed`; the mutators below are the only way to change either.

use chrono::{DateTime, Utc};
use dwm_common::events::{Operation, PresentationStatus};
use serde::{Deserialize, Serialize};

/// Result payload attached by the backend when a task finishes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResult {
    /// Watermarked document locator (embed)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    /// Recovered watermark content (extract)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_content: Option<String>,
    /// Extraction confidence (extract)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

/// In-flight or finished watermark job
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingTask {
    task_id: String,
    operation: Operation,
    status: PresentationStatus,
    progress_percent: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    estimated_time_remaining: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<TaskResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ended_at: Option<DateTime<Utc>>,
}

impl ProcessingTask {
    /// New task in `processing` with an advisory starting progress
    pub fn new(task_id: impl Into<String>, operation: Operation, initial_progress: u8) -> Self {
        Self {
            task_id: task_id.into(),
            operation,
            status: PresentationStatus::Processing,
            progress_percent: initial_progress.min(100),
            estimated_time_remaining: None,
            result: None,
            error: None,
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn status(&self) -> PresentationStatus {
        self.status
    }

    pub fn progress_percent(&self) -> u8 {
        self.progress_percent
    }

    pub fn estimated_time_remaining(&self) -> Option<&str> {
        self.estimated_time_remaining.as_deref()
    }

    pub fn result(&self) -> Option<&TaskResult> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self.status, PresentationStatus::Processing)
    }

    /// Apply reported progress and estimate
    ///
    /// Progress never decreases while the task is processing. Ignored once
    /// the task is terminal.
    pub(crate) fn update_progress(&mut self, reported_percent: u8, estimate: Option<String>) {
        if self.is_terminal() {
            return;
        }
        self.progress_percent = self.progress_percent.max(reported_percent.min(100));
        self.estimated_time_remaining = estimate;
    }

    pub(crate) fn complete(&mut self, result: TaskResult) {
        self.status = PresentationStatus::Completed;
        self.progress_percent = 100;
        self.result = Some(result);
        self.error = None;
        self.ended_at = Some(Utc::now());
    }

    pub(crate) fn fail(&mut self, message: impl Into<String>) {
        self.status = PresentationStatus::Failed;
        self.progress_percent = 0;
        self.result = None;
        self.error = Some(message.into());
        self.ended_at = Some(Utc::now());
    }
}

/// Clamp a raw backend progress value to a whole percentage
pub(crate) fn percent_from_raw(raw: f64) -> u8 {
    if raw.is_nan() {
        return 0;
    }
    raw.clamp(0.0, 100.0).round() as u8
}
