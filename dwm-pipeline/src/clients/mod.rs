//! External collaborators
//!
//! The pipeline talks to three services through narrow async traits:
//! - `FileTransport`: stores a binary blob and returns a stable reference
//! - `JobBackend`: accepts embed/extract jobs and reports task status
//! - `PolicyStore`: lists active policies (opaque to the pipeline)
//!
//! `http` provides reqwest-backed implementations of all three.

pub mod http;

use crate::error::{BackendError, TransportError};
use crate::models::{Policy, SelectedFile, TaskResult, UploadedReference};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use http::HttpBackendClient;

/// Stores a selected file and returns where it can be found
#[async_trait]
pub trait FileTransport: Send + Sync {
    async fn upload(&self, file: &SelectedFile) -> Result<UploadedReference, TransportError>;
}

/// Remote watermark job service
#[async_trait]
pub trait JobBackend: Send + Sync {
    async fn submit_embed(
        &self,
        file_url: &str,
        watermark_text: &str,
    ) -> Result<SubmitResponse, BackendError>;

    async fn submit_extract(&self, file_url: &str) -> Result<SubmitResponse, BackendError>;

    async fn get_status(&self, task_id: &str) -> Result<StatusResponse, BackendError>;
}

/// Read-only source of policy bundles
#[async_trait]
pub trait PolicyStore: Send + Sync {
    async fn list_active_policies(&self) -> Result<Vec<Policy>, BackendError>;
}

/// Job creation response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub task_id: String,
}

/// Status query response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    /// "processing" | "finished" | "failed"; anything else counts as processing
    pub status: String,
    #[serde(default)]
    pub progress: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<TaskResult>,
    /// Failure reason, when the backend provides one
    #[serde(default, alias = "message", skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Backend-reported task state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendStatus {
    Finished,
    Failed,
    /// `processing` or any unrecognised value
    Processing,
}

impl StatusResponse {
    pub fn backend_status(&self) -> BackendStatus {
        match self.status.as_str() {
            "finished" => BackendStatus::Finished,
            "failed" => BackendStatus::Failed,
            _ => BackendStatus::Processing,
        }
    }

    /// Convenience constructor for a non-terminal response
    pub fn processing(progress: f64) -> Self {
        Self {
            status: "processing".to_string(),
            progress,
            estimated_time: None,
            result: None,
            error: None,
        }
    }

    pub fn finished(progress: f64, result: Option<TaskResult>) -> Self {
        Self {
            status: "finished".to_string(),
            progress,
            estimated_time: None,
            result,
            error: None,
        }
    }

    pub fn failed(error: Option<String>) -> Self {
        Self {
            status: "failed".to_string(),
            progress: 0.0,
            estimated_time: None,
            result: None,
            error,
        }
    }

    pub fn with_estimate(mut self, estimate: impl Into<String>) -> Self {
        self.estimated_time = Some(estimate.into());
        self
    }
}
