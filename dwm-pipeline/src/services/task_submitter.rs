//! Remote job submission
//!
//! Turns an uploaded file plus operation parameters into exactly one backend
//! job request. Embed parameters are validated before the request is built.

use crate::clients::JobBackend;
use crate::error::{ValidationError, WorkflowError};
use crate::models::{Operation, ProcessingTask, UploadedReference};
use serde::{Deserialize, Serialize};

/// Operation parameters supplied by the operator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitParams {
    /// Selected policy (embed only)
    #[serde(default)]
    pub policy_id: Option<String>,
    /// Text to embed (embed only)
    #[serde(default)]
    pub watermark_text: Option<String>,
}

impl SubmitParams {
    pub fn embed(policy_id: impl Into<String>, watermark_text: impl Into<String>) -> Self {
        Self {
            policy_id: Some(policy_id.into()),
            watermark_text: Some(watermark_text.into()),
        }
    }

    pub fn extract() -> Self {
        Self::default()
    }
}

/// Builds and sends job requests
#[derive(Debug, Clone)]
pub struct TaskSubmitter {
    initial_progress: u8,
}

impl TaskSubmitter {
    pub fn new(initial_progress: u8) -> Self {
        Self { initial_progress }
    }

    /// Check operation parameters without touching the network
    pub fn validate(operation: Operation, params: &SubmitParams) -> Result<(), ValidationError> {
        if operation == Operation::Extract {
            return Ok(());
        }

        if non_blank(params.policy_id.as_deref()).is_none() {
            return Err(ValidationError::MissingPolicy);
        }
        if non_blank(params.watermark_text.as_deref()).is_none() {
            return Err(ValidationError::MissingWatermarkText);
        }
        Ok(())
    }

    /// Submit one job and return the new task in `processing`
    pub async fn submit(
        &self,
        backend: &dyn JobBackend,
        operation: Operation,
        uploaded: &UploadedReference,
        params: &SubmitParams,
    ) -> Result<ProcessingTask, WorkflowError> {
        Self::validate(operation, params)?;

        let response = match operation {
            Operation::Embed => {
                // validate() guarantees presence
                let text = params.watermark_text.as_deref().unwrap_or_default();
                backend.submit_embed(&uploaded.file_url, text).await
            }
            Operation::Extract => backend.submit_extract(&uploaded.file_url).await,
        };

        let submitted = response.map_err(|e| {
            tracing::warn!(operation = %operation, error = %e, "Job submission rejected");
            WorkflowError::SubmissionFailed(e.to_string())
        })?;

        tracing::info!(
            operation = %operation,
            task_id = %submitted.task_id,
            file_url = %uploaded.file_url,
            policy_id = params.policy_id.as_deref().unwrap_or("-"),
            "Job submitted"
        );

        Ok(ProcessingTask::new(
            submitted.task_id,
            operation,
            self.initial_progress,
        ))
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
