//! Scripted collaborators for tests
//!
//! In-memory implementations of the client traits whose responses are fixed
//! up front. Delays use `tokio::time::sleep`, so they follow paused test time.

use crate::clients::{FileTransport, JobBackend, PolicyStore, StatusResponse, SubmitResponse};
use crate::error::{BackendError, TransportError};
use crate::models::{Operation, Policy, SelectedFile, UploadedReference};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

/// File transport returning a fixed outcome after an optional delay
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    outcome: Option<Result<UploadedReference, TransportError>>,
    delay: Duration,
    calls: AtomicUsize,
}

impl ScriptedTransport {
    /// Succeeds with `mem://<name>` for every upload
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_outcome(mut self, outcome: Result<UploadedReference, TransportError>) -> Self {
        self.outcome = Some(outcome);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn upload_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FileTransport for ScriptedTransport {
    async fn upload(&self, file: &SelectedFile) -> Result<UploadedReference, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match &self.outcome {
            Some(outcome) => outcome.clone(),
            None => Ok(UploadedReference {
                file_url: format!("mem://{}", file.name()),
                file_name: file.name().to_string(),
                file_size_bytes: file.size_bytes(),
            }),
        }
    }
}

/// Job backend replaying a queue of status responses
///
/// Once the queue is drained every further query returns the fallback
/// (a bare `processing` at 0% unless set).
#[derive(Debug)]
pub struct ScriptedBackend {
    submit_outcome: Result<SubmitResponse, BackendError>,
    statuses: Mutex<VecDeque<Result<StatusResponse, BackendError>>>,
    fallback: StatusResponse,
    status_delay: Duration,
    submissions: Mutex<Vec<(Operation, String, Option<String>)>>,
    submit_calls: AtomicUsize,
    status_calls: AtomicUsize,
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self {
            submit_outcome: Ok(SubmitResponse {
                task_id: "task-1".to_string(),
            }),
            statuses: Mutex::new(VecDeque::new()),
            fallback: StatusResponse::processing(0.0),
            status_delay: Duration::ZERO,
            submissions: Mutex::new(Vec::new()),
            submit_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
        }
    }
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_task_id(mut self, task_id: impl Into<String>) -> Self {
        self.submit_outcome = Ok(SubmitResponse {
            task_id: task_id.into(),
        });
        self
    }

    pub fn with_submit_error(mut self, error: BackendError) -> Self {
        self.submit_outcome = Err(error);
        self
    }

    pub fn with_statuses(mut self, statuses: Vec<Result<StatusResponse, BackendError>>) -> Self {
        self.statuses = Mutex::new(statuses.into());
        self
    }

    pub fn with_fallback_status(mut self, fallback: StatusResponse) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn with_status_delay(mut self, delay: Duration) -> Self {
        self.status_delay = delay;
        self
    }

    pub async fn push_status(&self, status: Result<StatusResponse, BackendError>) {
        self.statuses.lock().await.push_back(status);
    }

    pub fn submit_calls(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    /// Most recent submission as (operation, file url, watermark text)
    pub async fn last_submission(&self) -> Option<(Operation, String, Option<String>)> {
        self.submissions.lock().await.last().cloned()
    }

    async fn record_submission(&self, entry: (Operation, String, Option<String>)) {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        self.submissions.lock().await.push(entry);
    }
}

#[async_trait]
impl JobBackend for ScriptedBackend {
    async fn submit_embed(
        &self,
        file_url: &str,
        watermark_text: &str,
    ) -> Result<SubmitResponse, BackendError> {
        self.record_submission((
            Operation::Embed,
            file_url.to_string(),
            Some(watermark_text.to_string()),
        ))
        .await;
        self.submit_outcome.clone()
    }

    async fn submit_extract(&self, file_url: &str) -> Result<SubmitResponse, BackendError> {
        self.record_submission((Operation::Extract, file_url.to_string(), None))
            .await;
        self.submit_outcome.clone()
    }

    async fn get_status(&self, _task_id: &str) -> Result<StatusResponse, BackendError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        if !self.status_delay.is_zero() {
            tokio::time::sleep(self.status_delay).await;
        }

        let next = self.statuses.lock().await.pop_front();
        next.unwrap_or_else(|| Ok(self.fallback.clone()))
    }
}

/// Policy store with a fixed list
#[derive(Debug, Default)]
pub struct StaticPolicyStore {
    policies: Vec<Policy>,
    error: Option<BackendError>,
}

impl StaticPolicyStore {
    pub fn new(policies: Vec<Policy>) -> Self {
        Self {
            policies,
            error: None,
        }
    }

    pub fn failing(error: BackendError) -> Self {
        Self {
            policies: Vec::new(),
            error: Some(error),
        }
    }
}

#[async_trait]
impl PolicyStore for StaticPolicyStore {
    async fn list_active_policies(&self) -> Result<Vec<Policy>, BackendError> {
        match &self.error {
            Some(error) => Err(error.clone()),
            None => Ok(self.policies.clone()),
        }
    }
}
