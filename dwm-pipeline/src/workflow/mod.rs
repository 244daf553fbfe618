//! Document watermark workflow
//!
//! Composes intake, upload tracking, submission and polling into one
//! observable state machine:
//!
//! ```text
//! Idle → FileSelected → Uploading → Uploaded → Submitting → Processing
//!            ↑              │                      │             │
//!            └── (failure) ─┘      Uploaded ←──────┘     Completed | Failed | TimedOut
//! ```
//!
//! Any state returns to `Idle` through `reset()`, which stops polling before
//! discarding anything. Selecting a file outside `Idle` resets first.
//!
//! Operations return their error and also record it in `last_error`, so the
//! hosting layer can render failures from the snapshot alone. Upload and
//! submission release the state lock while the network call is in flight; an
//! epoch counter discards completions that land after a reset or reselection.

pub mod snapshot;

pub use snapshot::WorkflowSnapshot;

use crate::clients::{FileTransport, JobBackend, PolicyStore};
use crate::error::{ErrorSummary, WorkflowError};
use crate::event_bridge::EventReporter;
use crate::models::{
    Operation, PollLogEntry, Policy, ProcessingTask, SelectedFile, UploadedReference,
    WorkflowState,
};
use crate::services::{
    FileIntake, PollingEngine, SubmitParams, TaskSubmitter, TimerCounts, UploadTracker,
};
use dwm_common::config::PipelineConfig;
use dwm_common::events::EventBus;
use std::sync::Arc;
use tokio::sync::{watch, Mutex, MutexGuard};
use uuid::Uuid;

/// External services a workflow talks to
#[derive(Clone)]
pub struct Collaborators {
    pub transport: Arc<dyn FileTransport>,
    pub backend: Arc<dyn JobBackend>,
    pub policies: Arc<dyn PolicyStore>,
}

impl Collaborators {
    /// One client serving all three roles
    pub fn shared<C>(client: Arc<C>) -> Self
    where
        C: FileTransport + JobBackend + PolicyStore + 'static,
    {
        Self {
            transport: client.clone(),
            backend: client.clone(),
            policies: client,
        }
    }
}

#[derive(Debug)]
struct WorkflowInner {
    /// `Processing` hands presentation over to the polling engine
    state: WorkflowState,
    epoch: u64,
    selected: Option<SelectedFile>,
    uploaded: Option<UploadedReference>,
    last_error: Option<ErrorSummary>,
}

impl Default for WorkflowInner {
    fn default() -> Self {
        Self {
            state: WorkflowState::Idle,
            epoch: 0,
            selected: None,
            uploaded: None,
            last_error: None,
        }
    }
}

impl WorkflowInner {
    fn record(&mut self, err: WorkflowError) -> WorkflowError {
        tracing::warn!(code = err.code(), error = %err, "Workflow operation failed");
        self.last_error = Some(err.summary());
        err
    }
}

/// One document watermark workflow instance
pub struct Workflow {
    id: Uuid,
    intake: FileIntake,
    tracker: UploadTracker,
    submitter: TaskSubmitter,
    engine: PollingEngine,
    collaborators: Collaborators,
    reporter: EventReporter,
    inner: Mutex<WorkflowInner>,
}

impl Workflow {
    pub fn new(config: &PipelineConfig, collaborators: Collaborators, event_bus: EventBus) -> Self {
        let id = Uuid::new_v4();
        let reporter = EventReporter::new(event_bus, id);

        Self {
            id,
            intake: FileIntake::new(&config.intake),
            tracker: UploadTracker::new(config.upload.clone(), reporter.clone()),
            submitter: TaskSubmitter::new(config.polling.initial_progress),
            engine: PollingEngine::new(
                Arc::clone(&collaborators.backend),
                config.polling.clone(),
                reporter.clone(),
            ),
            collaborators,
            reporter,
            inner: Mutex::new(WorkflowInner::default()),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn intake(&self) -> &FileIntake {
        &self.intake
    }

    /// Current externally visible state
    pub async fn state(&self) -> WorkflowState {
        let inner = self.inner.lock().await;
        self.resolve_state(&inner).await
    }

    /// Validate and select a file, discarding any previous workflow state
    ///
    /// A rejected file leaves the state and the current selection untouched.
    pub async fn select(
        &self,
        file_name: impl Into<String>,
        content: impl Into<Arc<[u8]>>,
    ) -> Result<(), WorkflowError> {
        let selection = self.intake.select(file_name, content);

        let mut inner = self.inner.lock().await;
        let file = match selection {
            Ok(file) => file,
            Err(e) => return Err(inner.record(e.into())),
        };

        let previous = self.resolve_state(&inner).await;
        if previous != WorkflowState::Idle {
            tracing::info!(from = %previous, "New selection replaces current workflow");
            self.discard(&mut inner, previous).await;
        }

        tracing::info!(
            file_name = %file.name(),
            size_bytes = file.size_bytes(),
            "File selected"
        );
        inner.selected = Some(file);
        inner.state = WorkflowState::FileSelected;
        self.reporter
            .state_changed(WorkflowState::Idle, WorkflowState::FileSelected);
        Ok(())
    }

    /// Upload the selected file
    ///
    /// On failure the selection is kept and the workflow returns to
    /// `FileSelected` so the upload can be retried.
    pub async fn upload(&self) -> Result<(), WorkflowError> {
        let (file, epoch) = {
            let mut inner = self.inner.lock().await;
            let file = match (inner.state, inner.selected.clone()) {
                (WorkflowState::FileSelected, Some(file)) => file,
                _ => {
                    let state = self.resolve_state(&inner).await;
                    return Err(inner.record(WorkflowError::InvalidState {
                        action: "upload",
                        state,
                    }));
                }
            };
            inner.state = WorkflowState::Uploading;
            inner.last_error = None;
            (file, inner.epoch)
        };
        self.reporter
            .state_changed(WorkflowState::FileSelected, WorkflowState::Uploading);

        let outcome = self
            .tracker
            .upload(self.collaborators.transport.as_ref(), &file)
            .await;

        let mut inner = self.inner.lock().await;
        if inner.epoch != epoch {
            tracing::debug!(file_name = %file.name(), "Discarding upload result after reset");
            return Err(WorkflowError::Superseded);
        }

        match outcome {
            Ok(reference) => {
                inner.uploaded = Some(reference);
                inner.state = WorkflowState::Uploaded;
                self.reporter
                    .state_changed(WorkflowState::Uploading, WorkflowState::Uploaded);
                Ok(())
            }
            Err(e) => {
                inner.state = WorkflowState::FileSelected;
                self.reporter
                    .state_changed(WorkflowState::Uploading, WorkflowState::FileSelected);
                Err(inner.record(e.into()))
            }
        }
    }

    /// Submit the uploaded file and start polling the new task
    ///
    /// Parameters are validated before any state change. A backend rejection
    /// leaves the workflow in `Uploaded` so it can be resubmitted.
    pub async fn submit(
        &self,
        operation: Operation,
        params: SubmitParams,
    ) -> Result<(), WorkflowError> {
        let (uploaded, epoch) = {
            let mut inner = self.inner.lock().await;
            let uploaded = match (inner.state, inner.uploaded.clone()) {
                (WorkflowState::Uploaded, Some(uploaded)) => uploaded,
                _ => {
                    let state = self.resolve_state(&inner).await;
                    return Err(inner.record(WorkflowError::InvalidState {
                        action: "submit",
                        state,
                    }));
                }
            };
            if let Err(e) = TaskSubmitter::validate(operation, &params) {
                return Err(inner.record(e.into()));
            }
            inner.state = WorkflowState::Submitting;
            inner.last_error = None;
            (uploaded, inner.epoch)
        };
        self.reporter
            .state_changed(WorkflowState::Uploaded, WorkflowState::Submitting);

        let outcome = self
            .submitter
            .submit(
                self.collaborators.backend.as_ref(),
                operation,
                &uploaded,
                &params,
            )
            .await;

        let mut inner = self.inner.lock().await;
        if inner.epoch != epoch {
            if let Ok(task) = &outcome {
                tracing::warn!(task_id = %task.task_id(), "Task created after reset; not polling it");
            }
            return Err(WorkflowError::Superseded);
        }

        match outcome {
            Ok(task) => {
                self.engine.start_polling(task).await;
                inner.state = WorkflowState::Processing;
                self.reporter
                    .state_changed(WorkflowState::Submitting, WorkflowState::Processing);
                Ok(())
            }
            Err(e) => {
                inner.state = WorkflowState::Uploaded;
                self.reporter
                    .state_changed(WorkflowState::Submitting, WorkflowState::Uploaded);
                Err(inner.record(e))
            }
        }
    }

    /// Return to `Idle` from any state. Idempotent.
    pub async fn reset(&self) {
        let mut inner = self.inner.lock().await;
        let previous = self.resolve_state(&inner).await;
        self.discard(&mut inner, previous).await;
        tracing::info!(from = %previous, "Workflow reset");
    }

    pub async fn snapshot(&self) -> WorkflowSnapshot {
        let inner = self.inner.lock().await;
        let state = self.resolve_state(&inner).await;
        let polling = self.engine.snapshot().await;

        WorkflowSnapshot {
            workflow_id: self.id,
            state,
            file: inner.selected.clone(),
            uploaded: inner.uploaded.clone(),
            upload_progress: self.tracker.progress(),
            task: polling.task,
            poll_count: polling.poll_count,
            elapsed_ms: polling.elapsed_ms,
            timeout_notice: polling.timeout_notice,
            last_error: inner.last_error.clone(),
        }
    }

    pub async fn task(&self) -> Option<ProcessingTask> {
        self.engine.task().await
    }

    pub async fn poll_log(&self) -> Vec<PollLogEntry> {
        self.engine.poll_log().await
    }

    pub async fn last_error(&self) -> Option<ErrorSummary> {
        self.inner.lock().await.last_error.clone()
    }

    pub fn upload_progress(&self) -> u8 {
        self.tracker.progress()
    }

    pub fn subscribe_upload_progress(&self) -> watch::Receiver<u8> {
        self.tracker.subscribe()
    }

    /// Live polling timers; never more than one of each
    pub async fn live_timers(&self) -> TimerCounts {
        self.engine.live_timers().await
    }

    /// Active policies for the embed selector
    pub async fn policies(&self) -> Result<Vec<Policy>, WorkflowError> {
        self.collaborators
            .policies
            .list_active_policies()
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Policy store unavailable");
                WorkflowError::PolicyStore(e.to_string())
            })
    }

    async fn resolve_state(&self, inner: &WorkflowInner) -> WorkflowState {
        match inner.state {
            WorkflowState::Processing => self.engine.phase().await.workflow_state(),
            state => state,
        }
    }

    /// Stop polling, cancel upload timers and drop every entity
    async fn discard(&self, inner: &mut MutexGuard<'_, WorkflowInner>, previous: WorkflowState) {
        self.engine.clear().await;
        self.tracker.cancel().await;

        let epoch = inner.epoch + 1;
        **inner = WorkflowInner {
            epoch,
            ..WorkflowInner::default()
        };
        self.reporter.state_changed(previous, WorkflowState::Idle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::StatusResponse;
    use crate::testing::{ScriptedBackend, ScriptedTransport, StaticPolicyStore};
    use std::time::Duration;

    fn workflow() -> Workflow {
        Workflow::new(
            &PipelineConfig::default(),
            Collaborators {
                transport: Arc::new(ScriptedTransport::new()),
                backend: Arc::new(ScriptedBackend::new()),
                policies: Arc::new(StaticPolicyStore::default()),
            },
            EventBus::new(64),
        )
    }

    #[tokio::test]
    async fn test_upload_requires_selection() {
        let workflow = workflow();
        let err = workflow.upload().await.unwrap_err();
        assert_eq!(err.code(), "INVALID_STATE");
        assert_eq!(workflow.state().await, WorkflowState::Idle);
        assert_eq!(
            workflow.last_error().await.map(|e| e.code),
            Some("INVALID_STATE".to_string())
        );
    }

    #[tokio::test]
    async fn test_rejected_selection_keeps_previous_file() {
        let workflow = workflow();
        workflow.select("a.pdf", vec![1u8; 4]).await.unwrap();

        let err = workflow.select("b.exe", vec![1u8; 4]).await.unwrap_err();
        assert_eq!(err.code(), "UNSUPPORTED_TYPE");

        let snapshot = workflow.snapshot().await;
        assert_eq!(snapshot.state, WorkflowState::FileSelected);
        assert_eq!(snapshot.file.unwrap().name(), "a.pdf");
    }

    #[tokio::test]
    async fn test_submit_validation_keeps_uploaded_state() {
        let workflow = workflow();
        workflow.select("a.pdf", vec![1u8; 4]).await.unwrap();
        workflow.upload().await.unwrap();

        let err = workflow
            .submit(Operation::Embed, SubmitParams::embed("p1", ""))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "MISSING_WATERMARK_TEXT");
        assert_eq!(workflow.state().await, WorkflowState::Uploaded);
        assert!(workflow.task().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_state_reports_visible_state() {
        let backend = ScriptedBackend::new()
            .with_statuses(vec![Ok(StatusResponse::failed(Some("bad file".to_string())))]);
        let workflow = Workflow::new(
            &PipelineConfig::default(),
            Collaborators {
                transport: Arc::new(ScriptedTransport::new()),
                backend: Arc::new(backend),
                policies: Arc::new(StaticPolicyStore::default()),
            },
            EventBus::new(64),
        );
        workflow.select("a.pdf", vec![1u8; 4]).await.unwrap();
        workflow.upload().await.unwrap();
        workflow
            .submit(Operation::Extract, SubmitParams::extract())
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(2_100)).await;
        assert_eq!(workflow.state().await, WorkflowState::Failed);

        let err = workflow.upload().await.unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::InvalidState {
                state: WorkflowState::Failed,
                ..
            }
        ));
        let err = workflow
            .submit(Operation::Extract, SubmitParams::extract())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::InvalidState {
                state: WorkflowState::Failed,
                ..
            }
        ));

        let recorded = workflow.last_error().await.unwrap();
        assert_eq!(recorded.code, "INVALID_STATE");
        assert_eq!(recorded.message, "Cannot submit while FAILED");
        assert_eq!(workflow.snapshot().await.state, WorkflowState::Failed);
    }

    #[tokio::test]
    async fn test_reselect_discards_upload() {
        let workflow = workflow();
        workflow.select("a.pdf", vec![1u8; 4]).await.unwrap();
        workflow.upload().await.unwrap();

        workflow.select("b.docx", vec![2u8; 8]).await.unwrap();
        let snapshot = workflow.snapshot().await;
        assert_eq!(snapshot.state, WorkflowState::FileSelected);
        assert!(snapshot.uploaded.is_none());
        assert_eq!(snapshot.file.unwrap().name(), "b.docx");
    }
}
