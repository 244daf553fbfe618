//! Workflow fixtures built on the scripted collaborators

use dwm_common::config::PipelineConfig;
use dwm_common::events::{EventBus, WorkflowEvent};
use dwm_pipeline::clients::StatusResponse;
use dwm_pipeline::models::{Policy, TaskResult, UploadedReference};
use dwm_pipeline::testing::{ScriptedBackend, ScriptedTransport, StaticPolicyStore};
use dwm_pipeline::{Collaborators, Workflow};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

/// Workflow plus a subscription that sees every event from construction on
pub fn build_workflow(
    config: &PipelineConfig,
    transport: Arc<ScriptedTransport>,
    backend: Arc<ScriptedBackend>,
    policies: Arc<StaticPolicyStore>,
) -> (Workflow, broadcast::Receiver<WorkflowEvent>) {
    let bus = EventBus::new(256);
    let events = bus.subscribe();
    let workflow = Workflow::new(
        config,
        Collaborators {
            transport,
            backend,
            policies,
        },
        bus,
    );
    (workflow, events)
}

/// Drain whatever is buffered right now
pub fn collect_events(rx: &mut broadcast::Receiver<WorkflowEvent>) -> Vec<WorkflowEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

pub fn doc_bytes(size: usize) -> Vec<u8> {
    vec![0x25; size]
}

pub fn policy(id: &str) -> Policy {
    Policy {
        id: id.to_string(),
        name: format!("Policy {}", id),
        description: "Test policy".to_string(),
        watermark_text: "CONFIDENTIAL".to_string(),
        sensitivity: Some("internal".to_string()),
    }
}

/// Config whose intake accepts at most `max_size_bytes`
pub fn small_intake_config(max_size_bytes: u64) -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.intake.max_size_bytes = max_size_bytes;
    config
}

/// Transport answering `{u1, doc.pdf, 10 MiB}` after 300ms
pub fn scenario_transport() -> Arc<ScriptedTransport> {
    Arc::new(
        ScriptedTransport::new()
            .with_delay(Duration::from_millis(300))
            .with_outcome(Ok(UploadedReference {
                file_url: "u1".to_string(),
                file_name: "doc.pdf".to_string(),
                file_size_bytes: 10_485_760,
            })),
    )
}

/// Backend issuing `t1`, then processing 30 → processing 60 → finished with `d1`
pub fn scenario_backend() -> Arc<ScriptedBackend> {
    Arc::new(
        ScriptedBackend::new()
            .with_task_id("t1")
            .with_statuses(vec![
                Ok(StatusResponse::processing(30.0)),
                Ok(StatusResponse::processing(60.0)),
                Ok(StatusResponse::finished(
                    100.0,
                    Some(TaskResult {
                        download_url: Some("d1".to_string()),
                        ..Default::default()
                    }),
                )),
            ]),
    )
}
