//! Data models for dwm-pipeline
//!
//! - SelectedFile / UploadedReference: file intake and transport output
//! - ProcessingTask: the in-flight job record, mutated only by the polling engine
//! - PollLogEntry: append-only diagnostics for one task
//! - Policy: opaque policy store entry

pub mod file;
pub mod poll_log;
pub mod policy;
pub mod processing_task;

pub use dwm_common::events::{Operation, PresentationStatus, WorkflowState};
pub use file::{SelectedFile, UploadedReference};
pub use poll_log::PollLogEntry;
pub use policy::Policy;
pub use processing_task::{ProcessingTask, TaskResult};
