//! Pipeline components
//!
//! Leaves first: intake validates, the tracker drives the transport, the
//! submitter creates the backend job, and the engine polls it to a terminal
//! state. `crate::workflow` composes them.

pub mod file_intake;
pub mod polling_engine;
pub mod task_submitter;
mod timer;
pub mod upload_tracker;

pub use file_intake::FileIntake;
pub use polling_engine::{PollPhase, PollingEngine, PollingSnapshot, TimerCounts};
pub use task_submitter::{SubmitParams, TaskSubmitter};
pub use upload_tracker::UploadTracker;
