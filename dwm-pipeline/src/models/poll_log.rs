//! Poll log entries
//!
//! One entry per successful status query, appended by the polling engine and
//! cleared when a new task starts or the workflow resets.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Raw record of one status response
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollLogEntry {
    /// 1-based poll sequence number within the task
    pub sequence: u64,
    pub polled_at: DateTime<Utc>,
    /// Status string exactly as the backend reported it
    pub backend_status: String,
    /// Progress exactly as the backend reported it
    pub raw_progress: f64,
    pub has_result: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_time: Option<String>,
}
