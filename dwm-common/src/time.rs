//! Timestamp utilities

use chrono::{DateTime, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Whole seconds elapsed since `since`, clamped at zero
pub fn elapsed_seconds(since: DateTime<Utc>) -> u64 {
    u64::try_from((Utc::now() - since).num_seconds()).unwrap_or(0)
}
