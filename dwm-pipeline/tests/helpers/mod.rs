//! Test Helper Utilities
//!
//! Shared utilities for testing dwm-pipeline

#![allow(dead_code)]

pub mod fixtures;
pub mod log_capture;

pub use fixtures::{
    build_workflow, collect_events, doc_bytes, policy, scenario_backend, scenario_transport,
    small_intake_config,
};
pub use log_capture::{capture_logs, LogCapture};
