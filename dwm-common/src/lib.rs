//! # DWM Common Library
//!
//! Shared code for the document watermark services including:
//! - Error types
//! - Pipeline configuration (TOML + defaults)
//! - Event types (WorkflowEvent enum) and the EventBus
//! - SSE helpers
//! - Timestamp utilities

pub mod config;
pub mod error;
pub mod events;
pub mod sse;
pub mod time;

pub use error::{Error, Result};
