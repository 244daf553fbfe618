//! HTTP API handlers for dwm-pipeline
//!
//! REST operations over the single workflow instance plus an SSE event feed.

pub mod health;
pub mod policies;
pub mod sse;
pub mod workflow;

pub use health::health_routes;
pub use policies::policy_routes;
pub use sse::event_stream;
pub use workflow::workflow_routes;
