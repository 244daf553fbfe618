//! Server-Sent Events (SSE) for workflow progress streaming

use crate::AppState;
use axum::{
    extract::State,
    response::sse::{Event, Sse},
};
use futures::stream::Stream;
use std::convert::Infallible;

/// GET /events - SSE event stream for workflow progress
///
/// Streams every `WorkflowEvent`:
/// - StateChanged
/// - UploadProgress
/// - PollRecorded
/// - TaskCompleted / TaskFailed
/// - ProcessingTimedOut
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    dwm_common::sse::create_event_sse_stream("dwm-pipeline", &state.event_bus)
}
