//! Task status polling engine
//!
//! Owns at most one interval timer and one timeout timer. `start_polling`
//! always cancels the previous pair before creating a new one, and every exit
//! path (terminal success, terminal failure, query error, timeout, explicit
//! stop, drop) clears both.
//!
//! **Termination rule:** polling stops when the backend reports `finished`
//! with a result payload, or `failed`. A bare `finished` keeps polling.
//!
//! Each run carries a generation number. Ticks are sequential within a run
//! (the next tick is not awaited until the current status query returns), and
//! a response that arrives after its run was stopped or replaced is dropped
//! without touching the task or the log.

use super::timer::{cancel_slot, is_slot_live, ScheduledTimer};
use crate::clients::{BackendStatus, JobBackend, StatusResponse};
use crate::error::BackendError;
use crate::event_bridge::EventReporter;
use crate::models::processing_task::percent_from_raw;
use crate::models::{PollLogEntry, ProcessingTask, WorkflowState};
use dwm_common::config::PollingConfig;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Failure message when the backend gives no reason
pub const DEFAULT_FAILURE_MESSAGE: &str = "processing failed";

/// Failure message when the status query itself errors
pub const STATUS_QUERY_FAILED: &str = "status query failed";

/// Advisory shown when the timeout fires
pub const TIMEOUT_NOTICE: &str = "processing timed out; check results manually later";

/// Engine lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PollPhase {
    Idle,
    Polling,
    Completed,
    Failed,
    TimedOut,
}

impl PollPhase {
    /// Workflow state this phase presents as
    pub fn workflow_state(self) -> WorkflowState {
        match self {
            PollPhase::Idle => WorkflowState::Idle,
            PollPhase::Polling => WorkflowState::Processing,
            PollPhase::Completed => WorkflowState::Completed,
            PollPhase::Failed => WorkflowState::Failed,
            PollPhase::TimedOut => WorkflowState::TimedOut,
        }
    }
}

/// Live timer counts; each is 0 or 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimerCounts {
    pub interval: usize,
    pub timeout: usize,
}

/// Point-in-time view of the engine
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollingSnapshot {
    pub phase: PollPhase,
    pub task: Option<ProcessingTask>,
    pub poll_count: u64,
    pub elapsed_ms: Option<u64>,
    pub timeout_notice: Option<String>,
}

#[derive(Debug, Default)]
struct TimerPair {
    interval: Option<ScheduledTimer>,
    timeout: Option<ScheduledTimer>,
}

impl TimerPair {
    fn clear(&mut self) {
        let interval = cancel_slot(&mut self.interval);
        let timeout = cancel_slot(&mut self.timeout);
        if interval || timeout {
            tracing::debug!(interval, timeout, "Polling timers cleared");
        }
    }
}

#[derive(Debug)]
struct EngineState {
    generation: u64,
    phase: PollPhase,
    task: Option<ProcessingTask>,
    log: Vec<PollLogEntry>,
    sequence: u64,
    started_at: Option<Instant>,
    timeout_notice: Option<String>,
    timers: TimerPair,
}

impl Default for EngineState {
    fn default() -> Self {
        Self {
            generation: 0,
            phase: PollPhase::Idle,
            task: None,
            log: Vec::new(),
            sequence: 0,
            started_at: None,
            timeout_notice: None,
            timers: TimerPair::default(),
        }
    }
}

enum TickOutcome {
    Continue,
    Stop,
}

/// Everything a timer task needs, captured at start
#[derive(Clone)]
struct RunContext {
    generation: u64,
    task_id: String,
    backend: Arc<dyn JobBackend>,
    shared: Arc<Mutex<EngineState>>,
    reporter: EventReporter,
}

impl RunContext {
    /// Lock shared state if this run is still the live one
    async fn lock_live(
        &self,
        stop: &CancellationToken,
    ) -> Option<tokio::sync::MutexGuard<'_, EngineState>> {
        let state = self.shared.lock().await;
        if stop.is_cancelled() || state.generation != self.generation {
            return None;
        }
        Some(state)
    }
}

/// Status polling driver for one workflow instance
pub struct PollingEngine {
    backend: Arc<dyn JobBackend>,
    config: PollingConfig,
    reporter: EventReporter,
    shared: Arc<Mutex<EngineState>>,
    shutdown: CancellationToken,
}

impl PollingEngine {
    pub fn new(backend: Arc<dyn JobBackend>, config: PollingConfig, reporter: EventReporter) -> Self {
        Self {
            backend,
            config,
            reporter,
            shared: Arc::new(Mutex::new(EngineState::default())),
            shutdown: CancellationToken::new(),
        }
    }

    /// Begin polling for `task`, replacing any previous run
    pub async fn start_polling(&self, task: ProcessingTask) {
        let mut state = self.shared.lock().await;

        // Unconditional: this is the only place a new pair is created
        state.timers.clear();

        state.generation += 1;
        state.phase = PollPhase::Polling;
        state.sequence = 0;
        state.log.clear();
        state.timeout_notice = None;
        state.started_at = Some(Instant::now());

        let ctx = RunContext {
            generation: state.generation,
            task_id: task.task_id().to_string(),
            backend: Arc::clone(&self.backend),
            shared: Arc::clone(&self.shared),
            reporter: self.reporter.clone(),
        };
        state.task = Some(task);

        tracing::info!(
            task_id = %ctx.task_id,
            generation = ctx.generation,
            interval_ms = self.config.interval_ms,
            timeout_secs = self.config.timeout_secs,
            "Polling started"
        );

        let period = self.config.interval();
        let timeout = self.config.timeout();
        let interval_ctx = ctx.clone();
        state.timers.interval = Some(ScheduledTimer::spawn(&self.shutdown, move |stop| {
            run_interval(interval_ctx, period, stop)
        }));
        state.timers.timeout = Some(ScheduledTimer::spawn(&self.shutdown, move |stop| {
            run_timeout(ctx, timeout, stop)
        }));
    }

    /// Clear both timers and end the current run. Safe to call any number of
    /// times.
    ///
    /// A run stopped before reaching a terminal state returns to `Idle`; the
    /// task and its log stay readable.
    pub async fn stop_polling(&self) {
        let mut state = self.shared.lock().await;
        let was_polling = state.phase == PollPhase::Polling;
        state.stop();
        if was_polling {
            state.phase = PollPhase::Idle;
            tracing::info!(generation = state.generation, "Polling stopped before a terminal state");
            self.reporter
                .state_changed(WorkflowState::Processing, WorkflowState::Idle);
        }
    }

    /// Stop polling and discard the task and its log
    pub async fn clear(&self) {
        let mut state = self.shared.lock().await;
        state.stop();
        state.phase = PollPhase::Idle;
        state.task = None;
        state.log.clear();
        state.sequence = 0;
        state.started_at = None;
        state.timeout_notice = None;
    }

    pub async fn phase(&self) -> PollPhase {
        self.shared.lock().await.phase
    }

    pub async fn task(&self) -> Option<ProcessingTask> {
        self.shared.lock().await.task.clone()
    }

    pub async fn poll_log(&self) -> Vec<PollLogEntry> {
        self.shared.lock().await.log.clone()
    }

    pub async fn timeout_notice(&self) -> Option<String> {
        self.shared.lock().await.timeout_notice.clone()
    }

    pub async fn live_timers(&self) -> TimerCounts {
        let state = self.shared.lock().await;
        TimerCounts {
            interval: usize::from(is_slot_live(&state.timers.interval)),
            timeout: usize::from(is_slot_live(&state.timers.timeout)),
        }
    }

    pub async fn snapshot(&self) -> PollingSnapshot {
        let state = self.shared.lock().await;
        PollingSnapshot {
            phase: state.phase,
            task: state.task.clone(),
            poll_count: state.sequence,
            elapsed_ms: state.started_at.map(|started| {
                u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
            }),
            timeout_notice: state.timeout_notice.clone(),
        }
    }
}

impl Drop for PollingEngine {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn run_interval(ctx: RunContext, period: Duration, stop: CancellationToken) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = stop.cancelled() => return,
            _ = ticker.tick() => {}
        }

        tracing::debug!(task_id = %ctx.task_id, "Poll tick");
        let response = ctx.backend.get_status(&ctx.task_id).await;

        let Some(mut state) = ctx.lock_live(&stop).await else {
            tracing::debug!(task_id = %ctx.task_id, "Discarding status response from a stopped run");
            return;
        };

        if let TickOutcome::Stop = state.apply_response(&ctx, response) {
            state.stop();
            return;
        }
    }
}

async fn run_timeout(ctx: RunContext, timeout: Duration, stop: CancellationToken) {
    tokio::select! {
        _ = stop.cancelled() => return,
        _ = tokio::time::sleep(timeout) => {}
    }

    let Some(mut state) = ctx.lock_live(&stop).await else {
        return;
    };

    state.stop();
    state.phase = PollPhase::TimedOut;
    state.timeout_notice = Some(TIMEOUT_NOTICE.to_string());

    tracing::warn!(
        task_id = %ctx.task_id,
        timeout_secs = timeout.as_secs(),
        polls = state.sequence,
        "Processing timed out"
    );
    ctx.reporter.processing_timed_out(&ctx.task_id, TIMEOUT_NOTICE);
    ctx.reporter
        .state_changed(WorkflowState::Processing, WorkflowState::TimedOut);
}

impl EngineState {
    /// Cancel both timers and retire the current generation so any response
    /// still in flight is dropped
    fn stop(&mut self) {
        self.timers.clear();
        self.generation += 1;
    }

    fn apply_response(
        &mut self,
        ctx: &RunContext,
        response: Result<StatusResponse, BackendError>,
    ) -> TickOutcome {
        let Some(task) = self.task.as_mut() else {
            return TickOutcome::Stop;
        };

        let status = match response {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!(task_id = %ctx.task_id, error = %e, "Status query failed; stopping");
                task.fail(STATUS_QUERY_FAILED);
                self.phase = PollPhase::Failed;
                ctx.reporter.task_failed(&ctx.task_id, STATUS_QUERY_FAILED);
                ctx.reporter
                    .state_changed(WorkflowState::Processing, WorkflowState::Failed);
                return TickOutcome::Stop;
            }
        };

        self.sequence += 1;
        let entry = PollLogEntry {
            sequence: self.sequence,
            polled_at: dwm_common::time::now(),
            backend_status: status.status.clone(),
            raw_progress: status.progress,
            has_result: status.result.is_some(),
            estimated_time: status.estimated_time.clone(),
        };

        task.update_progress(percent_from_raw(status.progress), status.estimated_time.clone());

        tracing::debug!(
            task_id = %ctx.task_id,
            sequence = entry.sequence,
            backend_status = %entry.backend_status,
            progress = task.progress_percent(),
            has_result = entry.has_result,
            "Status recorded"
        );
        ctx.reporter
            .poll_recorded(&ctx.task_id, &entry, task.progress_percent());
        self.log.push(entry);

        match (status.backend_status(), status.result) {
            (BackendStatus::Finished, Some(result)) => {
                task.complete(result);
                self.phase = PollPhase::Completed;
                tracing::info!(task_id = %ctx.task_id, polls = self.sequence, "Task completed");
                ctx.reporter.task_completed(&ctx.task_id, task.operation());
                ctx.reporter
                    .state_changed(WorkflowState::Processing, WorkflowState::Completed);
                TickOutcome::Stop
            }
            (BackendStatus::Failed, _) => {
                let message = status
                    .error
                    .filter(|e| !e.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_FAILURE_MESSAGE.to_string());
                task.fail(message.clone());
                self.phase = PollPhase::Failed;
                tracing::warn!(task_id = %ctx.task_id, error = %message, "Task failed");
                ctx.reporter.task_failed(&ctx.task_id, &message);
                ctx.reporter
                    .state_changed(WorkflowState::Processing, WorkflowState::Failed);
                TickOutcome::Stop
            }
            (BackendStatus::Finished, None) => {
                tracing::debug!(task_id = %ctx.task_id, "Finished without result; still polling");
                TickOutcome::Continue
            }
            (BackendStatus::Processing, _) => TickOutcome::Continue,
        }
    }
}
