//! Upload progress tracking
//!
//! The file transport reports no progress, so progress is simulated: while the
//! transport call is in flight a repeating timer adds a random increment
//! (1..=max_increment) every tick until the soft ceiling is reached. When the
//! transport resolves the simulation is cancelled and the real outcome wins:
//! success forces 100% and schedules a reset to 0 after a grace delay,
//! failure resets to 0 immediately.
//!
//! Only one simulation is ever live. Starting an upload cancels the previous
//! upload's ticker and grace timer first, and an upload whose transport call
//! resolves after it was superseded leaves progress untouched.

use super::timer::{cancel_slot, is_slot_live, ScheduledTimer};
use crate::clients::FileTransport;
use crate::error::TransportError;
use crate::event_bridge::EventReporter;
use crate::models::{SelectedFile, UploadedReference};
use dwm_common::config::UploadConfig;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Default)]
struct TrackerTimers {
    /// Bumped by every upload start and every cancel
    generation: u64,
    ticker: Option<ScheduledTimer>,
    grace: Option<ScheduledTimer>,
}

impl TrackerTimers {
    fn cancel_all(&mut self) {
        cancel_slot(&mut self.ticker);
        cancel_slot(&mut self.grace);
    }
}

/// Simulated upload progress driver
pub struct UploadTracker {
    config: UploadConfig,
    progress: Arc<watch::Sender<u8>>,
    reporter: EventReporter,
    timers: Mutex<TrackerTimers>,
    shutdown: CancellationToken,
}

impl UploadTracker {
    pub fn new(config: UploadConfig, reporter: EventReporter) -> Self {
        let (progress, _) = watch::channel(0u8);
        Self {
            config,
            progress: Arc::new(progress),
            reporter,
            timers: Mutex::new(TrackerTimers::default()),
            shutdown: CancellationToken::new(),
        }
    }

    /// Current progress percentage
    pub fn progress(&self) -> u8 {
        *self.progress.borrow()
    }

    /// Observe progress changes
    pub fn subscribe(&self) -> watch::Receiver<u8> {
        self.progress.subscribe()
    }

    /// Run one transport call with simulated progress
    ///
    /// The transport outcome is returned unchanged; no reference is produced
    /// on failure.
    pub async fn upload(
        &self,
        transport: &dyn FileTransport,
        file: &SelectedFile,
    ) -> Result<UploadedReference, TransportError> {
        let generation = self.begin().await;

        tracing::info!(
            file_name = %file.name(),
            size_bytes = file.size_bytes(),
            "Upload started"
        );

        let outcome = transport.upload(file).await;

        self.finish(generation, outcome.is_ok()).await;

        match &outcome {
            Ok(reference) => tracing::info!(
                file_name = %reference.file_name,
                file_url = %reference.file_url,
                "Upload finished"
            ),
            Err(e) => tracing::warn!(file_name = %file.name(), error = %e, "Upload failed"),
        }

        outcome
    }

    /// Stop any simulation or pending grace reset and zero the indicator
    pub async fn cancel(&self) {
        let mut timers = self.timers.lock().await;
        timers.cancel_all();
        timers.generation += 1;
        set_progress(&self.progress, &self.reporter, 0, None);
    }

    /// Whether the simulated progress ticker is currently scheduled
    pub async fn is_simulating(&self) -> bool {
        is_slot_live(&self.timers.lock().await.ticker)
    }

    /// Number of live timers (ticker + grace)
    pub async fn live_timer_count(&self) -> usize {
        let timers = self.timers.lock().await;
        usize::from(is_slot_live(&timers.ticker)) + usize::from(is_slot_live(&timers.grace))
    }

    async fn begin(&self) -> u64 {
        let mut timers = self.timers.lock().await;
        timers.cancel_all();
        timers.generation += 1;
        set_progress(&self.progress, &self.reporter, 0, None);

        let progress = Arc::clone(&self.progress);
        let reporter = self.reporter.clone();
        let tick = self.config.tick_interval();
        let max_increment = self.config.max_increment.max(1);
        let ceiling = self.config.soft_ceiling;

        timers.ticker = Some(ScheduledTimer::spawn(&self.shutdown, move |stop| {
            simulate_progress(progress, reporter, tick, max_increment, ceiling, stop)
        }));

        timers.generation
    }

    async fn finish(&self, generation: u64, succeeded: bool) {
        let mut timers = self.timers.lock().await;
        if timers.generation != generation {
            tracing::debug!("Upload resolved after being superseded; progress left untouched");
            return;
        }

        cancel_slot(&mut timers.ticker);

        if !succeeded {
            set_progress(&self.progress, &self.reporter, 0, None);
            return;
        }

        set_progress(&self.progress, &self.reporter, 100, None);

        let progress = Arc::clone(&self.progress);
        let reporter = self.reporter.clone();
        let grace = self.config.reset_grace();
        timers.grace = Some(ScheduledTimer::spawn(&self.shutdown, move |stop| async move {
            tokio::select! {
                _ = stop.cancelled() => {}
                _ = tokio::time::sleep(grace) => {
                    set_progress(&progress, &reporter, 0, Some(&stop));
                }
            }
        }));
    }
}

impl Drop for UploadTracker {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn simulate_progress(
    progress: Arc<watch::Sender<u8>>,
    reporter: EventReporter,
    tick: Duration,
    max_increment: u8,
    ceiling: u8,
    stop: CancellationToken,
) {
    let mut ticker = interval_at(Instant::now() + tick, tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = stop.cancelled() => return,
            _ = ticker.tick() => {}
        }

        let increment = rand::thread_rng().gen_range(1..=max_increment);
        let next = progress.borrow().saturating_add(increment).min(ceiling);
        set_progress(&progress, &reporter, next, Some(&stop));

        if next >= ceiling {
            return;
        }
    }
}

/// Publish a new value unless `guard` has been cancelled
///
/// The guard is checked under the channel's write lock, so a cancelled timer
/// can never overwrite the value written by whoever cancelled it.
fn set_progress(
    progress: &watch::Sender<u8>,
    reporter: &EventReporter,
    value: u8,
    guard: Option<&CancellationToken>,
) {
    let changed = progress.send_if_modified(|current| {
        if guard.map(CancellationToken::is_cancelled).unwrap_or(false) || *current == value {
            return false;
        }
        *current = value;
        true
    });

    if changed {
        reporter.upload_progress(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedTransport;
    use crate::services::FileIntake;
    use dwm_common::config::IntakeConfig;

    fn selected(name: &str) -> SelectedFile {
        FileIntake::new(&IntakeConfig::default())
            .select(name, vec![0u8; 128])
            .unwrap()
    }

    fn tracker() -> Arc<UploadTracker> {
        Arc::new(UploadTracker::new(UploadConfig::default(), EventReporter::detached()))
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_stays_under_ceiling_while_in_flight() {
        let tracker = tracker();
        let transport = Arc::new(ScriptedTransport::new().with_delay(Duration::from_secs(60)));

        let upload = {
            let tracker = Arc::clone(&tracker);
            let transport = Arc::clone(&transport);
            tokio::spawn(async move { tracker.upload(transport.as_ref(), &selected("doc.pdf")).await })
        };

        let mut last = 0;
        for _ in 0..150 {
            tokio::time::sleep(Duration::from_millis(200)).await;
            let current = tracker.progress();
            assert!(current <= 90, "progress {} exceeded the soft ceiling", current);
            assert!(current >= last, "progress went backwards: {} -> {}", last, current);
            last = current;
        }
        // 150 ticks of at least +1 each must have reached the ceiling
        assert_eq!(tracker.progress(), 90);
        assert!(!tracker.is_simulating().await);

        upload.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_forces_100_then_resets_after_grace() {
        let tracker = tracker();
        let transport = ScriptedTransport::new().with_delay(Duration::from_millis(500));

        let reference = tracker.upload(&transport, &selected("doc.pdf")).await.unwrap();
        assert_eq!(reference.file_name, "doc.pdf");
        assert_eq!(tracker.progress(), 100);
        assert!(!tracker.is_simulating().await);

        tokio::time::sleep(Duration::from_millis(900)).await;
        assert_eq!(tracker.progress(), 100);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(tracker.progress(), 0);
        assert_eq!(tracker.live_timer_count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_resets_immediately() {
        let tracker = tracker();
        let transport = ScriptedTransport::new()
            .with_delay(Duration::from_millis(700))
            .with_outcome(Err(TransportError::Network("connection reset".to_string())));

        let err = tracker.upload(&transport, &selected("doc.pdf")).await.unwrap_err();
        assert!(matches!(err, TransportError::Network(_)));
        assert_eq!(tracker.progress(), 0);
        assert_eq!(tracker.live_timer_count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_upload_supersedes_previous_timer() {
        let tracker = tracker();
        let slow = Arc::new(ScriptedTransport::new().with_delay(Duration::from_secs(5)));
        let fast = ScriptedTransport::new().with_delay(Duration::from_secs(1));

        let first = {
            let tracker = Arc::clone(&tracker);
            let slow = Arc::clone(&slow);
            tokio::spawn(async move { tracker.upload(slow.as_ref(), &selected("a.pdf")).await })
        };
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(tracker.live_timer_count().await, 1);

        tracker.upload(&fast, &selected("b.pdf")).await.unwrap();
        assert_eq!(tracker.progress(), 100);
        assert!(tracker.live_timer_count().await <= 1);

        // Grace reset runs, then the superseded upload resolves without touching progress
        tokio::time::sleep(Duration::from_secs(5)).await;
        first.await.unwrap().unwrap();
        assert_eq!(tracker.progress(), 0);
        assert_eq!(tracker.live_timer_count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_grace_reset_and_zeroes() {
        let tracker = tracker();
        let transport = ScriptedTransport::new();

        tracker.upload(&transport, &selected("doc.pdf")).await.unwrap();
        assert_eq!(tracker.progress(), 100);

        tracker.cancel().await;
        assert_eq!(tracker.progress(), 0);
        assert_eq!(tracker.live_timer_count().await, 0);
    }
}
