//! Coalesces a bursty snapshot stream into rate-limited render calls.
//!
//! One cooperative loop waits on cancellation, an optional deadline, the
//! snapshot channel and a periodic tick, in that priority. Only the newest
//! snapshot is ever rendered and never more than once per debounce window.

use std::fmt::Display;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn};

pub const DEBOUNCE_INTERVAL: Duration = Duration::from_millis(200);
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergerConfig {
    /// Minimum spacing between two render calls.
    pub debounce: Duration,
    /// Liveness wake-up used to release a snapshot held back by the debounce.
    pub tick: Duration,
    /// Re-render the latest snapshot on every eligible wake, even when unchanged.
    pub heartbeat: bool,
}

impl Default for MergerConfig {
    fn default() -> Self {
        Self {
            debounce: DEBOUNCE_INTERVAL,
            tick: TICK_INTERVAL,
            heartbeat: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeExit {
    Cancelled,
    DeadlineElapsed,
    SourceClosed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeOutcome {
    pub exit: MergeExit,
    /// Render calls made, failed ones included.
    pub renders: u64,
    pub render_failures: u64,
    pub received: u64,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateMerger {
    config: MergerConfig,
}

impl UpdateMerger {
    pub fn new(config: MergerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> MergerConfig {
        self.config
    }

    /// Drive `render` from `updates` until `shutdown` observes `true`, the
    /// deadline passes, or the sender side of `updates` is gone.
    ///
    /// A failed render is logged and counted; the loop keeps going.
    pub async fn run<T, E, F>(
        &self,
        mut updates: mpsc::Receiver<T>,
        mut shutdown: watch::Receiver<bool>,
        deadline: Option<Instant>,
        mut render: F,
    ) -> MergeOutcome
    where
        E: Display,
        F: FnMut(&T) -> Result<(), E>,
    {
        let mut state = MergeState::new(self.config);
        let mut ticker = tokio::time::interval(self.config.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let exit = loop {
            tokio::select! {
                biased;
                _ = cancelled(&mut shutdown) => break MergeExit::Cancelled,
                _ = deadline_elapsed(deadline) => break MergeExit::DeadlineElapsed,
                maybe_snapshot = updates.recv() => {
                    match maybe_snapshot {
                        Some(snapshot) => {
                            state.record(snapshot);
                            while let Ok(next) = updates.try_recv() {
                                state.record(next);
                            }
                            state.render_if_due(Instant::now(), &mut render);
                        }
                        None => {
                            if let Some(flush_at) = state.pending_flush_at(Instant::now()) {
                                tokio::select! {
                                    biased;
                                    _ = cancelled(&mut shutdown) => break MergeExit::Cancelled,
                                    _ = deadline_elapsed(deadline) => break MergeExit::DeadlineElapsed,
                                    _ = tokio::time::sleep_until(flush_at) => {}
                                }
                                state.render_if_due(Instant::now(), &mut render);
                            }
                            break MergeExit::SourceClosed;
                        }
                    }
                }
                _ = ticker.tick() => {
                    state.render_if_due(Instant::now(), &mut render);
                }
            }
        };

        debug!(
            ?exit,
            renders = state.renders,
            received = state.received,
            "update_merger_stopped"
        );
        MergeOutcome {
            exit,
            renders: state.renders,
            render_failures: state.render_failures,
            received: state.received,
        }
    }
}

struct MergeState<T> {
    config: MergerConfig,
    latest: Option<T>,
    dirty: bool,
    last_rendered: Option<Instant>,
    renders: u64,
    render_failures: u64,
    received: u64,
}

impl<T> MergeState<T> {
    fn new(config: MergerConfig) -> Self {
        Self {
            config,
            latest: None,
            dirty: false,
            last_rendered: None,
            renders: 0,
            render_failures: 0,
            received: 0,
        }
    }

    fn record(&mut self, snapshot: T) {
        self.latest = Some(snapshot);
        self.dirty = true;
        self.received += 1;
    }

    fn window_open(&self, now: Instant) -> bool {
        self.last_rendered
            .map_or(true, |at| now >= at + self.config.debounce)
    }

    /// When an unrendered snapshot may be flushed, if there is one.
    fn pending_flush_at(&self, now: Instant) -> Option<Instant> {
        if !self.dirty || self.latest.is_none() {
            return None;
        }
        Some(
            self.last_rendered
                .map_or(now, |at| (at + self.config.debounce).max(now)),
        )
    }

    fn render_if_due<E, F>(&mut self, now: Instant, render: &mut F) -> bool
    where
        E: Display,
        F: FnMut(&T) -> Result<(), E>,
    {
        if !(self.dirty || self.config.heartbeat) || !self.window_open(now) {
            return false;
        }
        let Some(snapshot) = self.latest.as_ref() else {
            return false;
        };
        self.last_rendered = Some(now);
        self.dirty = false;
        self.renders += 1;
        if let Err(err) = render(snapshot) {
            self.render_failures += 1;
            warn!("render_failed: {err}");
        }
        true
    }
}

/// Resolves once `true` is observed. A dropped sender never resolves.
async fn cancelled(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

async fn deadline_elapsed(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending::<()>().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    fn recorder(
        start: Instant,
        seen: &mut Vec<(u32, Duration)>,
    ) -> impl FnMut(&u32) -> Result<(), String> + '_ {
        move |snapshot| {
            seen.push((*snapshot, start.elapsed()));
            Ok(())
        }
    }

    fn values(seen: &[(u32, Duration)]) -> Vec<u32> {
        seen.iter().map(|(value, _)| *value).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn queued_burst_collapses_to_latest() {
        let (tx, rx) = mpsc::channel(16);
        let (_stop_tx, stop_rx) = watch::channel(false);
        for n in 1..=5 {
            tx.send(n).await.expect("send");
        }
        let start = Instant::now();
        let mut seen = Vec::new();
        let outcome = UpdateMerger::default()
            .run(
                rx,
                stop_rx,
                Some(start + Duration::from_millis(150)),
                recorder(start, &mut seen),
            )
            .await;

        assert_eq!(values(&seen), vec![5]);
        assert_eq!(outcome.exit, MergeExit::DeadlineElapsed);
        assert_eq!(outcome.received, 5);
        assert_eq!(outcome.renders, 1);
        drop(tx);
    }

    #[tokio::test(start_paused = true)]
    async fn burst_inside_window_renders_newest_on_tick() {
        let (tx, rx) = mpsc::channel(16);
        let (_stop_tx, stop_rx) = watch::channel(false);
        tokio::spawn(async move {
            tx.send(1).await.expect("send");
            sleep(Duration::from_millis(50)).await;
            tx.send(2).await.expect("send");
            sleep(Duration::from_millis(10)).await;
            tx.send(3).await.expect("send");
            sleep(Duration::from_secs(10)).await;
        });
        let start = Instant::now();
        let mut seen = Vec::new();
        UpdateMerger::default()
            .run(
                rx,
                stop_rx,
                Some(start + Duration::from_millis(1500)),
                recorder(start, &mut seen),
            )
            .await;

        assert_eq!(values(&seen), vec![1, 3]);
        assert!(seen[1].1 - seen[0].1 >= DEBOUNCE_INTERVAL);
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_without_snapshots_never_render() {
        let (_tx, rx) = mpsc::channel::<u32>(4);
        let (_stop_tx, stop_rx) = watch::channel(false);
        let start = Instant::now();
        let mut seen = Vec::new();
        let outcome = UpdateMerger::default()
            .run(
                rx,
                stop_rx,
                Some(start + Duration::from_secs(5)),
                recorder(start, &mut seen),
            )
            .await;

        assert!(seen.is_empty());
        assert_eq!(outcome.renders, 0);
        assert_eq!(outcome.exit, MergeExit::DeadlineElapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn suppressed_snapshot_renders_once_after_silence() {
        let (tx, rx) = mpsc::channel(4);
        let (_stop_tx, stop_rx) = watch::channel(false);
        tokio::spawn(async move {
            tx.send(1).await.expect("send");
            sleep(Duration::from_millis(100)).await;
            tx.send(2).await.expect("send");
            sleep(Duration::from_secs(30)).await;
        });
        let start = Instant::now();
        let mut seen = Vec::new();
        let outcome = UpdateMerger::default()
            .run(
                rx,
                stop_rx,
                Some(start + Duration::from_secs(4)),
                recorder(start, &mut seen),
            )
            .await;

        assert_eq!(values(&seen), vec![1, 2]);
        assert!(seen[1].1 >= TICK_INTERVAL && seen[1].1 < TICK_INTERVAL * 2);
        assert_eq!(outcome.renders, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_drops_pending_snapshot() {
        let (tx, rx) = mpsc::channel(4);
        let (stop_tx, stop_rx) = watch::channel(false);
        tokio::spawn(async move {
            tx.send(1).await.expect("send");
            sleep(Duration::from_millis(50)).await;
            tx.send(2).await.expect("send");
            sleep(Duration::from_millis(50)).await;
            let _ = stop_tx.send(true);
            sleep(Duration::from_secs(10)).await;
        });
        let start = Instant::now();
        let mut seen = Vec::new();
        let outcome = UpdateMerger::default()
            .run(rx, stop_rx, None, recorder(start, &mut seen))
            .await;

        assert_eq!(values(&seen), vec![1]);
        assert_eq!(outcome.exit, MergeExit::Cancelled);
        assert_eq!(outcome.received, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_cancel_sender_does_not_cancel() {
        let (_tx, rx) = mpsc::channel::<u32>(4);
        let (stop_tx, stop_rx) = watch::channel(false);
        drop(stop_tx);
        let start = Instant::now();
        let mut seen = Vec::new();
        let outcome = UpdateMerger::default()
            .run(
                rx,
                stop_rx,
                Some(start + Duration::from_secs(2)),
                recorder(start, &mut seen),
            )
            .await;

        assert_eq!(outcome.exit, MergeExit::DeadlineElapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn closed_source_flushes_last_snapshot() {
        let (tx, rx) = mpsc::channel(4);
        let (_stop_tx, stop_rx) = watch::channel(false);
        tokio::spawn(async move {
            tx.send(1).await.expect("send");
            sleep(Duration::from_millis(50)).await;
            tx.send(2).await.expect("send");
        });
        let start = Instant::now();
        let mut seen = Vec::new();
        let outcome = UpdateMerger::default()
            .run(rx, stop_rx, None, recorder(start, &mut seen))
            .await;

        assert_eq!(values(&seen), vec![1, 2]);
        assert!(seen[1].1 >= DEBOUNCE_INTERVAL && seen[1].1 < TICK_INTERVAL);
        assert_eq!(outcome.exit, MergeExit::SourceClosed);
    }

    #[tokio::test(start_paused = true)]
    async fn render_errors_are_counted_and_loop_continues() {
        let (tx, rx) = mpsc::channel(4);
        let (_stop_tx, stop_rx) = watch::channel(false);
        tokio::spawn(async move {
            tx.send(1).await.expect("send");
            sleep(Duration::from_millis(300)).await;
            tx.send(2).await.expect("send");
            sleep(Duration::from_secs(10)).await;
        });
        let mut seen = Vec::new();
        let outcome = UpdateMerger::default()
            .run(
                rx,
                stop_rx,
                Some(Instant::now() + Duration::from_millis(1500)),
                |snapshot: &u32| {
                    seen.push(*snapshot);
                    if *snapshot == 1 {
                        Err("sink closed".to_string())
                    } else {
                        Ok(())
                    }
                },
            )
            .await;

        assert_eq!(seen, vec![1, 2]);
        assert_eq!(outcome.renders, 2);
        assert_eq!(outcome.render_failures, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn heartbeat_rerenders_unchanged_snapshot() {
        let (tx, rx) = mpsc::channel(4);
        let (_stop_tx, stop_rx) = watch::channel(false);
        tx.send(7).await.expect("send");
        let merger = UpdateMerger::new(MergerConfig {
            heartbeat: true,
            ..MergerConfig::default()
        });
        let start = Instant::now();
        let mut seen = Vec::new();
        let outcome = merger
            .run(
                rx,
                stop_rx,
                Some(start + Duration::from_millis(2500)),
                recorder(start, &mut seen),
            )
            .await;

        assert_eq!(values(&seen), vec![7, 7, 7]);
        assert_eq!(outcome.received, 1);
        drop(tx);
    }
}
