//! Polling loop: one cycle = registry snapshot → one task per player → join → sleep.
//!
//! Per-player failures end in [`PlayerOutcome::Skipped`] and never touch
//! sibling tasks or the next tick.

use logger::{now_iso, ApiStatusEvent, CycleHeartbeatEvent, EventLogger, MatchNotifiedEvent};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::{validate_poll_interval, MonitorConfig};
use crate::dedup::DedupCache;
use crate::error::ConfigError;
use crate::extractor::{AssetVersions, MatchInfoExtractor};
use crate::fetcher::{MatchSource, RetryingFetcher};
use crate::registry::AccountRegistry;
use crate::sink::NotificationSink;
use crate::types::{MatchId, NotificationPayload, WatchEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    Sleeping,
    Stopped,
}

/// What happened to one player in one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerOutcome {
    Notified(MatchId),
    /// Newest match was already notified.
    UpToDate,
    NoMatches,
    Skipped { stage: &'static str, reason: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub cycle: u64,
    pub players: usize,
    pub notified: usize,
    pub up_to_date: usize,
    pub skipped: usize,
}

impl CycleReport {
    fn count(&mut self, outcome: &PlayerOutcome) {
        match outcome {
            PlayerOutcome::Notified(_) => self.notified += 1,
            PlayerOutcome::UpToDate | PlayerOutcome::NoMatches => self.up_to_date += 1,
            PlayerOutcome::Skipped { .. } => self.skipped += 1,
        }
    }
}

/// Shared by every per-player task of every cycle.
struct Engine {
    fetcher: RetryingFetcher,
    dedup: DedupCache,
    extractor: MatchInfoExtractor,
    sink: Arc<dyn NotificationSink>,
    recent_count: u32,
}

impl Engine {
    /// list → gate → detail → extract → deliver → record, strictly in order.
    async fn poll_player(&self, entry: &WatchEntry, events: Option<&EventLogger>) -> PlayerOutcome {
        let player = &entry.player_key;

        let ids = match self.fetcher.list_recent_matches(player, self.recent_count).await {
            Ok(ids) => ids,
            Err(e) => return skip(events, entry, "list_recent_matches", e.to_string()),
        };
        // newest only, older ids are never backfilled
        let Some(latest) = ids.into_iter().next() else {
            debug!(player = %player, "no matches yet for {}", entry.handle);
            return PlayerOutcome::NoMatches;
        };

        let mut state = self.dedup.lock(player).await;
        if !state.should_notify(&latest) {
            debug!(player = %player, match_id = %latest, "already notified");
            return PlayerOutcome::UpToDate;
        }

        let detail = match self.fetcher.fetch_match_detail(&latest).await {
            Ok(d) => d,
            Err(e) => return skip(events, entry, "fetch_match_detail", e.to_string()),
        };

        let payload = match self.extractor.extract(&detail, player).await {
            Ok(p) => p,
            Err(e) => return skip(events, entry, "extract", e.to_string()),
        };

        if let Err(e) = self.sink.deliver(&payload).await {
            return skip(events, entry, "deliver", format!("{e:#}"));
        }

        state.record_notified(latest.clone(), payload.clone());
        drop(state);

        info!(
            player = %player,
            match_id = %latest,
            "{} finished a {} game as {} ({}, {})",
            payload.player_name,
            payload.mode,
            payload.unit_played,
            if payload.outcome.is_win() { "win" } else { "loss" },
            payload.stats,
        );
        if let Some(events) = events {
            log_notified(events, &payload);
        }
        PlayerOutcome::Notified(latest)
    }
}

fn skip(
    events: Option<&EventLogger>,
    entry: &WatchEntry,
    stage: &'static str,
    reason: String,
) -> PlayerOutcome {
    warn!(player = %entry.player_key, "skipping {} this cycle, {stage}: {reason}", entry.handle);
    if let Some(events) = events {
        let _ = events.log(&ApiStatusEvent {
            ts: now_iso(),
            event: "API_STATUS",
            source: stage.to_string(),
            scope: entry.player_key.to_string(),
            ok: false,
            message: reason.clone(),
        });
    }
    PlayerOutcome::Skipped { stage, reason }
}

fn log_notified(events: &EventLogger, payload: &NotificationPayload) {
    let _ = events.log(&MatchNotifiedEvent {
        ts: now_iso(),
        event: "MATCH_NOTIFIED",
        player_key: payload.player_key.to_string(),
        player_name: payload.player_name.clone(),
        match_id: payload.match_id.to_string(),
        champion: payload.unit_played.clone(),
        win: payload.outcome.is_win(),
        kda: payload.stats.to_string(),
        game_mode: payload.mode.clone(),
    });
}

/// Operator control: interval changes and shutdown.
#[derive(Clone)]
pub struct SchedulerHandle {
    interval_tx: Arc<watch::Sender<Duration>>,
    shutdown_tx: Arc<watch::Sender<bool>>,
    state_rx: watch::Receiver<SchedulerState>,
}

impl SchedulerHandle {
    /// Takes effect at the next sleep. Below-floor values are rejected and
    /// the current interval is kept.
    pub fn set_interval_secs(&self, secs: u64) -> Result<(), ConfigError> {
        let interval = validate_poll_interval(secs)?;
        self.interval_tx.send_replace(interval);
        info!("poll interval set to {secs}s (applies from next sleep)");
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        *self.interval_tx.borrow()
    }

    /// Lets the running cycle finish; no new cycle starts.
    pub fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);
    }

    pub fn state(&self) -> SchedulerState {
        *self.state_rx.borrow()
    }

    /// Resolves once the scheduler reached `state`.
    pub async fn wait_for_state(&self, state: SchedulerState) {
        let mut rx = self.state_rx.clone();
        let _ = rx.wait_for(|s| *s == state).await;
    }
}

pub struct PollingScheduler {
    engine: Arc<Engine>,
    registry: Arc<dyn AccountRegistry>,
    events: Option<EventLogger>,
    interval_tx: Arc<watch::Sender<Duration>>,
    shutdown_tx: Arc<watch::Sender<bool>>,
    state_tx: watch::Sender<SchedulerState>,
    cycles: u64,
}

impl PollingScheduler {
    pub fn new(
        config: &MonitorConfig,
        source: Arc<dyn MatchSource>,
        assets: Arc<dyn AssetVersions>,
        registry: Arc<dyn AccountRegistry>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        let engine = Engine {
            fetcher: RetryingFetcher::new(source, config.retry),
            dedup: DedupCache::new(config.cache_ttl),
            extractor: MatchInfoExtractor::new(assets),
            sink,
            recent_count: config.recent_count,
        };
        let (interval_tx, _) = watch::channel(config.poll_interval);
        let (shutdown_tx, _) = watch::channel(false);
        let (state_tx, _) = watch::channel(SchedulerState::Idle);

        Self {
            engine: Arc::new(engine),
            registry,
            events: None,
            interval_tx: Arc::new(interval_tx),
            shutdown_tx: Arc::new(shutdown_tx),
            state_tx,
            cycles: 0,
        }
    }

    /// JSONL audit stream (`MATCH_NOTIFIED`, `API_STATUS`, `CYCLE_HEARTBEAT`).
    pub fn with_event_logger(mut self, events: EventLogger) -> Self {
        self.events = Some(events);
        self
    }

    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            interval_tx: Arc::clone(&self.interval_tx),
            shutdown_tx: Arc::clone(&self.shutdown_tx),
            state_rx: self.state_tx.subscribe(),
        }
    }

    pub fn dedup(&self) -> &DedupCache {
        &self.engine.dedup
    }

    pub fn state(&self) -> SchedulerState {
        *self.state_tx.borrow()
    }

    /// One full pass over the registry snapshot. Never fails: every problem
    /// ends up as a skipped player in the report.
    pub async fn run_cycle(&mut self) -> CycleReport {
        self.cycles += 1;
        let mut report = CycleReport { cycle: self.cycles, ..Default::default() };

        let watched = match self.registry.list_watched().await {
            Ok(w) => w,
            Err(e) => {
                warn!("registry snapshot failed, cycle {} is empty: {e:#}", self.cycles);
                return report;
            }
        };
        report.players = watched.len();

        let mut tasks = JoinSet::new();
        for entry in watched {
            let engine = Arc::clone(&self.engine);
            let events = self.events.clone();
            tasks.spawn(async move { engine.poll_player(&entry, events.as_ref()).await });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => report.count(&outcome),
                Err(e) => {
                    warn!("player task died: {e}");
                    report.skipped += 1;
                }
            }
        }

        self.log_heartbeat(&report);
        report
    }

    /// Runs until [`SchedulerHandle::shutdown`]. An in-flight cycle always
    /// completes; only the sleep is cut short.
    pub async fn run(mut self) {
        let mut shutdown = self.shutdown_tx.subscribe();
        info!("match monitor started, interval {}s", self.interval_tx.borrow().as_secs());

        loop {
            if *shutdown.borrow_and_update() {
                break;
            }

            self.state_tx.send_replace(SchedulerState::Running);
            let report = self.run_cycle().await;
            info!(
                "cycle {} done: {} players, {} notified, {} up to date, {} skipped",
                report.cycle, report.players, report.notified, report.up_to_date, report.skipped
            );

            if *shutdown.borrow_and_update() {
                break;
            }

            // read here, so an interval change mid-cycle applies to this sleep
            let interval = *self.interval_tx.borrow();
            self.state_tx.send_replace(SchedulerState::Sleeping);
            tokio::select! {
                _ = sleep(interval) => {}
                _ = shutdown.changed() => {}
            }
        }

        self.state_tx.send_replace(SchedulerState::Stopped);
        info!("match monitor stopped after {} cycles", self.cycles);
    }

    fn log_heartbeat(&self, report: &CycleReport) {
        if let Some(events) = &self.events {
            let _ = events.log(&CycleHeartbeatEvent {
                ts: now_iso(),
                event: "CYCLE_HEARTBEAT",
                cycle: report.cycle,
                poll_interval_secs: self.interval_tx.borrow().as_secs(),
                players: report.players,
                notified: report.notified,
                up_to_date: report.up_to_date,
                skipped: report.skipped,
            });
        }
    }
}
