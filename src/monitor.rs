//! Staleness detection with one alert per staleness episode.
//!
//! Each watched source runs a two-state machine:
//!
//! | state    | fresh at tick        | stale at tick                          |
//! |----------|----------------------|----------------------------------------|
//! | Normal   | stay                 | → Alerting, expire slot, emit `Stale`  |
//! | Alerting | → Normal (`Recovered` if enabled) | expire slot, stay       |
//!
//! Events go out over an mpsc channel; delivery is someone else's problem.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::config::SourcesConfig;
use crate::fusion::{FusionEngine, SourceKind};

/// Alert state of one watched source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertState {
    /// Source is fresh, or has not been checked yet.
    Normal,
    /// Source went stale and an alert was emitted.
    Alerting,
}

/// What an [`AlertEvent`] reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    /// Source stopped reporting.
    Stale,
    /// Source is reporting again.
    Recovered,
}

/// One outbound notification.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertEvent {
    /// Source the alert concerns.
    pub source: SourceKind,
    /// Stale or recovered.
    pub kind: AlertKind,
    /// Human-readable text.
    pub message: String,
    /// Tick time that produced the event.
    pub at: DateTime<Utc>,
}

/// State machine entry for one source.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceWatch {
    /// Watched source.
    pub source: SourceKind,
    /// Current alert state.
    pub state: AlertState,
    /// Time of the last transition (or creation).
    pub since: DateTime<Utc>,
}

/// Periodic staleness checker over a [`FusionEngine`].
#[derive(Debug)]
pub struct StalenessMonitor {
    engine: Arc<FusionEngine>,
    sources: SourcesConfig,
    watches: Vec<SourceWatch>,
    notify_recovery: bool,
}

impl StalenessMonitor {
    /// Create a monitor with every watched source in [`AlertState::Normal`].
    pub fn new(
        engine: Arc<FusionEngine>,
        sources: SourcesConfig,
        watched: &[SourceKind],
        notify_recovery: bool,
        now: DateTime<Utc>,
    ) -> Self {
        let mut watches: Vec<SourceWatch> = Vec::with_capacity(watched.len());
        for &source in watched {
            if watches.iter().all(|w| w.source != source) {
                watches.push(SourceWatch {
                    source,
                    state: AlertState::Normal,
                    since: now,
                });
            }
        }
        Self {
            engine,
            sources,
            watches,
            notify_recovery,
        }
    }

    /// Alert state of `source`, or `None` if it is not watched.
    pub fn state(&self, source: SourceKind) -> Option<AlertState> {
        self.watch(source).map(|w| w.state)
    }

    /// Full watch entry of `source`.
    pub fn watch(&self, source: SourceKind) -> Option<&SourceWatch> {
        self.watches.iter().find(|w| w.source == source)
    }

    /// All watch entries.
    pub fn watches(&self) -> &[SourceWatch] {
        &self.watches
    }

    /// Evaluate every watched source at `now` and return the events to emit.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Vec<AlertEvent> {
        let mut events = Vec::new();
        for watch in &mut self.watches {
            let source = watch.source;
            let label = &self.sources.profile(source).label;

            if self.engine.is_fresh(source, now) {
                if watch.state == AlertState::Alerting {
                    watch.state = AlertState::Normal;
                    watch.since = now;
                    info!(%source, "source recovered");
                    if self.notify_recovery {
                        events.push(AlertEvent {
                            source,
                            kind: AlertKind::Recovered,
                            message: format!("\u{2705} {label} is reporting again"),
                            at: now,
                        });
                    }
                }
                continue;
            }

            if watch.state == AlertState::Alerting {
                // A reading that arrived and aged out between ticks must
                // still leave fusion; no second alert for the same episode.
                if self.engine.expire_if_stale(source, now) {
                    debug!(%source, "source still stale, alert already sent");
                }
                continue;
            }

            // Re-checked under the engine lock: a reading that landed since
            // `is_fresh` keeps the source Normal.
            if !self.engine.expire_if_stale(source, now) {
                continue;
            }

            watch.state = AlertState::Alerting;
            watch.since = now;
            warn!(%source, "source stale, reading expired");
            events.push(AlertEvent {
                source,
                kind: AlertKind::Stale,
                message: format!("\u{26a0}\u{fe0f} Warning: {label} not responding"),
                at: now,
            });
        }
        events
    }
}

/// Run the monitor every `period` until shutdown.
///
/// The first tick is skipped so sources get one full period to report after
/// startup. Events are handed over with `try_send`; a full or closed channel
/// drops the event with a warning instead of stalling the loop.
pub async fn run_monitor(
    monitor: Arc<Mutex<StalenessMonitor>>,
    period: Duration,
    alert_tx: mpsc::Sender<AlertEvent>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    info!(interval_secs = period.as_secs(), "staleness monitor started");
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    // Skip the first immediate tick.
    interval.tick().await;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let events = monitor
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .tick(Utc::now());
                for event in events {
                    if let Err(e) = alert_tx.try_send(event) {
                        warn!(error = %e, "alert dropped");
                    }
                }
            }
            result = shutdown_rx.changed() => {
                if result.is_err() || *shutdown_rx.borrow() {
                    break;
                }
            }
        }
    }

    info!("staleness monitor stopped");
}
