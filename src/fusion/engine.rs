//! The shared fusion engine.
//!
//! Both slots and the cached estimate live behind one sync [`Mutex`]. Every
//! write recomputes the estimate before the lock is released, so a reader can
//! never see a slot update without the matching estimate.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use super::{Reading, SourceKind, SourceSlot};

/// A fully populated fused estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Fused {
    /// Mean temperature of both sources, °C.
    pub temperature: f64,
    /// Mean relative humidity of both sources, %.
    pub humidity: f64,
    /// Propagated temperature uncertainty, °C.
    pub temp_error: f64,
    /// Propagated humidity uncertainty, %.
    pub hum_error: f64,
    /// When this estimate was computed.
    pub computed_at: DateTime<Utc>,
}

impl Fused {
    /// Whether every numeric field is finite. A non-finite field serializes
    /// as `null` beside populated siblings.
    fn is_finite(&self) -> bool {
        [self.temperature, self.humidity, self.temp_error, self.hum_error]
            .iter()
            .all(|v| v.is_finite())
    }
}

/// Cached fusion result: either every field is present or none is.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct FusedEstimate(Option<Fused>);

impl FusedEstimate {
    /// The empty estimate.
    pub const NONE: FusedEstimate = FusedEstimate(None);

    /// Fuse two optional readings.
    ///
    /// A missing source invalidates the whole estimate; there is no
    /// single-source fallback. So does any non-finite result, e.g. a mean
    /// that overflows. Temperature and humidity are unweighted means.
    /// Uncertainty is the root-sum-square of both sources' fixed bounds,
    /// halved (error of the mean of two independent measurements).
    pub fn fuse(local: Option<&Reading>, remote: Option<&Reading>, now: DateTime<Utc>) -> Self {
        let (Some(local), Some(remote)) = (local, remote) else {
            return Self::NONE;
        };
        let fused = Fused {
            temperature: (local.temperature() + remote.temperature()) / 2.0,
            humidity: (local.humidity() + remote.humidity()) / 2.0,
            temp_error: root_sum_square(local.temp_error(), remote.temp_error()) / 2.0,
            hum_error: root_sum_square(local.hum_error(), remote.hum_error()) / 2.0,
            computed_at: now,
        };
        if !fused.is_finite() {
            return Self::NONE;
        }
        Self(Some(fused))
    }

    /// The populated estimate, if both sources were present.
    pub fn get(&self) -> Option<&Fused> {
        self.0.as_ref()
    }

    /// Whether the estimate is empty.
    pub fn is_none(&self) -> bool {
        self.0.is_none()
    }

    /// Fused temperature.
    pub fn temperature(&self) -> Option<f64> {
        self.0.map(|f| f.temperature)
    }

    /// Fused humidity.
    pub fn humidity(&self) -> Option<f64> {
        self.0.map(|f| f.humidity)
    }

    /// Fused temperature uncertainty.
    pub fn temp_error(&self) -> Option<f64> {
        self.0.map(|f| f.temp_error)
    }

    /// Fused humidity uncertainty.
    pub fn hum_error(&self) -> Option<f64> {
        self.0.map(|f| f.hum_error)
    }

    /// When the estimate was computed.
    pub fn computed_at(&self) -> Option<DateTime<Utc>> {
        self.0.map(|f| f.computed_at)
    }
}

fn root_sum_square(a: f64, b: f64) -> f64 {
    (a * a + b * b).sqrt()
}

/// Point-in-time copy of the engine state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snapshot {
    /// Latest local reading.
    pub local: Option<Reading>,
    /// Latest remote reading.
    pub remote: Option<Reading>,
    /// Estimate derived from exactly these two readings.
    pub fused: FusedEstimate,
}

impl Snapshot {
    /// Reading for the given source.
    pub fn reading(&self, source: SourceKind) -> Option<&Reading> {
        match source {
            SourceKind::Local => self.local.as_ref(),
            SourceKind::Remote => self.remote.as_ref(),
        }
    }
}

#[derive(Debug)]
struct EngineState {
    local: SourceSlot,
    remote: SourceSlot,
    fused: FusedEstimate,
}

impl EngineState {
    fn slot(&self, source: SourceKind) -> &SourceSlot {
        match source {
            SourceKind::Local => &self.local,
            SourceKind::Remote => &self.remote,
        }
    }

    fn slot_mut(&mut self, source: SourceKind) -> &mut SourceSlot {
        match source {
            SourceKind::Local => &mut self.local,
            SourceKind::Remote => &mut self.remote,
        }
    }

    fn recompute(&mut self, now: DateTime<Utc>) {
        self.fused = FusedEstimate::fuse(self.local.latest(), self.remote.latest(), now);
    }
}

/// Owner of both source slots and the derived estimate.
///
/// Created once at startup and shared by `Arc` with every task. Uses a sync
/// [`Mutex`] since no critical section awaits or does I/O.
#[derive(Debug)]
pub struct FusionEngine {
    state: Mutex<EngineState>,
}

impl FusionEngine {
    /// Create an engine with both sources offline.
    pub fn new(max_age: Duration) -> Self {
        Self {
            state: Mutex::new(EngineState {
                local: SourceSlot::new(max_age),
                remote: SourceSlot::new(max_age),
                fused: FusedEstimate::NONE,
            }),
        }
    }

    /// Store a local reading and recompute.
    pub fn update_local(&self, reading: Reading) {
        self.update_at(SourceKind::Local, reading, Utc::now());
    }

    /// Store a remote reading and recompute.
    pub fn update_remote(&self, reading: Reading) {
        self.update_at(SourceKind::Remote, reading, Utc::now());
    }

    /// Store a reading for `source` and recompute with `now` as the
    /// computation time.
    ///
    /// Freshness is not checked here; expiry belongs to the
    /// staleness monitor.
    pub fn update_at(&self, source: SourceKind, reading: Reading, now: DateTime<Utc>) {
        let mut state = self.lock();
        state.slot_mut(source).set(reading);
        state.recompute(now);
        debug!(
            %source,
            temperature = reading.temperature(),
            humidity = reading.humidity(),
            fused = !state.fused.is_none(),
            "reading stored"
        );
    }

    /// Consistent copy of both readings and the estimate.
    pub fn snapshot(&self) -> Snapshot {
        let state = self.lock();
        Snapshot {
            local: state.local.latest().copied(),
            remote: state.remote.latest().copied(),
            fused: state.fused,
        }
    }

    /// Whether `source` holds a reading within its freshness window at `now`.
    pub fn is_fresh(&self, source: SourceKind, now: DateTime<Utc>) -> bool {
        self.lock().slot(source).is_fresh(now)
    }

    /// Clear `source` if it is not fresh at `now`, recomputing the estimate.
    ///
    /// The check and the clear happen under one lock, so a reading that
    /// arrived after the caller last looked is never discarded. Returns `true`
    /// when the source is (now) offline.
    pub fn expire_if_stale(&self, source: SourceKind, now: DateTime<Utc>) -> bool {
        let mut state = self.lock();
        let slot = state.slot_mut(source);
        if slot.is_fresh(now) {
            return false;
        }
        if slot.latest().is_some() {
            slot.expire();
            state.recompute(now);
            debug!(%source, "stale reading expired");
        }
        true
    }

    fn lock(&self) -> MutexGuard<'_, EngineState> {
        // Every mutation recomputes before unlocking, so a poisoned guard
        // still holds a consistent state.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
