//! Latest-reading holder for a single source.

use std::time::Duration;

use chrono::{DateTime, Utc};

use super::Reading;

/// Most recent reading of one source plus its freshness window.
///
/// `latest` is `None` exactly when the source is considered offline.
#[derive(Debug, Clone)]
pub struct SourceSlot {
    latest: Option<Reading>,
    max_age: Duration,
}

impl SourceSlot {
    /// Create an empty (offline) slot.
    pub fn new(max_age: Duration) -> Self {
        Self {
            latest: None,
            max_age,
        }
    }

    /// Replace the stored reading unconditionally.
    pub fn set(&mut self, reading: Reading) {
        self.latest = Some(reading);
    }

    /// Drop the stored reading. Idempotent.
    pub fn expire(&mut self) {
        self.latest = None;
    }

    /// The stored reading, if any.
    pub fn latest(&self) -> Option<&Reading> {
        self.latest.as_ref()
    }

    /// Freshness window.
    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    /// Whether a reading is present and no older than `max_age` at `now`.
    ///
    /// A reading stamped after `now` (clock skew) counts as fresh.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        let Some(reading) = self.latest else {
            return false;
        };
        match now.signed_duration_since(reading.captured_at()).to_std() {
            Ok(age) => age <= self.max_age,
            Err(_) => true,
        }
    }
}
