//! Sensor fusion core: readings, per-source slots, and the locked engine.
//!
//! The [`FusionEngine`] is the only shared mutable state in the daemon. Every
//! producer and reader goes through it; nothing holds a slot directly.

mod engine;
mod reading;
mod slot;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use engine::{Fused, FusedEstimate, FusionEngine, Snapshot};
pub use reading::{ErrorBounds, Reading};
pub use slot::SourceSlot;

/// Identifies one of the two measurement sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Sensor attached to the host running the daemon.
    Local,
    /// Device that pushes its readings over HTTP.
    Remote,
}

impl SourceKind {
    /// Both sources, local first.
    pub const ALL: [SourceKind; 2] = [SourceKind::Local, SourceKind::Remote];

    /// Lowercase name used in logs and config.
    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::Local => "local",
            SourceKind::Remote => "remote",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
