//! Structured logging on `tracing`.
//!
//! The daemon writes JSON lines to a daily-rolling file under the configured
//! log directory and human-readable lines to stderr. One-shot subcommands log
//! to stderr only. `RUST_LOG`, when set, overrides `[logging] level`.

use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::{self, LoggingConfig};

/// File name prefix; the appender adds a `.YYYY-MM-DD` suffix.
pub const LOG_FILE_PREFIX: &str = "climate-guardian.log";

/// Keeps the file writer alive. Dropping it flushes buffered lines.
pub struct LoggingGuard {
    logs_dir: PathBuf,
    _worker: WorkerGuard,
}

impl LoggingGuard {
    /// Directory the JSON log files are written to.
    pub fn logs_dir(&self) -> &Path {
        &self.logs_dir
    }
}

/// Level filter from `RUST_LOG`, falling back to the configured directive.
///
/// # Errors
///
/// Returns an error if `RUST_LOG` is unset and `level` is not a valid filter
/// directive (e.g. `info` or `climate_guardian=debug,tower_http=warn`).
pub fn level_filter(level: &str) -> anyhow::Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(level).with_context(|| format!("invalid logging.level: {level}"))
}

/// Install the daemon subscriber described by `config`.
///
/// Without `logging.dir` the files go to `~/.climate-guardian/logs`.
///
/// # Errors
///
/// Fails if the directory cannot be created, the level is invalid, or a
/// global subscriber is already installed.
pub fn init_production(config: &LoggingConfig) -> anyhow::Result<LoggingGuard> {
    let logs_dir = match &config.dir {
        Some(dir) => dir.clone(),
        None => config::default_logs_dir()?,
    };
    std::fs::create_dir_all(&logs_dir)
        .with_context(|| format!("failed to create logs directory {}", logs_dir.display()))?;

    let filter = level_filter(&config.level)?;
    let (writer, worker) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(&logs_dir, LOG_FILE_PREFIX));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().json().with_writer(writer))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .context("a global tracing subscriber is already installed")?;

    Ok(LoggingGuard {
        logs_dir,
        _worker: worker,
    })
}

/// Stderr-only logging at `info` for one-shot subcommands.
pub fn init_cli() {
    let filter = level_filter("info").unwrap_or_else(|_| EnvFilter::new("info"));
    // Ignored: a subscriber may already be installed (tests).
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
