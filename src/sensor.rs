//! Raw sensor input: the local sensor seam, its poller, and inbound payload
//! parsing for the remote device.
//!
//! Driver code stays outside the daemon. The local sensor is read through a
//! helper command that prints one JSON object per invocation.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use tokio::process::Command;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::GuardianError;
use crate::fusion::{ErrorBounds, FusionEngine};

/// An unstamped measurement: no timestamp, no error bounds yet.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct RawReading {
    /// Temperature in °C.
    pub temperature: f64,
    /// Relative humidity in %.
    pub humidity: f64,
}

impl RawReading {
    /// Parse an inbound JSON payload `{"temperature": n, "humidity": n}`.
    ///
    /// Extra fields are ignored. Values are not range-checked.
    ///
    /// # Errors
    ///
    /// Returns [`GuardianError::MalformedInboundReading`] for invalid JSON,
    /// missing fields, or non-numeric values.
    pub fn from_json(body: &[u8]) -> Result<Self, GuardianError> {
        serde_json::from_slice(body)
            .map_err(|e| GuardianError::MalformedInboundReading(e.to_string()))
    }
}

/// A locally attached sensor.
#[async_trait]
pub trait LocalSensor: Send + Sync {
    /// Take one measurement.
    ///
    /// # Errors
    ///
    /// Returns [`GuardianError::SensorReadFailure`] when no reading could be
    /// obtained this cycle.
    async fn read(&self) -> Result<RawReading, GuardianError>;
}

/// Reads the sensor by running a helper program.
///
/// The helper must print `{"temperature": n, "humidity": n}` on stdout and
/// exit with status 0.
#[derive(Debug, Clone)]
pub struct CommandSensor {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandSensor {
    /// Build from an argv-style command. Returns `None` for an empty command.
    pub fn from_argv(argv: &[String], timeout: Duration) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
            timeout,
        })
    }
}

#[async_trait]
impl LocalSensor for CommandSensor {
    async fn read(&self) -> Result<RawReading, GuardianError> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, output)
            .await
            .map_err(|_| {
                GuardianError::SensorReadFailure(format!(
                    "{} timed out after {}s",
                    self.program,
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| {
                GuardianError::SensorReadFailure(format!("failed to run {}: {e}", self.program))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GuardianError::SensorReadFailure(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        parse_sensor_output(&output.stdout)
    }
}

/// Parse helper stdout into a [`RawReading`].
///
/// # Errors
///
/// Returns [`GuardianError::SensorReadFailure`] if stdout is not the expected
/// JSON object.
pub fn parse_sensor_output(stdout: &[u8]) -> Result<RawReading, GuardianError> {
    serde_json::from_slice(stdout)
        .map_err(|e| GuardianError::SensorReadFailure(format!("unparsable sensor output: {e}")))
}

/// Read the sensor once and store the result as the local reading.
///
/// On failure the local slot is left as it was; expiry is the staleness
/// monitor's job.
///
/// # Errors
///
/// Propagates the sensor's [`GuardianError::SensorReadFailure`].
pub async fn poll_once(
    sensor: &dyn LocalSensor,
    engine: &FusionEngine,
    bounds: ErrorBounds,
) -> Result<(), GuardianError> {
    let raw = sensor.read().await?;
    engine.update_local(bounds.reading(raw.temperature, raw.humidity, Utc::now()));
    debug!(
        temperature = raw.temperature,
        humidity = raw.humidity,
        "local reading stored"
    );
    Ok(())
}

/// Poll the local sensor every `period` until shutdown.
///
/// The first read happens immediately.
pub async fn run_local_poller(
    sensor: Arc<dyn LocalSensor>,
    engine: Arc<FusionEngine>,
    bounds: ErrorBounds,
    period: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    info!(interval_secs = period.as_secs(), "local poller started");
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if let Err(e) = poll_once(sensor.as_ref(), &engine, bounds).await {
                    warn!(error = %e, "local sensor read failed, keeping previous reading");
                }
            }
            result = shutdown_rx.changed() => {
                if result.is_err() || *shutdown_rx.borrow() {
                    break;
                }
            }
        }
    }

    info!("local poller stopped");
}
