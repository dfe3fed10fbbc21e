//! Tests for the local poller against scripted sensors.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use climate_guardian::error::GuardianError;
use climate_guardian::fusion::{ErrorBounds, FusionEngine};
use climate_guardian::sensor::{poll_once, run_local_poller, LocalSensor, RawReading};
use tokio::sync::watch;

/// Returns queued results in order, then fails forever.
struct ScriptedSensor {
    results: Mutex<VecDeque<Result<RawReading, GuardianError>>>,
}

impl ScriptedSensor {
    fn new(results: Vec<Result<RawReading, GuardianError>>) -> Self {
        Self {
            results: Mutex::new(results.into()),
        }
    }
}

#[async_trait]
impl LocalSensor for ScriptedSensor {
    async fn read(&self) -> Result<RawReading, GuardianError> {
        self.results
            .lock()
            .expect("lock")
            .pop_front()
            .unwrap_or_else(|| Err(GuardianError::SensorReadFailure("exhausted".to_owned())))
    }
}

fn raw(temperature: f64, humidity: f64) -> RawReading {
    RawReading {
        temperature,
        humidity,
    }
}

#[tokio::test]
async fn successful_read_stamps_local_bounds() {
    let engine = FusionEngine::new(Duration::from_secs(60));
    let sensor = ScriptedSensor::new(vec![Ok(raw(20.5, 48.0))]);

    poll_once(&sensor, &engine, ErrorBounds::DHT22)
        .await
        .expect("read should succeed");

    let local = engine.snapshot().local.expect("local stored");
    assert!((local.temperature() - 20.5).abs() < f64::EPSILON);
    assert!((local.temp_error() - 0.5).abs() < f64::EPSILON);
    assert!((local.hum_error() - 2.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn failed_read_leaves_previous_reading() {
    let engine = FusionEngine::new(Duration::from_secs(60));
    let sensor = ScriptedSensor::new(vec![
        Ok(raw(20.5, 48.0)),
        Err(GuardianError::SensorReadFailure("checksum".to_owned())),
    ]);

    poll_once(&sensor, &engine, ErrorBounds::DHT22)
        .await
        .expect("first read succeeds");
    let err = poll_once(&sensor, &engine, ErrorBounds::DHT22)
        .await
        .expect_err("second read fails");
    assert!(matches!(err, GuardianError::SensorReadFailure(_)));

    let local = engine.snapshot().local.expect("previous reading kept");
    assert!((local.temperature() - 20.5).abs() < f64::EPSILON);
}

#[tokio::test(start_paused = true)]
async fn poller_reads_immediately_then_on_interval() {
    let engine = Arc::new(FusionEngine::new(Duration::from_secs(60)));
    let sensor: Arc<dyn LocalSensor> = Arc::new(ScriptedSensor::new(vec![
        Ok(raw(20.0, 50.0)),
        Err(GuardianError::SensorReadFailure("flaky".to_owned())),
        Ok(raw(21.0, 51.0)),
    ]));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let handle = tokio::spawn(run_local_poller(
        sensor,
        Arc::clone(&engine),
        ErrorBounds::DHT22,
        Duration::from_secs(10),
        shutdown_rx,
    ));

    tokio::time::sleep(Duration::from_secs(1)).await;
    let first = engine.snapshot().local.expect("first read is immediate");
    assert!((first.temperature() - 20.0).abs() < f64::EPSILON);

    tokio::time::sleep(Duration::from_secs(10)).await;
    let after_failure = engine.snapshot().local.expect("kept after failure");
    assert!((after_failure.temperature() - 20.0).abs() < f64::EPSILON);

    tokio::time::sleep(Duration::from_secs(10)).await;
    let third = engine.snapshot().local.expect("third read stored");
    assert!((third.temperature() - 21.0).abs() < f64::EPSILON);

    shutdown_tx.send(true).expect("poller still listening");
    handle.await.expect("poller should stop cleanly");
}
