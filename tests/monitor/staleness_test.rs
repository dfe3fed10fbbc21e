//! Tests for the staleness state machine.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use climate_guardian::config::SourcesConfig;
use climate_guardian::fusion::{ErrorBounds, FusionEngine, SourceKind};
use climate_guardian::monitor::{AlertKind, AlertState, StalenessMonitor};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0)
        .single()
        .expect("valid timestamp")
}

fn secs(n: i64) -> DateTime<Utc> {
    t0() + chrono::Duration::seconds(n)
}

fn setup(watched: &[SourceKind], notify_recovery: bool) -> (Arc<FusionEngine>, StalenessMonitor) {
    let engine = Arc::new(FusionEngine::new(Duration::from_secs(60)));
    let monitor = StalenessMonitor::new(
        Arc::clone(&engine),
        SourcesConfig::default(),
        watched,
        notify_recovery,
        t0(),
    );
    (engine, monitor)
}

fn push_remote(engine: &FusionEngine, at: DateTime<Utc>) {
    engine.update_at(
        SourceKind::Remote,
        ErrorBounds::DHT11.reading(22.0, 55.0, at),
        at,
    );
}

fn push_local(engine: &FusionEngine, at: DateTime<Utc>) {
    engine.update_at(
        SourceKind::Local,
        ErrorBounds::DHT22.reading(20.0, 50.0, at),
        at,
    );
}

#[test]
fn fresh_source_stays_normal() {
    let (engine, mut monitor) = setup(&[SourceKind::Remote], false);
    push_remote(&engine, t0());

    assert!(monitor.tick(secs(30)).is_empty());
    assert!(monitor.tick(secs(60)).is_empty());
    assert_eq!(monitor.state(SourceKind::Remote), Some(AlertState::Normal));
}

#[test]
fn never_reported_source_alerts() {
    let (_engine, mut monitor) = setup(&[SourceKind::Remote], false);
    let events = monitor.tick(secs(60));
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, AlertKind::Stale);
}

#[test]
fn one_alert_per_staleness_episode() {
    let (engine, mut monitor) = setup(&[SourceKind::Remote], false);
    push_remote(&engine, t0());

    let first = monitor.tick(secs(61));
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].source, SourceKind::Remote);
    assert_eq!(first[0].kind, AlertKind::Stale);
    assert_eq!(first[0].at, secs(61));
    assert!(first[0].message.contains("ESP8266 (DHT11) not responding"));

    for n in 2..10 {
        assert!(monitor.tick(secs(61 * n)).is_empty(), "tick {n} re-alerted");
    }
    assert_eq!(monitor.state(SourceKind::Remote), Some(AlertState::Alerting));
}

#[test]
fn stale_transition_expires_slot_and_estimate() {
    let (engine, mut monitor) = setup(&[SourceKind::Remote], false);
    push_local(&engine, secs(60));
    push_remote(&engine, t0());
    assert!(!engine.snapshot().fused.is_none());

    monitor.tick(secs(61));

    let snapshot = engine.snapshot();
    assert!(snapshot.remote.is_none());
    assert!(snapshot.local.is_some());
    assert!(snapshot.fused.is_none());
}

#[test]
fn recovery_returns_to_normal_silently_by_default() {
    let (engine, mut monitor) = setup(&[SourceKind::Remote], false);
    push_remote(&engine, t0());
    assert_eq!(monitor.tick(secs(61)).len(), 1);

    push_remote(&engine, secs(90));
    assert!(monitor.tick(secs(100)).is_empty());
    assert_eq!(monitor.state(SourceKind::Remote), Some(AlertState::Normal));
    let watch = monitor.watch(SourceKind::Remote).expect("watched");
    assert_eq!(watch.since, secs(100));
}

#[test]
fn recovery_event_when_enabled() {
    let (engine, mut monitor) = setup(&[SourceKind::Remote], true);
    push_remote(&engine, t0());
    monitor.tick(secs(61));

    push_remote(&engine, secs(90));
    let events = monitor.tick(secs(100));
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, AlertKind::Recovered);
    assert!(events[0].message.contains("reporting again"));
}

#[test]
fn second_episode_alerts_again() {
    let (engine, mut monitor) = setup(&[SourceKind::Remote], false);
    push_remote(&engine, t0());
    assert_eq!(monitor.tick(secs(61)).len(), 1);

    push_remote(&engine, secs(90));
    assert!(monitor.tick(secs(100)).is_empty());

    assert_eq!(monitor.tick(secs(200)).len(), 1);
}

#[test]
fn local_source_ignored_unless_watched() {
    let (engine, mut monitor) = setup(&[SourceKind::Remote], false);
    push_local(&engine, t0());
    push_remote(&engine, secs(500));

    assert!(monitor.tick(secs(500)).is_empty());
    assert!(engine.snapshot().local.is_some());
    assert_eq!(monitor.state(SourceKind::Local), None);
}

#[test]
fn watched_local_source_expires_independently() {
    let (engine, mut monitor) = setup(&[SourceKind::Remote, SourceKind::Local], false);
    push_local(&engine, t0());
    push_remote(&engine, secs(500));

    let events = monitor.tick(secs(500));
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].source, SourceKind::Local);
    assert!(events[0].message.contains("Raspberry Pi (DHT22)"));
    assert!(engine.snapshot().local.is_none());
    assert_eq!(monitor.state(SourceKind::Remote), Some(AlertState::Normal));
}

#[test]
fn reading_that_ages_out_while_alerting_is_expired_without_new_alert() {
    let (engine, mut monitor) = setup(&[SourceKind::Remote], false);
    push_local(&engine, secs(600));
    push_remote(&engine, t0());
    assert_eq!(monitor.tick(secs(600)).len(), 1);

    // Arrives between ticks and is already stale by the next one.
    push_remote(&engine, secs(610));
    push_local(&engine, secs(1200));
    assert!(!engine.snapshot().fused.is_none());

    assert!(monitor.tick(secs(1200)).is_empty());
    assert_eq!(monitor.state(SourceKind::Remote), Some(AlertState::Alerting));
    let snapshot = engine.snapshot();
    assert!(snapshot.remote.is_none());
    assert!(snapshot.local.is_some());
    assert!(snapshot.fused.is_none());
}
