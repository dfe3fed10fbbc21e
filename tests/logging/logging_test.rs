//! Tests for `src/logging.rs`.
//!
//! The global subscriber can only be installed once per process, so exactly
//! one test here installs it.

use climate_guardian::config::LoggingConfig;
use climate_guardian::logging::{self, LoggingGuard};

#[test]
fn logging_guard_is_send() {
    fn assert_send<T: Send>() {}
    assert_send::<LoggingGuard>();
}

#[test]
fn level_filter_accepts_directives() {
    logging::level_filter("info").expect("plain level");
    logging::level_filter("climate_guardian=debug,tower_http=warn").expect("per-target levels");
}

#[test]
fn level_filter_rejects_garbage_without_rust_log() {
    if std::env::var_os("RUST_LOG").is_some() {
        return;
    }
    let err = logging::level_filter("climate_guardian=loud").expect_err("not a level");
    assert!(format!("{err:#}").contains("invalid logging.level"));
}

#[test]
fn init_production_creates_logs_dir_and_refuses_second_install() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let logs_dir = tmp.path().join("nested").join("logs");
    let config = LoggingConfig {
        dir: Some(logs_dir.clone()),
        level: "debug".to_owned(),
    };

    let guard = logging::init_production(&config).expect("logging should initialise");
    assert_eq!(guard.logs_dir(), logs_dir.as_path());
    assert!(logs_dir.exists(), "logs directory should be created");
    tracing::info!("hello from the logging test");

    let second = logging::init_production(&config);
    assert!(second.is_err(), "a second global subscriber must be refused");
    drop(guard);
}
