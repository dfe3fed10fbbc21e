//! Coverage for config parsing, validation, and loading.

use std::time::Duration;

use climate_guardian::config::{load_config, Config};
use climate_guardian::fusion::{ErrorBounds, SourceKind};

#[test]
fn defaults_are_valid() {
    let config = Config::default();
    config.validate().expect("defaults should validate");
    assert_eq!(config.server.listen_addr, "0.0.0.0:8080");
    assert_eq!(config.monitor.max_age(), Duration::from_secs(60));
    assert_eq!(config.monitor.interval(), Duration::from_secs(60));
    assert_eq!(config.local.interval(), Duration::from_secs(10));
    assert!(!config.monitor.watch_local);
    assert!(!config.monitor.notify_recovery);
    assert_eq!(config.weather.city, "Chernihiv");
    assert_eq!(config.shutdown.timeout(), Duration::from_secs(10));
}

#[test]
fn empty_toml_yields_defaults() {
    let config = Config::from_toml("").expect("empty config is valid");
    assert_eq!(config.sources.remote.bounds(), ErrorBounds::DHT11);
    assert_eq!(config.sources.local.bounds(), ErrorBounds::DHT22);
}

#[test]
fn partial_sections_keep_other_defaults() {
    let toml_str = r#"
[server]
listen_addr = "127.0.0.1:9000"

[sources.remote]
label = "Balcony ESP"
temp_error = 1.5
hum_error = 4.0

[monitor]
max_age_secs = 120
watch_local = true

[telegram]
notify_chats = [12345]
"#;
    let config = Config::from_toml(toml_str).expect("should parse");
    assert_eq!(config.listen_addr().expect("addr").port(), 9000);
    assert_eq!(config.sources.remote.label, "Balcony ESP");
    assert!((config.sources.remote.temp_error - 1.5).abs() < f64::EPSILON);
    assert!((config.sources.remote.hum_error - 4.0).abs() < f64::EPSILON);
    assert_eq!(config.sources.profile(SourceKind::Local).label, "Raspberry Pi (DHT22)");
    assert_eq!(config.monitor.max_age(), Duration::from_secs(120));
    assert_eq!(config.monitor.interval(), Duration::from_secs(60));
    assert_eq!(
        config.monitor.watched_sources(),
        vec![SourceKind::Remote, SourceKind::Local]
    );
    assert_eq!(config.telegram.notify_chats, vec![12345]);
    assert!(config.telegram.allowed_chats.is_empty());
}

#[test]
fn invalid_values_are_rejected() {
    for (toml_str, needle) in [
        ("[server]\nlisten_addr = \"nowhere\"", "listen_addr"),
        ("[monitor]\nmax_age_secs = 0", "max_age_secs"),
        ("[monitor]\ninterval_secs = 0", "interval_secs"),
        ("[local]\ninterval_secs = 0", "local.interval_secs"),
        (
            "[sources.local]\nlabel = \"Pi\"\ntemp_error = -1.0\nhum_error = 2.0",
            "temp_error",
        ),
    ] {
        let err = Config::from_toml(toml_str).expect_err(toml_str);
        assert!(
            format!("{err:#}").contains(needle),
            "error for {toml_str:?} should mention {needle}: {err:#}"
        );
    }
}

#[test]
fn unparsable_toml_is_an_error() {
    assert!(Config::from_toml("[monitor\nmax_age_secs = 1").is_err());
    assert!(Config::from_toml("[monitor]\nmax_age_secs = \"soon\"").is_err());
    assert!(
        Config::from_toml("[sources.remote]\nlabel = \"ESP\"").is_err(),
        "a source profile needs both error bounds"
    );
}

#[test]
fn load_config_missing_file_uses_defaults() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let config = load_config(&tmp.path().join("absent.toml")).expect("defaults");
    assert_eq!(config.server.listen_addr, "0.0.0.0:8080");
}

#[test]
fn load_config_reads_file() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let path = tmp.path().join("climate-guardian.toml");
    std::fs::write(&path, "[weather]\ncity = \"Kyiv\"\nenabled = false\n")
        .expect("should write config");

    let config = load_config(&path).expect("should load");
    assert_eq!(config.weather.city, "Kyiv");
    assert!(!config.weather.enabled);
}

#[test]
fn load_config_reports_invalid_file() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let path = tmp.path().join("bad.toml");
    std::fs::write(&path, "[monitor]\nmax_age_secs = 0\n").expect("should write config");

    let err = load_config(&path).expect_err("invalid config");
    assert!(format!("{err:#}").contains("bad.toml"));
}

#[test]
fn config_round_trips_through_toml() {
    let rendered = toml::to_string_pretty(&Config::default()).expect("serializable");
    let parsed = Config::from_toml(&rendered).expect("rendered config should parse");
    assert_eq!(parsed.server.listen_addr, Config::default().server.listen_addr);
}
