//! Tests for `src/telegram/commands.rs` and the shared reply path.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use climate_guardian::config::{Config, SourcesConfig};
use climate_guardian::fusion::{ErrorBounds, FusionEngine, SourceKind};
use climate_guardian::monitor::StalenessMonitor;
use climate_guardian::telegram::commands::{handle_help, parse_command, respond, BotCommand, CommandContext};
use climate_guardian::telegram::SharedState;
use climate_guardian::weather::{WeatherBoard, WeatherReport};

#[test]
fn parse_known_commands() {
    assert_eq!(parse_command("/start"), Some(BotCommand::Help));
    assert_eq!(parse_command("/help"), Some(BotCommand::Help));
    assert_eq!(parse_command("/weather"), Some(BotCommand::Weather));
    assert_eq!(parse_command("/average"), Some(BotCommand::Average));
    assert_eq!(parse_command("/esp"), Some(BotCommand::Esp));
    assert_eq!(parse_command("/rpi"), Some(BotCommand::Rpi));
    assert_eq!(parse_command("/status"), Some(BotCommand::Status));
}

#[test]
fn parse_strips_bot_mention_and_args() {
    assert_eq!(
        parse_command("/average@climate_bot"),
        Some(BotCommand::Average)
    );
    assert_eq!(parse_command("  /esp now please"), Some(BotCommand::Esp));
}

#[test]
fn parse_rejects_plain_text_and_flags_unknown() {
    assert_eq!(parse_command("hello"), None);
    assert_eq!(
        parse_command("/reboot"),
        Some(BotCommand::Unknown("reboot".to_owned()))
    );
}

#[test]
fn help_lists_every_command() {
    let help = handle_help();
    for cmd in ["/weather", "/average", "/esp", "/rpi", "/status", "/help"] {
        assert!(help.contains(cmd), "help should mention {cmd}");
    }
}

#[test]
fn respond_routes_to_the_right_source() {
    let engine = FusionEngine::new(Duration::from_secs(60));
    engine.update_remote(ErrorBounds::DHT11.reading(22.0, 55.0, Utc::now()));
    let sources = SourcesConfig::default();
    let ctx = CommandContext {
        sources: &sources,
        city: "Chernihiv",
        snapshot: engine.snapshot(),
        weather: WeatherReport::default(),
        watches: Vec::new(),
        now: Utc::now(),
    };

    assert!(respond(&BotCommand::Esp, &ctx).contains("Temperature: 22.0 ± 2.0 °C"));
    assert_eq!(
        respond(&BotCommand::Rpi, &ctx),
        "Raspberry Pi (DHT22) offline"
    );
    assert!(respond(&BotCommand::Average, &ctx).contains("not available"));
    assert!(respond(&BotCommand::Weather, &ctx).starts_with("Weather in Chernihiv"));
    assert_eq!(
        respond(&BotCommand::Unknown("<x>".to_owned()), &ctx),
        "Unknown command: /&lt;x&gt;"
    );
}

#[test]
fn shared_state_reply_reads_live_state() {
    let config = Arc::new(Config::default());
    let engine = Arc::new(FusionEngine::new(config.monitor.max_age()));
    let monitor = Arc::new(Mutex::new(StalenessMonitor::new(
        Arc::clone(&engine),
        config.sources.clone(),
        &[SourceKind::Remote],
        false,
        Utc::now(),
    )));
    let weather = Arc::new(WeatherBoard::new());
    weather.record_success("Clear sky, 5°C".to_owned(), Utc::now());

    let shared = SharedState {
        engine: Arc::clone(&engine),
        weather,
        monitor,
        config,
    };

    assert_eq!(shared.reply_to("just chatting"), None);
    assert_eq!(
        shared.reply_to("/weather").as_deref(),
        Some("Weather in Chernihiv: Clear sky, 5°C")
    );

    engine.update_local(ErrorBounds::DHT22.reading(20.0, 50.0, Utc::now()));
    engine.update_remote(ErrorBounds::DHT11.reading(22.0, 55.0, Utc::now()));
    let average = shared.reply_to("/average").expect("command");
    assert!(average.starts_with("Average Temperature: 21.0 ± 1.0 °C"));

    let status = shared.reply_to("/status").expect("command");
    assert!(status.contains("ESP8266 (DHT11): 0s ago, ok"));
    assert!(status.ends_with("Fusion: active"));
}
