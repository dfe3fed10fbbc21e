//! Climate Guardian CLI entry point.
//!
//! Provides `start` for running the daemon and `check-config` for validating
//! a configuration file without starting anything.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use teloxide::Bot;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use climate_guardian::config::{self, Config};
use climate_guardian::fusion::{FusionEngine, SourceKind};
use climate_guardian::monitor::{self, AlertEvent, StalenessMonitor};
use climate_guardian::sensor::{self, CommandSensor, LocalSensor};
use climate_guardian::server::{self, AppState};
use climate_guardian::telegram::notifier::{self, AlertSink, LogSink, TelegramSink};
use climate_guardian::telegram::{self, SharedState};
use climate_guardian::weather::{self, OpenWeatherMap, WeatherBoard, WeatherProvider};
use climate_guardian::{logging, runtime};

/// Capacity of the alert channel between the monitor and the notifier.
const ALERT_CHANNEL_CAPACITY: usize = 32;

/// Climate Guardian: two-sensor climate fusion daemon.
#[derive(Parser)]
#[command(name = "climate-guardian", version, about)]
struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Available CLI subcommands.
#[derive(Subcommand)]
enum Command {
    /// Run the daemon.
    Start {
        /// Path to the TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Load and validate the config, then exit.
    CheckConfig {
        /// Path to the TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Missing .env is fine.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    match cli.command {
        Command::Start { config } => handle_start(config).await,
        Command::CheckConfig { config } => handle_check_config(config),
    }
}

/// Read a secret from the environment variable named in config.
fn secret_from_env(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.trim().is_empty())
}

/// Run the daemon until Ctrl+C.
async fn handle_start(config_arg: Option<PathBuf>) -> anyhow::Result<()> {
    let config_path = config::config_path(config_arg.as_deref());
    let config = config::load_config(&config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;
    let config = Arc::new(config);

    // Set up production logging (JSON file + stderr).
    let logging_guard = logging::init_production(&config.logging)?;
    info!(dir = %logging_guard.logs_dir().display(), "logging initialised");

    let listen_addr = config.listen_addr()?;
    let engine = Arc::new(FusionEngine::new(config.monitor.max_age()));
    let weather_board = Arc::new(WeatherBoard::new());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (alert_tx, alert_rx) = mpsc::channel::<AlertEvent>(ALERT_CHANNEL_CAPACITY);

    let monitor = Arc::new(Mutex::new(StalenessMonitor::new(
        Arc::clone(&engine),
        config.sources.clone(),
        &config.monitor.watched_sources(),
        config.monitor.notify_recovery,
        Utc::now(),
    )));

    let mut handles: Vec<JoinHandle<()>> = Vec::new();

    // Local sensor poller.
    match CommandSensor::from_argv(&config.local.command, config.local.read_timeout()) {
        Some(command_sensor) => {
            let local_sensor: Arc<dyn LocalSensor> = Arc::new(command_sensor);
            let engine = Arc::clone(&engine);
            let bounds = config.sources.profile(SourceKind::Local).bounds();
            let period = config.local.interval();
            let rx = shutdown_rx.clone();
            handles.push(runtime::spawn_supervised(
                "local-poller",
                shutdown_rx.clone(),
                move || {
                    sensor::run_local_poller(
                        Arc::clone(&local_sensor),
                        Arc::clone(&engine),
                        bounds,
                        period,
                        rx.clone(),
                    )
                },
            ));
        }
        None => warn!("local.command is empty, local sensor disabled"),
    }

    // Staleness monitor.
    {
        let monitor = Arc::clone(&monitor);
        let period = config.monitor.interval();
        let alert_tx = alert_tx.clone();
        let rx = shutdown_rx.clone();
        handles.push(runtime::spawn_supervised(
            "staleness-monitor",
            shutdown_rx.clone(),
            move || monitor::run_monitor(Arc::clone(&monitor), period, alert_tx.clone(), rx.clone()),
        ));
    }
    drop(alert_tx);

    // Weather refresher.
    if config.weather.enabled {
        match secret_from_env(&config.weather.api_key_env) {
            Some(api_key) => {
                let provider: Arc<dyn WeatherProvider> =
                    Arc::new(OpenWeatherMap::new(&config.weather, api_key)?);
                let board = Arc::clone(&weather_board);
                let period = config.weather.interval();
                let rx = shutdown_rx.clone();
                handles.push(runtime::spawn_supervised(
                    "weather-refresher",
                    shutdown_rx.clone(),
                    move || {
                        weather::run_weather_refresher(
                            Arc::clone(&provider),
                            Arc::clone(&board),
                            period,
                            rx.clone(),
                        )
                    },
                ));
            }
            None => warn!(
                env = %config.weather.api_key_env,
                "weather API key not set, weather lookups disabled"
            ),
        }
    }

    // Telegram bot and alert sink.
    let bot = secret_from_env(&config.telegram.bot_token_env).map(Bot::new);
    let sink: Arc<dyn AlertSink> = match &bot {
        Some(bot) if !config.telegram.notify_chats.is_empty() => Arc::new(TelegramSink::new(
            bot.clone(),
            &config.telegram.notify_chats,
        )),
        _ => {
            info!("no telegram notify chats, alerts go to the log");
            Arc::new(LogSink)
        }
    };
    handles.push(tokio::spawn(notifier::run_notifier(sink, alert_rx)));

    match bot {
        Some(bot) => {
            let shared = SharedState {
                engine: Arc::clone(&engine),
                weather: Arc::clone(&weather_board),
                monitor: Arc::clone(&monitor),
                config: Arc::clone(&config),
            };
            handles.push(tokio::spawn(telegram::run_telegram(
                bot,
                shared,
                shutdown_rx.clone(),
            )));
        }
        None => warn!(
            env = %config.telegram.bot_token_env,
            "telegram bot token not set, chat commands disabled"
        ),
    }

    // HTTP server.
    let listener = tokio::net::TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind {listen_addr}"))?;
    let app_state = AppState {
        engine: Arc::clone(&engine),
        weather: Arc::clone(&weather_board),
        remote_bounds: config.sources.profile(SourceKind::Remote).bounds(),
    };
    let server_rx = shutdown_rx.clone();
    handles.push(tokio::spawn(async move {
        if let Err(e) = server::serve(listener, app_state, server_rx).await {
            warn!(error = %e, "http server exited with error");
        }
    }));

    info!(
        config = %config_path.display(),
        addr = %listen_addr,
        "climate guardian started"
    );

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    info!("shutdown requested");
    let _ = shutdown_tx.send(true);

    let timeout = config.shutdown.timeout();
    let joined = tokio::time::timeout(timeout, async {
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "task ended abnormally");
            }
        }
    })
    .await;
    if joined.is_err() {
        warn!(
            timeout_secs = timeout.as_secs(),
            "tasks did not stop in time, exiting anyway"
        );
    }

    info!("climate guardian stopped");
    Ok(())
}

/// Validate the config file and print the effective settings.
fn handle_check_config(config_arg: Option<PathBuf>) -> anyhow::Result<()> {
    logging::init_cli();

    let config_path = config::config_path(config_arg.as_deref());
    let config: Config = config::load_config(&config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;

    logging::level_filter(&config.logging.level)?;

    let rendered = toml::to_string_pretty(&config).context("failed to render config")?;
    info!(path = %config_path.display(), "config is valid");
    println!("{rendered}");
    Ok(())
}
