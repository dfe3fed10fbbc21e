//! Configuration loading and validation.
//!
//! Loads `climate-guardian.toml` (or `$CLIMATE_GUARDIAN_CONFIG`). Every
//! section uses `#[serde(default)]`, so a missing or empty file is valid.
//! Secrets are never stored in the file: it only names the environment
//! variables that hold them.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::fusion::{ErrorBounds, SourceKind};

/// Environment variable that overrides the config file location.
pub const CONFIG_PATH_ENV: &str = "CLIMATE_GUARDIAN_CONFIG";

/// Config file used when no override is given.
pub const DEFAULT_CONFIG_FILE: &str = "climate-guardian.toml";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP listener settings.
    pub server: ServerConfig,
    /// Per-source labels and accuracy constants.
    pub sources: SourcesConfig,
    /// Local sensor polling.
    pub local: LocalConfig,
    /// Staleness monitoring.
    pub monitor: MonitorConfig,
    /// Weather lookup.
    pub weather: WeatherConfig,
    /// Telegram bot and alert targets.
    pub telegram: TelegramConfig,
    /// Log output.
    pub logging: LoggingConfig,
    /// Graceful shutdown.
    pub shutdown: ShutdownConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to bind, e.g. `0.0.0.0:8080`.
    pub listen_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

/// Display label and fixed accuracy of one source.
///
/// All fields are required when the section is present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceProfile {
    /// Human-readable name used in chat replies and alerts.
    pub label: String,
    /// Temperature accuracy in °C (±).
    pub temp_error: f64,
    /// Relative humidity accuracy in % (±).
    pub hum_error: f64,
}

impl SourceProfile {
    /// Accuracy constants as [`ErrorBounds`].
    pub fn bounds(&self) -> ErrorBounds {
        ErrorBounds {
            temperature: self.temp_error,
            humidity: self.hum_error,
        }
    }
}

/// Profiles for both sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// Sensor attached to this host.
    pub local: SourceProfile,
    /// Device pushing readings over HTTP.
    pub remote: SourceProfile,
}

impl SourcesConfig {
    /// Profile of the given source.
    pub fn profile(&self, source: SourceKind) -> &SourceProfile {
        match source {
            SourceKind::Local => &self.local,
            SourceKind::Remote => &self.remote,
        }
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            local: SourceProfile {
                label: "Raspberry Pi (DHT22)".to_owned(),
                temp_error: ErrorBounds::DHT22.temperature,
                hum_error: ErrorBounds::DHT22.humidity,
            },
            remote: SourceProfile {
                label: "ESP8266 (DHT11)".to_owned(),
                temp_error: ErrorBounds::DHT11.temperature,
                hum_error: ErrorBounds::DHT11.humidity,
            },
        }
    }
}

/// Local sensor polling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalConfig {
    /// Seconds between sensor reads.
    pub interval_secs: u64,
    /// Helper command printing `{"temperature":..,"humidity":..}`.
    /// Empty disables local polling.
    pub command: Vec<String>,
    /// Seconds before a hanging helper is killed.
    pub read_timeout_secs: u64,
}

impl LocalConfig {
    /// Poll period.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Helper command timeout.
    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_local_interval_secs(),
            command: vec!["dht22-read".to_owned()],
            read_timeout_secs: default_read_timeout_secs(),
        }
    }
}

/// Staleness monitoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Seconds between staleness checks.
    pub interval_secs: u64,
    /// Age in seconds after which a reading is stale.
    pub max_age_secs: u64,
    /// Also expire and alert on the local source.
    pub watch_local: bool,
    /// Send a message when a stale source reports again.
    pub notify_recovery: bool,
}

impl MonitorConfig {
    /// Check period.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Freshness window.
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_secs)
    }

    /// Sources the monitor watches. The remote source is always included.
    pub fn watched_sources(&self) -> Vec<SourceKind> {
        if self.watch_local {
            vec![SourceKind::Remote, SourceKind::Local]
        } else {
            vec![SourceKind::Remote]
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_monitor_interval_secs(),
            max_age_secs: default_max_age_secs(),
            watch_local: false,
            notify_recovery: false,
        }
    }
}

/// Weather lookup (OpenWeatherMap current weather endpoint).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    /// Master switch.
    pub enabled: bool,
    /// Seconds between lookups.
    pub interval_secs: u64,
    /// City name passed as `q`.
    pub city: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Endpoint URL.
    pub base_url: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl WeatherConfig {
    /// Lookup period.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_weather_interval_secs(),
            city: "Chernihiv".to_owned(),
            api_key_env: "OPENWEATHER_API_KEY".to_owned(),
            base_url: "https://api.openweathermap.org/data/2.5/weather".to_owned(),
            timeout_secs: 10,
        }
    }
}

/// Telegram bot and alert targets.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Environment variable holding the bot token.
    pub bot_token_env: String,
    /// Chats allowed to issue commands. Empty allows everyone.
    pub allowed_chats: Vec<i64>,
    /// Chats receiving alerts.
    pub notify_chats: Vec<i64>,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token_env: "CLIMATE_GUARDIAN_TELEGRAM_TOKEN".to_owned(),
            allowed_chats: Vec::new(),
            notify_chats: Vec::new(),
        }
    }
}

/// Log output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Directory for JSON log files. Defaults to `~/.climate-guardian/logs`.
    pub dir: Option<PathBuf>,
    /// Level filter used when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: None,
            level: "info".to_owned(),
        }
    }
}

/// Graceful shutdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// Seconds to wait for tasks to finish before exiting.
    pub timeout_secs: u64,
}

impl ShutdownConfig {
    /// Drain timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self { timeout_secs: 10 }
    }
}

impl Config {
    /// Parse a TOML string and validate it.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or a value is out of bounds.
    pub fn from_toml(toml_str: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(toml_str).context("failed to parse config TOML")?;
        config.validate()?;
        Ok(config)
    }

    /// Check that values are within sane bounds.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.listen_addr()?;
        for source in SourceKind::ALL {
            let profile = self.sources.profile(source);
            anyhow::ensure!(
                profile.temp_error.is_finite() && profile.temp_error >= 0.0,
                "sources.{source}.temp_error must be a non-negative number"
            );
            anyhow::ensure!(
                profile.hum_error.is_finite() && profile.hum_error >= 0.0,
                "sources.{source}.hum_error must be a non-negative number"
            );
        }
        anyhow::ensure!(
            self.local.interval_secs >= 1,
            "local.interval_secs must be >= 1"
        );
        anyhow::ensure!(
            self.local.read_timeout_secs >= 1,
            "local.read_timeout_secs must be >= 1"
        );
        anyhow::ensure!(
            self.monitor.interval_secs >= 1,
            "monitor.interval_secs must be >= 1"
        );
        anyhow::ensure!(
            self.monitor.max_age_secs >= 1,
            "monitor.max_age_secs must be >= 1"
        );
        anyhow::ensure!(
            self.weather.interval_secs >= 1,
            "weather.interval_secs must be >= 1"
        );
        anyhow::ensure!(
            self.weather.timeout_secs >= 1,
            "weather.timeout_secs must be >= 1"
        );
        Ok(())
    }

    /// Parsed HTTP listen address.
    ///
    /// # Errors
    ///
    /// Returns an error if `server.listen_addr` is not a socket address.
    pub fn listen_addr(&self) -> anyhow::Result<SocketAddr> {
        self.server
            .listen_addr
            .parse()
            .with_context(|| format!("invalid server.listen_addr: {}", self.server.listen_addr))
    }
}

/// Load configuration from `path`. A missing file yields defaults.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read, parsed, or
/// validated.
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    match std::fs::read_to_string(path) {
        Ok(contents) => {
            tracing::info!(path = %path.display(), "loading config from file");
            Config::from_toml(&contents)
                .with_context(|| format!("invalid config at {}", path.display()))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!(path = %path.display(), "no config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => Err(anyhow::anyhow!(
            "failed to read config at {}: {e}",
            path.display()
        )),
    }
}

/// Resolve the config path: explicit argument, then `$CLIMATE_GUARDIAN_CONFIG`,
/// then `./climate-guardian.toml`.
pub fn config_path(explicit: Option<&Path>) -> PathBuf {
    config_path_with(explicit, |key| std::env::var(key).ok())
}

/// Resolve the config path using a custom env resolver (for testing).
pub fn config_path_with(
    explicit: Option<&Path>,
    env: impl Fn(&str) -> Option<String>,
) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_owned();
    }
    if let Some(p) = env(CONFIG_PATH_ENV) {
        return PathBuf::from(p);
    }
    PathBuf::from(DEFAULT_CONFIG_FILE)
}

/// Default log directory (`~/.climate-guardian/logs`).
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn default_logs_dir() -> anyhow::Result<PathBuf> {
    let home = directories::BaseDirs::new()
        .ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
    Ok(home.home_dir().join(".climate-guardian").join("logs"))
}

// Default value functions for serde

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_owned()
}
fn default_local_interval_secs() -> u64 {
    10
}
fn default_read_timeout_secs() -> u64 {
    15
}
fn default_monitor_interval_secs() -> u64 {
    60
}
fn default_max_age_secs() -> u64 {
    60
}
fn default_weather_interval_secs() -> u64 {
    300
}
