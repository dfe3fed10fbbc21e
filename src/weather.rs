//! Outdoor weather lookup and the board that caches its last result.
//!
//! Weather never feeds into fusion; it is display-only context for the HTTP
//! and chat surfaces. Lookup failures degrade to "Weather unavailable".

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::WeatherConfig;
use crate::error::GuardianError;

/// Text shown when no weather description is available.
pub const WEATHER_UNAVAILABLE: &str = "Weather unavailable";

/// Last known weather, as shown to consumers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeatherReport {
    /// Description from the last successful lookup; cleared on failure.
    pub description: Option<String>,
    /// Time of the last successful lookup.
    pub updated_at: Option<DateTime<Utc>>,
}

impl WeatherReport {
    /// Description or the unavailable placeholder.
    pub fn display(&self) -> &str {
        self.description.as_deref().unwrap_or(WEATHER_UNAVAILABLE)
    }
}

/// Shared cache of the latest weather lookup.
#[derive(Debug, Default)]
pub struct WeatherBoard {
    report: Mutex<WeatherReport>,
}

impl WeatherBoard {
    /// Create an empty board.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a successful lookup.
    pub fn record_success(&self, description: String, at: DateTime<Utc>) {
        let mut report = self.report.lock().unwrap_or_else(PoisonError::into_inner);
        report.description = Some(description);
        report.updated_at = Some(at);
    }

    /// Mark the weather unavailable, keeping the last success time.
    pub fn record_failure(&self) {
        let mut report = self.report.lock().unwrap_or_else(PoisonError::into_inner);
        report.description = None;
    }

    /// Copy of the current report.
    pub fn current(&self) -> WeatherReport {
        self.report
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Source of a one-line weather description.
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Fetch the current description.
    ///
    /// # Errors
    ///
    /// Returns [`GuardianError::UpstreamWeatherFailure`] on any transport or
    /// decoding failure.
    async fn fetch(&self) -> Result<String, GuardianError>;
}

/// Subset of the OpenWeatherMap current-weather response we read.
#[derive(Debug, Deserialize)]
pub struct OwmResponse {
    /// Weather conditions, first entry is the primary one.
    pub weather: Vec<OwmCondition>,
    /// Main measurements.
    pub main: OwmMain,
}

/// One weather condition entry.
#[derive(Debug, Deserialize)]
pub struct OwmCondition {
    /// Free-text description, e.g. "light rain".
    pub description: String,
}

/// Main measurement block.
#[derive(Debug, Deserialize)]
pub struct OwmMain {
    /// Temperature in the requested units.
    pub temp: f64,
}

/// Render an OpenWeatherMap response as `"Light rain, 12.3°C"`.
///
/// # Errors
///
/// Returns [`GuardianError::UpstreamWeatherFailure`] if the response has no
/// weather condition.
pub fn describe(response: &OwmResponse) -> Result<String, GuardianError> {
    let condition = response.weather.first().ok_or_else(|| {
        GuardianError::UpstreamWeatherFailure("response has no weather entry".to_owned())
    })?;
    Ok(format!(
        "{}, {}°C",
        capitalize(&condition.description),
        response.main.temp
    ))
}

/// Uppercase the first character, lowercase the rest.
fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// OpenWeatherMap client for the current-weather endpoint.
pub struct OpenWeatherMap {
    client: reqwest::Client,
    base_url: String,
    city: String,
    api_key: String,
}

impl OpenWeatherMap {
    /// Build a client from config and an API key.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &WeatherConfig, api_key: String) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            city: config.city.clone(),
            api_key,
        })
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherMap {
    async fn fetch(&self) -> Result<String, GuardianError> {
        let upstream = |e: reqwest::Error| GuardianError::UpstreamWeatherFailure(e.to_string());
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("q", self.city.as_str()),
                ("appid", self.api_key.as_str()),
                ("units", "metric"),
                ("lang", "en"),
            ])
            .send()
            .await
            .map_err(upstream)?
            .error_for_status()
            .map_err(upstream)?;
        let body: OwmResponse = response.json().await.map_err(upstream)?;
        describe(&body)
    }
}

/// Run one lookup and record the outcome on the board.
pub async fn refresh_once(provider: &dyn WeatherProvider, board: &WeatherBoard) {
    match provider.fetch().await {
        Ok(description) => {
            debug!(%description, "weather updated");
            board.record_success(description, Utc::now());
        }
        Err(e) => {
            warn!(error = %e, "weather lookup failed");
            board.record_failure();
        }
    }
}

/// Periodically refresh the weather board until shutdown.
pub async fn run_weather_refresher(
    provider: Arc<dyn WeatherProvider>,
    board: Arc<WeatherBoard>,
    period: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    info!(interval_secs = period.as_secs(), "weather refresher started");
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                refresh_once(provider.as_ref(), &board).await;
            }
            result = shutdown_rx.changed() => {
                if result.is_err() || *shutdown_rx.borrow() {
                    break;
                }
            }
        }
    }

    info!("weather refresher stopped");
}
