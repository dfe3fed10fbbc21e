//! Pure renderers from engine snapshots to external representations.
//!
//! Nothing here holds state or caches: every function reflects exactly the
//! snapshot it is given.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{SourceProfile, SourcesConfig};
use crate::fusion::{FusedEstimate, Reading, Snapshot, SourceKind};
use crate::monitor::{AlertState, SourceWatch};
use crate::telegram::ui::escape_html;
use crate::weather::WeatherReport;

/// Body of `GET /data`.
///
/// Field names are a fixed wire contract with existing clients: `esp_*`
/// is the remote device, `rpi_*` the local sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataView {
    /// Weather description or the unavailable placeholder.
    pub weather: String,
    /// Last successful weather lookup.
    pub weather_last_update: Option<DateTime<Utc>>,
    /// Remote temperature, °C.
    pub esp_temp: Option<f64>,
    /// Remote humidity, %.
    pub esp_hum: Option<f64>,
    /// Remote capture time.
    pub esp_last_update: Option<DateTime<Utc>>,
    /// Local temperature, °C.
    pub rpi_temp: Option<f64>,
    /// Local humidity, %.
    pub rpi_hum: Option<f64>,
    /// Local capture time.
    pub rpi_last_update: Option<DateTime<Utc>>,
    /// Fused temperature, °C.
    pub avg_temp: Option<f64>,
    /// Fused humidity, %.
    pub avg_hum: Option<f64>,
    /// Fused temperature uncertainty, °C.
    pub temp_error: Option<f64>,
    /// Fused humidity uncertainty, %.
    pub hum_error: Option<f64>,
    /// When the fused estimate was computed.
    pub avg_last_update: Option<DateTime<Utc>>,
}

/// Build the `GET /data` body.
pub fn data_view(snapshot: &Snapshot, weather: &WeatherReport) -> DataView {
    let remote = snapshot.remote.as_ref();
    let local = snapshot.local.as_ref();
    let fused = &snapshot.fused;
    DataView {
        weather: weather.display().to_owned(),
        weather_last_update: weather.updated_at,
        esp_temp: remote.map(Reading::temperature),
        esp_hum: remote.map(Reading::humidity),
        esp_last_update: remote.map(Reading::captured_at),
        rpi_temp: local.map(Reading::temperature),
        rpi_hum: local.map(Reading::humidity),
        rpi_last_update: local.map(Reading::captured_at),
        avg_temp: fused.temperature(),
        avg_hum: fused.humidity(),
        temp_error: fused.temp_error(),
        hum_error: fused.hum_error(),
        avg_last_update: fused.computed_at(),
    }
}

/// Body returned to the remote device after `POST /update`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateAck {
    /// Fused temperature after the update.
    #[serde(rename = "avgTemperature")]
    pub avg_temperature: Option<f64>,
    /// Fused humidity after the update.
    #[serde(rename = "avgHumidity")]
    pub avg_humidity: Option<f64>,
    /// Weather description for the device display.
    pub weather: String,
}

/// Build the `POST /update` acknowledgement.
pub fn update_ack(fused: &FusedEstimate, weather: &WeatherReport) -> UpdateAck {
    UpdateAck {
        avg_temperature: fused.temperature(),
        avg_humidity: fused.humidity(),
        weather: weather.display().to_owned(),
    }
}

/// Chat text for the fused estimate.
pub fn average_text(fused: &FusedEstimate) -> String {
    match fused.get() {
        Some(f) => format!(
            "Average Temperature: {:.1} \u{b1} {:.1} \u{b0}C\n\
             Average Humidity: {:.1} \u{b1} {:.1} %",
            f.temperature, f.temp_error, f.humidity, f.hum_error
        ),
        None => "Average data not available (a sensor is offline)".to_owned(),
    }
}

/// Chat text for one source.
pub fn source_text(profile: &SourceProfile, reading: Option<&Reading>) -> String {
    let label = escape_html(&profile.label);
    match reading {
        Some(r) => format!(
            "<b>{label}:</b>\n\
             Temperature: {:.1} \u{b1} {:.1} \u{b0}C\n\
             Humidity: {:.1} \u{b1} {:.1} %",
            r.temperature(),
            r.temp_error(),
            r.humidity(),
            r.hum_error()
        ),
        None => format!("{label} offline"),
    }
}

/// Chat text for the weather.
pub fn weather_text(city: &str, weather: &WeatherReport) -> String {
    format!(
        "Weather in {}: {}",
        escape_html(city),
        escape_html(weather.display())
    )
}

/// Chat text summarising freshness and alert state of every source.
pub fn status_text(
    sources: &SourcesConfig,
    snapshot: &Snapshot,
    watches: &[SourceWatch],
    now: DateTime<Utc>,
) -> String {
    let mut lines = vec!["<b>Status</b>".to_owned()];
    for source in SourceKind::ALL {
        let label = escape_html(&sources.profile(source).label);
        let age = match snapshot.reading(source) {
            Some(r) => format_age(now.signed_duration_since(r.captured_at())),
            None => "no data".to_owned(),
        };
        let alert = match watches.iter().find(|w| w.source == source) {
            Some(w) if w.state == AlertState::Alerting => ", alerting",
            Some(_) => ", ok",
            None => "",
        };
        lines.push(format!("{label}: {age}{alert}"));
    }
    let fusion = if snapshot.fused.is_none() {
        "unavailable"
    } else {
        "active"
    };
    lines.push(format!("Fusion: {fusion}"));
    lines.join("\n")
}

/// Format a reading age as "42s ago" / "3m ago" / "2h ago".
fn format_age(age: chrono::Duration) -> String {
    let secs = age.num_seconds().max(0);
    if secs < 60 {
        format!("{secs}s ago")
    } else if secs < 3600 {
        format!("{}m ago", secs / 60)
    } else {
        format!("{}h ago", secs / 3600)
    }
}
