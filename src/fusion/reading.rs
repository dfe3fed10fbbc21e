//! Immutable measurement values.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fixed accuracy of one sensor class, as published by the manufacturer.
///
/// These are configuration, not measurements: every reading from a source
/// carries the same bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ErrorBounds {
    /// Temperature accuracy in °C (±).
    pub temperature: f64,
    /// Relative humidity accuracy in % (±).
    pub humidity: f64,
}

impl ErrorBounds {
    /// DHT11: ±2.0 °C, ±5 %.
    pub const DHT11: ErrorBounds = ErrorBounds {
        temperature: 2.0,
        humidity: 5.0,
    };

    /// DHT22: ±0.5 °C, ±2 %.
    pub const DHT22: ErrorBounds = ErrorBounds {
        temperature: 0.5,
        humidity: 2.0,
    };

    /// Stamp a raw measurement with these bounds.
    pub fn reading(self, temperature: f64, humidity: f64, captured_at: DateTime<Utc>) -> Reading {
        Reading::new(temperature, humidity, self, captured_at)
    }
}

/// One measurement from one source.
///
/// Fields are private so a reading cannot change after construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Reading {
    temperature: f64,
    humidity: f64,
    temp_error: f64,
    hum_error: f64,
    captured_at: DateTime<Utc>,
}

impl Reading {
    /// Build a reading. Values are not range-checked.
    pub fn new(
        temperature: f64,
        humidity: f64,
        bounds: ErrorBounds,
        captured_at: DateTime<Utc>,
    ) -> Self {
        Self {
            temperature,
            humidity,
            temp_error: bounds.temperature,
            hum_error: bounds.humidity,
            captured_at,
        }
    }

    /// Temperature in °C.
    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    /// Relative humidity in %.
    pub fn humidity(&self) -> f64 {
        self.humidity
    }

    /// Temperature accuracy of the producing source.
    pub fn temp_error(&self) -> f64 {
        self.temp_error
    }

    /// Humidity accuracy of the producing source.
    pub fn hum_error(&self) -> f64 {
        self.hum_error
    }

    /// When the measurement was taken (or received, for pushed readings).
    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }
}
