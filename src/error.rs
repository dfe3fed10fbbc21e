//! Error kinds raised at the edges of the fusion core.
//!
//! The fusion engine itself is infallible once it holds a well-formed
//! [`Reading`](crate::fusion::Reading). Every variant here is contained by the
//! task that produced it.

use thiserror::Error;

/// Failures surfaced by the collaborators around the fusion engine.
#[derive(Debug, Error)]
pub enum GuardianError {
    /// The local sensor produced no reading this cycle.
    #[error("sensor read failed: {0}")]
    SensorReadFailure(String),

    /// An inbound remote payload was missing fields or not numeric.
    #[error("malformed inbound reading: {0}")]
    MalformedInboundReading(String),

    /// The weather service could not be reached or returned garbage.
    #[error("weather lookup failed: {0}")]
    UpstreamWeatherFailure(String),

    /// An alert could not be handed to the notification channel.
    #[error("alert delivery failed: {0}")]
    DeliveryFailure(String),
}
