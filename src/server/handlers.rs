//! Route handlers.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use tracing::{debug, warn};

use super::AppState;
use crate::error::GuardianError;
use crate::gateway::{self, DataView, UpdateAck};
use crate::sensor::RawReading;

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Error description.
    pub error: String,
}

/// Handler-level error mapped onto an HTTP status.
#[derive(Debug)]
pub struct ApiError(GuardianError);

impl From<GuardianError> for ApiError {
    fn from(e: GuardianError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            GuardianError::MalformedInboundReading(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (
            status,
            Json(ErrorBody {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

/// `POST /update`: store a remote reading stamped with the receipt time.
///
/// Malformed bodies are rejected before the engine is touched.
pub async fn post_update(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<UpdateAck>, ApiError> {
    let raw = RawReading::from_json(&body).inspect_err(|e| {
        warn!(error = %e, "rejected inbound reading");
    })?;

    let reading = state
        .remote_bounds
        .reading(raw.temperature, raw.humidity, Utc::now());
    state.engine.update_remote(reading);
    debug!(
        temperature = raw.temperature,
        humidity = raw.humidity,
        "remote reading stored"
    );

    let fused = state.engine.snapshot().fused;
    Ok(Json(gateway::update_ack(&fused, &state.weather.current())))
}

/// `GET /data`: the full snapshot.
pub async fn get_data(State(state): State<AppState>) -> Json<DataView> {
    let snapshot = state.engine.snapshot();
    Json(gateway::data_view(&snapshot, &state.weather.current()))
}

/// Liveness body.
#[derive(Debug, Serialize)]
pub struct HealthBody {
    /// Always `"ok"`.
    pub status: &'static str,
}

/// `GET /health`.
pub async fn health() -> Json<HealthBody> {
    Json(HealthBody { status: "ok" })
}

/// `GET /favicon.ico`: no content.
pub async fn favicon() -> StatusCode {
    StatusCode::NO_CONTENT
}
