//! HTTP route handlers for the API.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use conclave_common::ConclaveError;
use conclave_coordinator::{ChatRequest, ChatResponse, FanOutMode};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
    pub fast_model: String,
    pub smart_model: String,
    pub fan_out: FanOutMode,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.uptime_seconds(),
        fast_model: state.tiers.fast.clone(),
        smart_model: state.tiers.smart.clone(),
        fan_out: state.fan_out(),
    })
}

/// API error response. `status` picks the HTTP status and is not serialized.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
    #[serde(skip)]
    pub status: StatusCode,
}

impl ErrorResponse {
    pub fn bad_request(error: impl Into<String>, code: &'static str) -> Self {
        Self {
            error: error.into(),
            code,
            status: StatusCode::BAD_REQUEST,
        }
    }
}

impl From<ConclaveError> for ErrorResponse {
    fn from(err: ConclaveError) -> Self {
        let status = match &err {
            e if e.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
            ConclaveError::ModelService(_) | ConclaveError::SchemaValidation { .. } => {
                StatusCode::BAD_GATEWAY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            error: err.to_string(),
            code: err.kind(),
            status,
        }
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

/// Run one chat turn through the pipeline.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ErrorResponse> {
    let Json(request) = payload.map_err(|rejection| {
        warn!(error = %rejection.body_text(), "Rejected chat request body");
        ErrorResponse {
            error: rejection.body_text(),
            code: "INVALID_REQUEST",
            status: if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
                StatusCode::PAYLOAD_TOO_LARGE
            } else {
                StatusCode::BAD_REQUEST
            },
        }
    })?;

    if request.message.trim().is_empty() {
        return Err(ErrorResponse::bad_request(
            "message must not be empty",
            "EMPTY_MESSAGE",
        ));
    }

    info!(
        content_preview = %request.message.chars().take(50).collect::<String>(),
        history_len = request.history.len(),
        "Received chat message"
    );

    let response = state.pipeline.run(&request).await.map_err(|e| {
        error!(error = %e, code = e.kind(), "Chat pipeline failed");
        ErrorResponse::from(e)
    })?;

    Ok(Json(response))
}
