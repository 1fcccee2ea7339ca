//! Standardized API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use clickhouse_client::StoreStatus;
use serde::{Deserialize, Serialize};
use telemetry::{ComponentHealthReport, HealthStatus, MetricsSnapshot};

/// Acknowledgement for a tracking call.
#[derive(Debug, Serialize, Deserialize)]
pub struct TrackResponse {
    pub success: bool,
    pub received: usize,
    pub timestamp: i64,
}

impl TrackResponse {
    pub fn accepted(received: usize) -> Self {
        Self {
            success: true,
            received,
            timestamp: Utc::now().timestamp_millis(),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub store: StoreStatus,
    pub components: Vec<ComponentHealthReport>,
    pub export_watermark: DateTime<Utc>,
    pub metrics: MetricsSnapshot,
}

/// Error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Vec<String>) -> Self {
        self.details = Some(details);
        self
    }
}

/// API error carrying the engine error code.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub response: ErrorResponse,
}

impl ApiError {
    pub fn with_code(status: StatusCode, code: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            status,
            response: ErrorResponse::new(msg, code),
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::with_code(StatusCode::BAD_REQUEST, "VALID_001", msg)
    }

    pub fn validation(status: StatusCode, code: impl Into<String>, errors: Vec<String>) -> Self {
        Self {
            status,
            response: ErrorResponse::new("Validation failed", code).with_details(errors),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.response)).into_response()
    }
}

impl From<engine_core::Error> for ApiError {
    fn from(err: engine_core::Error) -> Self {
        let status =
            StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        match &err {
            engine_core::Error::ValidationWithCode { code, message, .. } => {
                ApiError::validation(status, *code, vec![message.clone()])
            }
            _ => ApiError::with_code(status, err.error_code(), err.to_string()),
        }
    }
}
