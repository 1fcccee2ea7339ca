//! Unified error types for the analytics engine.
//!
//! Error codes surfaced over HTTP:
//! - VALID_001-002: Validation errors
//! - EXPORT_001: Export cycle already running
//! - STORE_001: Event store failures
//! - SINK_001: Object storage failures

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Validation error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorCode {
    /// VALID_001: Invalid JSON / Invalid format
    InvalidFormat,
    /// VALID_002: Payload exceeds size limit
    PayloadTooLarge,
}

impl ValidationErrorCode {
    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidFormat => "VALID_001",
            Self::PayloadTooLarge => "VALID_002",
        }
    }

    /// Get the HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::InvalidFormat => 400,
            Self::PayloadTooLarge => 413,
        }
    }
}

/// Unified error type for the analytics engine.
#[derive(Debug, Error)]
pub enum Error {
    /// Validation error with code.
    #[error("[{code}] {message}")]
    ValidationWithCode {
        code: &'static str,
        message: String,
        http_status: u16,
    },

    #[error("validation error: {0}")]
    Validation(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// ClickHouse query or insert failure.
    #[error("store error: {0}")]
    Store(String),

    /// Object storage failure.
    #[error("storage error: {0}")]
    Storage(String),

    /// A manual export was requested while another cycle holds the guard.
    #[error("export cycle already in progress")]
    CycleInProgress,

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a validation error with code.
    pub fn validation_code(code: ValidationErrorCode, msg: impl Into<String>) -> Self {
        Self::ValidationWithCode {
            code: code.code(),
            message: msg.into(),
            http_status: code.http_status(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Get the HTTP status code for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::ValidationWithCode { http_status, .. } => *http_status,
            Self::Validation(_) => 400,
            Self::Serialization(_) => 400,
            Self::Store(_) => 503,
            Self::Storage(_) => 502,
            Self::CycleInProgress => 409,
            Self::Internal(_) => 500,
        }
    }

    /// Get the error code string for the response body.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ValidationWithCode { code, .. } => code,
            Self::Validation(_) | Self::Serialization(_) => "VALID_001",
            Self::Store(_) => "STORE_001",
            Self::Storage(_) => "SINK_001",
            Self::CycleInProgress => "EXPORT_001",
            Self::Internal(_) => "INTERNAL",
        }
    }
}
