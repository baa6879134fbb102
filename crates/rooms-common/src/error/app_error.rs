//! Application error types
//!
//! Unified error handling for the gateway process.

use rooms_core::StoreError;
use serde::Serialize;
use std::fmt;

use crate::config::ConfigError;

/// Application-wide error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Client errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not accepting new work: {0}")]
    ShuttingDown(String),

    // Store errors
    #[error(transparent)]
    Store(#[from] StoreError),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Internal errors
    #[error("Internal server error")]
    Internal(#[source] anyhow::Error),
}

impl AppError {
    /// Get error code for client-facing responses
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::ShuttingDown(_) => "SHUTTING_DOWN",
            Self::Store(e) => e.code(),
            Self::Config(_) => "CONFIG_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Check if the client caused this error
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidInput(_) | Self::ShuttingDown(_))
    }

    /// Create an invalid input error
    #[must_use]
    pub fn invalid_input(msg: impl fmt::Display) -> Self {
        Self::InvalidInput(msg.to_string())
    }

    /// Create an internal error from any error
    pub fn internal(err: impl Into<anyhow::Error>) -> Self {
        Self::Internal(err.into())
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

/// Error frame sent to clients
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<&AppError> for ErrorResponse {
    fn from(err: &AppError) -> Self {
        Self {
            code: err.error_code().to_string(),
            message: err.to_string(),
            details: None,
        }
    }
}

impl From<AppError> for ErrorResponse {
    fn from(err: AppError) -> Self {
        Self::from(&err)
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
