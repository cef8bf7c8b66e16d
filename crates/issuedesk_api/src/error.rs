//! Error model used by issue tracker API client operations.

use std::io;

use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ApiError>;

/// Represents every way a request against the tracker API can fail: transport problems, non-2xx statuses (with the server's message when it sent one), `success: false` envelopes and local credential storage failures.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("http {status}: {}", message.as_deref().unwrap_or("request failed"))]
    Http {
        status: StatusCode,
        message: Option<String>,
    },
    #[error("authentication error ({status}): {}", message.as_deref().unwrap_or("access denied"))]
    Authentication {
        status: StatusCode,
        message: Option<String>,
    },
    #[error("{0}")]
    Application(String),
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("credential store error: {0}")]
    Credential(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("unexpected error: {0}")]
    Other(String),
}

impl ApiError {
    /// Builds the error for a non-2xx response, routing 401/403 to `Authentication`.
    pub fn from_status(status: StatusCode, message: Option<String>) -> Self {
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            ApiError::Authentication { status, message }
        } else {
            ApiError::Http { status, message }
        }
    }

    /// Message supplied by the server, if the failure carried one.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Http { message, .. } | ApiError::Authentication { message, .. } => {
                message.as_deref()
            }
            ApiError::Application(message) => Some(message.as_str()),
            _ => None,
        }
        .filter(|text| !text.trim().is_empty())
    }

    /// Human-readable message for the UI: the server's own wording or the caller's fallback.
    pub fn user_message(&self, fallback: &str) -> String {
        self.server_message()
            .map(str::to_string)
            .unwrap_or_else(|| fallback.to_string())
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Authentication { .. })
    }
}

impl From<reqwest::Error> for ApiError {
    /// Converts reqwest errors into semantic ApiError variants.
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout(err.to_string())
        } else if err.is_status() {
            let status = err.status().unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            ApiError::from_status(status, None)
        } else if err.is_connect() {
            ApiError::Network(err.to_string())
        } else if err.is_decode() {
            ApiError::Serialization(err.to_string())
        } else {
            ApiError::Other(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Serialization(err.to_string())
    }
}
