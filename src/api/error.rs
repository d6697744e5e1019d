//! Backend error types with HTTP status mapping.

use reqwest::StatusCode;

/// Failure of a single backend call.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Backend is not reachable at {0}")]
    Connection(String),
    #[error("Request timed out after {0}s")]
    Timeout(u64),
    #[error("HTTP client error: {0}")]
    HttpClient(String),
    #[error("No authentication token found")]
    MissingToken,
    #[error("Authentication required")]
    Unauthorized,
    #[error("Booking conflict: {0}")]
    Conflict(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Backend returned error (status {status}): {body}")]
    Status { status: u16, body: String },
    #[error("Response parsing error: {0}")]
    ResponseParsing(String),
    #[error("Invalid request URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// Classify a non-success response.
    pub fn from_status(status: StatusCode, body: String) -> Self {
        match status {
            StatusCode::UNAUTHORIZED => ApiError::Unauthorized,
            StatusCode::CONFLICT => ApiError::Conflict(body),
            StatusCode::NOT_FOUND => ApiError::NotFound(body),
            _ => ApiError::Status {
                status: status.as_u16(),
                body,
            },
        }
    }

    /// Build from a transport-level reqwest failure.
    pub fn from_transport(err: reqwest::Error, base_url: &str, timeout_secs: u64) -> Self {
        if err.is_connect() {
            ApiError::Connection(base_url.to_string())
        } else if err.is_timeout() {
            ApiError::Timeout(timeout_secs)
        } else if err.is_decode() {
            ApiError::ResponseParsing(err.to_string())
        } else {
            ApiError::HttpClient(err.to_string())
        }
    }

    /// True for failures that end the session (missing or rejected token).
    pub fn is_auth(&self) -> bool {
        matches!(self, ApiError::MissingToken | ApiError::Unauthorized)
    }
}
