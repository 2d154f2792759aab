//! API client errors

/// Result alias for API calls
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors returned by [`crate::ApiClient`]
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Request rejected: token missing or expired")]
    Unauthorized,

    #[error("Unexpected status {status} for {path}")]
    Status {
        status: reqwest::StatusCode,
        path: String,
    },

    #[error("Invalid API base URL: {0}")]
    InvalidBaseUrl(String),
}
