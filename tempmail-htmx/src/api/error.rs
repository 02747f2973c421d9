//! API client errors

use thiserror::Error;

/// Errors raised while talking to smtp.dev
#[derive(Debug, Error)]
pub enum ApiError {
    /// The API key is empty or not a valid header value
    #[error("Invalid API key")]
    InvalidApiKey,

    /// 401 from the API
    #[error("Unauthorized: API key is invalid or missing")]
    Unauthorized,

    /// 404 from the API
    #[error("Not found: {0}")]
    NotFound(String),

    /// 422 from the API, with the violation payload
    #[error("Validation failed: {0}")]
    Validation(String),

    /// 429 from the API
    #[error("Rate limit exceeded, too many requests in a short time")]
    RateLimited,

    /// Any other non-success status
    #[error("API returned error {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, possibly truncated
        body: String,
    },

    /// No response was received
    #[error("No response received from API server: {0}")]
    Network(#[from] reqwest::Error),

    /// Response body did not match the expected shape
    #[error("Invalid response from {path}: {message}")]
    Decode {
        /// Request path
        path: String,
        /// Decoder message
        message: String,
    },
}

impl ApiError {
    /// HTTP status best describing this error, for surfacing to a browser
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::InvalidApiKey => 400,
            Self::Unauthorized => 401,
            Self::NotFound(_) => 404,
            Self::Validation(_) => 422,
            Self::RateLimited => 429,
            Self::Status { status, .. } => *status,
            Self::Network(_) | Self::Decode { .. } => 502,
        }
    }

    /// Whether retrying later may succeed
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::RateLimited | Self::Network(_))
            || matches!(self, Self::Status { status, .. } if *status >= 500)
    }
}

/// Whether `status` counts as success for the API (200..=204)
#[must_use]
pub const fn is_success_status(status: u16) -> bool {
    status >= 200 && status <= 204
}
