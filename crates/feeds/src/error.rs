//! Error types for feed operations.

use thiserror::Error;

/// Errors that can occur while fetching prices from the exchange.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("request timed out")]
    Timeout,

    #[error("exchange rate limit exceeded")]
    RateLimited,

    #[error("exchange returned HTTP {0}")]
    Status(u16),

    #[error("request failed: {0}")]
    Request(String),

    #[error("failed to parse exchange response: {0}")]
    Parse(String),

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

impl From<reqwest::Error> for FeedError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FeedError::Timeout
        } else if err.is_decode() {
            FeedError::Parse(err.to_string())
        } else {
            FeedError::Request(err.to_string())
        }
    }
}

impl FeedError {
    /// True when retrying the request may succeed; a retry budget applies.
    pub fn is_transient(&self) -> bool {
        matches!(self, FeedError::Timeout | FeedError::RateLimited)
    }
}
