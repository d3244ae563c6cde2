//! Price feed layer: a sliding-window rate limiter shared by outbound
//! exchange calls, and a KuCoin REST ticker fetcher with retry/backoff.

pub mod error;
pub mod kucoin;
pub mod limiter;

pub use error::FeedError;
pub use kucoin::{FetchConfig, PriceFetcher};
pub use limiter::RateLimiter;

use async_trait::async_trait;

/// Sink for user-visible fetch progress notices (retries, cooldowns,
/// failures). Keeps this crate ignorant of the messaging transport.
#[async_trait]
pub trait NoticeSink: Send + Sync {
    async fn notice(&self, text: &str);
}
