//! KuCoin REST ticker fetcher.
//!
//! Pulls the full ticker set in one call, filters to spot USDT pairs, and
//! degrades to an empty snapshot on failure so a bad cycle never kills the
//! control loop.

use crate::error::FeedError;
use crate::limiter::RateLimiter;
use crate::NoticeSink;
use coinwatch_core::{base_asset, PriceSnapshot};
use reqwest::StatusCode;
use std::time::Duration;
use tracing::{debug, warn};

/// Quote asset the scanner watches.
const TARGET_QUOTE_SUFFIX: &str = "-USDT";

/// Leveraged/derivative token markers excluded from scanning, matched as
/// substrings of the base-asset code.
const EXCLUDED_MARKERS: [&str; 6] = ["UP", "DOWN", "3L", "2L", "3S", "2S"];

/// Fetcher configuration.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Exchange REST endpoint.
    pub base_url: String,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Backoff between timed-out attempts.
    pub retry_backoff: Duration,
    /// Cooldown after an exchange 429; does not consume the attempt budget.
    pub rate_limit_cooldown: Duration,
    /// Rate limiter window capacity.
    pub max_requests: usize,
    /// Rate limiter window length.
    pub period: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.kucoin.com".to_string(),
            request_timeout: Duration::from_secs(10),
            retry_backoff: Duration::from_secs(2),
            rate_limit_cooldown: Duration::from_secs(300),
            max_requests: 5,
            period: Duration::from_secs(1),
        }
    }
}

/// Fetches the current USDT-pair price snapshot from KuCoin.
pub struct PriceFetcher {
    http: reqwest::Client,
    config: FetchConfig,
    limiter: RateLimiter,
}

impl PriceFetcher {
    pub fn new(config: FetchConfig) -> Result<Self, FeedError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| FeedError::Client(e.to_string()))?;
        let limiter = RateLimiter::new(config.max_requests, config.period);
        Ok(Self {
            http,
            config,
            limiter,
        })
    }

    /// Fetch a snapshot, retrying timeouts up to `max_attempts` times.
    ///
    /// Timeouts consume an attempt and back off briefly; an exchange 429
    /// sleeps the long cooldown without consuming an attempt; any other
    /// failure aborts immediately. All failure paths report through
    /// `notices` and return an empty snapshot, which simply yields no
    /// alerts on the next comparison.
    pub async fn fetch(&mut self, max_attempts: u32, notices: &dyn NoticeSink) -> PriceSnapshot {
        let mut attempt = 0;
        while attempt < max_attempts {
            self.limiter.acquire().await;

            match self.fetch_once().await {
                Ok(snapshot) => {
                    debug!(pairs = snapshot.len(), "fetched ticker snapshot");
                    return snapshot;
                }
                Err(FeedError::Timeout) => {
                    attempt += 1;
                    notices
                        .notice(&format!(
                            "Attempt {attempt} of {max_attempts}: request timed out. Retrying..."
                        ))
                        .await;
                    if attempt < max_attempts {
                        tokio::time::sleep(self.config.retry_backoff).await;
                    }
                }
                Err(FeedError::RateLimited) => {
                    notices
                        .notice("Rate limit exceeded. Pausing for 5 minutes.")
                        .await;
                    tokio::time::sleep(self.config.rate_limit_cooldown).await;
                }
                Err(e) => {
                    warn!(error = %e, "price fetch failed");
                    notices.notice(&format!("Error fetching prices: {e}")).await;
                    return PriceSnapshot::new();
                }
            }
        }

        notices
            .notice("Maximum retry attempts reached. Skipping this scan.")
            .await;
        PriceSnapshot::new()
    }

    async fn fetch_once(&self) -> Result<PriceSnapshot, FeedError> {
        let url = format!("{}/api/v1/market/allTickers", self.config.base_url);
        let response = self.http.get(&url).send().await?;

        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            return Err(FeedError::RateLimited);
        }
        if !response.status().is_success() {
            return Err(FeedError::Status(response.status().as_u16()));
        }

        let json: serde_json::Value = response.json().await?;
        Ok(parse_tickers(&json))
    }
}

/// Build a snapshot from the allTickers payload, keeping USDT pairs with a
/// non-null last price and skipping leveraged-token markets.
///
/// Response shape:
/// `{"data":{"ticker":[{"symbol":"BTC-USDT","last":"50000.1",...},...]}}`
pub(crate) fn parse_tickers(json: &serde_json::Value) -> PriceSnapshot {
    let mut snapshot = PriceSnapshot::new();

    let Some(tickers) = json["data"]["ticker"].as_array() else {
        warn!("ticker payload missing data.ticker array");
        return snapshot;
    };

    for ticker in tickers {
        let Some(symbol) = ticker["symbol"].as_str() else {
            continue;
        };
        if !symbol.ends_with(TARGET_QUOTE_SUFFIX) {
            continue;
        }
        if is_leveraged(base_asset(symbol)) {
            continue;
        }

        let last = ticker["last"]
            .as_str()
            .and_then(|s| s.parse::<f64>().ok())
            .or_else(|| ticker["last"].as_f64());
        if let Some(price) = last {
            snapshot.insert(symbol, price);
        }
    }

    snapshot
}

fn is_leveraged(base: &str) -> bool {
    EXCLUDED_MARKERS.iter().any(|marker| base.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_parse_keeps_usdt_pairs_only() {
        let payload = json!({"data": {"ticker": [
            {"symbol": "BTC-USDT", "last": "100.5"},
            {"symbol": "ETH-BTC", "last": "0.05"},
            {"symbol": "XRP-USDC", "last": "1.0"},
        ]}});
        let snapshot = parse_tickers(&payload);
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.price("BTC-USDT"), Some(100.5));
    }

    #[test]
    fn test_parse_skips_leveraged_tokens() {
        let payload = json!({"data": {"ticker": [
            {"symbol": "BTC3L-USDT", "last": "1.0"},
            {"symbol": "ETHDOWN-USDT", "last": "2.0"},
            {"symbol": "ADAUP-USDT", "last": "3.0"},
            {"symbol": "SOL2S-USDT", "last": "4.0"},
            {"symbol": "DOGE-USDT", "last": "0.1"},
        ]}});
        let snapshot = parse_tickers(&payload);
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.price("DOGE-USDT"), Some(0.1));
    }

    #[test]
    fn test_parse_skips_null_and_unparsable_last() {
        let payload = json!({"data": {"ticker": [
            {"symbol": "BTC-USDT", "last": null},
            {"symbol": "ETH-USDT", "last": "not-a-number"},
            {"symbol": "XRP-USDT", "last": 1.23},
        ]}});
        let snapshot = parse_tickers(&payload);
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.price("XRP-USDT"), Some(1.23));
    }

    #[test]
    fn test_parse_tolerates_malformed_payload() {
        assert!(parse_tickers(&json!({})).is_empty());
        assert!(parse_tickers(&json!({"data": {"ticker": "nope"}})).is_empty());
    }

    #[test]
    fn test_is_leveraged_is_case_sensitive_substring() {
        assert!(is_leveraged("BTC3L"));
        assert!(is_leveraged("ETHUP"));
        assert!(!is_leveraged("BTC"));
        // Lowercase markers do not match; exchange base codes are uppercase.
        assert!(!is_leveraged("down"));
    }
}
