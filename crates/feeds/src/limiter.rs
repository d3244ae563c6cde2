//! Sliding-window request throttle shared by all outbound exchange calls.

use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

/// Sliding-window rate limiter: at most `max_requests` acquisitions complete
/// within any window of `period`.
#[derive(Debug)]
pub struct RateLimiter {
    max_requests: usize,
    period: Duration,
    timestamps: VecDeque<Instant>,
}

impl RateLimiter {
    pub fn new(max_requests: usize, period: Duration) -> Self {
        Self {
            max_requests,
            period,
            timestamps: VecDeque::with_capacity(max_requests),
        }
    }

    /// Block until a request may proceed, then record it.
    ///
    /// Timestamps older than the window are evicted on every call, so memory
    /// stays bounded even in a tight loop.
    pub async fn acquire(&mut self) {
        self.evict(Instant::now());

        if self.timestamps.len() >= self.max_requests {
            if let Some(&oldest) = self.timestamps.front() {
                tokio::time::sleep_until(oldest + self.period).await;
            }
            self.evict(Instant::now());
        }

        self.timestamps.push_back(Instant::now());
    }

    fn evict(&mut self, now: Instant) {
        while self
            .timestamps
            .front()
            .is_some_and(|&t| now.duration_since(t) >= self.period)
        {
            self.timestamps.pop_front();
        }
    }
}
