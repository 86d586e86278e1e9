//! Per-fetcher rate limiting
//!
//! Each fetcher instance owns one [`RateLimiter`] gating its outgoing
//! requests, including secondary requests issued during hydration. The gate
//! is a leaky-bucket-of-one: it records the timestamp of the last request
//! and sleeps for the remainder of the source's minimum interval. It does
//! not coordinate across fetcher instances or processes, so global service
//! limits are advisory only.

use log::{debug, trace};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;

pub struct RateLimiter {
    /// Last request timestamp
    last_request: Mutex<Option<Instant>>,
    /// Minimum delay between requests
    min_interval: Duration,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval,
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Block until the source's minimum inter-request interval has elapsed,
    /// then claim the current instant as the last request time.
    pub async fn wait_if_needed(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                debug!("rate limiter: waiting {wait_time:?} before next request");
                sleep(wait_time).await;
            } else {
                trace!("rate limiter: {elapsed:?} since last request, no wait needed");
            }
        }

        *last = Some(Instant::now());
    }
}
