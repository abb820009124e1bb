//! Per-site politeness throttling.
//!
//! Every outbound request a [`Site`](crate::site::Site) makes first awaits
//! [`RequestThrottle::acquire`]. The engine only exposes the hook; the
//! caller decides the rate.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tokio::time::{sleep, Duration, Instant};
use tracing::debug;

#[async_trait]
pub trait RequestThrottle: Send + Sync {
    /// Wait until a request to `site_id` may be sent.
    async fn acquire(&self, site_id: &str);
}

/// Never waits.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoThrottle;

#[async_trait]
impl RequestThrottle for NoThrottle {
    async fn acquire(&self, _site_id: &str) {}
}

/// Token bucket for a single site.
///
/// Tokens are added at a constant rate and consumed per request. The bucket
/// starts full, allowing a burst up to the capacity.
#[derive(Debug)]
pub struct TokenBucket {
    /// Max tokens (= requests per minute).
    capacity: f32,
    tokens: f32,
    /// Tokens added per second.
    refill_rate: f32,
    last_refill: Instant,
}

impl TokenBucket {
    pub fn new(requests_per_minute: u32) -> Self {
        let capacity = requests_per_minute.max(1) as f32;
        Self {
            capacity,
            tokens: capacity,
            refill_rate: capacity / 60.0,
            last_refill: Instant::now(),
        }
    }

    /// Take a token, or report how long until one is available.
    pub fn try_acquire(&mut self) -> Result<(), Duration> {
        self.refill();

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            Ok(())
        } else {
            let tokens_needed = 1.0 - self.tokens;
            Err(Duration::from_secs_f32(tokens_needed / self.refill_rate))
        }
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f32();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.capacity);
        self.last_refill = now;
    }
}

/// One token bucket per site, created lazily on first use.
///
/// Unlike a rejecting limiter, `acquire` sleeps until the site's bucket
/// has a token.
pub struct TokenBucketThrottle {
    requests_per_minute: u32,
    overrides: HashMap<String, u32>,
    buckets: Mutex<HashMap<String, TokenBucket>>,
}

impl TokenBucketThrottle {
    pub fn new(requests_per_minute: u32) -> Self {
        Self {
            requests_per_minute,
            overrides: HashMap::new(),
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Use a different rate for one site.
    pub fn with_site_rate(mut self, site_id: impl Into<String>, requests_per_minute: u32) -> Self {
        self.overrides.insert(site_id.into(), requests_per_minute);
        self
    }

    fn rate_for(&self, site_id: &str) -> u32 {
        self.overrides
            .get(site_id)
            .copied()
            .unwrap_or(self.requests_per_minute)
    }
}

#[async_trait]
impl RequestThrottle for TokenBucketThrottle {
    async fn acquire(&self, site_id: &str) {
        loop {
            let wait = {
                let mut buckets = self.buckets.lock().await;
                let bucket = buckets
                    .entry(site_id.to_string())
                    .or_insert_with(|| TokenBucket::new(self.rate_for(site_id)));
                match bucket.try_acquire() {
                    Ok(()) => return,
                    Err(wait) => wait,
                }
            };
            debug!(site = %site_id, wait_ms = wait.as_millis() as u64, "Throttling request");
            sleep(wait).await;
        }
    }
}
