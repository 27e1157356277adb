//! Global admission control.

use std::sync::{Arc, Mutex, PoisonError};
use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use chrono::{DateTime, Utc};

use crate::clock::Clock;
use crate::config::RateLimitConfig;
use crate::error::ApiError;
use crate::observability::metrics;

/// A simple token bucket.
#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    last_update: DateTime<Utc>,
}

impl TokenBucket {
    fn new(capacity: f64, now: DateTime<Utc>) -> Self {
        Self {
            tokens: capacity,
            last_update: now,
        }
    }

    fn try_acquire(&mut self, capacity: f64, refill_rate: f64, now: DateTime<Utc>) -> bool {
        // A clock stepping backwards refills nothing.
        let elapsed = (now - self.last_update)
            .to_std()
            .map_or(0.0, |elapsed| elapsed.as_secs_f64());

        // Refill tokens
        self.tokens = (self.tokens + elapsed * refill_rate).min(capacity);
        self.last_update = self.last_update.max(now);

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// One bucket shared by every caller and every route.
pub struct RateLimiter {
    bucket: Mutex<TokenBucket>,
    clock: Arc<dyn Clock>,
    enabled: bool,
    capacity: f64,
    refill_rate: f64,
    retry_after_secs: u64,
}

impl RateLimiter {
    pub fn new(permits_per_second: f64, burst_size: u32, retry_after_secs: u64, clock: Arc<dyn Clock>) -> Self {
        let capacity = f64::from(burst_size.max(1));
        Self {
            bucket: Mutex::new(TokenBucket::new(capacity, clock.now())),
            clock,
            enabled: true,
            capacity,
            refill_rate: permits_per_second,
            retry_after_secs,
        }
    }

    pub fn from_config(config: &RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            enabled: config.enabled,
            ..Self::new(config.permits_per_second, config.burst_size, config.retry_after_secs, clock)
        }
    }

    /// Take one permit if available. Never waits.
    pub fn try_acquire(&self) -> bool {
        self.try_acquire_at(self.clock.now())
    }

    /// [`try_acquire`](Self::try_acquire) as of `now`.
    pub fn try_acquire_at(&self, now: DateTime<Utc>) -> bool {
        if !self.enabled {
            return true;
        }
        // The bucket is two numbers; a panic mid-update cannot corrupt it.
        let mut bucket = self.bucket.lock().unwrap_or_else(PoisonError::into_inner);
        bucket.try_acquire(self.capacity, self.refill_rate, now)
    }

    pub fn retry_after_secs(&self) -> u64 {
        self.retry_after_secs
    }
}

/// Middleware rejecting requests once the shared bucket is empty.
pub async fn admission_control(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if limiter.try_acquire() {
        return next.run(request).await;
    }

    tracing::warn!(
        method = %request.method(),
        path = %request.uri().path(),
        "Rate limit exceeded"
    );
    metrics::record_rate_limited();
    ApiError::AdmissionRejected {
        retry_after_secs: limiter.retry_after_secs(),
    }
    .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::TimeDelta;

    fn limiter(permits_per_second: f64, burst_size: u32) -> (RateLimiter, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        (RateLimiter::new(permits_per_second, burst_size, 2, clock.clone()), clock)
    }

    #[test]
    fn test_bucket_drains_then_refills() {
        let (limiter, clock) = limiter(2.0, 2);

        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());

        // 2 permits/second: one permit back after half a second.
        clock.advance(TimeDelta::milliseconds(400));
        assert!(!limiter.try_acquire());
        clock.advance(TimeDelta::milliseconds(200));
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());
    }

    #[test]
    fn test_no_burst_beyond_capacity() {
        let (limiter, clock) = limiter(2.0, 2);
        clock.advance(TimeDelta::seconds(60));

        let admitted = (0..10).filter(|_| limiter.try_acquire()).count();
        assert_eq!(admitted, 2);
    }

    #[test]
    fn test_disabled_limiter_admits_everything() {
        let config = RateLimitConfig {
            enabled: false,
            ..RateLimitConfig::default()
        };
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let limiter = RateLimiter::from_config(&config, clock);
        assert!((0..100).all(|_| limiter.try_acquire()));
    }

    #[test]
    fn test_clock_going_backwards_does_not_mint_permits() {
        let (limiter, clock) = limiter(2.0, 1);
        let t0 = clock.now();
        assert!(limiter.try_acquire_at(t0));
        assert!(!limiter.try_acquire_at(t0 - TimeDelta::seconds(1)));
        assert!(!limiter.try_acquire_at(t0));
    }
}
