//! Client-side call budget for the provider
//!
//! The free provider tier allows only a handful of calls per minute. A token
//! bucket in front of the transport lets the gateway refuse locally instead
//! of burning a call that would come back as a rate-limit note.

use parking_lot::Mutex;
use std::time::{Duration, Instant};

/// Token bucket refilled continuously at `capacity` tokens per minute
#[derive(Debug)]
pub struct TokenBucket {
    /// Maximum tokens (requests) allowed per minute
    capacity: u32,
    /// Current available tokens
    tokens: f64,
    /// Tokens added per second
    refill_rate: f64,
    /// Last refill time
    last_refill: Instant,
}

impl TokenBucket {
    pub fn per_minute(capacity: u32) -> Self {
        Self {
            capacity,
            tokens: capacity as f64,
            refill_rate: capacity as f64 / 60.0,
            last_refill: Instant::now(),
        }
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill);
        self.tokens =
            (self.tokens + elapsed.as_secs_f64() * self.refill_rate).min(self.capacity as f64);
        self.last_refill = now;
    }

    /// Try to consume a token, returns true if allowed
    pub fn try_acquire(&mut self) -> bool {
        self.refill();
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Get time until a token will be available
    pub fn time_until_available(&self) -> Duration {
        if self.tokens >= 1.0 || self.refill_rate <= 0.0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64((1.0 - self.tokens) / self.refill_rate)
        }
    }
}

/// Shared limiter used by the gateway
#[derive(Debug)]
pub struct RateLimiter {
    bucket: Mutex<TokenBucket>,
}

impl RateLimiter {
    pub fn per_minute(capacity: u32) -> Self {
        Self {
            bucket: Mutex::new(TokenBucket::per_minute(capacity)),
        }
    }

    pub fn try_acquire(&self) -> bool {
        self.bucket.lock().try_acquire()
    }

    pub fn time_until_available(&self) -> Duration {
        self.bucket.lock().time_until_available()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_bucket_basic() {
        let mut bucket = TokenBucket::per_minute(5);

        for _ in 0..5 {
            assert!(bucket.try_acquire());
        }

        assert!(!bucket.try_acquire());
        assert!(bucket.time_until_available() > Duration::ZERO);
    }

    #[test]
    fn test_token_bucket_refill() {
        let mut bucket = TokenBucket::per_minute(60);

        for _ in 0..60 {
            bucket.try_acquire();
        }
        assert!(!bucket.try_acquire());

        // Simulate time passing (one token per second)
        bucket.last_refill = Instant::now() - Duration::from_millis(2500);

        assert!(bucket.try_acquire());
        assert!(bucket.try_acquire());
        assert!(!bucket.try_acquire());
    }

    #[test]
    fn test_shared_limiter() {
        let limiter = RateLimiter::per_minute(1);
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());
    }
}
