//! Runtime configuration
//!
//! Gateway and poller settings. Everything has a working default so a bare
//! `GatewayConfig::default()` talks to the public provider with the `demo` key.

use crate::error::{AppError, Result};
use std::time::Duration;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://www.alphavantage.co/query";
pub const DEFAULT_API_KEY: &str = "demo";
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(30);
pub const DEFAULT_POLLING_FREQUENCY: Duration = Duration::from_millis(3000);
pub const MIN_POLLING_FREQUENCY: Duration = Duration::from_millis(1000);

/// Settings for the fetch cache gateway
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub base_url: Url,
    pub api_key: String,
    /// How long a cached response stays fresh
    pub cache_ttl: Duration,
    /// `None` leaves the transport default in place
    pub request_timeout: Option<Duration>,
    /// Client-side call budget; `None` disables the local limiter
    pub rate_limit_per_minute: Option<u32>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base url is valid"),
            api_key: DEFAULT_API_KEY.to_string(),
            cache_ttl: DEFAULT_CACHE_TTL,
            request_timeout: None,
            rate_limit_per_minute: None,
        }
    }
}

impl GatewayConfig {
    /// Build from the process environment, falling back to defaults.
    ///
    /// Reads `ALPHA_VANTAGE_API_KEY`, `ALPHA_VANTAGE_BASE_URL`,
    /// `STOCK_FEED_CACHE_TTL_SECS` and `STOCK_FEED_RATE_LIMIT_PER_MINUTE`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(key) = lookup("ALPHA_VANTAGE_API_KEY").filter(|k| !k.trim().is_empty()) {
            config.api_key = key;
        }

        if let Some(raw) = lookup("ALPHA_VANTAGE_BASE_URL") {
            config.base_url = Url::parse(&raw)
                .map_err(|e| {
                    AppError::Config(format!("Invalid ALPHA_VANTAGE_BASE_URL '{}': {}", raw, e))
                })?;
        }

        if let Some(raw) = lookup("STOCK_FEED_CACHE_TTL_SECS") {
            let secs: u64 = raw
                .parse()
                .map_err(|_| {
                    AppError::Config(format!("Invalid STOCK_FEED_CACHE_TTL_SECS '{}'", raw))
                })?;
            config.cache_ttl = Duration::from_secs(secs);
        }

        if let Some(raw) = lookup("STOCK_FEED_RATE_LIMIT_PER_MINUTE") {
            let rate: u32 = raw.parse().map_err(|_| {
                AppError::Config(format!("Invalid STOCK_FEED_RATE_LIMIT_PER_MINUTE '{}'", raw))
            })?;
            config.rate_limit_per_minute = (rate > 0).then_some(rate);
        }

        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_rate_limit(mut self, per_minute: u32) -> Self {
        self.rate_limit_per_minute = Some(per_minute);
        self
    }
}

/// Settings for the subscription poller
#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub polling_frequency: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            polling_frequency: DEFAULT_POLLING_FREQUENCY,
        }
    }
}

impl PollerConfig {
    pub fn new(polling_frequency: Duration) -> Self {
        Self {
            polling_frequency: clamp_polling_frequency(polling_frequency),
        }
    }
}

/// Enforce the 1 s floor on the poll interval
pub fn clamp_polling_frequency(frequency: Duration) -> Duration {
    frequency.max(MIN_POLLING_FREQUENCY)
}
