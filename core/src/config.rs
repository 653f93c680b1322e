//! Client configuration with builder-style setters.
//!
//! Defaults match the service's documented quota: 4 calls per second, with
//! up to 8 attempts of exponential backoff when the quota is hit.

use std::time::Duration;

use crate::error::{ApiError, Result};

pub const DEFAULT_ROOT_URL: &str = "https://actionnetwork.org/api/v2/";
pub const API_TOKEN_HEADER: &str = "OSDI-API-Token";

pub const API_KEY_ENV: &str = "ACTION_NETWORK_API_KEY";
pub const ROOT_URL_ENV: &str = "ACTION_NETWORK_ROOT_URL";

/// Everything `ActionNetworkClient` needs to connect.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_token: String,
    /// URL of the self-describing root document.
    pub root_url: String,
    pub timeout: Duration,
    /// Upper bound on pages followed by one collection fetch. `None` follows
    /// `next` links until the server stops sending them.
    pub max_pages: Option<usize>,
    pub rate_limit: RateLimitConfig,
    pub retry: RetryConfig,
}

/// Rolling-window call quota.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub calls: usize,
    pub period: Duration,
}

/// Backoff applied when the quota is exceeded.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total tries, including the first.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            calls: 4,
            period: Duration::from_secs(1),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 8,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Delay to wait after the given failed attempt (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(63) as i32;
        let secs = self.base_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        let capped = secs.min(self.max_delay.as_secs_f64());
        if capped.is_finite() && capped >= 0.0 {
            Duration::from_secs_f64(capped)
        } else {
            self.max_delay
        }
    }
}

impl ClientConfig {
    pub fn new(api_token: impl Into<String>) -> Self {
        Self {
            api_token: api_token.into(),
            root_url: DEFAULT_ROOT_URL.to_string(),
            timeout: Duration::from_secs(30),
            max_pages: None,
            rate_limit: RateLimitConfig::default(),
            retry: RetryConfig::default(),
        }
    }

    /// Build from `ACTION_NETWORK_API_KEY` and, if set,
    /// `ACTION_NETWORK_ROOT_URL`.
    pub fn from_env() -> Result<Self> {
        let token = std::env::var(API_KEY_ENV)
            .map_err(|_| ApiError::MissingField(format!("environment variable {API_KEY_ENV}")))?;
        let mut config = Self::new(token);
        if let Ok(root) = std::env::var(ROOT_URL_ENV) {
            config.root_url = root;
        }
        Ok(config)
    }

    pub fn root_url(mut self, url: impl Into<String>) -> Self {
        self.root_url = url.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn max_pages(mut self, max: usize) -> Self {
        self.max_pages = Some(max);
        self
    }

    pub fn rate_limit(mut self, calls: usize, period: Duration) -> Self {
        self.rate_limit = RateLimitConfig { calls, period };
        self
    }

    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.retry.max_attempts = attempts;
        self
    }
}
