//! Rolling-window call quota plus the backoff loop that enforces it.
//!
//! # Design
//! `RateLimiter` only answers "may I call now?". `Throttle` owns the retry
//! policy: a local quota violation and a `429` from the server are treated
//! the same way, sleeping with exponential backoff until the attempt budget
//! runs out. Time is read through `Clock` so tests can drive it by hand.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::config::{RateLimitConfig, RetryConfig};
use crate::error::{ApiError, Result};
use crate::http::{HttpRequest, HttpResponse, Transport};

pub const TOO_MANY_REQUESTS: u16 = 429;

/// Source of time for the limiter.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

/// Wall clock backed by `std::thread::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Admits at most `calls` within any `period`-long window.
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    calls: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            calls: Mutex::new(VecDeque::with_capacity(config.calls)),
            config,
        }
    }

    /// Record a call at `now` if the window has room. On refusal returns how
    /// long until the oldest call in the window expires.
    pub fn try_acquire(&self, now: Instant) -> Result<(), Duration> {
        let mut calls = self.calls.lock().unwrap_or_else(PoisonError::into_inner);
        while let Some(&oldest) = calls.front() {
            if now.saturating_duration_since(oldest) >= self.config.period {
                calls.pop_front();
            } else {
                break;
            }
        }
        if calls.len() < self.config.calls {
            calls.push_back(now);
            return Ok(());
        }
        let wait = calls
            .front()
            .map(|&oldest| self.config.period.saturating_sub(now.saturating_duration_since(oldest)))
            .unwrap_or(self.config.period);
        Err(wait)
    }

    pub fn in_window(&self) -> usize {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Sends requests through a transport while honouring the quota.
pub struct Throttle {
    limiter: RateLimiter,
    retry: RetryConfig,
    clock: Box<dyn Clock>,
}

impl std::fmt::Debug for Throttle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Throttle")
            .field("limiter", &self.limiter)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl Throttle {
    pub fn new(rate_limit: RateLimitConfig, retry: RetryConfig, clock: Box<dyn Clock>) -> Self {
        Self {
            limiter: RateLimiter::new(rate_limit),
            retry,
            clock,
        }
    }

    /// Execute `request`, backing off on quota violations. Gives up with
    /// `ApiError::RateLimited` once `max_attempts` tries have been refused.
    pub fn send<T: Transport>(&self, transport: &T, request: &HttpRequest) -> Result<HttpResponse> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.limiter.try_acquire(self.clock.now()) {
                Ok(()) => {
                    debug!(method = %request.method, url = %request.url, attempt, "sending request");
                    let response = transport.execute(request)?;
                    if response.status != TOO_MANY_REQUESTS {
                        return Ok(response);
                    }
                    warn!(url = %request.url, attempt, "server rejected call over quota");
                }
                Err(wait) => {
                    debug!(url = %request.url, attempt, ?wait, "local quota exhausted");
                }
            }

            if attempt >= max_attempts {
                return Err(ApiError::RateLimited { attempts: attempt });
            }
            let delay = self.retry.delay_for(attempt);
            warn!(attempt, ?delay, "rate limited, backing off");
            self.clock.sleep(delay);
            attempt += 1;
        }
    }
}
