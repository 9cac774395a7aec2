use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

use crate::error::ConfigError;
use crate::ratelimit::RateLimitConfig;

const MIN_WAIT: Duration = Duration::from_millis(1);
const MAX_WAIT: Duration = Duration::from_secs(60);

/// Token bucket for one service.
///
/// Refill is computed lazily from the elapsed time on every access; there is no
/// background timer. Tokens stay within `0..=burst_size`.
#[derive(Debug)]
pub struct TokenBucket {
    config: RateLimitConfig,
    state: Mutex<BucketState>,
}

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    /// A full bucket for `service`; rejects a zero rate or burst, which would never refill.
    pub fn new(service: &str, config: RateLimitConfig) -> Result<Self, ConfigError> {
        config.validate(service)?;
        Ok(Self::full(config))
    }

    /// Callers guarantee `config` has been validated.
    pub(crate) fn full(config: RateLimitConfig) -> Self {
        Self {
            config,
            state: Mutex::new(BucketState {
                tokens: f64::from(config.burst_size),
                last_refill: Instant::now(),
            }),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    pub fn available_tokens(&self) -> f64 {
        let mut state = self.state.lock();
        self.refill(&mut state);
        state.tokens
    }

    /// Take `n` tokens if they are available right now.
    pub fn try_acquire(&self, n: u32) -> bool {
        self.try_take(f64::from(n)).is_ok()
    }

    /// Wait until one token is available and consume it.
    pub async fn acquire(&self) {
        loop {
            match self.try_take(1.0) {
                Ok(()) => return,
                Err(wait) => tokio::time::sleep(wait).await,
            }
        }
    }

    /// Like [`acquire`](Self::acquire) but gives up after `limit`. Returns whether a token was taken.
    pub async fn acquire_timeout(&self, limit: Duration) -> bool {
        let deadline = Instant::now() + limit;
        loop {
            match self.try_take(1.0) {
                Ok(()) => return true,
                Err(wait) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return false;
                    }
                    tokio::time::sleep(wait.min(deadline - now)).await;
                }
            }
        }
    }

    /// Consume `n` tokens, or report how long until they would be available.
    fn try_take(&self, n: f64) -> Result<(), Duration> {
        let mut state = self.state.lock();
        self.refill(&mut state);
        if state.tokens >= n {
            state.tokens -= n;
            return Ok(());
        }
        let deficit = n - state.tokens;
        let wait = Duration::try_from_secs_f64(deficit / self.config.requests_per_second)
            .unwrap_or(MAX_WAIT);
        Err(wait.clamp(MIN_WAIT, MAX_WAIT))
    }

    fn refill(&self, state: &mut BucketState) {
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(state.last_refill).as_secs_f64();
        let max = f64::from(self.config.burst_size);
        state.tokens = (state.tokens + elapsed * self.config.requests_per_second).min(max);
        state.last_refill = now;
    }
}
