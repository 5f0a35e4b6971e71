//! Keyed GCRA admission limiter using the governor crate.

use std::num::NonZeroU32;

use async_trait::async_trait;
use governor::clock::{Clock, DefaultClock};
use governor::middleware::StateInformationMiddleware;
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{Quota, RateLimiter};

use forum_core::ports::{Admission, AdmissionLimiter, RateLimitError};

use super::RateLimitConfig;

type KeyedLimiter =
    RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock, StateInformationMiddleware>;

/// Per-client limiter using the generic cell rate algorithm.
///
/// Spreads the same `max_requests` per `window` budget evenly instead of
/// resetting at window boundaries, so a client can never get 2N requests
/// through around a boundary. Selected with `RATE_LIMIT_STRATEGY=gcra`.
pub struct GcraRateLimiter {
    limiter: KeyedLimiter,
    clock: DefaultClock,
}

impl GcraRateLimiter {
    pub fn new(config: &RateLimitConfig) -> Result<Self, RateLimitError> {
        let burst = NonZeroU32::new(config.max_requests).ok_or_else(|| {
            RateLimitError::Backend("max_requests must be greater than zero".to_string())
        })?;

        let quota = Quota::with_period(config.window / config.max_requests)
            .ok_or_else(|| RateLimitError::Backend("window must be greater than zero".to_string()))?
            .allow_burst(burst);

        let limiter: KeyedLimiter =
            RateLimiter::keyed(quota).with_middleware::<StateInformationMiddleware>();

        Ok(Self {
            limiter,
            clock: DefaultClock::default(),
        })
    }

    /// Number of clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.limiter.len()
    }
}

#[async_trait]
impl AdmissionLimiter for GcraRateLimiter {
    async fn admit(&self, client: &str) -> Result<Admission, RateLimitError> {
        match self.limiter.check_key(&client.to_owned()) {
            Ok(snapshot) => Ok(Admission::allow(
                snapshot.remaining_burst_capacity(),
                snapshot.quota().replenish_interval(),
            )),
            Err(not_until) => Ok(Admission::reject(
                not_until.wait_time_from(self.clock.now()),
            )),
        }
    }

    async fn evict_idle(&self) -> Result<usize, RateLimitError> {
        let before = self.limiter.len();
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
        Ok(before.saturating_sub(self.limiter.len()))
    }
}
