//! Admission control port.

use async_trait::async_trait;
use std::time::Duration;

/// Request admission limiter - abstraction over rate limiting backends.
#[async_trait]
pub trait AdmissionLimiter: Send + Sync {
    /// Count a request from `client` and decide whether it may proceed.
    ///
    /// A rejection is an expected outcome, not an error.
    async fn admit(&self, client: &str) -> Result<Admission, RateLimitError>;

    /// Drop tracking state for clients idle past the retention horizon.
    /// Returns how many entries were evicted.
    async fn evict_idle(&self) -> Result<usize, RateLimitError> {
        Ok(0)
    }
}

/// Result of an admission check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admission {
    pub allowed: bool,
    pub remaining: u32,
    pub reset_after: Duration,
}

impl Admission {
    pub fn allow(remaining: u32, reset_after: Duration) -> Self {
        Self {
            allowed: true,
            remaining,
            reset_after,
        }
    }

    pub fn reject(reset_after: Duration) -> Self {
        Self {
            allowed: false,
            remaining: 0,
            reset_after,
        }
    }
}

/// Rate limit errors.
#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    #[error("Backend error: {0}")]
    Backend(String),
}
