//! Admission limiter implementations.

mod fixed_window;

pub use fixed_window::{FixedWindowLimiter, RateLimitConfig};

#[cfg(feature = "rate-limit")]
mod gcra;
#[cfg(feature = "rate-limit")]
pub use gcra::GcraRateLimiter;

#[cfg(feature = "redis")]
mod redis;
#[cfg(feature = "redis")]
pub use self::redis::{RedisConfig, RedisRateLimitConfig, RedisRateLimiter};
