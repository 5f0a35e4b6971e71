//! # Forum Infrastructure
//!
//! Concrete implementations of the ports defined in `forum-core`:
//! storage, admission limiting and token verification.
//!
//! ## Feature Flags
//!
//! - `full` (default) - All features enabled
//! - `minimal` - No external services, in-memory store and fixed-window limiter only
//! - `postgres` - PostgreSQL storage via SeaORM
//! - `auth` - JWT token verification
//! - `rate-limit` - GCRA limiter via governor
//! - `redis` - Redis-backed shared admission limiter

pub mod database;
pub mod rate_limit;

#[cfg(feature = "auth")]
pub mod auth;

// Re-exports - In-Memory
pub use database::InMemoryForumStore;
pub use rate_limit::{FixedWindowLimiter, RateLimitConfig};

#[cfg(feature = "postgres")]
pub use database::{
    DatabaseConfig, PostgresCategoryRepository, PostgresCommentRepository,
    PostgresPostRepository, PostgresVoteStore,
};

#[cfg(feature = "auth")]
pub use auth::{JwtConfig, JwtTokenService};

#[cfg(feature = "rate-limit")]
pub use rate_limit::GcraRateLimiter;

// Re-exports - Redis
#[cfg(feature = "redis")]
pub use rate_limit::{RedisConfig, RedisRateLimitConfig, RedisRateLimiter};
