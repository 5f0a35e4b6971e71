//! Redis admission limiter using a fixed window counter.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{Client, Script};

use forum_core::ports::{Admission, AdmissionLimiter, RateLimitError};

use super::RateLimitConfig;

/// Redis connection configuration.
#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: String,
    pub connect_timeout: Duration,
    /// Use the in-memory limiter when Redis cannot be reached at startup.
    pub fallback_to_memory: bool,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            connect_timeout: Duration::from_secs(5),
            fallback_to_memory: true,
        }
    }
}

impl RedisConfig {
    /// Returns `None` when `REDIS_URL` is not set.
    pub fn from_env() -> Option<Self> {
        let url = std::env::var("REDIS_URL").ok()?;
        Some(Self {
            url,
            connect_timeout: Duration::from_secs(
                std::env::var("REDIS_CONNECT_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
            ),
            fallback_to_memory: std::env::var("REDIS_FALLBACK_TO_MEMORY")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(true),
        })
    }
}

/// Redis rate limiter configuration.
#[derive(Debug, Clone)]
pub struct RedisRateLimitConfig {
    /// Redis connection config
    pub redis: RedisConfig,
    /// Window and quota
    pub limits: RateLimitConfig,
    /// Key prefix for rate limit keys
    pub key_prefix: String,
}

impl RedisRateLimitConfig {
    pub fn new(redis: RedisConfig, limits: RateLimitConfig) -> Self {
        Self {
            redis,
            limits,
            key_prefix: std::env::var("RATE_LIMIT_KEY_PREFIX")
                .unwrap_or_else(|_| "forum:admission".to_string()),
        }
    }
}

/// Redis-backed fixed-window limiter shared by every server instance.
///
/// The counter key expires one window after the client's first request, which
/// gives the same rollover rule as the in-memory limiter and means Redis
/// evicts idle clients on its own.
pub struct RedisRateLimiter {
    conn: ConnectionManager,
    config: RedisRateLimitConfig,
    /// Lua script for atomic increment with expiry
    script: Script,
}

impl RedisRateLimiter {
    pub async fn new(config: RedisRateLimitConfig) -> Result<Self, RateLimitError> {
        let client = Client::open(config.redis.url.as_str())
            .map_err(|e| RateLimitError::Backend(e.to_string()))?;

        // Use timeout to prevent hanging if Redis is unreachable
        let conn_manager_fut = ConnectionManager::new(client);
        let conn = tokio::time::timeout(config.redis.connect_timeout, conn_manager_fut)
            .await
            .map_err(|_| RateLimitError::Backend("Connection timed out".to_string()))?
            .map_err(|e| RateLimitError::Backend(e.to_string()))?;

        // Returns: [current_count, ttl_remaining_ms]
        let script = Script::new(
            r#"
            local key = KEYS[1]
            local window_ms = tonumber(ARGV[1])

            local current = redis.call('INCR', key)
            if current == 1 then
                redis.call('PEXPIRE', key, window_ms)
            end

            local ttl = redis.call('PTTL', key)
            return {current, ttl}
            "#,
        );

        tracing::info!(url = %config.redis.url, "Connected to Redis admission limiter");

        Ok(Self {
            conn,
            config,
            script,
        })
    }

    fn make_key(&self, key: &str) -> String {
        format!("{}:{}", self.config.key_prefix, key)
    }
}

#[async_trait]
impl AdmissionLimiter for RedisRateLimiter {
    async fn admit(&self, client: &str) -> Result<Admission, RateLimitError> {
        let redis_key = self.make_key(client);
        let mut conn = self.conn.clone();
        let limits = &self.config.limits;

        let result: Vec<i64> = self
            .script
            .key(&redis_key)
            .arg(limits.window.as_millis() as u64)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| RateLimitError::Backend(e.to_string()))?;

        let current_count = result.first().copied().unwrap_or(1).max(0) as u64;
        let ttl_ms = result
            .get(1)
            .copied()
            .filter(|ttl| *ttl > 0)
            .map(|ttl| ttl as u64)
            .unwrap_or(limits.window.as_millis() as u64);
        let reset_after = Duration::from_millis(ttl_ms);

        let max = u64::from(limits.max_requests);
        if current_count > max {
            Ok(Admission::reject(reset_after))
        } else {
            Ok(Admission::allow((max - current_count) as u32, reset_after))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn get_test_ratelimiter() -> Option<RedisRateLimiter> {
        let config = RedisRateLimitConfig {
            redis: RedisConfig {
                url: std::env::var("REDIS_URL")
                    .unwrap_or_else(|_| "redis://localhost:6389".to_string()),
                connect_timeout: Duration::from_secs(1),
                fallback_to_memory: false,
            },
            limits: RateLimitConfig::new(2, Duration::from_secs(1)),
            key_prefix: format!("test_admission:{}", std::process::id()),
        };

        RedisRateLimiter::new(config).await.ok()
    }

    #[tokio::test]
    async fn test_redis_fixed_window() {
        let limiter = match get_test_ratelimiter().await {
            Some(l) => l,
            None => return,
        };

        let key = "test_client_1";

        let res = limiter.admit(key).await.unwrap();
        assert!(res.allowed);
        assert_eq!(res.remaining, 1);

        let res = limiter.admit(key).await.unwrap();
        assert!(res.allowed);
        assert_eq!(res.remaining, 0);

        let res = limiter.admit(key).await.unwrap();
        assert!(!res.allowed);

        // Wait for the window to expire
        tokio::time::sleep(Duration::from_millis(1500)).await;

        let res = limiter.admit(key).await.unwrap();
        assert!(res.allowed);
    }
}
