//! Application configuration loaded from environment variables.

use std::env;
use std::time::Duration;

use forum_core::services::DEFAULT_MAX_ATTEMPTS;
use forum_infra::RateLimitConfig;
#[cfg(feature = "postgres")]
use forum_infra::DatabaseConfig;

/// Which admission limiter backs the middleware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionStrategy {
    /// In-process fixed window, the default.
    FixedWindow,
    /// In-process GCRA via governor.
    Gcra,
    /// Fixed window shared through Redis.
    Redis,
}

impl AdmissionStrategy {
    /// Unknown values fall back to the fixed window.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "gcra" => Self::Gcra,
            "redis" => Self::Redis,
            "fixed-window" | "fixed_window" | "" => Self::FixedWindow,
            other => {
                tracing::warn!(strategy = %other, "Unknown admission strategy, using fixed-window");
                Self::FixedWindow
            }
        }
    }
}

/// Admission middleware configuration.
#[derive(Debug, Clone)]
pub struct AdmissionConfig {
    pub strategy: AdmissionStrategy,
    pub limits: RateLimitConfig,
    /// Key clients by the forwarded address instead of the socket peer.
    pub trust_proxy: bool,
}

impl AdmissionConfig {
    pub fn from_env() -> Self {
        Self {
            strategy: AdmissionStrategy::parse(
                &env::var("RATE_LIMIT_STRATEGY").unwrap_or_default(),
            ),
            limits: RateLimitConfig::from_env(),
            trust_proxy: env::var("RATE_LIMIT_TRUST_PROXY")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    #[cfg(feature = "postgres")]
    pub database: Option<DatabaseConfig>,
    pub admission: AdmissionConfig,
    /// Upper bound on one vote transaction, retries included.
    pub request_timeout: Duration,
    pub vote_max_attempts: u32,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            #[cfg(feature = "postgres")]
            database: DatabaseConfig::from_env(),
            admission: AdmissionConfig::from_env(),
            request_timeout: Duration::from_secs(
                env::var("REQUEST_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
            ),
            vote_max_attempts: env::var("VOTE_MAX_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_MAX_ATTEMPTS),
        }
    }
}
