//! Application state - shared across all handlers.

use std::sync::Arc;
use std::time::Duration;

use forum_core::ports::{
    AdmissionLimiter, CategoryRepository, CommentRepository, PostRepository, RateLimitError,
    VoteStore,
};
use forum_core::{PostAggregator, VoteEngine};
use forum_infra::{FixedWindowLimiter, InMemoryForumStore};

use crate::config::{AdmissionConfig, AdmissionStrategy, AppConfig};

/// Errors that abort startup.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("admission limiter unavailable: {0}")]
    Limiter(#[from] RateLimitError),
}

/// The storage adapters behind every port.
pub struct Stores {
    pub posts: Arc<dyn PostRepository>,
    pub comments: Arc<dyn CommentRepository>,
    pub categories: Arc<dyn CategoryRepository>,
    pub votes: Arc<dyn VoteStore>,
}

impl Stores {
    pub fn in_memory(store: InMemoryForumStore) -> Self {
        let store = Arc::new(store);
        Self {
            posts: store.clone(),
            comments: store.clone(),
            categories: store.clone(),
            votes: store,
        }
    }

    /// Connect to Postgres when configured, otherwise run in memory.
    pub async fn from_config(config: &AppConfig) -> Self {
        #[cfg(feature = "postgres")]
        {
            use forum_infra::{
                PostgresCategoryRepository, PostgresCommentRepository, PostgresPostRepository,
                PostgresVoteStore,
            };

            match &config.database {
                Some(db_config) => match forum_infra::database::connect(db_config).await {
                    Ok(db) => {
                        return Self {
                            posts: Arc::new(PostgresPostRepository::new(db.clone())),
                            comments: Arc::new(PostgresCommentRepository::new(db.clone())),
                            categories: Arc::new(PostgresCategoryRepository::new(db.clone())),
                            votes: Arc::new(PostgresVoteStore::new(db)),
                        };
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to connect to database, using in-memory store");
                    }
                },
                None => {
                    tracing::warn!("DATABASE_URL not set. Running without database (in-memory mode).");
                }
            }
        }

        #[cfg(not(feature = "postgres"))]
        {
            let _ = config;
            tracing::info!("Running without postgres feature - using in-memory store");
        }

        Self::in_memory(InMemoryForumStore::new())
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub limiter: Arc<dyn AdmissionLimiter>,
    pub votes: Arc<VoteEngine>,
    pub aggregator: Arc<PostAggregator>,
    pub posts: Arc<dyn PostRepository>,
    pub comments: Arc<dyn CommentRepository>,
    pub categories: Arc<dyn CategoryRepository>,
    pub request_timeout: Duration,
}

impl AppState {
    /// Build the application state with the configured adapters.
    pub async fn new(config: &AppConfig) -> Result<Self, StartupError> {
        let stores = Stores::from_config(config).await;
        let limiter = build_limiter(&config.admission).await?;

        let state = Self::from_parts(
            stores,
            limiter,
            config.request_timeout,
            config.vote_max_attempts,
        );
        tracing::info!("Application state initialized");
        Ok(state)
    }

    pub fn from_parts(
        stores: Stores,
        limiter: Arc<dyn AdmissionLimiter>,
        request_timeout: Duration,
        vote_max_attempts: u32,
    ) -> Self {
        let votes = VoteEngine::new(stores.votes.clone()).with_max_attempts(vote_max_attempts);
        let aggregator = PostAggregator::new(
            stores.posts.clone(),
            stores.votes.clone(),
            stores.comments.clone(),
        );

        Self {
            limiter,
            votes: Arc::new(votes),
            aggregator: Arc::new(aggregator),
            posts: stores.posts,
            comments: stores.comments,
            categories: stores.categories,
            request_timeout,
        }
    }
}

async fn build_limiter(
    config: &AdmissionConfig,
) -> Result<Arc<dyn AdmissionLimiter>, StartupError> {
    match config.strategy {
        #[cfg(feature = "rate-limit")]
        AdmissionStrategy::Gcra => {
            let limiter = forum_infra::GcraRateLimiter::new(&config.limits)?;
            tracing::info!(
                max_requests = config.limits.max_requests,
                window_secs = config.limits.window.as_secs(),
                "Using GCRA admission limiter"
            );
            return Ok(Arc::new(limiter));
        }
        #[cfg(feature = "redis")]
        AdmissionStrategy::Redis => {
            use forum_infra::{RedisConfig, RedisRateLimitConfig, RedisRateLimiter};

            match RedisConfig::from_env() {
                Some(redis) => {
                    let fallback = redis.fallback_to_memory;
                    let redis_config = RedisRateLimitConfig::new(redis, config.limits.clone());
                    match RedisRateLimiter::new(redis_config).await {
                        Ok(limiter) => return Ok(Arc::new(limiter)),
                        Err(e) if fallback => {
                            tracing::error!(error = %e, "Redis unreachable, using in-memory admission limiter");
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
                None => {
                    tracing::warn!("RATE_LIMIT_STRATEGY=redis but REDIS_URL is not set");
                }
            }
        }
        AdmissionStrategy::FixedWindow => {}
        #[allow(unreachable_patterns)]
        other => {
            tracing::warn!(strategy = ?other, "Admission strategy not compiled in, using fixed-window");
        }
    }

    tracing::info!(
        max_requests = config.limits.max_requests,
        window_secs = config.limits.window.as_secs(),
        "Using fixed-window admission limiter"
    );
    Ok(Arc::new(FixedWindowLimiter::new(config.limits.clone())))
}
