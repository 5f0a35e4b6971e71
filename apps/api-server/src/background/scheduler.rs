//! Cron-style job scheduler using tokio-cron-scheduler.

use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use forum_core::ports::AdmissionLimiter;

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Enable scheduler.
    pub enabled: bool,
    /// When the admission limiter drops idle client windows (with seconds).
    pub limiter_sweep_cron: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            limiter_sweep_cron: "0 */5 * * * *".to_string(),
        }
    }
}

impl SchedulerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            enabled: std::env::var("SCHEDULER_ENABLED")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(defaults.enabled),
            limiter_sweep_cron: std::env::var("LIMITER_SWEEP_CRON")
                .unwrap_or(defaults.limiter_sweep_cron),
        }
    }
}

/// Cron job scheduler wrapper.
pub struct Scheduler {
    inner: JobScheduler,
    config: SchedulerConfig,
}

impl Scheduler {
    /// Create a new scheduler.
    pub async fn new(config: SchedulerConfig) -> Result<Self, JobSchedulerError> {
        let inner = JobScheduler::new().await?;
        Ok(Self { inner, config })
    }

    /// Add a cron job.
    pub async fn add_cron<F, Fut>(
        &self,
        schedule: &str,
        task: F,
    ) -> Result<uuid::Uuid, JobSchedulerError>
    where
        F: Fn() -> Fut + Send + Sync + Clone + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let job = Job::new_async(schedule, move |_uuid, _lock| {
            let task = task.clone();
            Box::pin(async move {
                task().await;
            })
        })?;

        let id = self.inner.add(job).await?;
        tracing::info!(schedule = %schedule, job_id = %id, "Cron job registered");
        Ok(id)
    }

    /// Periodically evict idle windows from the admission limiter.
    pub async fn add_limiter_sweep(
        &self,
        limiter: Arc<dyn AdmissionLimiter>,
    ) -> Result<uuid::Uuid, JobSchedulerError> {
        let schedule = self.config.limiter_sweep_cron.clone();
        self.add_cron(&schedule, move || {
            let limiter = limiter.clone();
            async move {
                match limiter.evict_idle().await {
                    Ok(0) => {}
                    Ok(evicted) => tracing::debug!(evicted, "Evicted idle admission windows"),
                    Err(e) => tracing::error!(error = %e, "Admission limiter sweep failed"),
                }
            }
        })
        .await
    }

    /// Start the scheduler.
    pub async fn start(&self) -> Result<(), JobSchedulerError> {
        if !self.config.enabled {
            tracing::info!("Scheduler disabled");
            return Ok(());
        }

        self.inner.start().await?;
        tracing::info!("Scheduler started");
        Ok(())
    }

    /// Stop the scheduler.
    pub async fn shutdown(&mut self) -> Result<(), JobSchedulerError> {
        self.inner.shutdown().await?;
        tracing::info!("Scheduler stopped");
        Ok(())
    }
}

/// Build and start the scheduler with the limiter sweep registered.
pub async fn start(
    config: SchedulerConfig,
    limiter: Arc<dyn AdmissionLimiter>,
) -> Result<Scheduler, JobSchedulerError> {
    let scheduler = Scheduler::new(config).await?;
    scheduler.add_limiter_sweep(limiter).await?;
    scheduler.start().await?;
    Ok(scheduler)
}
