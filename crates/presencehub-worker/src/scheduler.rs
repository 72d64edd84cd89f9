//! Scheduler hosting the staleness sweep.

use std::sync::Arc;
use std::time::Duration;

use tokio_cron_scheduler::{Job as CronJob, JobScheduler};
use tracing;

use presencehub_core::error::AppError;

use crate::sweep::StalenessSweep;

/// Runs the staleness sweep on a fixed interval.
///
/// Runs are independent: a failed run is logged and silently ends, and
/// the next tick retries naturally. Idempotence of the sweep itself is
/// what makes overlap or skipped ticks harmless.
pub struct SweepScheduler {
    /// The underlying job scheduler.
    scheduler: JobScheduler,
    /// The sweep to run.
    sweep: Arc<StalenessSweep>,
    /// Interval between runs.
    interval: Duration,
}

impl std::fmt::Debug for SweepScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SweepScheduler").finish()
    }
}

impl SweepScheduler {
    /// Create a new sweep scheduler.
    pub async fn new(
        sweep: Arc<StalenessSweep>,
        config: &presencehub_core::config::worker::WorkerConfig,
    ) -> Result<Self, AppError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::internal(format!("Failed to create scheduler: {e}")))?;

        Ok(Self {
            scheduler,
            sweep,
            interval: Duration::from_secs(config.sweep_interval_minutes * 60),
        })
    }

    /// Register the staleness sweep as a repeated job.
    pub async fn register_staleness_sweep(&self) -> Result<(), AppError> {
        let sweep = Arc::clone(&self.sweep);
        let job = CronJob::new_repeated_async(self.interval, move |_uuid, _lock| {
            let sweep = Arc::clone(&sweep);
            Box::pin(async move {
                match sweep.run_once().await {
                    Ok(report) => {
                        tracing::debug!(
                            stale_found = report.stale_found,
                            corrected = report.corrected,
                            "staleness sweep completed"
                        );
                    }
                    Err(e) => {
                        tracing::error!("Staleness sweep failed: {}", e);
                    }
                }
            })
        })
        .map_err(|e| {
            AppError::internal(format!("Failed to create staleness_sweep schedule: {e}"))
        })?;

        self.scheduler.add(job).await.map_err(|e| {
            AppError::internal(format!("Failed to add staleness_sweep schedule: {e}"))
        })?;

        tracing::info!(
            "Registered: staleness_sweep (every {}min)",
            self.interval.as_secs() / 60
        );
        Ok(())
    }

    /// Start the scheduler.
    pub async fn start(&self) -> Result<(), AppError> {
        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::internal(format!("Failed to start scheduler: {e}")))?;

        tracing::info!("Sweep scheduler started");
        Ok(())
    }

    /// Shutdown the scheduler.
    pub async fn shutdown(&mut self) -> Result<(), AppError> {
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::internal(format!("Failed to shutdown scheduler: {e}")))?;

        tracing::info!("Sweep scheduler shut down");
        Ok(())
    }
}
