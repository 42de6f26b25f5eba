//! Sync scheduler
//!
//! Drives reconciliation cycles on a fixed interval in a single background
//! task. Cycles run inline in the task's loop, so they are single-flight by
//! construction; a tick that fires while a cycle is still running is skipped
//! rather than queued behind it.

use sqlx::PgPool;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{error, info};

use super::client::{CatalogClient, FetchError};
use super::config::SyncConfig;
use super::reconciler::Reconciler;

/// Delay before the first cycle, giving the server time to finish binding.
const STARTUP_DELAY: Duration = Duration::from_secs(5);

/// Interval-based driver for the reconciler
pub struct SyncScheduler {
    config: SyncConfig,
    reconciler: Reconciler,
}

impl SyncScheduler {
    /// Create a new scheduler and its source client
    pub fn new(config: SyncConfig, db: PgPool) -> Result<Self, FetchError> {
        let client = CatalogClient::new(config.source.clone())?;
        let reconciler = Reconciler::new(db, client, &config);
        Ok(Self { config, reconciler })
    }

    /// Start the scheduler in a background task.
    ///
    /// The task exits when the shutdown channel flips to true; a cycle in
    /// flight finishes its current batch first (the reconciler checks the
    /// same channel at batch boundaries).
    pub fn start(self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                interval_secs = self.config.interval_secs,
                "sync scheduler started"
            );

            tokio::time::sleep(STARTUP_DELAY).await;

            let mut ticker = interval(self.config.interval());
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = shutdown.changed() => break,
                }

                if *shutdown.borrow() {
                    break;
                }

                match self.reconciler.run_cycle(&shutdown).await {
                    Ok(summary) => {
                        if summary.failed_batches > 0 {
                            error!(
                                failed_batches = summary.failed_batches,
                                "reconciliation cycle completed with failed batches"
                            );
                        }
                    }
                    Err(cycle_error) => {
                        // a failed cycle never takes the scheduler down
                        error!(error = %cycle_error, "reconciliation cycle failed");
                    }
                }
            }

            info!("sync scheduler stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::config::SourceConfig;

    fn enabled_config() -> SyncConfig {
        SyncConfig {
            enabled: true,
            source: SourceConfig {
                app_id: "app".to_string(),
                master_key: "key".to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_scheduler_new() {
        let db = PgPool::connect_lazy("postgresql://localhost/carsync").unwrap();
        let scheduler = SyncScheduler::new(enabled_config(), db);
        assert!(scheduler.is_ok());
    }

    #[tokio::test]
    async fn test_scheduler_new_rejects_missing_credentials() {
        let db = PgPool::connect_lazy("postgresql://localhost/carsync").unwrap();
        let config = SyncConfig::default();
        assert!(matches!(
            SyncScheduler::new(config, db),
            Err(FetchError::Config(_))
        ));
    }
}
