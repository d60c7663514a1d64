use anyhow::Result;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::{Duration, interval};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{debug, error, info, warn};

use crate::config::SchedulerConfig;
use crate::state::SharedState;

/// Events pulled per retry sweep.
const SWEEP_BATCH: u64 = 50;

/// Background jobs for the daemon: the webhook retry sweep, event/log
/// pruning, and the IGDB token warm-up.
pub struct Scheduler {
    state: Arc<SharedState>,
    config: SchedulerConfig,
    running: Arc<RwLock<bool>>,
}

impl Scheduler {
    #[must_use]
    pub fn new(state: Arc<SharedState>, config: SchedulerConfig) -> Self {
        Self {
            state,
            config,
            running: Arc::new(RwLock::new(false)),
        }
    }

    pub async fn start(&self) -> Result<()> {
        if !self.config.enabled {
            info!("Scheduler is disabled in config");
            return Ok(());
        }

        *self.running.write().await = true;
        info!("Starting background scheduler");

        if let Some(cron_expr) = &self.config.cron_expression {
            self.run_with_cron(cron_expr).await
        } else {
            self.run_with_interval().await
        }
    }

    async fn run_with_cron(&self, cron_expr: &str) -> Result<()> {
        let mut sched = JobScheduler::new().await?;

        let state = Arc::clone(&self.state);
        let running = Arc::clone(&self.running);

        let sweep_job = Job::new_async(cron_expr, move |_uuid, _lock| {
            let state = Arc::clone(&state);
            let running = Arc::clone(&running);
            Box::pin(async move {
                if !*running.read().await {
                    return;
                }
                if let Err(e) = run_webhook_sweep(&state).await {
                    error!("Scheduled webhook sweep failed: {}", e);
                }
            })
        })?;

        let state = Arc::clone(&self.state);
        let retention_days = self.config.webhook_retention_days;

        // Daily cleanup at 03:00.
        let prune_job = Job::new_async("0 0 3 * * *", move |_uuid, _lock| {
            let state = Arc::clone(&state);
            Box::pin(async move {
                if let Err(e) = run_prune(&state, retention_days).await {
                    error!("Scheduled prune failed: {}", e);
                }
            })
        })?;

        sched.add(sweep_job).await?;
        sched.add(prune_job).await?;
        sched.start().await?;

        info!("Scheduler running with cron: {}", cron_expr);

        loop {
            if !*self.running.read().await {
                break;
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }

        sched.shutdown().await?;
        Ok(())
    }

    async fn run_with_interval(&self) -> Result<()> {
        let sweep_mins = self.config.webhook_retry_minutes;
        let warmup_mins = self.config.token_warmup_minutes;
        let retention_days = self.config.webhook_retention_days;

        info!("Scheduler running webhook sweep every {} minutes", sweep_mins);

        let mut sweep_interval = interval(Duration::from_secs(u64::from(sweep_mins) * 60));

        let mut warmup_interval = interval(Duration::from_secs(
            u64::from(warmup_mins.max(1)) * 60,
        ));

        let mut prune_interval = interval(Duration::from_secs(24 * 60 * 60));

        loop {
            tokio::select! {
                _ = sweep_interval.tick() => {
                    if !*self.running.read().await {
                        break;
                    }
                    if let Err(e) = run_webhook_sweep(&self.state).await {
                        error!("Scheduled webhook sweep failed: {}", e);
                    }
                }
                _ = warmup_interval.tick() => {
                    if !*self.running.read().await {
                        break;
                    }
                    if warmup_mins > 0 {
                        run_token_warmup(&self.state).await;
                    }
                }
                _ = prune_interval.tick() => {
                    if !*self.running.read().await {
                        break;
                    }
                    if let Err(e) = run_prune(&self.state, retention_days).await {
                        error!("Scheduled prune failed: {}", e);
                    }
                }
            }
        }

        Ok(())
    }

    pub async fn stop(&self) {
        info!("Stopping scheduler...");
        *self.running.write().await = false;
    }

    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }

    /// One pass of every job, for the CLI.
    pub async fn run_once(&self) -> Result<()> {
        info!("Running manual sweep...");

        run_webhook_sweep(&self.state).await?;
        run_prune(&self.state, self.config.webhook_retention_days).await?;
        run_token_warmup(&self.state).await;

        Ok(())
    }
}

async fn run_webhook_sweep(state: &Arc<SharedState>) -> Result<()> {
    let (done, failed) = state.billing_service.retry_pending(SWEEP_BATCH).await?;

    if done == 0 && failed == 0 {
        debug!("Webhook sweep: nothing pending");
    }

    Ok(())
}

async fn run_prune(state: &Arc<SharedState>, retention_days: u32) -> Result<()> {
    let events = state.store.prune_webhook_events(retention_days).await?;
    let logs = state.store.prune_logs(i64::from(retention_days)).await?;

    if events > 0 || logs > 0 {
        info!(events, logs, "Pruned old webhook events and logs");
    }

    Ok(())
}

/// Refresh the Twitch token ahead of expiry so interactive searches do
/// not pay the refresh latency. Failures are logged; the next search
/// retries anyway.
async fn run_token_warmup(state: &Arc<SharedState>) {
    let configured = !state.config.read().await.igdb.client_id.is_empty();
    if !configured {
        return;
    }

    if let Err(e) = state.igdb.warm_up().await {
        warn!("IGDB token warm-up failed: {}", e);
    }
}
