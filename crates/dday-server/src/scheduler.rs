//! Optional in-process schedule for the dispatch job.
//!
//! Most deployments trigger `POST /api/v1/notifications/dispatch` from an
//! external scheduler. Setting `DDAY_DISPATCH_CRON` registers the same run
//! inside the server instead.

use std::sync::Arc;

use sqlx::PgPool;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use dday_core::AppConfig;
use dday_db::TriggerSource;

/// Builds and starts the scheduler when a dispatch cron is configured.
///
/// The returned handle must be kept alive for the lifetime of the process;
/// dropping it stops the job. Returns `None` when no cron is configured.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the cron expression is invalid or the
/// scheduler fails to start.
pub async fn build_scheduler(
    pool: PgPool,
    config: Arc<AppConfig>,
) -> Result<Option<JobScheduler>, JobSchedulerError> {
    let Some(schedule) = config.dispatch_cron.clone() else {
        tracing::info!("scheduler: DDAY_DISPATCH_CRON not set; relying on external trigger");
        return Ok(None);
    };

    let scheduler = JobScheduler::new().await?;
    scheduler.add(dispatch_job(&schedule, pool, config)?).await?;
    scheduler.start().await?;

    tracing::info!(%schedule, "scheduler: reminder dispatch job registered");
    Ok(Some(scheduler))
}

fn dispatch_job(
    schedule: &str,
    pool: PgPool,
    config: Arc<AppConfig>,
) -> Result<Job, JobSchedulerError> {
    Job::new_async(schedule, move |_uuid, _lock| {
        let pool = pool.clone();
        let config = Arc::clone(&config);

        Box::pin(async move {
            run_scheduled_dispatch(&pool, &config).await;
        })
    })
}

async fn run_scheduled_dispatch(pool: &PgPool, config: &AppConfig) {
    let run_date = config.today();
    tracing::info!(%run_date, "scheduler: starting reminder dispatch");

    match dday_dispatch::dispatch_for_date(pool, config, run_date, TriggerSource::Cron).await {
        Ok(outcome) => tracing::info!(
            run_id = %outcome.run_id,
            total = outcome.summary.total,
            sent = outcome.summary.sent,
            failed = outcome.summary.failed,
            skipped = outcome.summary.skipped,
            "scheduler: reminder dispatch complete"
        ),
        Err(e) => tracing::error!(error = %e, "scheduler: reminder dispatch failed"),
    }
}
