use chrono::NaiveDate;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use dday_core::AppConfig;
use dday_db::{DispatchCounts, TriggerSource};
use dday_push::{PushClient, ServiceAccountKey};

use crate::pipeline::{dispatch_due, DispatchSummary};
use crate::DispatchError;

/// Result of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchOutcome {
    pub run_id: Uuid,
    pub run_date: NaiveDate,
    pub summary: DispatchSummary,
}

/// Runs the dispatch job for `run_date` using the configured credential.
///
/// The credential is validated before anything is recorded or read, so a
/// configuration problem fails the run without partial processing.
///
/// # Errors
///
/// - [`DispatchError::Credential`] if the service-account credential is
///   missing or malformed.
/// - [`DispatchError::Push`] if the HTTP client cannot be built or the token
///   exchange fails.
/// - [`DispatchError::Db`] on any database failure.
pub async fn dispatch_for_date(
    pool: &PgPool,
    config: &AppConfig,
    run_date: NaiveDate,
    trigger: TriggerSource,
) -> Result<DispatchOutcome, DispatchError> {
    let key = ServiceAccountKey::from_optional_json(config.firebase_service_account.as_deref())?;
    let client = PushClient::new(config.push_request_timeout_secs)?;
    dispatch_with_client(pool, client, &key, run_date, trigger, config.dispatch_page_size).await
}

/// Runs the dispatch job with an explicit push client and credential.
///
/// Records the run in `dispatch_runs`; when nothing is due the run completes
/// without contacting the push provider.
///
/// # Errors
///
/// Same as [`dispatch_for_date`], minus credential parsing.
pub async fn dispatch_with_client(
    pool: &PgPool,
    client: PushClient,
    key: &ServiceAccountKey,
    run_date: NaiveDate,
    trigger: TriggerSource,
    page_size: i64,
) -> Result<DispatchOutcome, DispatchError> {
    let run = dday_db::create_dispatch_run(pool, run_date, trigger).await?;
    tracing::info!(
        run_id = %run.public_id,
        %run_date,
        %trigger,
        "dispatch: run started"
    );

    match execute(pool, client, key, run_date, page_size).await {
        Ok(summary) => {
            dday_db::complete_dispatch_run(pool, run.id, counts(&summary)).await?;
            tracing::info!(run_id = %run.public_id, sent = summary.sent, "dispatch: run succeeded");
            Ok(DispatchOutcome {
                run_id: run.public_id,
                run_date,
                summary,
            })
        }
        Err(e) => {
            tracing::error!(run_id = %run.public_id, error = %e, "dispatch: run failed");
            if let Err(mark_err) = dday_db::fail_dispatch_run(pool, run.id, &e.to_string()).await {
                tracing::warn!(
                    run_id = %run.public_id,
                    error = %mark_err,
                    "dispatch: could not record run failure"
                );
            }
            Err(e)
        }
    }
}

async fn execute(
    pool: &PgPool,
    client: PushClient,
    key: &ServiceAccountKey,
    run_date: NaiveDate,
    page_size: i64,
) -> Result<DispatchSummary, DispatchError> {
    if dday_db::count_due_reminders(pool, run_date).await? == 0 {
        tracing::info!(%run_date, "dispatch: nothing due");
        return Ok(DispatchSummary::default());
    }

    let session = client.open_session(key).await?;
    dispatch_due(pool, &session, run_date, page_size).await
}

fn counts(summary: &DispatchSummary) -> DispatchCounts {
    let clamp = |n: u32| i32::try_from(n).unwrap_or(i32::MAX);
    DispatchCounts {
        total: clamp(summary.total),
        sent: clamp(summary.sent),
        failed: clamp(summary.failed),
        skipped: clamp(summary.skipped),
    }
}
