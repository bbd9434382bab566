//! Bookkeeping for reminder dispatch runs (`dispatch_runs`).
//!
//! A run is inserted as `running` and moves exactly once to `succeeded` or
//! `failed`. Both transitions are conditional on the current status.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// What started a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerSource {
    Http,
    Cron,
    Cli,
}

impl TriggerSource {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TriggerSource::Http => "http",
            TriggerSource::Cron => "cron",
            TriggerSource::Cli => "cli",
        }
    }
}

impl std::fmt::Display for TriggerSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DispatchRunRow {
    pub id: i64,
    pub public_id: Uuid,
    pub run_date: NaiveDate,
    pub trigger_source: String,
    pub status: String,
    pub total: i32,
    pub sent: i32,
    pub failed: i32,
    pub skipped: i32,
    pub error_message: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Final tallies written when a run succeeds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchCounts {
    pub total: i32,
    pub sent: i32,
    pub failed: i32,
    pub skipped: i32,
}

const RUN_COLUMNS: &str = "id, public_id, run_date, trigger_source, status, total, sent, \
                           failed, skipped, error_message, started_at, completed_at";

/// Inserts a new run in `running` status.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_dispatch_run(
    pool: &PgPool,
    run_date: NaiveDate,
    trigger: TriggerSource,
) -> Result<DispatchRunRow, DbError> {
    let row = sqlx::query_as::<_, DispatchRunRow>(&format!(
        "INSERT INTO dispatch_runs (public_id, run_date, trigger_source) \
         VALUES ($1, $2, $3) \
         RETURNING {RUN_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(run_date)
    .bind(trigger.as_str())
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Marks a running run as `succeeded` and records its counts.
///
/// # Errors
///
/// Returns [`DbError::InvalidDispatchRunTransition`] if the run is not
/// `running`, or [`DbError::Sqlx`] if the update fails.
pub async fn complete_dispatch_run(
    pool: &PgPool,
    id: i64,
    counts: DispatchCounts,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE dispatch_runs \
         SET status = 'succeeded', completed_at = NOW(), \
             total = $1, sent = $2, failed = $3, skipped = $4 \
         WHERE id = $5 AND status = 'running'",
    )
    .bind(counts.total)
    .bind(counts.sent)
    .bind(counts.failed)
    .bind(counts.skipped)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidDispatchRunTransition {
            id,
            expected_status: "running",
        });
    }
    Ok(())
}

/// Marks a running run as `failed` with an error message.
///
/// # Errors
///
/// Returns [`DbError::InvalidDispatchRunTransition`] if the run is not
/// `running`, or [`DbError::Sqlx`] if the update fails.
pub async fn fail_dispatch_run(pool: &PgPool, id: i64, error_message: &str) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE dispatch_runs \
         SET status = 'failed', completed_at = NOW(), error_message = $1 \
         WHERE id = $2 AND status = 'running'",
    )
    .bind(error_message)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidDispatchRunTransition {
            id,
            expected_status: "running",
        });
    }
    Ok(())
}

/// Returns the most recent `limit` runs, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_dispatch_runs(pool: &PgPool, limit: i64) -> Result<Vec<DispatchRunRow>, DbError> {
    let rows = sqlx::query_as::<_, DispatchRunRow>(&format!(
        "SELECT {RUN_COLUMNS} FROM dispatch_runs ORDER BY started_at DESC, id DESC LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
