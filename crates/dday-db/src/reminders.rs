//! Database operations for `reminders`.

use chrono::NaiveDate;
use dday_core::{PlannedReminder, ReminderOffset};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// An unsent reminder whose scheduled date has arrived.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DueReminderRow {
    pub id: Uuid,
    pub contract_id: Uuid,
    pub days_before: i32,
    pub scheduled_date: NaiveDate,
}

/// Counts unsent reminders scheduled for `date`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_due_reminders(pool: &PgPool, date: NaiveDate) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM reminders WHERE scheduled_date = $1 AND sent = FALSE",
    )
    .bind(date)
    .fetch_one(pool)
    .await?;
    Ok(count)
}

/// Returns up to `limit` unsent reminders scheduled for `date`, ordered by id.
///
/// Keyset-paginated: pass the last id of the previous page as `after` to get
/// the next one. Rows claimed while paging drop out of later pages but never
/// shift the cursor.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_due_reminders(
    pool: &PgPool,
    date: NaiveDate,
    after: Option<Uuid>,
    limit: i64,
) -> Result<Vec<DueReminderRow>, DbError> {
    let rows = sqlx::query_as::<_, DueReminderRow>(
        "SELECT id, contract_id, days_before, scheduled_date \
         FROM reminders \
         WHERE scheduled_date = $1 \
           AND sent = FALSE \
           AND ($2::uuid IS NULL OR id > $2) \
         ORDER BY id \
         LIMIT $3",
    )
    .bind(date)
    .bind(after)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Flags a reminder as sent.
///
/// Idempotent: an already-sent or missing reminder is left alone and no error
/// is raised. Returns `true` only when this call flipped `sent` from false to
/// true, which makes it usable as an atomic claim between overlapping runs.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn mark_reminder_sent(pool: &PgPool, id: Uuid) -> Result<bool, DbError> {
    let result = sqlx::query(
        "UPDATE reminders SET sent = TRUE, sent_at = NOW() \
         WHERE id = $1 AND sent = FALSE",
    )
    .bind(id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Distinct offsets currently configured for a contract.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails, or
/// [`DbError::InvalidOffset`] if a stored value is outside the known set.
pub async fn list_contract_offsets(
    pool: &PgPool,
    contract_id: Uuid,
) -> Result<Vec<ReminderOffset>, DbError> {
    let days = sqlx::query_scalar::<_, i32>(
        "SELECT DISTINCT days_before FROM reminders WHERE contract_id = $1 ORDER BY days_before",
    )
    .bind(contract_id)
    .fetch_all(pool)
    .await?;

    days.into_iter()
        .map(|d| ReminderOffset::try_from(d).map_err(DbError::from))
        .collect()
}

/// Replaces every reminder of a contract with `planned`, in one transaction.
///
/// Used when a contract's end date changes: scheduled dates are never edited
/// in place. Returns the number of rows inserted.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement fails; the transaction is rolled
/// back in that case.
pub async fn replace_contract_reminders(
    pool: &PgPool,
    contract_id: Uuid,
    planned: &[PlannedReminder],
) -> Result<u64, DbError> {
    let mut tx = pool.begin().await?;

    let deleted = sqlx::query("DELETE FROM reminders WHERE contract_id = $1")
        .bind(contract_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    let mut inserted = 0u64;
    for plan in planned {
        inserted += sqlx::query(
            "INSERT INTO reminders (contract_id, days_before, scheduled_date) \
             VALUES ($1, $2, $3)",
        )
        .bind(contract_id)
        .bind(plan.offset.days())
        .bind(plan.scheduled_date)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    }

    tx.commit().await?;

    tracing::debug!(%contract_id, deleted, inserted, "replaced contract reminders");
    Ok(inserted)
}
