use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// The slice of a contract the reminder job needs.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ContractRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub end_date: NaiveDate,
}

/// Loads live (not soft-deleted) contracts for the given ids.
///
/// Ids that are missing or soft-deleted are simply absent from the result.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_contracts_by_ids(pool: &PgPool, ids: &[Uuid]) -> Result<Vec<ContractRow>, DbError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let rows = sqlx::query_as::<_, ContractRow>(
        "SELECT id, user_id, title, end_date \
         FROM contracts \
         WHERE id = ANY($1) AND deleted_at IS NULL",
    )
    .bind(ids)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Loads one live contract.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the contract does not exist or is
/// soft-deleted, or [`DbError::Sqlx`] if the query fails.
pub async fn get_contract(pool: &PgPool, id: Uuid) -> Result<ContractRow, DbError> {
    sqlx::query_as::<_, ContractRow>(
        "SELECT id, user_id, title, end_date \
         FROM contracts \
         WHERE id = $1 AND deleted_at IS NULL",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}
