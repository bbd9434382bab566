use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// Returns every push token registered for `user_id`, oldest first.
///
/// An empty vector means the user has no deliverable device.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_push_tokens_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<String>, DbError> {
    let tokens = sqlx::query_scalar::<_, String>(
        "SELECT token FROM push_tokens WHERE user_id = $1 ORDER BY created_at, id",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(tokens)
}
