use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct DispatchRunsQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct DispatchRunItem {
    run_id: Uuid,
    run_date: NaiveDate,
    trigger_source: String,
    status: String,
    total: i32,
    sent: i32,
    failed: i32,
    skipped: i32,
    error_message: Option<String>,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl From<dday_db::DispatchRunRow> for DispatchRunItem {
    fn from(row: dday_db::DispatchRunRow) -> Self {
        Self {
            run_id: row.public_id,
            run_date: row.run_date,
            trigger_source: row.trigger_source,
            status: row.status,
            total: row.total,
            sent: row.sent,
            failed: row.failed,
            skipped: row.skipped,
            error_message: row.error_message,
            started_at: row.started_at,
            completed_at: row.completed_at,
        }
    }
}

pub(super) async fn list_dispatch_runs(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<DispatchRunsQuery>,
) -> Result<Json<ApiResponse<Vec<DispatchRunItem>>>, ApiError> {
    let rows = dday_db::list_dispatch_runs(&state.pool, normalize_limit(query.limit))
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(DispatchRunItem::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}
