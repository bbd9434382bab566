use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use dday_db::TriggerSource;
use dday_dispatch::DispatchOutcome;

use crate::middleware::RequestId;

use super::AppState;

#[derive(Debug, Deserialize)]
pub(super) struct DispatchQuery {
    /// `YYYY-MM-DD`; defaults to today in the canonical timezone.
    pub date: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct DispatchSucceeded {
    ok: bool,
    sent: u32,
    total: u32,
    failed: u32,
    skipped: u32,
    run_id: Uuid,
    run_date: NaiveDate,
}

#[derive(Debug, Serialize)]
pub(super) struct DispatchFailed {
    ok: bool,
    error: String,
}

impl From<DispatchOutcome> for DispatchSucceeded {
    fn from(outcome: DispatchOutcome) -> Self {
        Self {
            ok: true,
            sent: outcome.summary.sent,
            total: outcome.summary.total,
            failed: outcome.summary.failed,
            skipped: outcome.summary.skipped,
            run_id: outcome.run_id,
            run_date: outcome.run_date,
        }
    }
}

fn failure(status: StatusCode, error: impl Into<String>) -> Response {
    (
        status,
        Json(DispatchFailed {
            ok: false,
            error: error.into(),
        }),
    )
        .into_response()
}

/// Runs the reminder dispatch job once and reports its tallies.
pub(super) async fn trigger_dispatch(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<DispatchQuery>,
) -> Response {
    let run_date = match query.date.as_deref().map(str::trim) {
        None | Some("") => state.config.today(),
        Some(raw) => match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            Ok(date) => date,
            Err(_) => {
                return failure(
                    StatusCode::BAD_REQUEST,
                    format!("invalid date `{raw}`; expected YYYY-MM-DD"),
                );
            }
        },
    };

    tracing::info!(request_id = %req_id.0, %run_date, "dispatch requested");

    match dday_dispatch::dispatch_for_date(&state.pool, &state.config, run_date, TriggerSource::Http)
        .await
    {
        Ok(outcome) => (StatusCode::OK, Json(DispatchSucceeded::from(outcome))).into_response(),
        Err(e) => {
            tracing::error!(request_id = %req_id.0, error = %e, "dispatch request failed");
            failure(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};

    use super::super::test_support::{app_with, app_with_config, send, test_config};

    const PRIVATE_KEY: &str = include_str!("../../tests/fixtures/service_account_key.pem");

    fn post(uri: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .body(Body::empty())
            .expect("request")
    }

    fn credential_json() -> String {
        serde_json::json!({
            "project_id": "dday-test",
            "private_key": PRIVATE_KEY,
            "client_email": "push@dday-test.iam.gserviceaccount.com"
        })
        .to_string()
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn missing_credential_returns_500_with_ok_false(pool: sqlx::PgPool) {
        let (status, json) = send(app_with(pool, None), post("/api/v1/notifications/dispatch")).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["ok"], false);
        assert!(json["error"]
            .as_str()
            .expect("error message")
            .contains("not configured"));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn malformed_date_returns_400(pool: sqlx::PgPool) {
        let (status, json) = send(
            app_with(pool, None),
            post("/api/v1/notifications/dispatch?date=2024-13-40"),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["ok"], false);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn nothing_due_returns_zero_counts(pool: sqlx::PgPool) {
        let credential = credential_json();
        let app = app_with_config(pool.clone(), None, test_config(Some(credential.as_str())));

        let (status, json) =
            send(app, post("/api/v1/notifications/dispatch?date=2024-03-10")).await;

        assert_eq!(status, StatusCode::OK, "body: {json}");
        assert_eq!(json["ok"], true);
        assert_eq!(json["total"], 0);
        assert_eq!(json["sent"], 0);
        assert_eq!(json["run_date"], "2024-03-10");
        assert!(json["run_id"].is_string());

        let runs = dday_db::list_dispatch_runs(&pool, 5).await.expect("runs");
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].trigger_source, "http");
        assert_eq!(runs[0].status, "succeeded");
    }
}
