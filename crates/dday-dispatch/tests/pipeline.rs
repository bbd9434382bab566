//! Pipeline tests: real Postgres via `#[sqlx::test]`, recorded pushes.

use std::collections::HashSet;
use std::sync::Mutex;

use chrono::NaiveDate;
use dday_dispatch::{dispatch_due, preview_due, DispatchSummary, Notifier};
use dday_push::{PushError, PushMessage};
use uuid::Uuid;

/// Records every attempt; tokens in `failing` are rejected.
#[derive(Default)]
struct RecordingNotifier {
    attempts: Mutex<Vec<(String, PushMessage)>>,
    failing: HashSet<String>,
}

impl RecordingNotifier {
    fn failing_on(tokens: &[&str]) -> Self {
        Self {
            attempts: Mutex::default(),
            failing: tokens.iter().map(ToString::to_string).collect(),
        }
    }

    fn attempts(&self) -> Vec<(String, PushMessage)> {
        self.attempts.lock().expect("lock").clone()
    }
}

impl Notifier for RecordingNotifier {
    async fn notify(&self, device_token: &str, message: &PushMessage) -> Result<(), PushError> {
        self.attempts
            .lock()
            .expect("lock")
            .push((device_token.to_string(), message.clone()));
        if self.failing.contains(device_token) {
            return Err(PushError::Rejected {
                status: 404,
                body: "UNREGISTERED".to_string(),
            });
        }
        Ok(())
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

fn today() -> NaiveDate {
    date(2024, 3, 10)
}

async fn insert_contract(pool: &sqlx::PgPool, user_id: Uuid, title: &str) -> Uuid {
    sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO contracts (user_id, title, end_date) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(user_id)
    .bind(title)
    .bind(date(2024, 4, 30))
    .fetch_one(pool)
    .await
    .expect("insert contract")
}

async fn insert_reminder(
    pool: &sqlx::PgPool,
    contract_id: Uuid,
    days_before: i32,
    scheduled: NaiveDate,
) -> Uuid {
    sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO reminders (contract_id, days_before, scheduled_date) \
         VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(contract_id)
    .bind(days_before)
    .bind(scheduled)
    .fetch_one(pool)
    .await
    .expect("insert reminder")
}

async fn insert_token(pool: &sqlx::PgPool, user_id: Uuid, token: &str) {
    sqlx::query("INSERT INTO push_tokens (user_id, token) VALUES ($1, $2)")
        .bind(user_id)
        .bind(token)
        .execute(pool)
        .await
        .expect("insert token");
}

async fn is_sent(pool: &sqlx::PgPool, id: Uuid) -> bool {
    sqlx::query_scalar::<_, bool>("SELECT sent FROM reminders WHERE id = $1")
        .bind(id)
        .fetch_one(pool)
        .await
        .expect("select sent")
}

#[sqlx::test(migrations = "../../migrations")]
async fn reminder_is_sent_to_every_device_of_the_owner(pool: sqlx::PgPool) {
    let user = Uuid::new_v4();
    let netflix = insert_contract(&pool, user, "Netflix").await;
    let r1 = insert_reminder(&pool, netflix, 1, today()).await;
    insert_token(&pool, user, "T1").await;
    insert_token(&pool, user, "T2").await;

    let notifier = RecordingNotifier::default();
    let summary = dispatch_due(&pool, &notifier, today(), 100).await.unwrap();

    let attempts = notifier.attempts();
    let mut tokens: Vec<&str> = attempts.iter().map(|(t, _)| t.as_str()).collect();
    tokens.sort_unstable();
    assert_eq!(tokens, vec!["T1", "T2"]);
    for (_, message) in &attempts {
        assert!(message.body.contains("Netflix"));
        assert!(message.body.contains("내일"));
        assert_eq!(message.data["reminder_id"], r1.to_string());
    }
    assert!(is_sent(&pool, r1).await);
    assert_eq!(summary.total, 1);
    assert_eq!(summary.sent, 2);
}

#[sqlx::test(migrations = "../../migrations")]
async fn failed_deliveries_still_mark_the_reminder_sent(pool: sqlx::PgPool) {
    let user = Uuid::new_v4();
    let contract = insert_contract(&pool, user, "Netflix").await;
    let r1 = insert_reminder(&pool, contract, 1, today()).await;
    insert_token(&pool, user, "T1").await;
    insert_token(&pool, user, "T2").await;

    let notifier = RecordingNotifier::failing_on(&["T1", "T2"]);
    let summary = dispatch_due(&pool, &notifier, today(), 100).await.unwrap();

    assert_eq!(notifier.attempts().len(), 2);
    assert_eq!(summary.failed, 2);
    assert_eq!(summary.sent, 0);
    assert!(is_sent(&pool, r1).await);
}

#[sqlx::test(migrations = "../../migrations")]
async fn one_failing_device_does_not_block_others(pool: sqlx::PgPool) {
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();
    let a = insert_contract(&pool, alice, "Rent").await;
    let b = insert_contract(&pool, bob, "Gym").await;
    insert_reminder(&pool, a, 7, today()).await;
    insert_reminder(&pool, b, 30, today()).await;
    insert_token(&pool, alice, "dead").await;
    insert_token(&pool, alice, "alive").await;
    insert_token(&pool, bob, "bob-phone").await;

    let notifier = RecordingNotifier::failing_on(&["dead"]);
    let summary = dispatch_due(&pool, &notifier, today(), 100).await.unwrap();

    assert_eq!(summary.total, 2);
    assert_eq!(summary.sent, 2);
    assert_eq!(summary.failed, 1);
    let bodies: Vec<String> = notifier.attempts().into_iter().map(|(_, m)| m.body).collect();
    assert!(bodies.iter().any(|b| b.contains("7일 후")));
    assert!(bodies.iter().any(|b| b.contains("30일 후")));
}

#[sqlx::test(migrations = "../../migrations")]
async fn owner_without_devices_is_marked_sent_without_attempts(pool: sqlx::PgPool) {
    let contract = insert_contract(&pool, Uuid::new_v4(), "Phone plan").await;
    let r2 = insert_reminder(&pool, contract, 7, today()).await;

    let notifier = RecordingNotifier::default();
    let summary = dispatch_due(&pool, &notifier, today(), 100).await.unwrap();

    assert!(notifier.attempts().is_empty());
    assert!(is_sent(&pool, r2).await);
    assert_eq!(summary.without_device, 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn reminders_for_other_days_are_untouched(pool: sqlx::PgPool) {
    let user = Uuid::new_v4();
    let contract = insert_contract(&pool, user, "Insurance").await;
    let r3 = insert_reminder(&pool, contract, 1, date(2024, 3, 11)).await;
    let past = insert_reminder(&pool, contract, 3, date(2024, 3, 9)).await;
    insert_token(&pool, user, "T1").await;

    let notifier = RecordingNotifier::default();
    let summary = dispatch_due(&pool, &notifier, today(), 100).await.unwrap();

    assert_eq!(summary, DispatchSummary::default());
    assert!(notifier.attempts().is_empty());
    assert!(!is_sent(&pool, r3).await);
    assert!(!is_sent(&pool, past).await);
}

#[sqlx::test(migrations = "../../migrations")]
async fn missing_or_deleted_contract_is_skipped_and_left_unsent(pool: sqlx::PgPool) {
    let user = Uuid::new_v4();
    let contract = insert_contract(&pool, user, "Cancelled").await;
    let reminder = insert_reminder(&pool, contract, 1, today()).await;
    insert_token(&pool, user, "T1").await;
    sqlx::query("UPDATE contracts SET deleted_at = NOW() WHERE id = $1")
        .bind(contract)
        .execute(&pool)
        .await
        .unwrap();

    let notifier = RecordingNotifier::default();
    let summary = dispatch_due(&pool, &notifier, today(), 100).await.unwrap();

    assert_eq!(summary.skipped, 1);
    assert!(notifier.attempts().is_empty());
    assert!(!is_sent(&pool, reminder).await);
}

#[sqlx::test(migrations = "../../migrations")]
async fn second_run_on_the_same_day_sends_nothing(pool: sqlx::PgPool) {
    let user = Uuid::new_v4();
    let contract = insert_contract(&pool, user, "Netflix").await;
    insert_reminder(&pool, contract, 1, today()).await;
    insert_token(&pool, user, "T1").await;

    let first = RecordingNotifier::default();
    dispatch_due(&pool, &first, today(), 100).await.unwrap();
    assert_eq!(first.attempts().len(), 1);

    let second = RecordingNotifier::default();
    let summary = dispatch_due(&pool, &second, today(), 100).await.unwrap();
    assert!(second.attempts().is_empty());
    assert_eq!(summary.total, 0);
}

#[sqlx::test(migrations = "../../migrations")]
async fn small_pages_still_cover_every_due_reminder(pool: sqlx::PgPool) {
    let user = Uuid::new_v4();
    insert_token(&pool, user, "T1").await;
    let mut ids = Vec::new();
    for (i, days) in [1, 3, 7, 14, 30].into_iter().enumerate() {
        let contract = insert_contract(&pool, user, &format!("contract {i}")).await;
        ids.push(insert_reminder(&pool, contract, days, today()).await);
    }

    let notifier = RecordingNotifier::default();
    let summary = dispatch_due(&pool, &notifier, today(), 2).await.unwrap();

    assert_eq!(summary.total, 5);
    assert_eq!(notifier.attempts().len(), 5);
    for id in ids {
        assert!(is_sent(&pool, id).await);
    }
}

#[sqlx::test(migrations = "../../migrations")]
async fn reminder_claimed_by_another_run_is_not_dispatched(pool: sqlx::PgPool) {
    let user = Uuid::new_v4();
    let contract = insert_contract(&pool, user, "Netflix").await;
    let reminder = insert_reminder(&pool, contract, 1, today()).await;
    insert_token(&pool, user, "T1").await;

    // Another invocation claims the row between our read and our claim.
    let due = dday_db::list_due_reminders(&pool, today(), None, 10).await.unwrap();
    assert_eq!(due.len(), 1);
    assert!(dday_db::mark_reminder_sent(&pool, reminder).await.unwrap());
    assert!(!dday_db::mark_reminder_sent(&pool, reminder).await.unwrap());

    let notifier = RecordingNotifier::default();
    let summary = dispatch_due(&pool, &notifier, today(), 100).await.unwrap();
    assert_eq!(summary.total, 0);
    assert!(notifier.attempts().is_empty());
}

#[sqlx::test(migrations = "../../migrations")]
async fn concurrent_runs_deliver_each_reminder_once(pool: sqlx::PgPool) {
    let user = Uuid::new_v4();
    insert_token(&pool, user, "T1").await;
    for (i, days) in [1, 3, 7, 14, 30].into_iter().enumerate() {
        let contract = insert_contract(&pool, user, &format!("contract {i}")).await;
        insert_reminder(&pool, contract, days, today()).await;
    }

    let first = RecordingNotifier::default();
    let second = RecordingNotifier::default();
    let (a, b) = tokio::join!(
        dispatch_due(&pool, &first, today(), 100),
        dispatch_due(&pool, &second, today(), 100),
    );
    a.unwrap();
    b.unwrap();

    let mut reminder_ids: Vec<String> = first
        .attempts()
        .into_iter()
        .chain(second.attempts())
        .map(|(_, m)| m.data["reminder_id"].clone())
        .collect();
    assert_eq!(reminder_ids.len(), 5);
    reminder_ids.sort();
    reminder_ids.dedup();
    assert_eq!(reminder_ids.len(), 5, "no reminder may be delivered twice");
}

#[sqlx::test(migrations = "../../migrations")]
async fn preview_has_no_side_effects(pool: sqlx::PgPool) {
    let user = Uuid::new_v4();
    let contract = insert_contract(&pool, user, "Netflix").await;
    let reminder = insert_reminder(&pool, contract, 1, today()).await;
    insert_token(&pool, user, "T1").await;
    insert_token(&pool, user, "T2").await;

    let items = preview_due(&pool, today(), 50).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].reminder_id, reminder);
    assert_eq!(items[0].contract_title.as_deref(), Some("Netflix"));
    assert_eq!(items[0].device_count, 2);
    assert!(items[0].body.as_deref().unwrap_or_default().contains("내일"));
    assert!(!is_sent(&pool, reminder).await);
}
