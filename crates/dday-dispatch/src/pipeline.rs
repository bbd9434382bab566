use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use futures::future::join_all;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use dday_db::{ContractRow, DueReminderRow};

use crate::notifier::{build_push_message, Notifier};
use crate::DispatchError;

/// Tallies for one pass over the due reminders.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchSummary {
    /// Due, unsent reminders seen by this run.
    pub total: u32,
    /// Push messages accepted by the provider.
    pub sent: u32,
    /// Push messages that failed or timed out.
    pub failed: u32,
    /// Reminders whose contract is missing or soft-deleted; left unsent.
    pub skipped: u32,
    /// Reminders marked sent whose owner has no registered device.
    pub without_device: u32,
    /// Reminders another invocation claimed first.
    pub claimed_elsewhere: u32,
}

/// One due reminder as the dispatcher would handle it, without side effects.
#[derive(Debug, Clone, Serialize)]
pub struct PreviewItem {
    pub reminder_id: Uuid,
    pub contract_id: Uuid,
    pub contract_title: Option<String>,
    pub days_before: i32,
    pub body: Option<String>,
    pub device_count: usize,
}

/// Processes every unsent reminder scheduled for `today`.
///
/// Each reminder is claimed (marked sent) before anything is sent, so an
/// overlapping invocation can never deliver it twice. Delivery failures are
/// counted, never retried, and never stop the run. Database errors abort the
/// run; reminders claimed before the error stay sent.
///
/// # Errors
///
/// Returns [`DispatchError::Db`] if any query fails.
pub async fn dispatch_due<N: Notifier>(
    pool: &PgPool,
    notifier: &N,
    today: NaiveDate,
    page_size: i64,
) -> Result<DispatchSummary, DispatchError> {
    let mut summary = DispatchSummary::default();
    let mut recipients: HashMap<Uuid, Vec<String>> = HashMap::new();
    let mut cursor = None;

    loop {
        let page = dday_db::list_due_reminders(pool, today, cursor, page_size).await?;
        let Some(last) = page.last() else {
            break;
        };
        cursor = Some(last.id);

        let contracts = resolve_contracts(pool, &page).await?;
        for reminder in &page {
            summary.total += 1;
            let Some(contract) = contracts.get(&reminder.contract_id) else {
                tracing::warn!(
                    reminder_id = %reminder.id,
                    contract_id = %reminder.contract_id,
                    "dispatch: contract missing or deleted; skipping reminder"
                );
                summary.skipped += 1;
                continue;
            };

            if !dday_db::mark_reminder_sent(pool, reminder.id).await? {
                tracing::debug!(reminder_id = %reminder.id, "dispatch: already claimed");
                summary.claimed_elsewhere += 1;
                continue;
            }

            if !recipients.contains_key(&contract.user_id) {
                let tokens = dday_db::list_push_tokens_for_user(pool, contract.user_id).await?;
                recipients.insert(contract.user_id, tokens);
            }
            let tokens = recipients
                .get(&contract.user_id)
                .map_or(&[][..], Vec::as_slice);

            deliver(notifier, reminder, contract, tokens, &mut summary).await;
        }

        if usize::try_from(page_size).is_ok_and(|size| page.len() < size) {
            break;
        }
    }

    tracing::info!(
        %today,
        total = summary.total,
        sent = summary.sent,
        failed = summary.failed,
        skipped = summary.skipped,
        without_device = summary.without_device,
        "dispatch: pass complete"
    );
    Ok(summary)
}

/// Sends one reminder to all of its owner's devices concurrently.
async fn deliver<N: Notifier>(
    notifier: &N,
    reminder: &DueReminderRow,
    contract: &ContractRow,
    tokens: &[String],
    summary: &mut DispatchSummary,
) {
    if tokens.is_empty() {
        tracing::info!(
            reminder_id = %reminder.id,
            user_id = %contract.user_id,
            "dispatch: no registered devices; marked sent without delivery"
        );
        summary.without_device += 1;
        return;
    }

    let message = build_push_message(reminder, contract);
    let results = join_all(tokens.iter().map(|token| notifier.notify(token, &message))).await;

    for (token, result) in tokens.iter().zip(results) {
        match result {
            Ok(()) => summary.sent += 1,
            Err(e) => {
                summary.failed += 1;
                tracing::warn!(
                    reminder_id = %reminder.id,
                    token = %token_suffix(token),
                    error = %e,
                    "dispatch: push delivery failed"
                );
            }
        }
    }
}

/// Lists what a run for `today` would send, without claiming or sending.
///
/// # Errors
///
/// Returns [`DispatchError::Db`] if any query fails.
pub async fn preview_due(
    pool: &PgPool,
    today: NaiveDate,
    limit: i64,
) -> Result<Vec<PreviewItem>, DispatchError> {
    let due = dday_db::list_due_reminders(pool, today, None, limit).await?;
    let contracts = resolve_contracts(pool, &due).await?;
    let mut device_counts: HashMap<Uuid, usize> = HashMap::new();

    let mut items = Vec::with_capacity(due.len());
    for reminder in &due {
        let contract = contracts.get(&reminder.contract_id);
        let device_count = match contract {
            Some(c) => {
                if !device_counts.contains_key(&c.user_id) {
                    let tokens = dday_db::list_push_tokens_for_user(pool, c.user_id).await?;
                    device_counts.insert(c.user_id, tokens.len());
                }
                device_counts.get(&c.user_id).copied().unwrap_or_default()
            }
            None => 0,
        };

        items.push(PreviewItem {
            reminder_id: reminder.id,
            contract_id: reminder.contract_id,
            contract_title: contract.map(|c| c.title.clone()),
            days_before: reminder.days_before,
            body: contract.map(|c| build_push_message(reminder, c).body),
            device_count,
        });
    }
    Ok(items)
}

async fn resolve_contracts(
    pool: &PgPool,
    reminders: &[DueReminderRow],
) -> Result<HashMap<Uuid, ContractRow>, DispatchError> {
    let ids: Vec<Uuid> = reminders
        .iter()
        .map(|r| r.contract_id)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();

    let rows = dday_db::get_contracts_by_ids(pool, &ids).await?;
    Ok(rows.into_iter().map(|c| (c.id, c)).collect())
}

/// Last few characters of a device token, enough to correlate logs.
fn token_suffix(token: &str) -> String {
    let count = token.chars().count();
    let tail: String = token.chars().skip(count.saturating_sub(6)).collect();
    format!("…{tail}")
}
