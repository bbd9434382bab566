//! `dispatch` command handlers.

use chrono::NaiveDate;
use dday_db::TriggerSource;
use dday_dispatch::PreviewItem;

/// Runs the dispatch job once and prints its tallies.
///
/// # Errors
///
/// Returns an error if the credential is missing or malformed, the token
/// exchange fails, or any database query fails.
pub(crate) async fn run_dispatch(
    pool: &sqlx::PgPool,
    config: &dday_core::AppConfig,
    run_date: NaiveDate,
) -> anyhow::Result<()> {
    let outcome =
        dday_dispatch::dispatch_for_date(pool, config, run_date, TriggerSource::Cli).await?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

/// Prints what a run for `run_date` would send. Nothing is claimed or sent.
///
/// # Errors
///
/// Returns an error if any database query fails.
pub(crate) async fn run_preview(
    pool: &sqlx::PgPool,
    run_date: NaiveDate,
    limit: i64,
) -> anyhow::Result<()> {
    let items = dday_dispatch::preview_due(pool, run_date, limit).await?;
    if items.is_empty() {
        println!("dry-run: nothing due on {run_date}");
        return Ok(());
    }

    println!("dry-run: {} reminder(s) due on {run_date}", items.len());
    for item in &items {
        println!("{}", preview_line(item));
    }
    Ok(())
}

fn preview_line(item: &PreviewItem) -> String {
    match &item.body {
        Some(body) => format!(
            "  {} D-{:<2} devices={} {}",
            item.reminder_id, item.days_before, item.device_count, body
        ),
        None => format!(
            "  {} D-{:<2} skipped: contract {} missing or deleted",
            item.reminder_id, item.days_before, item.contract_id
        ),
    }
}
