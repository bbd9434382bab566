//! `reminders` command handlers.

use dday_core::{plan_reminders, ReminderOffset};
use uuid::Uuid;

/// Rebuilds a contract's reminder rows from its current end date.
///
/// Without explicit `offsets` the contract keeps the offsets it already has;
/// a contract with none gets every supported offset. Reminders whose date has
/// already passed are not recreated.
///
/// # Errors
///
/// Returns an error if the contract does not exist or a query fails.
pub(crate) async fn run_resync(
    pool: &sqlx::PgPool,
    config: &dday_core::AppConfig,
    contract_id: Uuid,
    offsets: Option<&[ReminderOffset]>,
) -> anyhow::Result<()> {
    let contract = dday_db::get_contract(pool, contract_id).await?;

    let offsets = match offsets {
        Some(explicit) => explicit.to_vec(),
        None => {
            let existing = dday_db::list_contract_offsets(pool, contract_id).await?;
            default_offsets(existing)
        }
    };

    let planned = plan_reminders(contract.end_date, &offsets, config.today());
    let inserted = dday_db::replace_contract_reminders(pool, contract_id, &planned).await?;

    tracing::info!(
        %contract_id,
        end_date = %contract.end_date,
        inserted,
        "reminders: resync complete"
    );
    println!(
        "resynced \"{}\": {inserted} reminder(s) scheduled before {}",
        contract.title, contract.end_date
    );
    for plan in &planned {
        println!("  D-{:<2} on {}", plan.offset.days(), plan.scheduled_date);
    }
    Ok(())
}

fn default_offsets(existing: Vec<ReminderOffset>) -> Vec<ReminderOffset> {
    if existing.is_empty() {
        ReminderOffset::ALL.to_vec()
    } else {
        existing
    }
}
