mod dispatch;
mod reminders;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use dday_core::ReminderOffset;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "dday-cli")]
#[command(about = "Operator tooling for contract expiry reminders")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Send today's due reminders
    Dispatch {
        /// Run for this date (YYYY-MM-DD) instead of today
        #[arg(long)]
        date: Option<NaiveDate>,
        /// List what would be sent without claiming or sending anything
        #[arg(long)]
        dry_run: bool,
        /// Maximum number of reminders to list in a dry run
        #[arg(long, default_value = "50")]
        limit: i64,
    },
    /// Manage stored reminder rows
    Reminders {
        #[command(subcommand)]
        command: RemindersCommands,
    },
}

#[derive(Debug, Subcommand)]
enum RemindersCommands {
    /// Rebuild a contract's reminders from its current end date
    Resync {
        contract_id: Uuid,
        /// Comma-separated day offsets (1, 3, 7, 14, 30); defaults to the existing set
        #[arg(long, value_delimiter = ',')]
        offsets: Option<Vec<ReminderOffset>>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("dday-cli: run with --help to list commands");
        return Ok(());
    };

    let config = dday_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = dday_db::PoolConfig::from_app_config(&config);
    let pool = dday_db::connect_pool(&config.database_url, pool_config).await?;

    match command {
        Commands::Migrate => {
            dday_db::run_migrations(&pool).await?;
            println!("migrations applied");
        }
        Commands::Dispatch {
            date,
            dry_run,
            limit,
        } => {
            let run_date = date.unwrap_or_else(|| config.today());
            if dry_run {
                dispatch::run_preview(&pool, run_date, limit).await?;
            } else {
                dispatch::run_dispatch(&pool, &config, run_date).await?;
            }
        }
        Commands::Reminders {
            command:
                RemindersCommands::Resync {
                    contract_id,
                    offsets,
                },
        } => {
            reminders::run_resync(&pool, &config, contract_id, offsets.as_deref()).await?;
        }
    }

    Ok(())
}
