pub mod app_config;
pub mod config;
pub mod reminders;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use reminders::{
    plan_reminders, reminder_notice, InvalidOffset, ParseOffsetError, PlannedReminder,
    ReminderNotice, ReminderOffset,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
