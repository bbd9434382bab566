use std::net::SocketAddr;

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    /// Hours east of UTC that define the calendar day reminders fire on.
    pub utc_offset_hours: i32,
    pub push_request_timeout_secs: u64,
    pub dispatch_page_size: i64,
    /// Six-field cron expression; `None` leaves scheduling to an external caller.
    pub dispatch_cron: Option<String>,
    /// Raw service-account JSON. Parsed per run so a bad value fails the run, not startup.
    pub firebase_service_account: Option<String>,
}

impl AppConfig {
    /// The canonical timezone as a fixed offset.
    #[must_use]
    pub fn canonical_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_hours * 3600).unwrap_or_else(|| Utc.fix())
    }

    /// Calendar date of `now` in the canonical timezone.
    #[must_use]
    pub fn date_at(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.canonical_offset()).date_naive()
    }

    /// Today's date in the canonical timezone.
    #[must_use]
    pub fn today(&self) -> NaiveDate {
        self.date_at(Utc::now())
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("utc_offset_hours", &self.utc_offset_hours)
            .field("push_request_timeout_secs", &self.push_request_timeout_secs)
            .field("dispatch_page_size", &self.dispatch_page_size)
            .field("dispatch_cron", &self.dispatch_cron)
            .field(
                "firebase_service_account",
                &self.firebase_service_account.as_ref().map(|_| "[redacted]"),
            )
            .finish()
    }
}
