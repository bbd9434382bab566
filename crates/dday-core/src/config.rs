use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from variables already in the process
/// environment, without reading `.env`.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Kept separate from the process environment so tests can drive it with a
/// plain `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let database_url = require("DATABASE_URL")?;
    let env = parse_environment(&lookup("DDAY_ENV").unwrap_or_else(|_| "development".into()))?;

    let bind_addr: SocketAddr = parse_var(&lookup, "DDAY_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = lookup("DDAY_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

    let db_max_connections = parse_var(&lookup, "DDAY_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_var(&lookup, "DDAY_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_var(&lookup, "DDAY_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let utc_offset_hours: i32 = parse_var(&lookup, "DDAY_UTC_OFFSET_HOURS", "9")?;
    if !(-12..=14).contains(&utc_offset_hours) {
        return Err(ConfigError::InvalidEnvVar {
            var: "DDAY_UTC_OFFSET_HOURS".to_string(),
            reason: format!("{utc_offset_hours} is outside -12..=14"),
        });
    }

    let push_request_timeout_secs = parse_var(&lookup, "DDAY_PUSH_REQUEST_TIMEOUT_SECS", "10")?;

    let dispatch_page_size: i64 = parse_var(&lookup, "DDAY_DISPATCH_PAGE_SIZE", "500")?;
    if dispatch_page_size < 1 {
        return Err(ConfigError::InvalidEnvVar {
            var: "DDAY_DISPATCH_PAGE_SIZE".to_string(),
            reason: "page size must be at least 1".to_string(),
        });
    }

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        utc_offset_hours,
        push_request_timeout_secs,
        dispatch_page_size,
        dispatch_cron: optional("DDAY_DISPATCH_CRON"),
        firebase_service_account: optional("FIREBASE_SERVICE_ACCOUNT"),
    })
}

/// Read `var` (or `default` when unset) and parse it into `T`.
fn parse_var<F, T>(lookup: &F, var: &str, default: &str) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw = lookup(var).unwrap_or_else(|_| default.to_string());
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "DDAY_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
