use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

const GOOGLE_FIRESTORE_BASE_URL: &str = "https://firestore.googleapis.com";

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

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let database_url = require("DATABASE_URL")?;
    let firestore_project_id = require("LINKPULSE_FIRESTORE_PROJECT_ID")?;

    let env = parse_environment(&or_default("LINKPULSE_ENV", "development"))?;
    let bind_addr = parse_addr("LINKPULSE_BIND_ADDR", "0.0.0.0:8080")?;
    let log_level = or_default("LINKPULSE_LOG_LEVEL", "info");

    let db_max_connections = parse_u32("LINKPULSE_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("LINKPULSE_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("LINKPULSE_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let firestore_database = or_default("LINKPULSE_FIRESTORE_DATABASE", "(default)");
    let firestore_base_url = resolve_firestore_base_url(
        lookup("LINKPULSE_FIRESTORE_BASE_URL").ok(),
        lookup("FIRESTORE_EMULATOR_HOST").ok(),
    );
    let firestore_token = lookup("LINKPULSE_FIRESTORE_TOKEN")
        .ok()
        .filter(|t| !t.trim().is_empty());
    let firestore_timeout_secs = parse_u64("LINKPULSE_FIRESTORE_TIMEOUT_SECS", "10")?;
    let firestore_max_retries = parse_u32("LINKPULSE_FIRESTORE_MAX_RETRIES", "2")?;
    let firestore_retry_backoff_ms = parse_u64("LINKPULSE_FIRESTORE_RETRY_BACKOFF_MS", "200")?;

    let links_collection = or_default("LINKPULSE_LINKS_COLLECTION", "links");
    let products_collection = or_default("LINKPULSE_PRODUCTS_COLLECTION", "products");

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        firestore_project_id,
        firestore_database,
        firestore_base_url,
        firestore_token,
        firestore_timeout_secs,
        firestore_max_retries,
        firestore_retry_backoff_ms,
        links_collection,
        products_collection,
    })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidEnvVar`] for anything other than
/// `development`, `test`, or `production`.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "LINKPULSE_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

/// An explicit base URL wins; otherwise the emulator host (as exported by the
/// Firebase CLI) is used over plain HTTP; otherwise the Google endpoint.
fn resolve_firestore_base_url(explicit: Option<String>, emulator_host: Option<String>) -> String {
    if let Some(url) = explicit.filter(|u| !u.trim().is_empty()) {
        return url.trim_end_matches('/').to_string();
    }
    if let Some(host) = emulator_host.filter(|h| !h.trim().is_empty()) {
        return format!("http://{}", host.trim());
    }
    GOOGLE_FIRESTORE_BASE_URL.to_string()
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
