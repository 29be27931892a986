use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use surat_core::retry::{RetryPolicy, DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS};
use surat_workflow::WorkflowConfig;

use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// Everything except `DATABASE_URL` and `JWT_SECRET` has a default suitable
/// for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long background tasks get to stop after the server drains.
    pub shutdown_timeout_secs: u64,
    pub database_url: String,
    pub jwt: JwtConfig,
    pub storage: StorageConfig,
    pub retry: RetryPolicy,
    /// Lifetime of signed report URLs in seconds (default: `3600`).
    pub signed_url_ttl_secs: u64,
    pub reminders: ReminderConfig,
}

/// Local object store settings.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Directory blobs are written under.
    pub root: PathBuf,
    /// Base URL the `/files` route is reachable at.
    pub public_url: String,
    pub signing_secret: String,
}

/// Deadline reminder sweep settings.
#[derive(Debug, Clone, Copy)]
pub struct ReminderConfig {
    /// Remind when the deadline is at most this many days away.
    pub horizon_days: i64,
    pub interval: Duration,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                        | Default                        |
    /// |--------------------------------|--------------------------------|
    /// | `HOST`                         | `0.0.0.0`                      |
    /// | `PORT`                         | `3000`                         |
    /// | `CORS_ORIGINS`                 | `http://localhost:5173`        |
    /// | `REQUEST_TIMEOUT_SECS`         | `30`                           |
    /// | `SHUTDOWN_TIMEOUT_SECS`        | `30`                           |
    /// | `DATABASE_URL`                 | required                       |
    /// | `STORAGE_ROOT`                 | `./storage`                    |
    /// | `STORAGE_PUBLIC_URL`           | `http://localhost:3000/files`  |
    /// | `STORAGE_SIGNING_SECRET`       | value of `JWT_SECRET`          |
    /// | `SIGNED_URL_TTL_SECS`          | `3600`                         |
    /// | `RETRY_MAX_ATTEMPTS`           | `3`                            |
    /// | `RETRY_BASE_DELAY_MS`          | `200`                          |
    /// | `DEADLINE_REMINDER_DAYS`       | `1`                            |
    /// | `DEADLINE_SWEEP_INTERVAL_SECS` | `3600`                         |
    ///
    /// JWT settings are read by [`JwtConfig::from_env`].
    ///
    /// # Panics
    ///
    /// Panics on a missing required variable or an unparseable value.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port = env_or("PORT", 3000u16);

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let jwt = JwtConfig::from_env();

        let storage = StorageConfig {
            root: std::env::var("STORAGE_ROOT")
                .unwrap_or_else(|_| "./storage".into())
                .into(),
            public_url: std::env::var("STORAGE_PUBLIC_URL")
                .unwrap_or_else(|_| "http://localhost:3000/files".into()),
            signing_secret: std::env::var("STORAGE_SIGNING_SECRET")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| jwt.secret.clone()),
        };

        let retry = RetryPolicy::new(
            env_or("RETRY_MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS),
            Duration::from_millis(env_or(
                "RETRY_BASE_DELAY_MS",
                DEFAULT_BASE_DELAY.as_millis() as u64,
            )),
        );

        let reminders = ReminderConfig {
            horizon_days: env_or("DEADLINE_REMINDER_DAYS", 1i64),
            interval: Duration::from_secs(env_or("DEADLINE_SWEEP_INTERVAL_SECS", 3600u64)),
        };

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs: env_or("REQUEST_TIMEOUT_SECS", 30u64),
            shutdown_timeout_secs: env_or("SHUTDOWN_TIMEOUT_SECS", 30u64),
            database_url,
            jwt,
            storage,
            retry,
            signed_url_ttl_secs: env_or("SIGNED_URL_TTL_SECS", 3600u64),
            reminders,
        }
    }

    /// Settings handed to the workflow services.
    pub fn workflow(&self) -> WorkflowConfig {
        WorkflowConfig {
            retry: self.retry,
            signed_url_ttl: Duration::from_secs(self.signed_url_ttl_secs),
        }
    }
}

/// Parse `key` from the environment, falling back to `default` when unset.
fn env_or<T>(key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .unwrap_or_else(|e| panic!("{key} has an invalid value '{raw}': {e}")),
        Err(_) => default,
    }
}
