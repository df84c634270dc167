//! Process configuration, read once from the environment at startup and
//! handed to the router state.

use std::{fmt::Display, str::FromStr};

use crate::db::DbConfig;

/// Secret used when `SESSION_SECRET` is not set. Production refuses it.
pub const DEFAULT_SESSION_SECRET: &str = "AwEsOmE";

/// Admin address used when `ADMIN_EMAIL` is not set.
pub const DEFAULT_ADMIN_EMAIL: &str = "admin@example.com";

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: String,
    pub host: String,
    pub port: u16,
    pub session_secret: String,
    pub admin_email: String,
    pub log_level: Option<String>,
    pub log_dir: String,
    /// `None` runs the service against the in-memory store.
    pub database: Option<DbConfig>,
}

impl Config {
    pub fn from_env() -> Self {
        let database = std::env::var("DATABASE_URL").ok().map(|url| DbConfig {
            url,
            max_connections: parse_or("DB_POOL_MAX", 10),
            min_connections: parse_or("DB_POOL_MIN", 2),
            connect_timeout_secs: parse_or("DB_CONNECT_TIMEOUT", 10),
            idle_timeout_secs: parse_or("DB_IDLE_TIMEOUT", 300),
        });

        Self {
            environment: var_or("ENVIRONMENT", "development"),
            host: var_or("HOST", "127.0.0.1"),
            port: parse_or("PORT", 9000),
            session_secret: var_or("SESSION_SECRET", DEFAULT_SESSION_SECRET),
            admin_email: var_or("ADMIN_EMAIL", DEFAULT_ADMIN_EMAIL),
            log_level: std::env::var("LOG_LEVEL").ok(),
            log_dir: var_or("LOG_DIR", "logs"),
            database,
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Refuses insecure settings in production. Warnings are logged for
    /// settings that are only suspicious.
    pub fn validate(&self) -> Result<(), String> {
        if !self.is_production() {
            return Ok(());
        }

        if self.session_secret.is_empty() || self.session_secret == DEFAULT_SESSION_SECRET {
            return Err(
                "SESSION_SECRET must be set to a secure, unique value in production".to_string(),
            );
        }

        if self.admin_email.is_empty() || self.admin_email == DEFAULT_ADMIN_EMAIL {
            tracing::warn!(
                "SECURITY: ADMIN_EMAIL is using an insecure default. \
                 Set ADMIN_EMAIL to a real address before registering."
            );
        }

        if self.database.is_none() {
            tracing::warn!("DATABASE_URL not set in production; data will not survive a restart");
        }

        Ok(())
    }

    /// Whether `email` is the designated administrator address.
    pub fn is_admin_email(&self, email: &str) -> bool {
        !self.admin_email.is_empty() && self.admin_email.eq_ignore_ascii_case(email.trim())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            host: "127.0.0.1".to_string(),
            port: 9000,
            session_secret: DEFAULT_SESSION_SECRET.to_string(),
            admin_email: DEFAULT_ADMIN_EMAIL.to_string(),
            log_level: None,
            log_dir: "logs".to_string(),
            database: None,
        }
    }
}

fn var_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| {
        tracing::debug!("{key} not set, using default: {default}");
        default.to_string()
    })
}

fn parse_or<T>(key: &str, default: T) -> T
where
    T: FromStr + Display + Copy,
    T::Err: Display,
{
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|e| {
            tracing::warn!("Invalid {key} value {raw:?}: {e}; using default {default}");
            default
        }),
        Err(_) => default,
    }
}
