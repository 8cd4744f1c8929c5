use std::env;
use std::str::FromStr;
use crate::errors::{ServiceError, ServiceResult};

pub const ENV_DATABASE_URL: &str = "HOSPITALITY_DATABASE_URL";
pub const ENV_MAX_CONNECTIONS: &str = "HOSPITALITY_DB_MAX_CONNECTIONS";
pub const ENV_RUN_MIGRATIONS: &str = "HOSPITALITY_RUN_MIGRATIONS";
pub const ENV_LOG_LEVEL: &str = "HOSPITALITY_LOG_LEVEL";

const DEFAULT_DATABASE_URL: &str = "sqlite://hospitality.sqlite?mode=rwc";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Runtime configuration for the core library
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub run_migrations: bool,
    pub log_level: log::LevelFilter,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            run_migrations: true,
            log_level: log::LevelFilter::Info,
        }
    }
}

impl CoreConfig {
    /// Load configuration from the process environment, reading a `.env` file first if one exists
    pub fn from_env() -> ServiceResult<Self> {
        // A missing .env is fine; real deployments set the variables directly
        let _ = dotenv::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from any key lookup. `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> ServiceResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let database_url = lookup(ENV_DATABASE_URL)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(defaults.database_url);

        let max_connections = match lookup(ENV_MAX_CONNECTIONS) {
            Some(raw) => parse_value::<u32>(ENV_MAX_CONNECTIONS, &raw)?,
            None => defaults.max_connections,
        };
        if max_connections == 0 {
            return Err(ServiceError::Configuration(format!(
                "{} must be at least 1",
                ENV_MAX_CONNECTIONS
            )));
        }

        let run_migrations = match lookup(ENV_RUN_MIGRATIONS) {
            Some(raw) => parse_flag(ENV_RUN_MIGRATIONS, &raw)?,
            None => defaults.run_migrations,
        };

        let log_level = match lookup(ENV_LOG_LEVEL) {
            Some(raw) => parse_value::<log::LevelFilter>(ENV_LOG_LEVEL, &raw)?,
            None => defaults.log_level,
        };

        Ok(Self {
            database_url,
            max_connections,
            run_migrations,
            log_level,
        })
    }

    /// Private in-memory database; one connection so every query sees the same data
    pub fn in_memory() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            max_connections: 1,
            run_migrations: true,
            log_level: log::LevelFilter::Warn,
        }
    }
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> ServiceResult<T> {
    raw.trim().parse::<T>().map_err(|_| {
        ServiceError::Configuration(format!("Invalid value for {}: {}", key, raw))
    })
}

fn parse_flag(key: &str, raw: &str) -> ServiceResult<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ServiceError::Configuration(format!("Invalid value for {}: {}", key, raw))),
    }
}
