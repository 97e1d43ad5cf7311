//! Configuration module for the grant backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Error raised when an environment variable holds an unusable value.
#[derive(Debug, thiserror::Error)]
#[error("invalid value for {key}: {value:?}")]
pub struct ConfigError {
    pub key: &'static str,
    pub value: String,
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Insert example tags and grants when the store is empty
    pub seed_data: bool,
    /// SQLite connection pool size
    pub max_connections: u32,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let db_path = env::var("GRANTS_DB_PATH")
            .unwrap_or_else(|_| "./data/grants.sqlite".to_string())
            .into();

        let bind_addr = parse_var("GRANTS_BIND_ADDR", "127.0.0.1:5000")?;
        let log_level = env::var("GRANTS_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let seed_data = parse_bool("GRANTS_SEED", true)?;
        let max_connections = parse_var("GRANTS_MAX_CONNECTIONS", "5")?;

        Ok(Self {
            db_path,
            bind_addr,
            log_level,
            seed_data,
            max_connections,
        })
    }
}

fn parse_var<T: std::str::FromStr>(key: &'static str, default: &str) -> Result<T, ConfigError> {
    let value = env::var(key).unwrap_or_else(|_| default.to_string());
    value.parse().map_err(|_| ConfigError { key, value })
}

fn parse_bool(key: &'static str, default: bool) -> Result<bool, ConfigError> {
    match env::var(key) {
        Err(_) => Ok(default),
        Ok(value) => match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError { key, value }),
        },
    }
}
