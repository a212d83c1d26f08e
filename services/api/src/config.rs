//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::str::FromStr;
use tracing::Level;
use training_core::paging::PageRequest;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Where aggregates are persisted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    /// Process-local storage. Everything is lost on restart.
    Memory,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" => Ok(StorageBackend::Postgres),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(format!("'{}' is not one of postgres, memory", other)),
        }
    }
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub storage_backend: StorageBackend,
    /// Required when `storage_backend` is `Postgres`.
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub log_level: Level,
    pub cors_origin: String,
    pub default_page_size: u32,
    pub max_page_size: u32,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server and Storage Settings ---
        let bind_address = parse_var("BIND_ADDRESS", "0.0.0.0:3000")?;
        let storage_backend = parse_var("STORAGE_BACKEND", "postgres")?;

        let database_url = std::env::var("DATABASE_URL").ok();
        if storage_backend == StorageBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::MissingVar("DATABASE_URL".to_string()));
        }
        let database_max_connections = parse_var("DATABASE_MAX_CONNECTIONS", "5")?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let cors_origin =
            std::env::var("CORS_ORIGIN").unwrap_or_else(|_| "http://localhost:3000".to_string());

        // --- Load Paging Settings ---
        let default_page_size: u32 = parse_var("DEFAULT_PAGE_SIZE", "20")?;
        let max_page_size: u32 = parse_var("MAX_PAGE_SIZE", "100")?;
        if max_page_size == 0 {
            return Err(ConfigError::InvalidValue(
                "MAX_PAGE_SIZE".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        if default_page_size == 0 || default_page_size > max_page_size {
            return Err(ConfigError::InvalidValue(
                "DEFAULT_PAGE_SIZE".to_string(),
                format!("must be between 1 and {}", max_page_size),
            ));
        }

        Ok(Self {
            bind_address,
            storage_backend,
            database_url,
            database_max_connections,
            log_level,
            cors_origin,
            default_page_size,
            max_page_size,
        })
    }

    /// A configuration for tests: in-memory storage and default paging.
    pub fn test_default() -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 0)),
            storage_backend: StorageBackend::Memory,
            database_url: None,
            database_max_connections: 1,
            log_level: Level::DEBUG,
            cors_origin: "http://localhost:3000".to_string(),
            default_page_size: PageRequest::DEFAULT_LIMIT,
            max_page_size: PageRequest::MAX_LIMIT,
        }
    }
}

fn parse_var<T>(name: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = std::env::var(name).unwrap_or_else(|_| default.to_string());
    raw.parse::<T>()
        .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string()))
}
