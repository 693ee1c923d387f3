use std::time::Duration;

use crate::reader::ReaderConfig;
use crate::shared::AppError;

/// Connection settings for the rooms database
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl DatabaseConfig {
    pub fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let url = lookup("DATABASE_URL")
            .filter(|value| !value.is_empty())
            .ok_or_else(|| AppError::Configuration("DATABASE_URL must be set".to_string()))?;

        let max_connections = lookup("DATABASE_MAX_CONNECTIONS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(5);

        let acquire_timeout_secs = lookup("DATABASE_ACQUIRE_TIMEOUT_SECS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(5);

        Ok(Self {
            url,
            max_connections,
            acquire_timeout: Duration::from_secs(acquire_timeout_secs),
        })
    }
}

/// Process configuration, read once at startup and passed down explicitly
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub reader: ReaderConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        Ok(Self {
            database: DatabaseConfig::from_lookup(&lookup)?,
            reader: ReaderConfig::from_lookup(&lookup)?,
        })
    }
}
