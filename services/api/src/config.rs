//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    /// Base URL of the object-storage service (Supabase-compatible REST).
    pub storage_url: String,
    pub storage_service_key: String,
    pub storage_bucket: String,
    /// Base URL of the external analysis worker.
    pub analysis_worker_url: String,
    /// HMAC secret for verifying bearer tokens.
    pub auth_jwt_secret: String,
    /// 32-byte key for the field cipher, supplied as 64 hex characters.
    pub encryption_key: [u8; 32],
    /// Validity window for signed audio URLs.
    pub signed_url_ttl_secs: u32,
    pub cors_origin: String,
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

        // --- Load Server and Database Settings ---
        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load External Service Settings ---
        let storage_url = std::env::var("STORAGE_URL")
            .map_err(|_| ConfigError::MissingVar("STORAGE_URL".to_string()))?;
        let storage_service_key = std::env::var("STORAGE_SERVICE_KEY")
            .map_err(|_| ConfigError::MissingVar("STORAGE_SERVICE_KEY".to_string()))?;
        let storage_bucket = std::env::var("STORAGE_BUCKET")
            .unwrap_or_else(|_| "audio-recordings".to_string());

        let analysis_worker_url = std::env::var("ANALYSIS_WORKER_URL")
            .unwrap_or_else(|_| "http://localhost:8000".to_string());

        // --- Load Secrets ---
        let auth_jwt_secret = std::env::var("AUTH_JWT_SECRET")
            .map_err(|_| ConfigError::MissingVar("AUTH_JWT_SECRET".to_string()))?;

        let encryption_key_hex = std::env::var("ENCRYPTION_KEY")
            .map_err(|_| ConfigError::MissingVar("ENCRYPTION_KEY".to_string()))?;
        let encryption_key = parse_key(&encryption_key_hex)?;

        let signed_url_ttl_secs = match std::env::var("SIGNED_URL_TTL_SECS") {
            Ok(raw) => raw.parse::<u32>().map_err(|e| {
                ConfigError::InvalidValue("SIGNED_URL_TTL_SECS".to_string(), e.to_string())
            })?,
            Err(_) => 3600,
        };

        let cors_origin = std::env::var("CORS_ORIGIN")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            storage_url,
            storage_service_key,
            storage_bucket,
            analysis_worker_url,
            auth_jwt_secret,
            encryption_key,
            signed_url_ttl_secs,
            cors_origin,
        })
    }
}

fn parse_key(raw: &str) -> Result<[u8; 32], ConfigError> {
    let bytes = hex::decode(raw).map_err(|e| {
        ConfigError::InvalidValue("ENCRYPTION_KEY".to_string(), e.to_string())
    })?;
    bytes.try_into().map_err(|_| {
        ConfigError::InvalidValue(
            "ENCRYPTION_KEY".to_string(),
            "expected 64 hex characters (32 bytes)".to_string(),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_must_be_exactly_32_bytes() {
        assert!(parse_key(&"ab".repeat(32)).is_ok());
        assert!(parse_key("abcd").is_err());
        assert!(parse_key("not hex at all").is_err());
    }
}
