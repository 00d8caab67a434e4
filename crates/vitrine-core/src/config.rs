//! Configuration module
//!
//! This module provides the runtime configuration for the ingestion service:
//! HTTP server settings, storage paths, upload contract limits, and the
//! admin credential set. Values come from the environment with documented
//! defaults; `validate` runs at startup and rejects unusable combinations.

use std::env;

use crate::constants;

// Common defaults
const DEFAULT_SERVER_PORT: u16 = 4000;
const DEFAULT_STORAGE_ROOT: &str = "./data/media";
const DEFAULT_TEMP_DIR: &str = "./data/tmp";
const RATE_LIMIT_MAX_CLIENTS: usize = 10_000;
const MIN_ADMIN_KEY_LEN: usize = 16;

/// Application configuration (ingestion service).
#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub environment: String,
    /// Accepted super-admin bearer keys.
    pub admin_api_keys: Vec<String>,
    /// Root directory for persisted renditions.
    pub storage_root: String,
    /// Directory for per-request temp artifacts.
    pub temp_dir: String,
    pub max_file_size_bytes: usize,
    pub max_batch_size_bytes: usize,
    pub max_files_per_request: usize,
    pub allowed_extensions: Vec<String>,
    pub allowed_content_types: Vec<String>,
    pub upload_rate_limit_per_minute: u32,
    pub rate_limit_window_secs: u64,
    /// Upper bound on tracked rate-limit buckets before eviction.
    pub rate_limit_max_clients: usize,
}

impl Config {
    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());
        let cors_origins: Vec<String> = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .collect();

        let admin_api_keys: Vec<String> = env::var("ADMIN_API_KEYS")
            .map_err(|_| anyhow::anyhow!("ADMIN_API_KEYS must be set for authentication"))?
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let max_file_size_bytes = env::var("MAX_FILE_SIZE_MB")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .map(|mb| mb * 1024 * 1024)
            .unwrap_or(constants::MAX_FILE_SIZE_BYTES);

        let max_batch_size_bytes = env::var("MAX_BATCH_SIZE_MB")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .map(|mb| mb * 1024 * 1024)
            .unwrap_or(constants::MAX_BATCH_SIZE_BYTES);

        let allowed_extensions = env::var("ALLOWED_EXTENSIONS")
            .unwrap_or_else(|_| constants::ALLOWED_EXTENSIONS.join(","))
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        let allowed_content_types = env::var("ALLOWED_CONTENT_TYPES")
            .unwrap_or_else(|_| constants::ALLOWED_CONTENT_TYPES.join(","))
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        let config = Config {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| DEFAULT_SERVER_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            cors_origins,
            environment,
            admin_api_keys,
            storage_root: env::var("LOCAL_STORAGE_PATH")
                .unwrap_or_else(|_| DEFAULT_STORAGE_ROOT.to_string()),
            temp_dir: env::var("TEMP_DIR").unwrap_or_else(|_| DEFAULT_TEMP_DIR.to_string()),
            max_file_size_bytes,
            max_batch_size_bytes,
            max_files_per_request: env::var("MAX_FILES_PER_REQUEST")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(constants::MAX_FILES_PER_REQUEST),
            allowed_extensions,
            allowed_content_types,
            upload_rate_limit_per_minute: env::var("UPLOAD_RATE_LIMIT_PER_MINUTE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(constants::UPLOAD_RATE_LIMIT_PER_MINUTE),
            rate_limit_window_secs: constants::RATE_LIMIT_WINDOW_SECS,
            rate_limit_max_clients: env::var("RATE_LIMIT_MAX_CLIENTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(RATE_LIMIT_MAX_CLIENTS),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.is_production() && self.cors_origins.iter().any(|o| o == "*") {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        if self.admin_api_keys.is_empty() {
            return Err(anyhow::anyhow!(
                "ADMIN_API_KEYS must contain at least one key"
            ));
        }

        if self
            .admin_api_keys
            .iter()
            .any(|k| k.len() < MIN_ADMIN_KEY_LEN)
        {
            return Err(anyhow::anyhow!(
                "Each admin API key must be at least {} characters long",
                MIN_ADMIN_KEY_LEN
            ));
        }

        if self.storage_root.trim().is_empty() {
            return Err(anyhow::anyhow!("LOCAL_STORAGE_PATH cannot be empty"));
        }

        if self.temp_dir.trim().is_empty() {
            return Err(anyhow::anyhow!("TEMP_DIR cannot be empty"));
        }

        if self.max_files_per_request == 0 {
            return Err(anyhow::anyhow!("MAX_FILES_PER_REQUEST must be at least 1"));
        }

        if self.max_file_size_bytes > self.max_batch_size_bytes {
            return Err(anyhow::anyhow!(
                "MAX_FILE_SIZE_MB cannot exceed MAX_BATCH_SIZE_MB"
            ));
        }

        if self.allowed_extensions.is_empty() || self.allowed_content_types.is_empty() {
            return Err(anyhow::anyhow!(
                "ALLOWED_EXTENSIONS and ALLOWED_CONTENT_TYPES cannot be empty"
            ));
        }

        Ok(())
    }
}
