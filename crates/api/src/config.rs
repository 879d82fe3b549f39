//! Application configuration loaded from environment variables.

use std::path::PathBuf;

use domain::Language;
use thiserror::Error;

use crate::auth::StaticTokenVerifier;

/// Errors raised while reading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// `PORT` is not a valid port number.
    #[error("Invalid PORT: {0}")]
    InvalidPort(String),

    /// `NOTIFICATION_LANGUAGE` is not a supported language.
    #[error("Invalid NOTIFICATION_LANGUAGE: {0}")]
    InvalidLanguage(String),

    /// An `AUTH_TOKENS` entry could not be parsed.
    #[error("Invalid AUTH_TOKENS entry '{entry}': {reason}")]
    InvalidToken { entry: String, reason: String },
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `DATABASE_URL`: PostgreSQL connection string; in-memory stores when unset
/// - `NOTIFICATION_LANGUAGE`: `ES` or `EN` (default: `ES`)
/// - `AUTH_TOKENS`: `token=user-uuid:ROLE+ROLE;...` accepted bearer tokens
/// - `SEED_FILE`: JSON file with users and products loaded at start-up
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub database_url: Option<String>,
    pub notification_language: Language,
    pub auth_tokens: StaticTokenVerifier,
    pub seed_file: Option<PathBuf>,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary variable source.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let port = match var("PORT") {
            Some(p) => p.parse().map_err(|_| ConfigError::InvalidPort(p))?,
            None => defaults.port,
        };

        let notification_language = match var("NOTIFICATION_LANGUAGE") {
            Some(lang) => lang.parse().map_err(|_| ConfigError::InvalidLanguage(lang))?,
            None => defaults.notification_language,
        };

        let auth_tokens = match var("AUTH_TOKENS") {
            Some(table) => StaticTokenVerifier::parse(&table)?,
            None => defaults.auth_tokens,
        };

        Ok(Self {
            host: var("HOST").unwrap_or(defaults.host),
            port,
            log_level: var("RUST_LOG").unwrap_or(defaults.log_level),
            database_url: var("DATABASE_URL").filter(|url| !url.is_empty()),
            notification_language,
            auth_tokens,
            seed_file: var("SEED_FILE").map(PathBuf::from),
        })
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            database_url: None,
            notification_language: Language::Spanish,
            auth_tokens: StaticTokenVerifier::default(),
            seed_file: None,
        }
    }
}
