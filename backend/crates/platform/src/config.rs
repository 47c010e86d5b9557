//! Environment Configuration
//!
//! Loads hashing and CORS settings from environment variables. Unset or blank
//! variables leave the corresponding option unset, so the module defaults
//! apply.

use std::time::Duration;

use thiserror::Error;

use crate::cors::CorsOptions;
use crate::password::{DEFAULT_COST, PasswordHashError, PasswordHasher, validate_cost};

/// bcrypt work factor, integer in `[4, 31]`
pub const PASSWORD_BCRYPT_COST: &str = "PASSWORD_BCRYPT_COST";
/// Comma-separated allowed origins
pub const CORS_ALLOW_ORIGINS: &str = "CORS_ALLOW_ORIGINS";
/// Comma-separated allowed methods
pub const CORS_ALLOW_METHODS: &str = "CORS_ALLOW_METHODS";
/// Comma-separated allowed request headers
pub const CORS_ALLOW_HEADERS: &str = "CORS_ALLOW_HEADERS";
/// Comma-separated exposed response headers
pub const CORS_EXPOSE_HEADERS: &str = "CORS_EXPOSE_HEADERS";
/// `true` / `false`
pub const CORS_ALLOW_CREDENTIALS: &str = "CORS_ALLOW_CREDENTIALS";
/// Preflight cache lifetime in seconds
pub const CORS_MAX_AGE_SECS: &str = "CORS_MAX_AGE_SECS";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?} ({reason})")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    fn invalid(key: &'static str, value: &str, reason: impl ToString) -> Self {
        ConfigError::InvalidValue {
            key,
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Password hashing configuration
///
/// The cost is validated on construction, so a `PasswordConfig` always yields
/// a working hasher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordConfig {
    cost: u32,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            cost: DEFAULT_COST as u32,
        }
    }
}

impl PasswordConfig {
    /// Config with a bcrypt work factor in `[4, 31]`
    pub fn new(cost: i32) -> Result<Self, PasswordHashError> {
        Ok(Self {
            cost: validate_cost(cost)?,
        })
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// bcrypt hasher using the configured cost
    pub fn hasher(&self) -> PasswordHasher {
        PasswordHasher::default().with_validated_cost(self.cost)
    }
}

/// Everything this crate reads from the environment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlatformConfig {
    pub password: PasswordConfig,
    pub cors: CorsOptions,
}

impl PlatformConfig {
    /// Load from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();

        if let Some(raw) = read(PASSWORD_BCRYPT_COST) {
            let cost = raw
                .trim()
                .parse::<i32>()
                .map_err(|e| ConfigError::invalid(PASSWORD_BCRYPT_COST, &raw, e))?;
            config.password = PasswordConfig::new(cost)
                .map_err(|e| ConfigError::invalid(PASSWORD_BCRYPT_COST, &raw, e))?;
        }

        if let Some(raw) = read(CORS_ALLOW_ORIGINS) {
            config.cors.allow_origins = split_list(&raw);
        }
        if let Some(raw) = read(CORS_ALLOW_METHODS) {
            config.cors.allow_methods = split_list(&raw);
        }
        if let Some(raw) = read(CORS_ALLOW_HEADERS) {
            config.cors.allow_headers = split_list(&raw);
        }
        if let Some(raw) = read(CORS_EXPOSE_HEADERS) {
            config.cors.expose_headers = split_list(&raw);
        }

        if let Some(raw) = read(CORS_ALLOW_CREDENTIALS) {
            config.cors.allow_credentials = Some(parse_bool(CORS_ALLOW_CREDENTIALS, &raw)?);
        }

        if let Some(raw) = read(CORS_MAX_AGE_SECS) {
            let secs = raw
                .trim()
                .parse::<u64>()
                .map_err(|e| ConfigError::invalid(CORS_MAX_AGE_SECS, &raw, e))?;
            config.cors.max_age = Some(Duration::from_secs(secs));
        }

        Ok(config)
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_bool(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::invalid(key, raw, "expected true or false")),
    }
}
