//! Cart configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All optional:
//! - `CART_STORAGE_DIR` - Directory for the file-backed store (default: `.cart`)
//! - `CART_CURRENCY` - Display currency: `BRL`, `USD` or `EUR` (default: `BRL`)
//! - `CART_PERSIST_MAX_ATTEMPTS` - Write attempts per cart version (default: 3, min 1)
//! - `CART_PERSIST_BACKOFF_MS` - Delay before the first retry in ms (default: 50)

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::format::MoneyFormat;
use crate::persist::PersistOptions;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Cart engine configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartConfig {
    /// Directory holding the persisted cart
    pub storage_dir: PathBuf,
    /// Display currency conventions
    pub currency: MoneyFormat,
    /// Writer retry settings
    pub persist: PersistOptions,
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from(".cart"),
            currency: MoneyFormat::default(),
            persist: PersistOptions::default(),
        }
    }
}

impl CartConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an invalid value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let storage_dir = lookup("CART_STORAGE_DIR").map_or(defaults.storage_dir, PathBuf::from);

        let currency = match lookup("CART_CURRENCY") {
            Some(code) => MoneyFormat::from_code(&code).ok_or_else(|| {
                ConfigError::InvalidEnvVar(
                    "CART_CURRENCY".to_string(),
                    format!("unsupported currency '{code}' (expected BRL, USD or EUR)"),
                )
            })?,
            None => defaults.currency,
        };

        let max_attempts = parse_or_default(
            &lookup,
            "CART_PERSIST_MAX_ATTEMPTS",
            defaults.persist.max_attempts,
        )?;
        if max_attempts == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "CART_PERSIST_MAX_ATTEMPTS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let backoff_ms = parse_or_default(
            &lookup,
            "CART_PERSIST_BACKOFF_MS",
            u64::try_from(defaults.persist.backoff.as_millis()).unwrap_or(u64::MAX),
        )?;

        Ok(Self {
            storage_dir,
            currency,
            persist: PersistOptions {
                max_attempts,
                backoff: Duration::from_millis(backoff_ms),
            },
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse a variable, falling back to `default` when unset.
fn parse_or_default<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    lookup(key).map_or(Ok(default), |value| {
        value
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}
