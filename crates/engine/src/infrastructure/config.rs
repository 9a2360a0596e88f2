//! Engine configuration

use std::env;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::infrastructure::retry::RetryConfig;

/// Default SQLite URL for the element store.
pub const DEFAULT_DATABASE_URL: &str = "sqlite:mixit.db?mode=rwc";

/// Default OpenAI-compatible base URL.
pub const DEFAULT_ORACLE_BASE_URL: &str = "https://api.openai.com";

/// Default chat model.
pub const DEFAULT_ORACLE_MODEL: &str = "gpt-4o";

/// Engine configuration loaded from environment
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// SQLite connection URL for elements, combinations and inventories
    pub database_url: String,
    /// Generative oracle configuration
    pub oracle: OracleConfig,
    /// Retry policy for oracle calls
    pub retry: RetryConfig,
    /// Limits applied to oracle answers before they are persisted
    pub validation: ValidationLimits,
}

/// Oracle client configuration
#[derive(Debug, Clone)]
pub struct OracleConfig {
    /// OpenAI-compatible API base URL (without `/v1`)
    pub base_url: String,
    /// Bearer token, if the endpoint needs one
    pub api_key: Option<String>,
    /// Chat model name
    pub model: String,
    /// Upper bound for a single oracle call
    pub timeout: Duration,
}

/// Validation limits for oracle answers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationLimits {
    pub max_name_length: usize,
    pub max_icon_length: usize,
}

impl Default for ValidationLimits {
    fn default() -> Self {
        Self {
            max_name_length: 48,
            max_icon_length: 16,
        }
    }
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_ORACLE_BASE_URL.to_string(),
            api_key: None,
            model: DEFAULT_ORACLE_MODEL.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            oracle: OracleConfig::default(),
            retry: RetryConfig::default(),
            validation: ValidationLimits::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables, after reading
    /// `.env.local` and `.env` from the current directory if present.
    pub fn from_env() -> Result<Self> {
        load_dotenv(Path::new("."));
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    pub fn from_vars<F>(var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let timeout_secs: u64 = parse_or(&var, "MIXIT_ORACLE_TIMEOUT_SECS", 30)?;

        Ok(Self {
            database_url: var("MIXIT_DATABASE_URL").unwrap_or(defaults.database_url),
            oracle: OracleConfig {
                base_url: var("MIXIT_ORACLE_BASE_URL").unwrap_or(defaults.oracle.base_url),
                api_key: var("MIXIT_ORACLE_API_KEY").filter(|k| !k.trim().is_empty()),
                model: var("MIXIT_ORACLE_MODEL").unwrap_or(defaults.oracle.model),
                timeout: Duration::from_secs(timeout_secs),
            },
            retry: RetryConfig {
                max_retries: parse_or(
                    &var,
                    "MIXIT_ORACLE_MAX_RETRIES",
                    defaults.retry.max_retries,
                )?,
                base_delay_ms: parse_or(
                    &var,
                    "MIXIT_ORACLE_BASE_DELAY_MS",
                    defaults.retry.base_delay_ms,
                )?,
                max_delay_ms: parse_or(
                    &var,
                    "MIXIT_ORACLE_MAX_DELAY_MS",
                    defaults.retry.max_delay_ms,
                )?,
                jitter_factor: defaults.retry.jitter_factor,
            },
            validation: ValidationLimits {
                max_name_length: parse_or(
                    &var,
                    "MIXIT_MAX_NAME_LENGTH",
                    defaults.validation.max_name_length,
                )?,
                max_icon_length: parse_or(
                    &var,
                    "MIXIT_MAX_ICON_LENGTH",
                    defaults.validation.max_icon_length,
                )?,
            },
        })
    }
}

fn parse_or<F, T>(var: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} must be a valid number, got {raw:?}")),
        None => Ok(default),
    }
}

/// Load `.env.local` then `.env` from `dir`. Values already set win.
pub fn load_dotenv(dir: &Path) {
    // Prefer local overrides.
    for filename in [".env.local", ".env"] {
        let path = dir.join(filename);
        if path.exists() {
            let _ = dotenvy::from_path(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = EngineConfig::from_vars(vars(&[])).unwrap();
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.oracle.model, DEFAULT_ORACLE_MODEL);
        assert_eq!(config.oracle.timeout, Duration::from_secs(30));
        assert!(config.oracle.api_key.is_none());
        assert_eq!(config.retry.max_retries, 2);
        assert_eq!(config.validation, ValidationLimits::default());
    }

    #[test]
    fn overrides_are_parsed() {
        let config = EngineConfig::from_vars(vars(&[
            ("MIXIT_DATABASE_URL", "sqlite::memory:"),
            ("MIXIT_ORACLE_API_KEY", "sk-test"),
            ("MIXIT_ORACLE_TIMEOUT_SECS", "5"),
            ("MIXIT_ORACLE_MAX_RETRIES", "4"),
            ("MIXIT_MAX_NAME_LENGTH", " 20 "),
        ]))
        .unwrap();
        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.oracle.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.oracle.timeout, Duration::from_secs(5));
        assert_eq!(config.retry.max_retries, 4);
        assert_eq!(config.validation.max_name_length, 20);
    }

    #[test]
    fn blank_api_key_is_ignored() {
        let config = EngineConfig::from_vars(vars(&[("MIXIT_ORACLE_API_KEY", "  ")])).unwrap();
        assert!(config.oracle.api_key.is_none());
    }

    #[test]
    fn invalid_number_is_an_error() {
        let err = EngineConfig::from_vars(vars(&[("MIXIT_ORACLE_TIMEOUT_SECS", "soon")]))
            .unwrap_err();
        assert!(err.to_string().contains("MIXIT_ORACLE_TIMEOUT_SECS"));
    }

    #[test]
    fn dotenv_file_fills_missing_vars() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(".env"),
            "MIXIT_DOTENV_PROBE_VALUE=from-file\n",
        )
        .unwrap();
        load_dotenv(dir.path());
        assert_eq!(
            env::var("MIXIT_DOTENV_PROBE_VALUE").ok().as_deref(),
            Some("from-file")
        );
    }
}
