//! Configuration management for the intent settlement service
//!
//! Loads configuration from TOML files with environment variable substitution.

use crate::error::{ServiceError, ServiceResult};
use crate::matching::DEFAULT_MAX_DEPTH;

use anyhow::{Context, Result};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

lazy_static! {
    static ref ENV_VAR: Regex = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("valid regex");
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub health_check_interval_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            health_check_interval_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Maximum number of intents in a discovered chain
    pub max_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub backend: StoreBackend,
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Sqlite,
            url: "sqlite://intent_app.db".to_string(),
            max_connections: 5,
            min_connections: 1,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
}

impl Settings {
    /// Load settings from the configured file, then apply `DATABASE_URL`
    pub fn load() -> Result<Self> {
        let config_path = env::var("INTENT_SETTLEMENT_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config/default.toml"));

        let mut settings = Self::load_from(&config_path)?;

        if let Ok(url) = env::var("DATABASE_URL") {
            if !url.is_empty() {
                settings.database.url = url;
            }
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        Self::from_toml(&config_str)
    }

    /// Parse settings from TOML text
    pub fn from_toml(config_str: &str) -> Result<Self> {
        // Substitute environment variables
        let config_str = substitute_env_vars(config_str);

        let settings: Settings =
            toml::from_str(&config_str).with_context(|| "Failed to parse configuration")?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate configuration
    fn validate(&self) -> ServiceResult<()> {
        if self.engine.max_depth == 0 {
            return Err(invalid("engine.max_depth must be at least 1"));
        }

        if self.database.backend == StoreBackend::Sqlite {
            if self.database.url.is_empty() {
                return Err(invalid("database.url is required for the sqlite backend"));
            }
            if self.database.max_connections == 0 {
                return Err(invalid("database.max_connections must be at least 1"));
            }
            if self.database.min_connections > self.database.max_connections {
                return Err(invalid("database.min_connections exceeds max_connections"));
            }
        }

        if self.metrics.enabled && self.metrics.port == self.api.port {
            tracing::warn!("Metrics and API share port {}", self.api.port);
        }

        Ok(())
    }
}

fn invalid(reason: &str) -> ServiceError {
    ServiceError::Config(reason.to_string())
}

/// Substitute environment variables in the format ${VAR_NAME}
fn substitute_env_vars(input: &str) -> String {
    ENV_VAR
        .replace_all(input, |caps: &regex::Captures| {
            env::var(&caps[1]).unwrap_or_default()
        })
        .into_owned()
}
