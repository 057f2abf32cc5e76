use crate::core::frequency::Frequency;
use crate::core::price::ADJUSTED_CLOSE;
use crate::providers::quandl::{DEFAULT_BASE_URL, DEFAULT_DATABASE};
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

/// Environment variable consulted when the config carries no API key.
pub const API_KEY_ENV: &str = "QUANDL_API_KEY";

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_database() -> String {
    DEFAULT_DATABASE.to_string()
}

fn default_price_column() -> String {
    ADJUSTED_CLOSE.to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct QuandlProviderConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_database")]
    pub database: String,
    pub api_key: Option<String>,
}

impl Default for QuandlProviderConfig {
    fn default() -> Self {
        QuandlProviderConfig {
            base_url: default_base_url(),
            database: default_database(),
            api_key: None,
        }
    }
}

impl QuandlProviderConfig {
    /// The configured key, or the one found through `lookup(API_KEY_ENV)`.
    pub fn resolve_api_key_with(&self, lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| lookup(API_KEY_ENV))
            .filter(|key| !key.trim().is_empty())
    }

    /// The configured key, falling back to the process environment.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.resolve_api_key_with(|name| std::env::var(name).ok())
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub quandl: QuandlProviderConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default = "default_price_column")]
    pub price_column: String,
    #[serde(default)]
    pub frequency: Frequency,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            providers: ProvidersConfig::default(),
            price_column: default_price_column(),
            frequency: Frequency::default(),
        }
    }
}

impl AppConfig {
    /// Loads the config from the default location, or the defaults when no file exists there.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!(
                "No config found at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("org", "findata", "findata")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}
