use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, num::NonZeroU32, path::PathBuf, time::Duration};

use crate::{coordinator::CoordinatorSettings, gateway::weatherapi::DEFAULT_BASE_URL};

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// api_key = "..."
/// default_city = "Prague"
/// default_country = "Czech Republic"
/// forecast_days = 7
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// WeatherAPI.com key.
    pub api_key: Option<String>,

    pub base_url: String,

    /// City shown at startup before the user searches.
    pub default_city: String,
    pub default_country: String,

    pub forecast_days: u32,

    /// Quiet period before a typed search query is sent.
    pub search_debounce_ms: u64,

    /// Queries of this many characters or fewer are never sent.
    pub min_query_chars: usize,

    /// `tracing` filter directive, e.g. "debug" or "weather_lookup_core=trace".
    pub trace_level: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            default_city: "Prague".to_string(),
            default_country: "Czech Republic".to_string(),
            forecast_days: 7,
            search_debounce_ms: 1200,
            min_query_chars: 2,
            trace_level: None,
        }
    }
}

impl Config {
    /// Load config from disk, or return the defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            // First run: no config file, return defaults.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("Invalid configuration TOML")
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weather-lookup", "weather-lookup")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Returns the API key, or an error telling the user how to set one.
    pub fn api_key(&self) -> Result<&str> {
        self.api_key.as_deref().filter(|key| !key.trim().is_empty()).ok_or_else(|| {
            anyhow!(
                "No WeatherAPI key configured.\n\
                 Hint: run `weather configure` and enter your API key."
            )
        })
    }

    pub fn set_api_key(&mut self, api_key: String) {
        self.api_key = Some(api_key.trim().to_string());
    }

    pub fn is_configured(&self) -> bool {
        self.api_key().is_ok()
    }

    pub fn set_default_location(&mut self, city: String, country: String) {
        self.default_city = city;
        self.default_country = country;
    }

    pub fn forecast_days(&self) -> Result<NonZeroU32> {
        NonZeroU32::new(self.forecast_days)
            .ok_or_else(|| anyhow!("`forecast_days` must be at least 1"))
    }

    /// Settings for the interactive coordinator derived from this config.
    pub fn coordinator_settings(&self) -> Result<CoordinatorSettings> {
        if self.default_city.trim().is_empty() {
            return Err(anyhow!("`default_city` must not be empty"));
        }

        Ok(CoordinatorSettings {
            default_city: self.default_city.clone(),
            default_country: self.default_country.clone(),
            forecast_days: self.forecast_days()?,
            debounce: Duration::from_millis(self.search_debounce_ms),
            min_query_chars: self.min_query_chars,
        })
    }
}
