use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fs, path::PathBuf};

use crate::{error::CredentialError, model::Location, provider::ProviderId};

/// Substring that marks an API key as not yet replaced by a real one.
pub const PLACEHOLDER_MARKER: &str = "TU_API_KEY";

/// Configuration for a single provider (e.g., API key).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub api_key: String,
}

/// Base URLs of each provider API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub openweather: String,
    pub weatherapi: String,
    pub aemet: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            openweather: "http://api.openweathermap.org/data/2.5".to_string(),
            weatherapi: "http://api.weatherapi.com/v1".to_string(),
            aemet: "https://opendata.aemet.es/opendata/api".to_string(),
        }
    }
}

impl Endpoints {
    pub fn base_url(&self, id: ProviderId) -> &str {
        match id {
            ProviderId::OpenWeather => &self.openweather,
            ProviderId::WeatherApi => &self.weatherapi,
            ProviderId::Aemet => &self.aemet,
        }
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// [location]
/// city = "Madrid"
/// country_code = "ES"
/// municipality_code = "28003"
///
/// [providers.aemet]
/// api_key = "..."
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub location: Location,
    pub endpoints: Endpoints,
    pub providers: HashMap<String, ProviderConfig>,
}

/// A credential after validation: decided once, before any provider runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    Present(String),
    Placeholder,
    Absent,
}

impl Credential {
    pub fn classify(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") => Credential::Absent,
            Some(key) if key.contains(PLACEHOLDER_MARKER) => Credential::Placeholder,
            Some(key) => Credential::Present(key.to_string()),
        }
    }

    /// The key to send, or the reason it must not be sent.
    pub fn key_for(&self, id: ProviderId) -> Result<&str, CredentialError> {
        match self {
            Credential::Present(key) => Ok(key.as_str()),
            Credential::Placeholder => Err(CredentialError::Placeholder(id)),
            Credential::Absent => Err(CredentialError::Missing(id)),
        }
    }
}

/// Resolved credentials for every provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub openweather: Credential,
    pub weatherapi: Credential,
    pub aemet: Credential,
}

impl Credentials {
    pub fn get(&self, id: ProviderId) -> &Credential {
        match id {
            ProviderId::OpenWeather => &self.openweather,
            ProviderId::WeatherApi => &self.weatherapi,
            ProviderId::Aemet => &self.aemet,
        }
    }
}

/// Everything one run needs, built once at startup and passed by reference.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub location: Location,
    pub endpoints: Endpoints,
    pub credentials: Credentials,
}

impl Config {
    pub fn provider_config(&self, id: ProviderId) -> Option<&ProviderConfig> {
        self.providers.get(id.as_str())
    }

    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
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
        let dirs = ProjectDirs::from("dev", "meteo", "meteo-cli")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Set or replace a provider API key.
    pub fn upsert_provider_api_key(&mut self, provider_id: ProviderId, api_key: String) {
        self.providers.insert(provider_id.as_str().to_string(), ProviderConfig { api_key });
    }

    /// Returns API key for a provider, if present in the file.
    pub fn provider_api_key(&self, provider_id: ProviderId) -> Option<&str> {
        self.provider_config(provider_id).map(|cfg| cfg.api_key.as_str())
    }

    /// Classify one provider's credential. The environment variable wins over the file.
    pub fn resolve_credential<F>(&self, id: ProviderId, env: &F) -> Credential
    where
        F: Fn(&str) -> Option<String>,
    {
        match env(id.env_var()) {
            Some(value) => Credential::classify(Some(&value)),
            None => Credential::classify(self.provider_api_key(id)),
        }
    }

    /// Build the run settings, reading credentials through `env`.
    pub fn into_run_settings<F>(self, env: F) -> RunSettings
    where
        F: Fn(&str) -> Option<String>,
    {
        let credentials = Credentials {
            openweather: self.resolve_credential(ProviderId::OpenWeather, &env),
            weatherapi: self.resolve_credential(ProviderId::WeatherApi, &env),
            aemet: self.resolve_credential(ProviderId::Aemet, &env),
        };

        RunSettings {
            location: self.location,
            endpoints: self.endpoints,
            credentials,
        }
    }

    /// Run settings with credentials from the process environment.
    pub fn into_run_settings_from_env(self) -> RunSettings {
        self.into_run_settings(|name| std::env::var(name).ok())
    }
}
