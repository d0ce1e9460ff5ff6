//! TOML configuration that builds a validated [`Catalog`].

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::{Catalog, Error, GenericBackend, ModelDescriptor, ProviderDescriptor, Result};

/// Top-level router configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Reject non-generic providers that have no resolvable credential
    #[serde(default)]
    pub require_credentials: bool,
    /// Providers in routing order
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
}

/// Configuration of one provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Unique provider name
    pub name: String,
    /// Explicit credential; takes precedence over the environment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Environment variable holding the credential
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
    /// Models the provider exposes
    #[serde(default)]
    pub models: Vec<ModelDescriptor>,
    /// Endpoint metadata for generic HTTP backends
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generic: Option<GenericBackend>,
}

impl ProviderConfig {
    /// Conventional environment variable for this provider (`my-llm` → `MY_LLM_API_KEY`).
    pub fn default_key_env(&self) -> String {
        format!("{}_API_KEY", self.name.to_uppercase().replace('-', "_"))
    }

    /// Resolves the credential from config, then `api_key_env`, then the conventional variable.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.resolve_api_key_with(|name| env::var(name).ok())
    }

    /// Resolves the credential using `lookup` in place of the process environment.
    pub fn resolve_api_key_with<F>(&self, lookup: F) -> Option<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = self.api_key.as_ref().filter(|key| !key.is_empty()) {
            return Some(key.clone());
        }
        if let Some(key) = self
            .api_key_env
            .as_deref()
            .and_then(&lookup)
            .filter(|key| !key.is_empty())
        {
            return Some(key);
        }
        lookup(&self.default_key_env()).filter(|key| !key.is_empty())
    }
}

impl RelayConfig {
    /// Get the default config directory path (`~/.relay`)
    ///
    /// # Errors
    /// Returns an error if the home directory cannot be determined
    pub fn config_dir() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| Error::Config("Could not determine home directory".to_owned()))?;
        Ok(home.join(".relay"))
    }

    /// Get the default config file path (`~/.relay/config.toml`)
    ///
    /// # Errors
    /// Returns an error if the home directory cannot be determined
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load config from the default location, or an empty config if none exists
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed
    pub fn load_default() -> Result<Self> {
        let config_path = Self::config_path()?;
        if config_path.exists() {
            Self::load_from_file(&config_path)
        } else {
            tracing::debug!(path = %config_path.display(), "No config file, using empty config");
            Ok(Self::default())
        }
    }

    /// Load config from a specific file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&contents)?;
        tracing::debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Parse config from TOML text
    ///
    /// # Errors
    /// Returns an error if the text is not valid TOML of the expected shape
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)?;
        for provider in &config.providers {
            tracing::debug!(
                provider = %provider.name,
                models = provider.models.len(),
                generic = provider.generic.is_some(),
                api_key = if provider.api_key.is_some() {
                    "present"
                } else {
                    "missing"
                },
                "Parsed provider config"
            );
        }
        Ok(config)
    }

    /// Save config to a specific file
    ///
    /// # Errors
    /// Returns an error if the file cannot be written
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|error| Error::Config(format!("Failed to serialize config: {error}")))?;

        let header = "# Relay Configuration File\n\
                      # Providers are tried in the order the routing strategy ranks them\n\n";

        fs::write(path, format!("{header}{contents}"))?;
        Ok(())
    }

    /// Resolves credentials and validates everything into a [`Catalog`].
    ///
    /// # Errors
    /// Returns [`Error::MissingApiKey`] for a non-generic provider without a
    /// credential when `require_credentials` is set, and any validation error
    /// from [`Catalog::new`].
    pub fn into_catalog(self) -> Result<Catalog> {
        self.into_catalog_with(|name| env::var(name).ok())
    }

    /// Like [`RelayConfig::into_catalog`], resolving environment lookups through `lookup`.
    ///
    /// # Errors
    /// Same as [`RelayConfig::into_catalog`].
    pub fn into_catalog_with<F>(self, lookup: F) -> Result<Catalog>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut descriptors = Vec::with_capacity(self.providers.len());
        for provider in self.providers {
            let api_key = provider.resolve_api_key_with(&lookup);
            if api_key.is_none() && provider.generic.is_none() && self.require_credentials {
                return Err(Error::MissingApiKey(
                    provider
                        .api_key_env
                        .clone()
                        .unwrap_or_else(|| provider.default_key_env()),
                ));
            }

            descriptors.push(ProviderDescriptor {
                name: provider.name,
                api_key,
                models: provider.models,
                generic: provider.generic,
            });
        }
        Catalog::new(descriptors)
    }
}
