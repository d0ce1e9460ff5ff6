use core::result::Result as CoreResult;
use std::io::Error as IoError;

use reqwest::Error as ReqwestError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;
use toml::de::Error as TomlError;

use crate::traits::Capability;

/// Result type for core operations.
pub type Result<T> = CoreResult<T, Error>;

/// Errors that can occur in the core library and in provider adapters.
#[derive(Debug, Error)]
pub enum Error {
    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// An HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Request(#[from] ReqwestError),

    /// JSON serialization or deserialization failed.
    #[error("JSON serialization error: {0}")]
    Json(#[from] SerdeJsonError),

    /// TOML deserialization failed.
    #[error("TOML deserialization error: {0}")]
    Toml(#[from] TomlError),

    /// Configuration is invalid or missing.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Required API key was not found.
    #[error("API key not found: {0}")]
    MissingApiKey(String),

    /// A provider call failed.
    #[error("Provider error: {0}")]
    Provider(String),

    /// A provider returned a payload that could not be used.
    #[error("Invalid response from provider: {0}")]
    InvalidResponse(String),

    /// The provider does not know the job id it was asked about.
    #[error("Unknown job {0}")]
    UnknownJob(String),

    /// The backend failed its health check.
    #[error("Backend unhealthy: {0}")]
    Unhealthy(String),

    /// The adapter does not implement an optional capability.
    #[error("Provider {provider} does not support {capability}")]
    CapabilityMissing {
        /// Provider whose adapter lacks the capability
        provider: String,
        /// The capability that was requested
        capability: Capability,
    },

    /// A general error not covered by other variants.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Builds a [`Error::CapabilityMissing`] for the given provider.
    pub fn capability_missing(provider: impl Into<String>, capability: Capability) -> Self {
        Self::CapabilityMissing {
            provider: provider.into(),
            capability,
        }
    }

    /// Determines whether this error may succeed if retried.
    ///
    /// Transport failures, provider failures and unhealthy backends are
    /// transient. Configuration problems and missing capabilities are not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Request(_) | Self::Provider(_) | Self::Unhealthy(_)
        )
    }
}
