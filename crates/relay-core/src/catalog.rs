//! Capability catalog: the providers the router may use and the models each exposes.
//!
//! Everything here is immutable after [`Catalog::new`] has validated it.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt::{Debug, Formatter, Result as FmtResult};

use crate::{ContentType, Error, QualityTier, Result};

/// Default request timeout for generic backends.
const DEFAULT_TIMEOUT_SECONDS: u64 = 120;
/// Authentication header used when a generic backend does not override it.
const DEFAULT_AUTH_HEADER: &str = "Authorization";
/// Authentication scheme prefix used when a generic backend does not override it.
const DEFAULT_AUTH_SCHEME: &str = "Bearer ";

/// A model exposed by a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Identifier, unique within its provider
    pub id: String,
    /// Content type the model produces
    pub content_type: ContentType,
    /// Cost per call, in whatever unit the deployment compares in
    pub cost: f64,
    /// Quality tier
    pub quality: QualityTier,
    /// Average latency in milliseconds; `None` sorts last
    #[serde(default)]
    pub avg_latency_ms: Option<f64>,
}

impl ModelDescriptor {
    /// Creates a model with unknown latency.
    pub fn new(
        id: impl Into<String>,
        content_type: ContentType,
        cost: f64,
        quality: QualityTier,
    ) -> Self {
        Self {
            id: id.into(),
            content_type,
            cost,
            quality,
            avg_latency_ms: None,
        }
    }

    /// Sets the average latency.
    #[must_use]
    pub fn with_latency(mut self, avg_latency_ms: f64) -> Self {
        self.avg_latency_ms = Some(avg_latency_ms);
        self
    }
}

/// Per-model overrides of the generic backend's template and extraction path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelOverride {
    /// Request body template for this model
    #[serde(default)]
    pub request_template: Option<String>,
    /// Response extraction path for this model
    #[serde(default)]
    pub response_path: Option<String>,
}

/// Connection and protocol metadata for a self-hosted or custom HTTP backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenericBackend {
    /// Endpoint generate requests are POSTed to
    pub base_url: String,
    /// Path probed by the health gate, relative to `base_url`
    #[serde(default)]
    pub health_check_path: Option<String>,
    /// Authentication header name override
    #[serde(default)]
    pub auth_header: Option<String>,
    /// Authentication scheme prefix override (e.g. `"Token "` or `""`)
    #[serde(default)]
    pub auth_scheme: Option<String>,
    /// Request body template
    #[serde(default)]
    pub request_template: Option<String>,
    /// Response extraction path
    #[serde(default)]
    pub response_path: Option<String>,
    /// Dedicated endpoint for embedding requests
    #[serde(default)]
    pub embedding_url: Option<String>,
    /// Overrides keyed by model id
    #[serde(default)]
    pub model_overrides: HashMap<String, ModelOverride>,
    /// Request timeout
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

/// Serde default for [`GenericBackend::timeout_seconds`].
const fn default_timeout_seconds() -> u64 {
    DEFAULT_TIMEOUT_SECONDS
}

impl GenericBackend {
    /// Creates backend metadata with only the base endpoint set.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            health_check_path: None,
            auth_header: None,
            auth_scheme: None,
            request_template: None,
            response_path: None,
            embedding_url: None,
            model_overrides: HashMap::new(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
        }
    }

    /// Sets the health-check path.
    #[must_use]
    pub fn with_health_check(mut self, path: impl Into<String>) -> Self {
        self.health_check_path = Some(path.into());
        self
    }

    /// Overrides the authentication header name and scheme prefix.
    #[must_use]
    pub fn with_auth(mut self, header: impl Into<String>, scheme: impl Into<String>) -> Self {
        self.auth_header = Some(header.into());
        self.auth_scheme = Some(scheme.into());
        self
    }

    /// Sets the provider-level request template.
    #[must_use]
    pub fn with_request_template(mut self, template: impl Into<String>) -> Self {
        self.request_template = Some(template.into());
        self
    }

    /// Sets the provider-level response extraction path.
    #[must_use]
    pub fn with_response_path(mut self, path: impl Into<String>) -> Self {
        self.response_path = Some(path.into());
        self
    }

    /// Sets the dedicated embedding endpoint.
    #[must_use]
    pub fn with_embedding_url(mut self, url: impl Into<String>) -> Self {
        self.embedding_url = Some(url.into());
        self
    }

    /// Adds a per-model override.
    #[must_use]
    pub fn with_model_override(
        mut self,
        model_id: impl Into<String>,
        model_override: ModelOverride,
    ) -> Self {
        self.model_overrides.insert(model_id.into(), model_override);
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout_seconds(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = timeout_seconds;
        self
    }

    /// Request template for `model_id`: the model override wins over the provider template.
    pub fn template_for(&self, model_id: &str) -> Option<&str> {
        self.model_overrides
            .get(model_id)
            .and_then(|model_override| model_override.request_template.as_deref())
            .or(self.request_template.as_deref())
    }

    /// Extraction path for `model_id`: the model override wins over the provider path.
    pub fn response_path_for(&self, model_id: &str) -> Option<&str> {
        self.model_overrides
            .get(model_id)
            .and_then(|model_override| model_override.response_path.as_deref())
            .or(self.response_path.as_deref())
    }

    /// Authentication header name.
    pub fn auth_header_name(&self) -> &str {
        self.auth_header.as_deref().unwrap_or(DEFAULT_AUTH_HEADER)
    }

    /// Authentication scheme prefix.
    pub fn auth_scheme_prefix(&self) -> &str {
        self.auth_scheme.as_deref().unwrap_or(DEFAULT_AUTH_SCHEME)
    }

    /// Validates the endpoint metadata.
    ///
    /// # Errors
    /// Returns [`Error::Config`] naming the provider and the offending field.
    pub fn validate(&self, provider: &str) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(Error::Config(format!(
                "Generic provider {provider} is missing base_url"
            )));
        }
        if !is_http_url(&self.base_url) {
            return Err(Error::Config(format!(
                "Generic provider {provider} base_url must start with http:// or https://"
            )));
        }
        if let Some(url) = &self.embedding_url
            && !is_http_url(url)
        {
            return Err(Error::Config(format!(
                "Generic provider {provider} embedding_url must start with http:// or https://"
            )));
        }
        if let Some(path) = &self.health_check_path
            && !path.starts_with('/')
        {
            return Err(Error::Config(format!(
                "Generic provider {provider} health_check_path must start with '/'"
            )));
        }
        if self.timeout_seconds == 0 {
            return Err(Error::Config(format!(
                "Generic provider {provider} timeout_seconds must be greater than zero"
            )));
        }
        Ok(())
    }
}

/// Returns true for absolute http(s) URLs.
fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// A provider the router may dispatch to.
#[derive(Clone, PartialEq)]
pub struct ProviderDescriptor {
    /// Unique key used for adapter lookup
    pub name: String,
    /// Authentication credential
    pub api_key: Option<String>,
    /// Models in catalog order
    pub models: Vec<ModelDescriptor>,
    /// Metadata for generic HTTP backends
    pub generic: Option<GenericBackend>,
}

impl ProviderDescriptor {
    /// Creates a provider with no models, credential or backend metadata.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            api_key: None,
            models: Vec::new(),
            generic: None,
        }
    }

    /// Sets the credential.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Appends a model.
    #[must_use]
    pub fn with_model(mut self, model: ModelDescriptor) -> Self {
        self.models.push(model);
        self
    }

    /// Marks this provider as a generic HTTP backend.
    #[must_use]
    pub fn with_generic(mut self, generic: GenericBackend) -> Self {
        self.generic = Some(generic);
        self
    }

    /// Looks up a model by id.
    pub fn model(&self, model_id: &str) -> Option<&ModelDescriptor> {
        self.models.iter().find(|model| model.id == model_id)
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Config("Provider name must not be empty".to_owned()));
        }

        let mut seen = HashSet::new();
        for model in &self.models {
            if model.id.trim().is_empty() {
                return Err(Error::Config(format!(
                    "Provider {} has a model with an empty id",
                    self.name
                )));
            }
            if !seen.insert(model.id.as_str()) {
                return Err(Error::Config(format!(
                    "Provider {} lists model {} more than once",
                    self.name, model.id
                )));
            }
            if !model.cost.is_finite() || model.cost < 0.0 {
                return Err(Error::Config(format!(
                    "Model {}/{} has invalid cost {}",
                    self.name, model.id, model.cost
                )));
            }
            if let Some(latency) = model.avg_latency_ms
                && (!latency.is_finite() || latency < 0.0)
            {
                return Err(Error::Config(format!(
                    "Model {}/{} has invalid average latency {latency}",
                    self.name, model.id
                )));
            }
        }

        if let Some(generic) = &self.generic {
            generic.validate(&self.name)?;
        }
        Ok(())
    }
}

impl Debug for ProviderDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ProviderDescriptor")
            .field("name", &self.name)
            .field(
                "api_key",
                &if self.api_key.is_some() {
                    "present"
                } else {
                    "missing"
                },
            )
            .field("models", &self.models)
            .field("generic", &self.generic)
            .finish()
    }
}

/// Validated, immutable set of providers and their models.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    /// Providers in configuration order
    providers: Vec<ProviderDescriptor>,
}

impl Catalog {
    /// Validates and builds a catalog.
    ///
    /// # Errors
    /// Returns [`Error::Config`] for empty or duplicate provider names,
    /// duplicate or empty model ids, negative or non-finite costs and
    /// latencies, and malformed generic backend metadata.
    pub fn new(providers: Vec<ProviderDescriptor>) -> Result<Self> {
        let mut names = HashSet::new();
        for provider in &providers {
            provider.validate()?;
            if !names.insert(provider.name.as_str()) {
                return Err(Error::Config(format!(
                    "Provider {} is configured more than once",
                    provider.name
                )));
            }
        }

        tracing::debug!(
            providers = providers.len(),
            models = providers.iter().map(|provider| provider.models.len()).sum::<usize>(),
            "Built provider catalog"
        );
        Ok(Self { providers })
    }

    /// Providers in configuration order.
    pub fn providers(&self) -> &[ProviderDescriptor] {
        &self.providers
    }

    /// Looks up a provider by name.
    pub fn provider(&self, name: &str) -> Option<&ProviderDescriptor> {
        self.providers.iter().find(|provider| provider.name == name)
    }

    /// Looks up a model of a provider.
    pub fn model(&self, provider: &str, model_id: &str) -> Option<&ModelDescriptor> {
        self.provider(provider)
            .and_then(|descriptor| descriptor.model(model_id))
    }

    /// Every (provider, model) pair in catalog iteration order.
    pub fn entries(&self) -> impl Iterator<Item = (&ProviderDescriptor, &ModelDescriptor)> {
        self.providers.iter().flat_map(|provider| {
            provider
                .models
                .iter()
                .map(move |model| (provider, model))
        })
    }

    /// Number of providers.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Whether the catalog has no providers.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
