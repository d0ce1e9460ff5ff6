//! Adapter registry keyed by provider name.
//!
//! Adapters are created once and shared for every request, so lookups hand
//! out `Arc` clones rather than building a new adapter per call.

use relay_core::{Catalog, ProviderAdapter};
use relay_providers::GenericHttpAdapter;
use std::collections::HashMap;
use std::sync::Arc;

use crate::{Result, RoutingError};

/// Registry that maps provider names to adapter instances.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    /// Map from provider name to adapter
    adapters: HashMap<String, Arc<dyn ProviderAdapter>>,
}

impl AdapterRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a generic HTTP adapter for every catalog provider with a
    /// `generic` block. Other providers are left for the caller to register.
    ///
    /// # Errors
    /// Returns an error if a generic adapter cannot be constructed.
    pub fn from_catalog(catalog: &Catalog) -> Result<Self> {
        let mut registry = Self::new();
        for provider in catalog.providers() {
            if provider.generic.is_some() {
                let adapter = GenericHttpAdapter::from_descriptor(provider)?;
                registry.register(provider.name.clone(), Arc::new(adapter));
            }
        }
        Ok(registry)
    }

    /// Registers (or replaces) the adapter for a provider.
    pub fn register(&mut self, provider: impl Into<String>, adapter: Arc<dyn ProviderAdapter>) {
        let provider = provider.into();
        tracing::debug!(provider = %provider, adapter = adapter.name(), "Registered adapter");
        self.adapters.insert(provider, adapter);
    }

    /// Get the adapter registered for a provider.
    pub fn get(&self, provider: &str) -> Option<Arc<dyn ProviderAdapter>> {
        self.adapters.get(provider).cloned()
    }

    /// Get the adapter registered for a provider, or an error naming it.
    ///
    /// # Errors
    /// Returns [`RoutingError::ProviderNotRegistered`] if no adapter is registered.
    pub fn require(&self, provider: &str) -> Result<Arc<dyn ProviderAdapter>> {
        self.get(provider)
            .ok_or_else(|| RoutingError::ProviderNotRegistered(provider.to_owned()))
    }

    /// Whether an adapter is registered for a provider.
    pub fn contains(&self, provider: &str) -> bool {
        self.adapters.contains_key(provider)
    }

    /// Consumes the registry, yielding every (provider, adapter) pair.
    pub fn into_entries(self) -> impl Iterator<Item = (String, Arc<dyn ProviderAdapter>)> {
        self.adapters.into_iter()
    }

    /// Names of all providers with a registered adapter, sorted.
    #[must_use]
    pub fn registered_providers(&self) -> Vec<String> {
        let mut names: Vec<_> = self.adapters.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::{GenericBackend, ProviderDescriptor};
    use relay_providers::MockAdapter;

    #[test]
    fn test_from_catalog_registers_generic_backends_only() -> Result<()> {
        let catalog = Catalog::new(vec![
            ProviderDescriptor::new("vendor").with_api_key("key"),
            ProviderDescriptor::new("local")
                .with_generic(GenericBackend::new("http://127.0.0.1:8080")),
        ])?;
        let registry = AdapterRegistry::from_catalog(&catalog)?;

        assert_eq!(registry.registered_providers(), vec!["local".to_owned()]);
        assert!(registry.get("vendor").is_none());
        assert!(matches!(
            registry.require("vendor"),
            Err(RoutingError::ProviderNotRegistered(ref name)) if name == "vendor"
        ));
        Ok(())
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = AdapterRegistry::new();
        registry.register("alpha", Arc::new(MockAdapter::new("first")));
        registry.register("alpha", Arc::new(MockAdapter::new("second")));

        assert!(registry.contains("alpha"));
        assert_eq!(registry.get("alpha").map(|adapter| adapter.name().to_owned()), Some("second".to_owned()));
    }
}
