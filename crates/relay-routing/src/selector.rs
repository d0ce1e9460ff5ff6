//! Candidate selection: filter the catalog to eligible models and rank them.

use relay_core::{Catalog, GenerateRequest, ModelDescriptor, ProviderDescriptor};

use crate::strategies::strategy_for;

/// An eligible (provider, model) pair.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'catalog> {
    /// Provider serving the model
    pub provider: &'catalog ProviderDescriptor,
    /// The model itself
    pub model: &'catalog ModelDescriptor,
}

impl Candidate<'_> {
    /// Provider name, the key adapters are registered under.
    pub fn provider_name(&self) -> &str {
        &self.provider.name
    }

    /// Model identifier passed to the adapter.
    pub fn model_id(&self) -> &str {
        &self.model.id
    }
}

/// Returns the eligible candidates for `request`, best first.
///
/// Eligibility is the model's content type plus the optional exact quality
/// filter. The order comes from the request's strategy; the sort is stable,
/// so ties keep catalog order. No match yields an empty list.
pub fn select_candidates<'catalog>(
    catalog: &'catalog Catalog,
    request: &GenerateRequest,
) -> Vec<Candidate<'catalog>> {
    let mut candidates: Vec<_> = catalog
        .entries()
        .filter(|(_, model)| model.content_type == request.content_type)
        .filter(|(_, model)| request.quality.is_none_or(|quality| model.quality == quality))
        .map(|(provider, model)| Candidate { provider, model })
        .collect();

    let strategy = strategy_for(request.strategy);
    candidates.sort_by(|left, right| strategy.compare(left.model, right.model));

    tracing::debug!(
        strategy = strategy.name(),
        content_type = %request.content_type,
        candidates = candidates.len(),
        "Selected candidates"
    );
    candidates
}
