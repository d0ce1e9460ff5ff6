//! Catalog builders and tracing setup shared by scenario files.

use relay_core::{ContentType, ModelDescriptor, ProviderDescriptor, QualityTier};
use tracing_subscriber::EnvFilter;

/// Installs a test-writer subscriber once per test binary.
///
/// Honors `RUST_LOG`, defaulting to debug output from the relay crates.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("relay_routing=debug,relay_providers=debug"));
    drop(
        tracing_subscriber::fmt()
            .with_test_writer()
            .with_env_filter(filter)
            .try_init(),
    );
}

/// A model with the given content type, cost and tier.
pub fn model(
    id: &str,
    content_type: ContentType,
    cost: f64,
    quality: QualityTier,
) -> ModelDescriptor {
    ModelDescriptor::new(id, content_type, cost, quality)
}

/// A medium-quality text model.
pub fn text_model(id: &str, cost: f64) -> ModelDescriptor {
    model(id, ContentType::Text, cost, QualityTier::Medium)
}

/// A provider exposing `models`.
pub fn provider(name: &str, models: impl IntoIterator<Item = ModelDescriptor>) -> ProviderDescriptor {
    models
        .into_iter()
        .fold(ProviderDescriptor::new(name), ProviderDescriptor::with_model)
}
