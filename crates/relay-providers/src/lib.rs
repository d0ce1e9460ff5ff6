//! Backend adapters for the relay router.
//!
//! [`GenericHttpAdapter`] talks to any self-hosted JSON-over-HTTP backend
//! described by a [`relay_core::GenericBackend`]: it renders request bodies
//! through the [`template`] engine and gates every call behind a cached
//! [`health`] probe. [`MockAdapter`] is a scripted stand-in for tests.

#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::assertions_on_result_states,
        clippy::missing_panics_doc,
        reason = "Allow for tests"
    )
)]

/// Generic JSON-over-HTTP backend adapter.
pub mod generic;
/// Time-boxed cached liveness check.
pub mod health;
/// Scripted adapter for tests.
pub mod mock;
/// Request-body rendering and response extraction.
pub mod template;

pub use generic::GenericHttpAdapter;
pub use health::{HEALTH_CACHE_TTL, HealthGate, HealthStatus};
pub use mock::{MockAdapter, MockOutcome};
pub use template::{
    TemplateFields, build_payload, default_payload, extract_embeddings, extract_path,
    extract_text, render_template,
};
