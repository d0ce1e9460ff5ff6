//! Core types and traits for the relay generation router.
//!
//! This crate provides the capability catalog, the request/result data model,
//! the adapter contract every backend implements, configuration loading and
//! the shared error type used across the workspace.

#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::assertions_on_result_states,
        clippy::missing_panics_doc,
        reason = "Allow for tests"
    )
)]

/// Provider and model descriptors plus catalog validation.
pub mod catalog;
/// TOML configuration for building a catalog.
pub mod config;
/// Error types and result definitions.
pub mod error;
/// Lock helpers shared by the stateful components.
pub mod sync;
/// The adapter contract backends implement.
pub mod traits;
/// Requests, results and the enums they are built from.
pub mod types;

pub use catalog::{Catalog, GenericBackend, ModelDescriptor, ModelOverride, ProviderDescriptor};
pub use config::{ProviderConfig, RelayConfig};
pub use error::{Error, Result};
pub use sync::IgnoreLock;
pub use traits::{Capability, ChunkStream, ProviderAdapter};
pub use types::{
    ContentType, GenerateRequest, GenerateResult, GenerationParams, JobStatusResult, QualityTier,
    StreamChunk, Strategy, TokenUsage,
};
