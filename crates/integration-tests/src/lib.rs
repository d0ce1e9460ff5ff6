//! Integration test framework for the relay router.
//!
//! Provides:
//! - JSON routing fixtures and the runner that plays them against an orchestrator
//! - A local axum backend that speaks the generic HTTP backend protocol
//! - Catalog and tracing helpers shared by the scenario files under `tests/`

#![cfg_attr(
    test,
    allow(
        dead_code,
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::assertions_on_result_states,
        clippy::panic,
        clippy::missing_panics_doc,
        clippy::missing_errors_doc,
        reason = "Allow for tests"
    )
)]

pub mod backend;
pub mod fixture;
pub mod runner;
pub mod support;
pub mod verification_result;

pub use backend::{BackendServer, BackendState};
pub use fixture::{FixtureAdapter, FixtureExpectation, FixtureOutcome, FixtureProvider, RoutingFixture};
pub use runner::{FixtureRunner, discover_fixtures};
pub use support::{init_tracing, model, provider, text_model};
pub use verification_result::VerificationResult;

// Re-export for fixture type definitions
pub use serde_json;
