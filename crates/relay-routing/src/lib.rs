//! Routing for the relay generation router.
//!
//! [`Orchestrator`] is the entry point: it selects eligible (provider, model)
//! candidates from the catalog, ranks them with the request's strategy, tries
//! each candidate's adapter in order, and tracks long-running jobs until a
//! poll observes them finished.

#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::assertions_on_result_states,
        clippy::missing_panics_doc,
        reason = "Allow for tests"
    )
)]

/// Routing error types.
pub mod error;
/// Registry of long-running jobs.
pub mod jobs;
/// Fallback orchestrator.
pub mod orchestrator;
/// Adapter lookup by provider name.
pub mod registry;
/// Candidate filtering and ordering.
pub mod selector;
/// Ranking strategies.
pub mod strategies;

pub use error::{Result, RoutingError};
pub use jobs::{ActiveJob, JobRegistry, derive_job_id};
pub use orchestrator::{Orchestrator, OrchestratorBuilder};
pub use registry::AdapterRegistry;
pub use selector::{Candidate, select_candidates};
pub use strategies::{CostStrategy, LatencyStrategy, QualityStrategy, RankingStrategy, strategy_for};
