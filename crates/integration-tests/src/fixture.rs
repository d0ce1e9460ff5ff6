//! Routing fixture format.
//!
//! A fixture describes a catalog, the scripted behavior of each provider's
//! mock adapter, one request, and what the orchestrator must do with it.

use relay_core::{GenerateRequest, JobStatusResult, ModelDescriptor};
use relay_providers::{MockAdapter, MockOutcome};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Complete routing fixture
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoutingFixture {
    /// Fixture name
    pub name: String,
    /// What the fixture exercises
    #[serde(default)]
    pub description: String,
    /// Catalog providers, in catalog order
    pub providers: Vec<FixtureProvider>,
    /// Request sent to the orchestrator
    pub request: GenerateRequest,
    /// Expected outcome
    pub expect: FixtureExpectation,
}

/// A catalog provider and, optionally, the mock adapter serving it
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FixtureProvider {
    /// Provider name
    pub name: String,
    /// Models the provider exposes
    pub models: Vec<ModelDescriptor>,
    /// Mock adapter script; `None` leaves the provider without an adapter
    #[serde(default)]
    pub adapter: Option<FixtureAdapter>,
}

/// Scripted mock adapter
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FixtureAdapter {
    /// Outcome queues per model id
    #[serde(default)]
    pub outcomes: HashMap<String, Vec<FixtureOutcome>>,
    /// Outcome for models without a queue
    #[serde(default)]
    pub default: Option<FixtureOutcome>,
    /// Status sequences per native job id
    #[serde(default)]
    pub job_statuses: HashMap<String, Vec<JobStatusResult>>,
}

impl FixtureAdapter {
    /// Builds the mock adapter this script describes.
    #[must_use]
    pub fn build(&self, provider: &str) -> MockAdapter {
        let mut mock = MockAdapter::new(provider);
        for (model_id, outcomes) in &self.outcomes {
            for outcome in outcomes {
                mock = mock.with_outcome(model_id.clone(), outcome.clone().into());
            }
        }
        if let Some(outcome) = &self.default {
            mock = mock.with_default_outcome(outcome.clone().into());
        }
        for (job_id, statuses) in &self.job_statuses {
            mock = mock.with_job_statuses(job_id.clone(), statuses.iter().cloned());
        }
        mock
    }
}

/// One scripted generate outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FixtureOutcome {
    /// Completed with a payload
    Complete {
        /// Payload
        data: Value,
    },
    /// Accepted as a job
    Pending {
        /// Native job id
        job_id: String,
    },
    /// Failed result
    Fail {
        /// Error message
        message: String,
    },
    /// Adapter error
    Error {
        /// Error message
        message: String,
    },
    /// Adapter panic
    Panic {
        /// Panic message
        message: String,
    },
}

impl From<FixtureOutcome> for MockOutcome {
    fn from(outcome: FixtureOutcome) -> Self {
        match outcome {
            FixtureOutcome::Complete { data } => Self::Complete(data),
            FixtureOutcome::Pending { job_id } => Self::Pending(job_id),
            FixtureOutcome::Fail { message } => Self::Fail(message),
            FixtureOutcome::Error { message } => Self::Error(message),
            FixtureOutcome::Panic { message } => Self::Panic(message),
        }
    }
}

/// Expected result of a fixture
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FixtureExpectation {
    /// `completed`, `pending` or `failed`
    pub status: String,
    /// Provider the result must name
    #[serde(default)]
    pub provider: Option<String>,
    /// Model the result must name
    #[serde(default)]
    pub model: Option<String>,
    /// Payload of a completed result
    #[serde(default)]
    pub data: Option<Value>,
    /// Substring the error of a failed result must contain
    #[serde(default)]
    pub error_contains: Option<String>,
    /// Exact generate call counts per provider
    #[serde(default)]
    pub calls: HashMap<String, usize>,
    /// Statuses expected from successive polls of a pending result's job
    #[serde(default)]
    pub polls: Vec<String>,
}
