//! Fixture runner.
//!
//! Builds a catalog and mock adapters from a fixture, sends its request
//! through a real orchestrator, and verifies the outcome.

use relay_core::{Catalog, GenerateResult, JobStatusResult, ProviderDescriptor};
use relay_providers::MockAdapter;
use relay_routing::Orchestrator;
use serde_json::from_str;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::fixture::{FixtureExpectation, RoutingFixture};
use crate::verification_result::VerificationResult;

/// Runs one routing fixture against an orchestrator
pub struct FixtureRunner {
    /// Fixture under test
    fixture: RoutingFixture,
    /// Orchestrator built from the fixture
    orchestrator: Orchestrator,
    /// Mock adapters by provider name
    mocks: Vec<(String, MockAdapter)>,
}

impl FixtureRunner {
    /// Load a fixture from a JSON file
    ///
    /// # Errors
    /// Returns error if file reading or parsing fails
    pub fn load_fixture(path: &Path) -> Result<RoutingFixture, String> {
        let content =
            fs::read_to_string(path).map_err(|err| format!("Failed to read fixture: {err}"))?;
        from_str(&content).map_err(|err| format!("Failed to parse fixture: {err}"))
    }

    /// Build the catalog and adapters a fixture describes
    ///
    /// # Errors
    /// Returns error if the fixture's catalog is invalid
    pub fn new(fixture: RoutingFixture) -> Result<Self, String> {
        let providers = fixture
            .providers
            .iter()
            .map(|provider| {
                provider
                    .models
                    .iter()
                    .cloned()
                    .fold(ProviderDescriptor::new(&provider.name), ProviderDescriptor::with_model)
            })
            .collect();
        let catalog =
            Catalog::new(providers).map_err(|err| format!("Invalid fixture catalog: {err}"))?;

        let mut builder = Orchestrator::builder(catalog);
        let mut mocks = Vec::new();
        for provider in &fixture.providers {
            if let Some(script) = &provider.adapter {
                let mock = script.build(&provider.name);
                builder = builder.with_adapter(provider.name.clone(), Arc::new(mock.clone()));
                mocks.push((provider.name.clone(), mock));
            }
        }

        Ok(Self {
            fixture,
            orchestrator: builder.build(),
            mocks,
        })
    }

    /// Fixture name
    pub fn name(&self) -> &str {
        &self.fixture.name
    }

    /// Send the request and verify every expectation
    pub async fn run(&self) -> VerificationResult {
        let mut verification = VerificationResult::new();
        let expect = &self.fixture.expect;

        let result = self.orchestrator.generate(&self.fixture.request).await;
        tracing::debug!(fixture = %self.fixture.name, ?result, "Fixture request finished");

        verify_result(&result, expect, &mut verification);
        self.verify_calls(expect, &mut verification);

        if !expect.polls.is_empty() {
            match result.job_id() {
                Some(job_id) => self.verify_polls(job_id, expect, &mut verification).await,
                None => verification.add_failure("Polls expected but result has no job id"),
            }
        }
        verification
    }

    fn verify_calls(&self, expect: &FixtureExpectation, verification: &mut VerificationResult) {
        for (provider, expected) in &expect.calls {
            let actual = self
                .mocks
                .iter()
                .find(|(name, _)| name == provider)
                .map_or(0, |(_, mock)| mock.call_count());
            verification.check(actual == *expected, || {
                format!("Provider '{provider}' called {actual} times, expected {expected}")
            });
        }
    }

    async fn verify_polls(
        &self,
        job_id: &str,
        expect: &FixtureExpectation,
        verification: &mut VerificationResult,
    ) {
        for (index, expected) in expect.polls.iter().enumerate() {
            let status = self.orchestrator.get_job_result(job_id).await;
            let actual = status_label(&status);
            verification.check(actual == expected.as_str(), || {
                format!("Poll {index} returned '{actual}', expected '{expected}'")
            });
        }
    }
}

fn verify_result(
    result: &GenerateResult,
    expect: &FixtureExpectation,
    verification: &mut VerificationResult,
) {
    let status = match result {
        GenerateResult::Completed { .. } => "completed",
        GenerateResult::Pending { .. } => "pending",
        GenerateResult::Failed { .. } => "failed",
    };
    verification.check(status == expect.status, || {
        format!("Result status '{status}', expected '{}': {result:?}", expect.status)
    });

    if let Some(provider) = &expect.provider {
        verification.check(result.provider() == Some(provider.as_str()), || {
            format!("Result provider {:?}, expected '{provider}'", result.provider())
        });
    }
    if let Some(model) = &expect.model {
        verification.check(result.model() == Some(model.as_str()), || {
            format!("Result model {:?}, expected '{model}'", result.model())
        });
    }
    if let Some(data) = &expect.data {
        verification.check(result.data() == Some(data), || {
            format!("Result data {:?}, expected {data}", result.data())
        });
    }
    if let Some(fragment) = &expect.error_contains {
        verification.check(
            result.error().is_some_and(|error| error.contains(fragment.as_str())),
            || format!("Result error {:?} does not contain '{fragment}'", result.error()),
        );
    }
}

fn status_label(status: &JobStatusResult) -> &'static str {
    match status {
        JobStatusResult::Pending => "pending",
        JobStatusResult::Completed { .. } => "completed",
        JobStatusResult::Failed { .. } => "failed",
    }
}

/// Discover all fixtures in a directory, recursively, sorted by path
///
/// # Errors
/// Returns error if directory reading fails
pub fn discover_fixtures(dir: &Path) -> Result<Vec<PathBuf>, String> {
    let mut fixtures = Vec::new();

    if !dir.exists() {
        return Ok(fixtures);
    }

    let entries = fs::read_dir(dir).map_err(|err| format!("Failed to read directory: {err}"))?;
    for entry in entries {
        let entry = entry.map_err(|err| format!("Failed to read entry: {err}"))?;
        let path = entry.path();

        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            fixtures.push(path);
        } else if path.is_dir() {
            fixtures.append(&mut discover_fixtures(&path)?);
        }
    }

    fixtures.sort();
    Ok(fixtures)
}
