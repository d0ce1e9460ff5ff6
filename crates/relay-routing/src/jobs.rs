//! Registry of long-running jobs.
//!
//! Maps the stable job id handed to callers onto the provider that accepted
//! the job and that provider's own id. Entries live until a poll observes a
//! terminal status; nothing is persisted.

use relay_core::{Capability, IgnoreLock as _, JobStatusResult};
use sha2::{Digest as _, Sha256};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::registry::AdapterRegistry;
use crate::{Result, RoutingError};

/// Prefix of every orchestrator job id.
const JOB_ID_PREFIX: &str = "job_";
/// Separator between provider name and native id in the hashed input.
const JOB_ID_SEPARATOR: u8 = 0x1f;

/// A job accepted by a provider and not yet observed terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveJob {
    /// Orchestrator job id
    pub job_id: String,
    /// Provider that accepted the job
    pub provider: String,
    /// The provider's own job id
    pub provider_job_id: String,
    /// Model the job runs on
    pub model: String,
}

/// Derives the orchestrator job id for a provider's native job id.
///
/// The id is a pure function of its inputs, so a given provider job always
/// maps to the same id and distinct provider jobs never collide in practice.
pub fn derive_job_id(provider: &str, provider_job_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(provider.as_bytes());
    hasher.update([JOB_ID_SEPARATOR]);
    hasher.update(provider_job_id.as_bytes());
    format!("{JOB_ID_PREFIX}{}", hex::encode(hasher.finalize()))
}

/// Thread-safe map of active jobs.
#[derive(Debug, Default)]
pub struct JobRegistry {
    /// Active jobs keyed by orchestrator job id
    jobs: Mutex<HashMap<String, ActiveJob>>,
}

impl JobRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a pending job and returns its orchestrator id.
    pub fn register(&self, provider: &str, provider_job_id: &str, model: &str) -> String {
        let job_id = derive_job_id(provider, provider_job_id);
        let job = ActiveJob {
            job_id: job_id.clone(),
            provider: provider.to_owned(),
            provider_job_id: provider_job_id.to_owned(),
            model: model.to_owned(),
        };
        self.jobs.lock_ignore_poison().insert(job_id.clone(), job);

        tracing::info!(job_id = %job_id, provider, provider_job_id, "Registered pending job");
        job_id
    }

    /// Looks up an active job.
    pub fn get(&self, job_id: &str) -> Option<ActiveJob> {
        self.jobs.lock_ignore_poison().get(job_id).cloned()
    }

    /// Removes a job, returning it if it was active.
    pub fn retire(&self, job_id: &str) -> Option<ActiveJob> {
        let retired = self.jobs.lock_ignore_poison().remove(job_id);
        if retired.is_some() {
            tracing::info!(job_id, "Retired job");
        }
        retired
    }

    /// Number of active jobs.
    pub fn len(&self) -> usize {
        self.jobs.lock_ignore_poison().len()
    }

    /// Whether no job is active.
    pub fn is_empty(&self) -> bool {
        self.jobs.lock_ignore_poison().is_empty()
    }

    /// Copies of every active job, ordered by job id.
    pub fn snapshot(&self) -> Vec<ActiveJob> {
        let mut jobs: Vec<_> = self.jobs.lock_ignore_poison().values().cloned().collect();
        jobs.sort_by(|left, right| left.job_id.cmp(&right.job_id));
        jobs
    }

    /// Polls the provider for a job's status, retiring the job once terminal.
    ///
    /// The entry is kept while the status is pending and when the poll fails
    /// with a retryable error. A poll error that cannot succeed on retry, such
    /// as the provider no longer knowing the job, retires it like a failure.
    ///
    /// # Errors
    /// Returns [`RoutingError::JobNotFound`] for unknown ids,
    /// [`RoutingError::ProviderNotRegistered`] when the provider's adapter is
    /// gone, [`RoutingError::CapabilityMissing`] when it cannot poll, and any
    /// adapter error from the poll.
    pub async fn poll(&self, job_id: &str, adapters: &AdapterRegistry) -> Result<JobStatusResult> {
        let job = self
            .get(job_id)
            .ok_or_else(|| RoutingError::JobNotFound(job_id.to_owned()))?;
        let adapter = adapters.require(&job.provider)?;

        if !adapter.supports(Capability::JobStatus) {
            return Err(RoutingError::CapabilityMissing {
                provider: job.provider,
                capability: Capability::JobStatus,
            });
        }

        let status = match adapter.check_job_status(&job.provider_job_id).await {
            Ok(status) => status,
            Err(error) => {
                if !error.is_retryable() {
                    tracing::warn!(job_id, provider = %job.provider, error = %error, "Job poll failed permanently");
                    self.retire(job_id);
                }
                return Err(RoutingError::from_adapter(error));
            }
        };

        if status.is_terminal() {
            self.retire(job_id);
        } else {
            tracing::debug!(job_id, provider = %job.provider, "Job still pending");
        }
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::Error;
    use relay_providers::MockAdapter;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn test_job_id_is_deterministic() {
        let first = derive_job_id("video", "abc");
        assert_eq!(first, derive_job_id("video", "abc"));
        assert!(first.starts_with("job_"));
        assert_eq!(first.len(), 4 + 64);

        assert_ne!(first, derive_job_id("video", "abd"));
        assert_ne!(derive_job_id("ab", "c"), derive_job_id("a", "bc"));
    }

    #[test]
    fn test_register_and_retire() {
        let registry = JobRegistry::new();
        let job_id = registry.register("video", "native-1", "v-1");

        assert_eq!(registry.len(), 1);
        let Some(job) = registry.get(&job_id) else {
            panic!("job should be active");
        };
        assert_eq!(job.provider_job_id, "native-1");
        assert_eq!(registry.snapshot(), vec![job]);

        assert!(registry.retire(&job_id).is_some());
        assert!(registry.retire(&job_id).is_none());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_poll_lifecycle() -> Result<()> {
        let mock = MockAdapter::new("video").with_job_statuses(
            "native-1",
            [
                JobStatusResult::Pending,
                JobStatusResult::Pending,
                JobStatusResult::Completed { data: json!("clip.mp4") },
            ],
        );
        let mut adapters = AdapterRegistry::new();
        adapters.register("video", Arc::new(mock.clone()));

        let jobs = JobRegistry::new();
        let job_id = jobs.register("video", "native-1", "v-1");

        assert_eq!(jobs.poll(&job_id, &adapters).await?, JobStatusResult::Pending);
        assert_eq!(jobs.poll(&job_id, &adapters).await?, JobStatusResult::Pending);
        assert_eq!(jobs.len(), 1);

        let done = jobs.poll(&job_id, &adapters).await?;
        assert_eq!(done, JobStatusResult::Completed { data: json!("clip.mp4") });
        assert!(jobs.is_empty());

        assert!(matches!(
            jobs.poll(&job_id, &adapters).await,
            Err(RoutingError::JobNotFound(_))
        ));
        assert_eq!(mock.polls().len(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_poll_without_capability_keeps_entry() {
        let mut adapters = AdapterRegistry::new();
        adapters.register("image", Arc::new(MockAdapter::new("image")));

        let jobs = JobRegistry::new();
        let job_id = jobs.register("image", "native-9", "i-1");

        let result = jobs.poll(&job_id, &adapters).await;
        assert!(matches!(
            result,
            Err(RoutingError::CapabilityMissing {
                capability: Capability::JobStatus,
                ..
            })
        ));
        assert_eq!(jobs.len(), 1);
    }

    #[tokio::test]
    async fn test_transient_poll_error_keeps_entry() -> Result<()> {
        let mock = MockAdapter::new("video")
            .with_job_statuses("native-1", [JobStatusResult::Completed { data: json!("clip.mp4") }])
            .with_poll_error("gateway timeout");
        let mut adapters = AdapterRegistry::new();
        adapters.register("video", Arc::new(mock));

        let jobs = JobRegistry::new();
        let job_id = jobs.register("video", "native-1", "v-1");

        assert!(matches!(
            jobs.poll(&job_id, &adapters).await,
            Err(RoutingError::Core(Error::Provider(_)))
        ));
        assert_eq!(jobs.len(), 1);

        assert!(jobs.poll(&job_id, &adapters).await?.is_terminal());
        assert!(jobs.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_job_on_provider_retires_entry() {
        let mock = MockAdapter::new("video").with_job_statuses("other", [JobStatusResult::Pending]);
        let mut adapters = AdapterRegistry::new();
        adapters.register("video", Arc::new(mock.clone()));

        let jobs = JobRegistry::new();
        let job_id = jobs.register("video", "native-1", "v-1");

        assert!(matches!(
            jobs.poll(&job_id, &adapters).await,
            Err(RoutingError::Core(Error::UnknownJob(_)))
        ));
        assert!(jobs.is_empty());
        assert!(matches!(
            jobs.poll(&job_id, &adapters).await,
            Err(RoutingError::JobNotFound(_))
        ));
        assert_eq!(mock.polls().len(), 1);
    }
}
