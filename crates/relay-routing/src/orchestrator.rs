//! Fallback orchestrator: the public entry point of the router.
//!
//! A request is matched against the catalog, the eligible candidates are
//! ranked, and each candidate's adapter is tried in turn until one completes
//! or accepts a long-running job. Adapter errors and panics count as failures
//! of that candidate; callers only ever see a structured result.

use core::any::Any;
use core::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::ready;
use futures::{FutureExt as _, StreamExt as _, stream};
use relay_core::{
    Capability, Catalog, ChunkStream, GenerateRequest, GenerateResult, JobStatusResult,
    ProviderAdapter, RelayConfig, StreamChunk,
};

use crate::jobs::{ActiveJob, JobRegistry};
use crate::registry::AdapterRegistry;
use crate::selector::{Candidate, select_candidates};
use crate::{Result, RoutingError};

/// Routes generation requests across providers with ordered fallback.
pub struct Orchestrator {
    /// Providers and models eligible for routing
    catalog: Catalog,
    /// Adapters keyed by provider name
    adapters: AdapterRegistry,
    /// Jobs awaiting a terminal status
    jobs: JobRegistry,
}

/// Builder wiring a catalog to its adapters.
pub struct OrchestratorBuilder {
    /// Catalog the orchestrator will route over
    catalog: Catalog,
    /// Adapters registered so far
    adapters: AdapterRegistry,
}

impl OrchestratorBuilder {
    /// Starts a builder with no adapters.
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            adapters: AdapterRegistry::new(),
        }
    }

    /// Registers a generic HTTP adapter for every provider with a `generic` block.
    ///
    /// # Errors
    /// Returns an error if a generic adapter cannot be constructed.
    pub fn with_generic_adapters(mut self) -> Result<Self> {
        for (name, adapter) in AdapterRegistry::from_catalog(&self.catalog)?.into_entries() {
            self.adapters.register(name, adapter);
        }
        Ok(self)
    }

    /// Registers the adapter for a provider.
    #[must_use]
    pub fn with_adapter(
        mut self,
        provider: impl Into<String>,
        adapter: Arc<dyn ProviderAdapter>,
    ) -> Self {
        self.adapters.register(provider, adapter);
        self
    }

    /// Finishes the orchestrator.
    pub fn build(self) -> Orchestrator {
        Orchestrator::new(self.catalog, self.adapters)
    }
}

impl Orchestrator {
    /// Creates an orchestrator over `catalog` with the given adapters.
    pub fn new(catalog: Catalog, adapters: AdapterRegistry) -> Self {
        for provider in catalog.providers() {
            if !adapters.contains(&provider.name) {
                tracing::warn!(provider = %provider.name, "No adapter registered; its models will be skipped");
            }
        }
        Self {
            catalog,
            adapters,
            jobs: JobRegistry::new(),
        }
    }

    /// Starts a builder for `catalog`.
    pub fn builder(catalog: Catalog) -> OrchestratorBuilder {
        OrchestratorBuilder::new(catalog)
    }

    /// Builds the catalog from config and registers generic HTTP adapters.
    /// Vendor adapters are registered afterwards with [`Orchestrator::register_adapter`].
    ///
    /// # Errors
    /// Returns an error if the config is invalid or an adapter cannot be built.
    pub fn from_config(config: RelayConfig) -> Result<Self> {
        let catalog = config.into_catalog()?;
        let adapters = AdapterRegistry::from_catalog(&catalog)?;
        Ok(Self::new(catalog, adapters))
    }

    /// Registers (or replaces) the adapter for a provider.
    pub fn register_adapter(
        &mut self,
        provider: impl Into<String>,
        adapter: Arc<dyn ProviderAdapter>,
    ) {
        self.adapters.register(provider, adapter);
    }

    /// The catalog this orchestrator routes over.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// The adapter registry.
    pub fn adapters(&self) -> &AdapterRegistry {
        &self.adapters
    }

    /// The candidates `generate` would try for `request`, in order.
    pub fn candidates(&self, request: &GenerateRequest) -> Vec<Candidate<'_>> {
        select_candidates(&self.catalog, request)
    }

    /// Generates content, falling back across candidates until one succeeds.
    ///
    /// Returns the first completed result, or a pending result carrying a
    /// stable job id for [`Orchestrator::get_job_result`]. Never panics and
    /// never returns an error; failures come back as [`GenerateResult::Failed`].
    pub async fn generate(&self, request: &GenerateRequest) -> GenerateResult {
        let candidates = self.candidates(request);
        if candidates.is_empty() {
            let error = RoutingError::NoSuitableProvider {
                content_type: request.content_type,
            };
            tracing::warn!(error = %error, "Request has no candidates");
            return GenerateResult::failed(error.to_string());
        }

        let mut attempts = 0_usize;
        for candidate in &candidates {
            let provider = candidate.provider_name();
            let model = candidate.model_id();

            let Some(adapter) = self.adapters.get(provider) else {
                tracing::warn!(provider, model, "No adapter registered, skipping candidate");
                continue;
            };
            attempts += 1;

            let outcome = AssertUnwindSafe(adapter.generate(request, model))
                .catch_unwind()
                .await;
            let result = match outcome {
                Ok(Ok(result)) => result,
                Ok(Err(error)) => {
                    tracing::warn!(
                        provider,
                        model,
                        error = %error,
                        retryable = error.is_retryable(),
                        "Candidate failed"
                    );
                    continue;
                }
                Err(payload) => {
                    tracing::warn!(
                        provider,
                        model,
                        panic = %panic_message(payload.as_ref()),
                        "Adapter panicked"
                    );
                    continue;
                }
            };

            match result {
                GenerateResult::Completed { .. } => {
                    tracing::info!(provider, model, attempts, "Request completed");
                    return result;
                }
                GenerateResult::Pending {
                    job_id: provider_job_id,
                    ..
                } if !provider_job_id.is_empty() => {
                    return self.accept_job(adapter.as_ref(), candidate, provider_job_id);
                }
                GenerateResult::Pending { .. } => {
                    tracing::warn!(provider, model, "Pending result carried no job id");
                }
                GenerateResult::Failed { error, .. } => {
                    tracing::warn!(provider, model, error = %error, "Candidate returned failure");
                }
            }
        }

        let error = RoutingError::AllProvidersFailed { attempts };
        tracing::error!(
            candidates = candidates.len(),
            attempts,
            "All candidates failed"
        );
        GenerateResult::failed(error.to_string())
    }

    /// Registers a pending job and rewrites the result to carry the stable id.
    fn accept_job(
        &self,
        adapter: &dyn ProviderAdapter,
        candidate: &Candidate<'_>,
        provider_job_id: String,
    ) -> GenerateResult {
        let provider = candidate.provider_name();
        let model = candidate.model_id();

        if !adapter.supports(Capability::JobStatus) {
            tracing::warn!(
                provider,
                model,
                "Adapter returned a pending job but cannot poll job status; polling will fail"
            );
        }

        let job_id = self.jobs.register(provider, &provider_job_id, model);
        GenerateResult::Pending {
            job_id,
            provider_job_id: Some(provider_job_id),
            provider: provider.to_owned(),
            model: model.to_owned(),
        }
    }

    /// Polls a job returned by [`Orchestrator::generate`].
    ///
    /// Terminal statuses retire the job, so a later poll of the same id
    /// reports it as not found. Never panics and never returns an error.
    pub async fn get_job_result(&self, job_id: &str) -> JobStatusResult {
        let outcome = AssertUnwindSafe(self.jobs.poll(job_id, &self.adapters))
            .catch_unwind()
            .await;
        match outcome {
            Ok(Ok(status)) => status,
            Ok(Err(error)) => {
                tracing::warn!(job_id, error = %error, "Job poll failed");
                JobStatusResult::failed(error.to_string())
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::warn!(job_id, panic = %message, "Adapter panicked while polling");
                JobStatusResult::failed(format!("Adapter panicked while polling: {message}"))
            }
        }
    }

    /// Streams content from the first candidate that supports streaming.
    ///
    /// The stream ends after its first completed or error chunk, and gains a
    /// closing error chunk if the adapter's stream runs out without one. When
    /// no candidate can stream, it yields a single error chunk.
    pub async fn generate_stream(&self, request: &GenerateRequest) -> ChunkStream {
        match self.open_stream(request).await {
            Ok(chunks) => end_after_terminal(chunks),
            Err(error) => {
                tracing::warn!(error = %error, "No stream opened");
                stream::iter([StreamChunk::error(error.to_string())]).boxed()
            }
        }
    }

    async fn open_stream(&self, request: &GenerateRequest) -> Result<ChunkStream> {
        let candidates = self.candidates(request);
        if candidates.is_empty() {
            return Err(RoutingError::NoSuitableProvider {
                content_type: request.content_type,
            });
        }

        for candidate in &candidates {
            let provider = candidate.provider_name();
            let model = candidate.model_id();
            let Some(adapter) = self.adapters.get(provider) else {
                tracing::warn!(provider, model, "No adapter registered, skipping candidate");
                continue;
            };
            if !adapter.supports(Capability::Streaming) {
                tracing::debug!(provider, model, "Adapter cannot stream, skipping candidate");
                continue;
            }

            let outcome = AssertUnwindSafe(adapter.generate_stream(request, model))
                .catch_unwind()
                .await;
            match outcome {
                Ok(Ok(chunks)) => {
                    tracing::info!(provider, model, "Stream opened");
                    return Ok(chunks);
                }
                Ok(Err(error)) => {
                    tracing::warn!(provider, model, error = %error, "Stream failed to open");
                }
                Err(payload) => {
                    tracing::warn!(
                        provider,
                        model,
                        panic = %panic_message(payload.as_ref()),
                        "Adapter panicked opening stream"
                    );
                }
            }
        }

        Err(RoutingError::NoStreamingProvider {
            content_type: request.content_type,
        })
    }

    /// Computes embeddings with a specific provider's adapter.
    ///
    /// # Errors
    /// Returns [`RoutingError::ProviderNotRegistered`],
    /// [`RoutingError::CapabilityMissing`] or the adapter's error.
    pub async fn embed_content(
        &self,
        provider: &str,
        model_id: &str,
        texts: &[String],
    ) -> Result<Vec<Vec<f32>>> {
        let adapter = self.capable_adapter(provider, Capability::Embedding)?;
        adapter
            .embed_content(texts, model_id)
            .await
            .map_err(RoutingError::from_adapter)
    }

    /// Counts the tokens a request would consume on a specific provider.
    ///
    /// # Errors
    /// Returns [`RoutingError::ProviderNotRegistered`],
    /// [`RoutingError::CapabilityMissing`] or the adapter's error.
    pub async fn count_tokens(
        &self,
        provider: &str,
        model_id: &str,
        request: &GenerateRequest,
    ) -> Result<u64> {
        let adapter = self.capable_adapter(provider, Capability::TokenCounting)?;
        adapter
            .count_tokens(request, model_id)
            .await
            .map_err(RoutingError::from_adapter)
    }

    /// Ends a stateful chat session on a specific provider.
    ///
    /// # Errors
    /// Returns [`RoutingError::ProviderNotRegistered`],
    /// [`RoutingError::CapabilityMissing`] or the adapter's error.
    pub async fn end_chat_session(&self, provider: &str, session_id: &str) -> Result<()> {
        let adapter = self.capable_adapter(provider, Capability::SessionTeardown)?;
        adapter
            .end_chat_session(session_id)
            .await
            .map_err(RoutingError::from_adapter)
    }

    /// Jobs awaiting a terminal status.
    pub fn active_jobs(&self) -> Vec<ActiveJob> {
        self.jobs.snapshot()
    }

    /// Number of jobs awaiting a terminal status.
    pub fn active_job_count(&self) -> usize {
        self.jobs.len()
    }

    fn capable_adapter(
        &self,
        provider: &str,
        capability: Capability,
    ) -> Result<Arc<dyn ProviderAdapter>> {
        let adapter = self.adapters.require(provider)?;
        if adapter.supports(capability) {
            Ok(adapter)
        } else {
            Err(RoutingError::CapabilityMissing {
                provider: provider.to_owned(),
                capability,
            })
        }
    }
}

/// Cuts a stream off after its first terminal chunk, and closes a stream that
/// ran out without one with an error chunk.
fn end_after_terminal(chunks: ChunkStream) -> ChunkStream {
    chunks
        .map(Some)
        .chain(stream::once(ready(None)))
        .scan(false, |finished, next| {
            if *finished {
                return ready(None);
            }
            let chunk = match next {
                Some(chunk) => {
                    *finished = chunk.is_terminal();
                    chunk
                }
                None => {
                    *finished = true;
                    tracing::warn!("Stream ended without a terminal chunk");
                    StreamChunk::error("stream ended without a terminal element")
                }
            };
            ready(Some(chunk))
        })
        .boxed()
}

/// Best-effort text of a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_owned())
}
