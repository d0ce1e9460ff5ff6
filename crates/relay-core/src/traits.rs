use async_trait::async_trait;
use futures::stream::BoxStream;
use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::{Error, GenerateRequest, GenerateResult, JobStatusResult, Result, StreamChunk};

/// Lazy, finite stream of partial results. Ends after a terminal chunk.
pub type ChunkStream = BoxStream<'static, StreamChunk>;

/// Optional capabilities an adapter may implement beyond `generate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Polling the status of a long-running job
    JobStatus,
    /// Streaming partial results
    Streaming,
    /// Computing embeddings
    Embedding,
    /// Counting tokens for a request
    TokenCounting,
    /// Tearing down a stateful chat session
    SessionTeardown,
}

impl Capability {
    /// Every optional capability.
    pub const ALL: [Self; 5] = [
        Self::JobStatus,
        Self::Streaming,
        Self::Embedding,
        Self::TokenCounting,
        Self::SessionTeardown,
    ];
}

impl Display for Capability {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let label = match self {
            Self::JobStatus => "job status polling",
            Self::Streaming => "streaming",
            Self::Embedding => "embeddings",
            Self::TokenCounting => "token counting",
            Self::SessionTeardown => "chat session teardown",
        };
        f.write_str(label)
    }
}

/// Uniform contract every backend integration implements.
///
/// Only [`ProviderAdapter::generate`] is required. The optional operations
/// default to [`Error::CapabilityMissing`]; adapters that implement one must
/// also report it from [`ProviderAdapter::supports`] so callers can check
/// before calling.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Returns the adapter's display name, used in logs.
    fn name(&self) -> &str;

    /// Whether this adapter implements the given optional capability.
    fn supports(&self, _capability: Capability) -> bool {
        false
    }

    /// Generates content for `request` with the given model.
    ///
    /// # Errors
    ///
    /// Returns an error when the call could not produce a structured result.
    /// Callers treat an error exactly like a failed result.
    async fn generate(&self, request: &GenerateRequest, model_id: &str) -> Result<GenerateResult>;

    /// Polls the status of a job this adapter previously reported as pending.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapabilityMissing`] unless overridden.
    async fn check_job_status(&self, _provider_job_id: &str) -> Result<JobStatusResult> {
        Err(Error::capability_missing(self.name(), Capability::JobStatus))
    }

    /// Opens a stream of partial results.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapabilityMissing`] unless overridden.
    async fn generate_stream(
        &self,
        _request: &GenerateRequest,
        _model_id: &str,
    ) -> Result<ChunkStream> {
        Err(Error::capability_missing(self.name(), Capability::Streaming))
    }

    /// Computes one embedding vector per input text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapabilityMissing`] unless overridden.
    async fn embed_content(&self, _texts: &[String], _model_id: &str) -> Result<Vec<Vec<f32>>> {
        Err(Error::capability_missing(self.name(), Capability::Embedding))
    }

    /// Counts the tokens `request` would consume.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapabilityMissing`] unless overridden.
    async fn count_tokens(&self, _request: &GenerateRequest, _model_id: &str) -> Result<u64> {
        Err(Error::capability_missing(
            self.name(),
            Capability::TokenCounting,
        ))
    }

    /// Ends a stateful chat session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapabilityMissing`] unless overridden.
    async fn end_chat_session(&self, _session_id: &str) -> Result<()> {
        Err(Error::capability_missing(
            self.name(),
            Capability::SessionTeardown,
        ))
    }
}
