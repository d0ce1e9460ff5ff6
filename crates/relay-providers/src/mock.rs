//! Mock adapter for testing routing behavior.
//!
//! Outcomes are scripted per model so tests can drive the orchestrator
//! through failures, fallbacks, pending jobs and panics without a backend.

use async_trait::async_trait;
use futures::StreamExt as _;
use futures::stream;
use relay_core::{
    Capability, ChunkStream, Error, GenerateRequest, GenerateResult, IgnoreLock as _,
    JobStatusResult, ProviderAdapter, Result, StreamChunk, TokenUsage,
};
use serde_json::Value;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

/// Scripted outcomes keyed by model id
type OutcomeMap = Arc<Mutex<HashMap<String, VecDeque<MockOutcome>>>>;
/// Scripted job status sequences keyed by native job id
type StatusMap = Arc<Mutex<HashMap<String, VecDeque<JobStatusResult>>>>;

/// What a scripted `generate` call does.
#[derive(Debug, Clone, PartialEq)]
pub enum MockOutcome {
    /// Return a completed result with this payload
    Complete(Value),
    /// Return a pending result with this native job id
    Pending(String),
    /// Return a failed result with this message
    Fail(String),
    /// Return `Err(Error::Provider)` with this message
    Error(String),
    /// Panic with this message
    Panic(String),
}

/// One recorded `generate` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCall {
    /// Model the call was made with
    pub model: String,
    /// Prompt of the request
    pub prompt: String,
}

/// Mock adapter that returns scripted outcomes and records every call.
///
/// Clones share their script and history.
#[derive(Clone)]
pub struct MockAdapter {
    /// Provider name this adapter is registered under
    name: String,
    /// Outcome queues per model; the last queued outcome is not consumed
    outcomes: OutcomeMap,
    /// Outcome for models with no script
    default_outcome: Arc<Mutex<Option<MockOutcome>>>,
    /// Status sequences per job; the last status repeats
    job_statuses: StatusMap,
    /// Transient errors returned by the next polls, in order
    poll_errors: Arc<Mutex<VecDeque<String>>>,
    /// Stream scripts per model
    streams: Arc<Mutex<HashMap<String, Vec<StreamChunk>>>>,
    /// Optional capabilities this mock reports
    capabilities: Arc<Mutex<HashSet<Capability>>>,
    /// Usage attached to completed results
    usage: Option<TokenUsage>,
    /// Generate calls in order
    call_history: Arc<Mutex<Vec<MockCall>>>,
    /// Job ids polled in order
    polls: Arc<Mutex<Vec<String>>>,
    /// Sessions ended in order
    ended_sessions: Arc<Mutex<Vec<String>>>,
}

impl MockAdapter {
    /// Create a new mock adapter with a given provider name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            outcomes: Arc::new(Mutex::new(HashMap::new())),
            default_outcome: Arc::new(Mutex::new(None)),
            job_statuses: Arc::new(Mutex::new(HashMap::new())),
            poll_errors: Arc::new(Mutex::new(VecDeque::new())),
            streams: Arc::new(Mutex::new(HashMap::new())),
            capabilities: Arc::new(Mutex::new(HashSet::new())),
            usage: None,
            call_history: Arc::new(Mutex::new(Vec::new())),
            polls: Arc::new(Mutex::new(Vec::new())),
            ended_sessions: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queue an outcome for a model. Queued outcomes are used in order and the
    /// last one keeps answering once the others are consumed.
    #[must_use]
    pub fn with_outcome(self, model_id: impl Into<String>, outcome: MockOutcome) -> Self {
        self.outcomes
            .lock_ignore_poison()
            .entry(model_id.into())
            .or_default()
            .push_back(outcome);
        self
    }

    /// Set the outcome for models with no script.
    #[must_use]
    pub fn with_default_outcome(self, outcome: MockOutcome) -> Self {
        *self.default_outcome.lock_ignore_poison() = Some(outcome);
        self
    }

    /// Script the statuses returned for a job. Enables job status polling.
    #[must_use]
    pub fn with_job_statuses(
        self,
        job_id: impl Into<String>,
        statuses: impl IntoIterator<Item = JobStatusResult>,
    ) -> Self {
        self.job_statuses
            .lock_ignore_poison()
            .insert(job_id.into(), statuses.into_iter().collect());
        self.with_capability(Capability::JobStatus)
    }

    /// Fail the next job poll with a transient provider error. Each call
    /// queues one more failing poll.
    #[must_use]
    pub fn with_poll_error(self, message: impl Into<String>) -> Self {
        self.poll_errors.lock_ignore_poison().push_back(message.into());
        self.with_capability(Capability::JobStatus)
    }

    /// Script the chunks streamed for a model. Enables streaming.
    #[must_use]
    pub fn with_stream(self, model_id: impl Into<String>, chunks: Vec<StreamChunk>) -> Self {
        self.streams
            .lock_ignore_poison()
            .insert(model_id.into(), chunks);
        self.with_capability(Capability::Streaming)
    }

    /// Report an optional capability.
    #[must_use]
    pub fn with_capability(self, capability: Capability) -> Self {
        self.capabilities.lock_ignore_poison().insert(capability);
        self
    }

    /// Attach token usage to completed results.
    #[must_use]
    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = Some(usage);
        self
    }

    /// Get the call history (every generate call made).
    #[must_use]
    pub fn calls(&self) -> Vec<MockCall> {
        self.call_history.lock_ignore_poison().clone()
    }

    /// Get the number of generate calls made.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.call_history.lock_ignore_poison().len()
    }

    /// Job ids polled, in order.
    #[must_use]
    pub fn polls(&self) -> Vec<String> {
        self.polls.lock_ignore_poison().clone()
    }

    /// Sessions ended, in order.
    #[must_use]
    pub fn ended_sessions(&self) -> Vec<String> {
        self.ended_sessions.lock_ignore_poison().clone()
    }

    /// Clear the recorded history.
    pub fn clear_history(&self) {
        self.call_history.lock_ignore_poison().clear();
        self.polls.lock_ignore_poison().clear();
        self.ended_sessions.lock_ignore_poison().clear();
    }

    /// Next scripted outcome for a model.
    fn next_outcome(&self, model_id: &str, prompt: &str) -> MockOutcome {
        let scripted = {
            let mut outcomes = self.outcomes.lock_ignore_poison();
            outcomes.get_mut(model_id).and_then(|queue| {
                if queue.len() > 1 {
                    queue.pop_front()
                } else {
                    queue.front().cloned()
                }
            })
        };

        scripted.unwrap_or_else(|| {
            self.default_outcome
                .lock_ignore_poison()
                .clone()
                .unwrap_or_else(|| {
                    MockOutcome::Complete(Value::from(format!("Mock response for prompt: {prompt}")))
                })
        })
    }

    fn require(&self, capability: Capability) -> Result<()> {
        if self.supports(capability) {
            Ok(())
        } else {
            Err(Error::capability_missing(&self.name, capability))
        }
    }
}

#[async_trait]
impl ProviderAdapter for MockAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn supports(&self, capability: Capability) -> bool {
        self.capabilities.lock_ignore_poison().contains(&capability)
    }

    async fn generate(&self, request: &GenerateRequest, model_id: &str) -> Result<GenerateResult> {
        self.call_history.lock_ignore_poison().push(MockCall {
            model: model_id.to_owned(),
            prompt: request.prompt.clone(),
        });

        match self.next_outcome(model_id, &request.prompt) {
            MockOutcome::Complete(data) => {
                Ok(GenerateResult::completed(data, &self.name, model_id).with_usage(self.usage))
            }
            MockOutcome::Pending(job_id) => Ok(GenerateResult::pending(job_id, &self.name, model_id)),
            MockOutcome::Fail(message) => {
                Ok(GenerateResult::failed_for(message, &self.name, model_id))
            }
            MockOutcome::Error(message) => Err(Error::Provider(message)),
            MockOutcome::Panic(message) => panic!("{message}"),
        }
    }

    async fn check_job_status(&self, provider_job_id: &str) -> Result<JobStatusResult> {
        self.require(Capability::JobStatus)?;
        self.polls.lock_ignore_poison().push(provider_job_id.to_owned());
        if let Some(message) = self.poll_errors.lock_ignore_poison().pop_front() {
            return Err(Error::Provider(message));
        }

        let mut statuses = self.job_statuses.lock_ignore_poison();
        let queue = statuses
            .get_mut(provider_job_id)
            .ok_or_else(|| Error::UnknownJob(provider_job_id.to_owned()))?;
        let status = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        drop(statuses);

        status.ok_or_else(|| Error::Provider(format!("No status scripted for {provider_job_id}")))
    }

    async fn generate_stream(
        &self,
        request: &GenerateRequest,
        model_id: &str,
    ) -> Result<ChunkStream> {
        self.require(Capability::Streaming)?;

        let chunks = self
            .streams
            .lock_ignore_poison()
            .get(model_id)
            .cloned()
            .unwrap_or_else(|| {
                vec![
                    StreamChunk::delta(request.prompt.clone()),
                    StreamChunk::Completed {
                        data: Value::from(request.prompt.clone()),
                        usage: None,
                    },
                ]
            });
        Ok(stream::iter(chunks).boxed())
    }

    async fn embed_content(&self, texts: &[String], _model_id: &str) -> Result<Vec<Vec<f32>>> {
        self.require(Capability::Embedding)?;
        Ok(texts.iter().map(|text| vec![text.len() as f32]).collect())
    }

    async fn count_tokens(&self, request: &GenerateRequest, _model_id: &str) -> Result<u64> {
        self.require(Capability::TokenCounting)?;
        Ok(request.prompt.split_whitespace().count() as u64)
    }

    async fn end_chat_session(&self, session_id: &str) -> Result<()> {
        self.require(Capability::SessionTeardown)?;
        self.ended_sessions
            .lock_ignore_poison()
            .push(session_id.to_owned());
        Ok(())
    }
}
