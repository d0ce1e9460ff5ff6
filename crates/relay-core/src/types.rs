//! Request and result types shared by the router and every adapter.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Kind of content a model produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    /// Text generation
    Text,
    /// Image generation
    Image,
    /// Audio generation
    Audio,
    /// Video generation
    Video,
}

impl Display for ContentType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let label = match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Audio => "audio",
            Self::Video => "video",
        };
        f.write_str(label)
    }
}

/// Quality tier of a model. Ordered `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    /// Cheapest, least capable models
    Low,
    /// Balanced models
    Medium,
    /// Most capable models
    High,
}

impl QualityTier {
    /// Sort rank used by the quality strategy; lower sorts first.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::High => 1,
            Self::Medium => 2,
            Self::Low => 3,
        }
    }
}

impl Display for QualityTier {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let label = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        };
        f.write_str(label)
    }
}

/// Ranking rule used to order eligible candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Cheapest first
    #[default]
    Cost,
    /// Fastest known average latency first
    Latency,
    /// Highest quality tier first
    Quality,
}

/// Optional sampling parameters forwarded to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationParams {
    /// Sampling temperature
    pub temperature: Option<f64>,
    /// Maximum number of tokens to generate
    pub max_tokens: Option<u32>,
    /// Nucleus sampling threshold
    pub top_p: Option<f64>,
}

/// A content-generation request as received by the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    /// Content type the caller wants back
    pub content_type: ContentType,
    /// Prompt text
    pub prompt: String,
    /// Ranking strategy for candidate ordering
    #[serde(default)]
    pub strategy: Strategy,
    /// Restrict candidates to exactly this quality tier
    #[serde(default)]
    pub quality: Option<QualityTier>,
    /// Sampling parameters
    #[serde(default)]
    pub params: GenerationParams,
    /// System instruction
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// Session identifier for stateful multi-turn backends
    #[serde(default)]
    pub session_id: Option<String>,
}

impl GenerateRequest {
    /// Creates a request with the default (cost) strategy and no filters.
    pub fn new(content_type: ContentType, prompt: impl Into<String>) -> Self {
        Self {
            content_type,
            prompt: prompt.into(),
            strategy: Strategy::default(),
            quality: None,
            params: GenerationParams::default(),
            system_prompt: None,
            session_id: None,
        }
    }

    /// Creates a text generation request.
    pub fn text(prompt: impl Into<String>) -> Self {
        Self::new(ContentType::Text, prompt)
    }

    /// Sets the ranking strategy.
    #[must_use]
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Restricts candidates to a single quality tier.
    #[must_use]
    pub fn with_quality(mut self, quality: QualityTier) -> Self {
        self.quality = Some(quality);
        self
    }

    /// Sets the sampling temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.params.temperature = Some(temperature);
        self
    }

    /// Sets the maximum number of generated tokens.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.params.max_tokens = Some(max_tokens);
        self
    }

    /// Sets the nucleus sampling threshold.
    #[must_use]
    pub fn with_top_p(mut self, top_p: f64) -> Self {
        self.params.top_p = Some(top_p);
        self
    }

    /// Sets the system instruction.
    #[must_use]
    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    /// Attaches a session identifier.
    #[must_use]
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

/// Token accounting reported by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Prompt tokens
    pub input: u64,
    /// Generated tokens
    pub output: u64,
}

impl TokenUsage {
    /// Total tokens billed for the call.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.input + self.output
    }
}

/// Outcome of a generate call.
///
/// Exactly one shape exists at a time, so a result can never carry both data
/// and an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum GenerateResult {
    /// The backend produced its payload.
    Completed {
        /// Generated payload
        data: Value,
        /// Provider that served the request
        provider: String,
        /// Model that served the request
        model: String,
        /// Token usage, when reported
        #[serde(default, skip_serializing_if = "Option::is_none")]
        usage: Option<TokenUsage>,
    },
    /// The backend accepted the request as a long-running job.
    ///
    /// Adapters put their own job id in `job_id`. The orchestrator replaces it
    /// with its own stable id and moves the native id to `provider_job_id`.
    Pending {
        /// Job identifier to poll with
        job_id: String,
        /// Backend-native identifier, set once the orchestrator has rewritten `job_id`
        #[serde(default, skip_serializing_if = "Option::is_none")]
        provider_job_id: Option<String>,
        /// Provider running the job
        provider: String,
        /// Model running the job
        model: String,
    },
    /// The call failed.
    Failed {
        /// Human-readable error
        error: String,
        /// Provider involved, when known
        #[serde(default, skip_serializing_if = "Option::is_none")]
        provider: Option<String>,
        /// Model involved, when known
        #[serde(default, skip_serializing_if = "Option::is_none")]
        model: Option<String>,
    },
}

impl GenerateResult {
    /// Builds a completed result.
    pub fn completed(data: Value, provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self::Completed {
            data,
            provider: provider.into(),
            model: model.into(),
            usage: None,
        }
    }

    /// Builds a pending result carrying the backend's own job id.
    pub fn pending(
        job_id: impl Into<String>,
        provider: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self::Pending {
            job_id: job_id.into(),
            provider_job_id: None,
            provider: provider.into(),
            model: model.into(),
        }
    }

    /// Builds a failed result with no provider attribution.
    pub fn failed(error: impl Into<String>) -> Self {
        Self::Failed {
            error: error.into(),
            provider: None,
            model: None,
        }
    }

    /// Builds a failed result attributed to a provider and model.
    pub fn failed_for(
        error: impl Into<String>,
        provider: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self::Failed {
            error: error.into(),
            provider: Some(provider.into()),
            model: Some(model.into()),
        }
    }

    /// Attaches token usage to a completed result. Other shapes are unchanged.
    #[must_use]
    pub fn with_usage(mut self, token_usage: Option<TokenUsage>) -> Self {
        if let Self::Completed { usage, .. } = &mut self {
            *usage = token_usage;
        }
        self
    }

    /// Whether the call completed.
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    /// Whether the call is a pending job.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending { .. })
    }

    /// Whether the call failed.
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// The payload of a completed result.
    pub fn data(&self) -> Option<&Value> {
        match self {
            Self::Completed { data, .. } => Some(data),
            Self::Pending { .. } | Self::Failed { .. } => None,
        }
    }

    /// The error of a failed result.
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failed { error, .. } => Some(error),
            Self::Completed { .. } | Self::Pending { .. } => None,
        }
    }

    /// The job id of a pending result.
    pub fn job_id(&self) -> Option<&str> {
        match self {
            Self::Pending { job_id, .. } => Some(job_id),
            Self::Completed { .. } | Self::Failed { .. } => None,
        }
    }

    /// The provider echoed by the result, when known.
    pub fn provider(&self) -> Option<&str> {
        match self {
            Self::Completed { provider, .. } | Self::Pending { provider, .. } => Some(provider),
            Self::Failed { provider, .. } => provider.as_deref(),
        }
    }

    /// The model echoed by the result, when known.
    pub fn model(&self) -> Option<&str> {
        match self {
            Self::Completed { model, .. } | Self::Pending { model, .. } => Some(model),
            Self::Failed { model, .. } => model.as_deref(),
        }
    }
}

/// Status of a long-running job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum JobStatusResult {
    /// Still running
    Pending,
    /// Finished with a payload
    Completed {
        /// Generated payload
        data: Value,
    },
    /// Finished with an error
    Failed {
        /// Human-readable error
        error: String,
    },
}

impl JobStatusResult {
    /// Builds a failed status.
    pub fn failed(error: impl Into<String>) -> Self {
        Self::Failed {
            error: error.into(),
        }
    }

    /// Completed and failed statuses are terminal.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// The error of a failed status.
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failed { error } => Some(error),
            Self::Pending | Self::Completed { .. } => None,
        }
    }
}

/// One element of a streamed generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamChunk {
    /// Partial output
    Delta {
        /// Text fragment
        text: String,
    },
    /// Final element of a successful stream
    Completed {
        /// Full payload
        data: Value,
        /// Token usage, when reported
        #[serde(default, skip_serializing_if = "Option::is_none")]
        usage: Option<TokenUsage>,
    },
    /// Final element of a failed stream
    Error {
        /// Human-readable error
        error: String,
    },
}

impl StreamChunk {
    /// Builds a delta chunk.
    pub fn delta(text: impl Into<String>) -> Self {
        Self::Delta { text: text.into() }
    }

    /// Builds a terminal error chunk.
    pub fn error(error: impl Into<String>) -> Self {
        Self::Error {
            error: error.into(),
        }
    }

    /// Completed and error chunks end a stream.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Delta { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{from_value, json, to_value};

    #[test]
    fn test_quality_rank_order() {
        assert!(QualityTier::High.rank() < QualityTier::Medium.rank());
        assert!(QualityTier::Medium.rank() < QualityTier::Low.rank());
        assert!(QualityTier::Low < QualityTier::High);
    }

    #[test]
    fn test_request_builder() {
        let request = GenerateRequest::text("Hello")
            .with_strategy(Strategy::Latency)
            .with_quality(QualityTier::High)
            .with_temperature(0.2)
            .with_max_tokens(64)
            .with_top_p(0.9)
            .with_system_prompt("Be brief")
            .with_session("session-1");

        assert_eq!(request.content_type, ContentType::Text);
        assert_eq!(request.strategy, Strategy::Latency);
        assert_eq!(request.quality, Some(QualityTier::High));
        assert_eq!(request.params.max_tokens, Some(64));
        assert_eq!(request.system_prompt.as_deref(), Some("Be brief"));
        assert_eq!(request.session_id.as_deref(), Some("session-1"));
    }

    #[test]
    fn test_request_defaults_when_deserialized() {
        let request: GenerateRequest =
            match from_value(json!({"contentType": "image", "prompt": "a cat"})) {
                Ok(request) => request,
                Err(error) => panic!("deserialize failed: {error}"),
            };
        assert_eq!(request.content_type, ContentType::Image);
        assert_eq!(request.strategy, Strategy::Cost);
        assert!(request.quality.is_none());
    }

    #[test]
    fn test_generate_result_shapes() {
        let completed = GenerateResult::completed(json!("hi"), "alpha", "alpha-1")
            .with_usage(Some(TokenUsage {
                input: 3,
                output: 4,
            }));
        assert!(completed.is_completed());
        assert_eq!(completed.data(), Some(&json!("hi")));
        assert!(completed.error().is_none());

        let failed = GenerateResult::failed("boom");
        assert_eq!(failed.error(), Some("boom"));
        assert!(failed.data().is_none());
        assert!(failed.provider().is_none());

        let pending = GenerateResult::pending("native-1", "beta", "beta-video");
        assert_eq!(pending.job_id(), Some("native-1"));
        assert_eq!(pending.provider(), Some("beta"));
        assert_eq!(pending.with_usage(None).job_id(), Some("native-1"));
    }

    #[test]
    fn test_generate_result_wire_shape() {
        let failed = GenerateResult::failed_for("status 500", "alpha", "alpha-1");
        let value = match to_value(&failed) {
            Ok(value) => value,
            Err(error) => panic!("serialize failed: {error}"),
        };
        assert_eq!(
            value,
            json!({"status": "failed", "error": "status 500", "provider": "alpha", "model": "alpha-1"})
        );
    }

    #[test]
    fn test_terminal_states() {
        assert!(!JobStatusResult::Pending.is_terminal());
        assert!(JobStatusResult::failed("x").is_terminal());
        assert!(JobStatusResult::Completed { data: json!(1) }.is_terminal());

        assert!(!StreamChunk::delta("a").is_terminal());
        assert!(StreamChunk::error("b").is_terminal());
    }

    #[test]
    fn test_token_usage_total() {
        let usage = TokenUsage {
            input: 10,
            output: 5,
        };
        assert_eq!(usage.total(), 15);
    }
}
