//! Adapter for self-hosted JSON-over-HTTP backends.
//!
//! Generate and embed calls POST a rendered template (or a default payload)
//! and pass a cached health probe first. Jobs are polled at `<base>/job/<id>`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Url};
use serde::Deserialize;
use serde_json::Value;

use relay_core::{
    Capability, Error, GenerateRequest, GenerateResult, GenericBackend, JobStatusResult,
    ProviderAdapter, ProviderDescriptor, Result, TokenUsage,
};

use crate::health::HealthGate;
use crate::template::{TemplateFields, build_payload, extract_embeddings, extract_text};

/// Placeholder that marks a template as usable for embedding requests.
const TEXTS_PLACEHOLDER: &str = "{{texts}}";

/// Adapter for self-hosted or custom JSON-over-HTTP backends.
///
/// Request bodies come from the backend's template (or a default payload),
/// generated text is pulled out of the response with the configured path, and
/// every generate and embed call first passes the [`HealthGate`].
pub struct GenericHttpAdapter {
    /// Provider name
    name: String,
    /// Credential sent in the auth header, if any
    api_key: Option<String>,
    /// Endpoint and protocol metadata
    backend: GenericBackend,
    /// HTTP client with the backend's timeout
    client: Client,
    /// Cached liveness check
    health: HealthGate,
}

impl GenericHttpAdapter {
    /// Creates an adapter for `backend`.
    ///
    /// # Errors
    /// Returns an error if the backend metadata is invalid or the HTTP client
    /// cannot be built.
    pub fn new(
        name: impl Into<String>,
        api_key: Option<String>,
        backend: GenericBackend,
    ) -> Result<Self> {
        let name = name.into();
        backend.validate(&name)?;

        let client = Client::builder()
            .timeout(Duration::from_secs(backend.timeout_seconds))
            .build()?;
        let health = HealthGate::new(backend.health_check_path.clone());

        Ok(Self {
            name,
            api_key,
            backend,
            client,
            health,
        })
    }

    /// Creates an adapter from a catalog entry.
    ///
    /// # Errors
    /// Returns [`Error::Config`] if the provider has no generic backend block.
    pub fn from_descriptor(descriptor: &ProviderDescriptor) -> Result<Self> {
        let backend = descriptor.generic.clone().ok_or_else(|| {
            Error::Config(format!(
                "Provider {} has no generic backend configuration",
                descriptor.name
            ))
        })?;
        Self::new(descriptor.name.clone(), descriptor.api_key.clone(), backend)
    }

    /// The backend metadata this adapter was built from.
    pub fn backend(&self) -> &GenericBackend {
        &self.backend
    }

    /// The adapter's health gate.
    pub fn health(&self) -> &HealthGate {
        &self.health
    }

    /// Joins `suffix` onto the base endpoint.
    fn endpoint(&self, suffix: &str) -> String {
        format!("{}{suffix}", self.backend.base_url.trim_end_matches('/'))
    }

    /// Status endpoint of a job, with the id escaped as a single path segment.
    fn job_url(&self, provider_job_id: &str) -> Result<Url> {
        let mut url = Url::parse(&self.backend.base_url)
            .map_err(|error| Error::Config(format!("Invalid base_url for {}: {error}", self.name)))?;
        url.path_segments_mut()
            .map_err(|()| Error::Config(format!("base_url for {} cannot carry a path", self.name)))?
            .pop_if_empty()
            .push("job")
            .push(provider_job_id);
        Ok(url)
    }

    /// Adds the auth header when a credential is configured.
    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => builder.header(
                self.backend.auth_header_name(),
                format!("{}{key}", self.backend.auth_scheme_prefix()),
            ),
            None => builder,
        }
    }

    /// Passes the health gate or reports the backend unhealthy.
    async fn ensure_healthy(&self) -> Result<()> {
        let healthy = self
            .health
            .check(|path| {
                let request = self.authorize(self.client.get(self.endpoint(&path)));
                async move {
                    match request.send().await {
                        Ok(response) => response.status().is_success(),
                        Err(error) => {
                            tracing::debug!(error = %error, "Health probe request failed");
                            false
                        }
                    }
                }
            })
            .await;

        if healthy {
            Ok(())
        } else {
            Err(Error::Unhealthy(format!(
                "{} did not pass its health check",
                self.name
            )))
        }
    }

    /// POSTs `payload` to `url` and parses the JSON response.
    async fn post_json(&self, url: &str, payload: &Value) -> Result<Value> {
        let response = self
            .authorize(self.client.post(url))
            .header("Content-Type", "application/json")
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(Error::Provider(format!(
                "{} request failed with status {status}: {error_text}",
                self.name
            )));
        }

        Ok(response.json::<Value>().await?)
    }
}

/// Native job id of a response shaped `{"status": "pending", "jobId": ...}`.
fn pending_job_id(response: &Value) -> Option<String> {
    if response.get("status").and_then(Value::as_str) != Some("pending") {
        return None;
    }
    response
        .get("jobId")
        .or_else(|| response.get("job_id"))
        .and_then(Value::as_str)
        .map(str::to_owned)
}

/// Token usage from a `usage` object in either snake or camel case.
fn parse_usage(response: &Value) -> Option<TokenUsage> {
    let usage = response.get("usage")?;
    let first_count = |keys: &[&str]| keys.iter().find_map(|key| usage.get(key)?.as_u64());

    let input = first_count(&["prompt_tokens", "input_tokens", "inputTokens"]);
    let output = first_count(&["completion_tokens", "output_tokens", "outputTokens"]);
    if input.is_none() && output.is_none() {
        return None;
    }
    Some(TokenUsage {
        input: input.unwrap_or(0),
        output: output.unwrap_or(0),
    })
}

/// Body returned by `GET <base>/job/<id>`.
#[derive(Deserialize)]
struct JobStatusPayload {
    /// Job state label
    status: String,
    /// Result payload once completed
    #[serde(default)]
    data: Option<Value>,
    /// Error message once failed
    #[serde(default)]
    error: Option<String>,
}

impl JobStatusPayload {
    fn into_status(self) -> Result<JobStatusResult> {
        match self.status.as_str() {
            "pending" | "queued" | "running" | "processing" => Ok(JobStatusResult::Pending),
            "completed" | "succeeded" | "success" => Ok(JobStatusResult::Completed {
                data: self.data.unwrap_or(Value::Null),
            }),
            "failed" | "error" | "cancelled" => Ok(JobStatusResult::failed(
                self.error.unwrap_or_else(|| "Job failed".to_owned()),
            )),
            other => Err(Error::InvalidResponse(format!(
                "Unknown job status '{other}'"
            ))),
        }
    }
}

#[async_trait]
impl ProviderAdapter for GenericHttpAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn supports(&self, capability: Capability) -> bool {
        matches!(capability, Capability::JobStatus | Capability::Embedding)
    }

    async fn generate(&self, request: &GenerateRequest, model_id: &str) -> Result<GenerateResult> {
        if let Err(error) = self.ensure_healthy().await {
            return Ok(GenerateResult::failed_for(
                error.to_string(),
                &self.name,
                model_id,
            ));
        }

        let fields = TemplateFields::from_request(request, model_id);
        let payload = build_payload(self.backend.template_for(model_id), &fields)?;
        let response = self.post_json(&self.backend.base_url, &payload).await?;

        if let Some(job_id) = pending_job_id(&response) {
            tracing::debug!(provider = %self.name, model = model_id, job_id = %job_id, "Backend accepted job");
            return Ok(GenerateResult::pending(job_id, &self.name, model_id));
        }

        let path = self.backend.response_path_for(model_id);
        match extract_text(&response, path) {
            Ok(text) => Ok(
                GenerateResult::completed(Value::String(text), &self.name, model_id)
                    .with_usage(parse_usage(&response)),
            ),
            Err(error) => Ok(GenerateResult::failed_for(
                error.to_string(),
                &self.name,
                model_id,
            )),
        }
    }

    async fn check_job_status(&self, provider_job_id: &str) -> Result<JobStatusResult> {
        let url = self.job_url(provider_job_id)?;
        let response = self.authorize(self.client.get(url)).send().await?;

        let status = response.status();
        if status.is_client_error() {
            tracing::debug!(provider = %self.name, provider_job_id, %status, "Backend rejected job poll");
            return Err(Error::UnknownJob(provider_job_id.to_owned()));
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(Error::Provider(format!(
                "{} job status request failed with status {status}: {error_text}",
                self.name
            )));
        }

        response.json::<JobStatusPayload>().await?.into_status()
    }

    async fn embed_content(&self, texts: &[String], model_id: &str) -> Result<Vec<Vec<f32>>> {
        self.ensure_healthy().await?;

        let template = self
            .backend
            .template_for(model_id)
            .filter(|template| template.contains(TEXTS_PLACEHOLDER));
        let path = template.and(self.backend.response_path_for(model_id));
        let fields = TemplateFields::for_texts(model_id, texts);
        let payload = build_payload(template, &fields)?;

        let url = self
            .backend
            .embedding_url
            .as_deref()
            .unwrap_or(self.backend.base_url.as_str());
        let response = self.post_json(url, &payload).await?;
        extract_embeddings(&response, path)
    }
}
