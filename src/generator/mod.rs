pub mod types;

use crate::config::{GeneratorConfig, Secrets};
use crate::generator::types::{
    ChatCompletionRequest, ChatCompletionResponse, FailureKind, GenerationOutcome,
    GenerationRequest,
};
use anyhow::Result;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::log::{debug, warn};

const ERROR_EXCERPT_LENGTH: usize = 200;

/// A text generation backend. Failures are returned as `GenerationOutcome::Failure`,
/// implementations must never panic or bubble errors for upstream problems.
#[async_trait]
pub trait UpstreamGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest, timeout: Duration) -> GenerationOutcome;

    /// Whether credentials are present, reported by the health endpoint.
    fn is_configured(&self) -> bool;
}

/// Maps a non-2xx completion status to a failure kind. Only the status is inspected.
pub fn classify_status(status: StatusCode) -> FailureKind {
    match status {
        StatusCode::TOO_MANY_REQUESTS => FailureKind::RateLimited,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => FailureKind::AuthFailed,
        _ => FailureKind::UpstreamError,
    }
}

fn classify_transport(error: &reqwest::Error) -> FailureKind {
    if error.is_timeout() {
        FailureKind::Timeout
    } else {
        FailureKind::UpstreamError
    }
}

fn excerpt(text: &str) -> String {
    text.chars().take(ERROR_EXCERPT_LENGTH).collect()
}

/// OpenAI compatible `/chat/completions` client.
pub struct OpenAiGenerator {
    client: Client,
    completions_url: String,
    api_key: Option<String>,
    headers: HeaderMap,
}
impl OpenAiGenerator {
    pub fn new(config: &GeneratorConfig, secrets: &Secrets) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let optional_headers = [
            ("openai-organization", &secrets.openai_organization),
            ("openai-project", &secrets.openai_project),
        ];
        for (name, value) in optional_headers {
            if let Some(value) = value {
                headers.insert(HeaderName::from_static(name), HeaderValue::from_str(value)?);
            }
        }

        Ok(Self {
            client: Client::builder().build()?,
            completions_url: format!(
                "{}/chat/completions",
                config.api_base_url.trim_end_matches('/')
            ),
            api_key: secrets.openai_api_key.clone(),
            headers,
        })
    }

    async fn request(&self, api_key: &str, request: &GenerationRequest) -> GenerationOutcome {
        let response = match self
            .client
            .post(&self.completions_url)
            .bearer_auth(api_key)
            .headers(self.headers.clone())
            .json(&ChatCompletionRequest::from(request))
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                let kind = classify_transport(&e);
                return GenerationOutcome::failure(kind, None, format!("Network error: {e}"));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(
                "Completion API returned {status}: {}",
                excerpt(body.trim())
            );
            return GenerationOutcome::failure(
                classify_status(status),
                Some(status.as_u16()),
                format!("Unsuccessful status {status}"),
            );
        }

        match response.json::<ChatCompletionResponse>().await {
            Ok(completion) => GenerationOutcome::from_content(completion.first_content()),
            Err(e) => GenerationOutcome::failure(
                classify_transport(&e),
                Some(status.as_u16()),
                format!("Failed to read completion response: {e}"),
            ),
        }
    }
}

#[async_trait]
impl UpstreamGenerator for OpenAiGenerator {
    async fn generate(&self, request: &GenerationRequest, timeout: Duration) -> GenerationOutcome {
        let api_key = match &self.api_key {
            Some(api_key) => api_key,
            None => {
                return GenerationOutcome::failure(
                    FailureKind::AuthFailed,
                    None,
                    "No completion API key is configured",
                )
            }
        };

        debug!("Requesting completion from {}", self.completions_url);
        match tokio::time::timeout(timeout, self.request(api_key, request)).await {
            Ok(outcome) => outcome,
            Err(_) => GenerationOutcome::failure(
                FailureKind::Timeout,
                None,
                format!("No completion within {}ms", timeout.as_millis()),
            ),
        }
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}
