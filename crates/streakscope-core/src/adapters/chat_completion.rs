use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::data_source::SourceError;
use crate::http_client::{HttpAuth, HttpClient, HttpRequest};
use crate::narrative::{NarrativeConfig, NarrativePrompt, NarrativeService};
use crate::retry::{execute_with_retry, RetryConfig};

pub const NARRATIVE_API_KEY_ENV: &str = "STREAKSCOPE_NARRATIVE_API_KEY";

/// Narrative service backed by an OpenAI-compatible chat-completions endpoint.
#[derive(Clone)]
pub struct ChatCompletionNarrator {
    http_client: Arc<dyn HttpClient>,
    config: NarrativeConfig,
    retry: RetryConfig,
}

impl ChatCompletionNarrator {
    pub fn new(http_client: Arc<dyn HttpClient>, config: NarrativeConfig) -> Self {
        Self {
            http_client,
            config,
            retry: RetryConfig::exponential(1),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }

    fn build_request(&self, api_key: &str, prompt: NarrativePrompt) -> Result<HttpRequest, SourceError> {
        let body = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: String::from("system"),
                    content: prompt.system,
                },
                ChatMessage {
                    role: String::from("user"),
                    content: prompt.user,
                },
            ],
            temperature: Some(self.config.temperature),
            max_tokens: Some(self.config.max_tokens),
        };
        let body = serde_json::to_string(&body).map_err(|error| {
            SourceError::internal(format!("failed to encode chat request: {error}"))
        })?;

        Ok(HttpRequest::post(self.endpoint())
            .with_auth(&HttpAuth::BearerToken(api_key.to_owned()))
            .with_json_body(body)
            .with_timeout_ms(self.config.timeout_ms))
    }
}

impl NarrativeService for ChatCompletionNarrator {
    fn name(&self) -> &'static str {
        "chat_completions"
    }

    fn generate<'a>(
        &'a self,
        prompt: NarrativePrompt,
    ) -> Pin<Box<dyn Future<Output = Result<String, SourceError>> + Send + 'a>> {
        Box::pin(async move {
            let api_key = self
                .config
                .api_key
                .as_deref()
                .filter(|key| !key.trim().is_empty())
                .ok_or_else(|| {
                    SourceError::invalid_request(format!(
                        "narrative api key is not configured (set {NARRATIVE_API_KEY_ENV})"
                    ))
                })?;

            let request = self.build_request(api_key, prompt)?;
            let started = Instant::now();
            let response = execute_with_retry(self.http_client.as_ref(), request, &self.retry)
                .await
                .map_err(|error| {
                    SourceError::unavailable(format!(
                        "narrative transport error: {}",
                        error.message()
                    ))
                })?;

            if !response.is_success() {
                return Err(SourceError::from_status("narrative service", response.status));
            }

            let content = parse_completion(&response.body)?;
            info!(
                model = %self.config.model,
                latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                chars = content.chars().count(),
                "narrative generated"
            );
            Ok(content)
        })
    }
}

/// Extracts the first choice's message content.
pub fn parse_completion(body: &str) -> Result<String, SourceError> {
    let parsed: ChatCompletionResponse = serde_json::from_str(body).map_err(|error| {
        SourceError::invalid_response(format!("narrative response is not valid JSON: {error}"))
    })?;

    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .map(|message| message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or_else(|| SourceError::invalid_response("narrative response has no content"))
}

#[derive(Debug, Clone, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChoice {
    message: Option<ChatMessageOut>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatMessageOut {
    #[serde(default)]
    content: String,
}
