//! OpenAI API client
//!
//! Direct HTTP client for the chat-completions and image-generations
//! endpoints. Every non-success outcome is mapped onto a
//! [`GenerationError`] variant so the section generator can tell transient
//! failures from permanent ones.

use crate::generation::openai_types::{
    ApiErrorEnvelope, ChatCompletionRequest, ChatCompletionResponse, ChatMessage,
    ImageGenerationRequest, ImageGenerationResponse, ResponseFormat,
};
use crate::generation::{GenerationClient, GenerationError, ImageParams, ImageRef, TextParams};
use async_trait::async_trait;
use std::time::Duration;

/// Default OpenAI API base URL
pub const OPENAI_API_BASE_URL: &str = "https://api.openai.com/v1";

/// Longest upstream error body kept in an error message
const MAX_ERROR_BODY_CHARS: usize = 500;

/// Connection settings for [`OpenAiClient`]
#[derive(Debug, Clone)]
pub struct OpenAiSettings {
    /// API base URL (overridable for tests and proxies)
    pub base_url: String,
    /// Chat model used for outlines and sections
    pub text_model: String,
    /// Image model
    pub image_model: String,
    /// Per-request timeout for text calls
    pub text_timeout: Duration,
    /// Per-request timeout for image calls
    pub image_timeout: Duration,
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        Self {
            base_url: OPENAI_API_BASE_URL.to_string(),
            text_model: "gpt-4o".to_string(),
            image_model: "dall-e-3".to_string(),
            text_timeout: Duration::from_secs(180),
            image_timeout: Duration::from_secs(120),
        }
    }
}

/// [`GenerationClient`] backed by the OpenAI HTTP API
pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    settings: OpenAiSettings,
}

impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // never print the key
        f.debug_struct("OpenAiClient")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl OpenAiClient {
    /// Create a client sharing the given connection pool
    pub fn new(http: reqwest::Client, api_key: impl Into<String>, settings: OpenAiSettings) -> Self {
        Self {
            http,
            api_key: api_key.into(),
            settings,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.settings.base_url.trim_end_matches('/'), path)
    }

    fn ensure_api_key(&self) -> Result<(), GenerationError> {
        if self.api_key.trim().is_empty() {
            return Err(GenerationError::Authentication(
                "API key is empty".to_string(),
            ));
        }
        Ok(())
    }

    /// POST a JSON body and return the raw success body
    async fn post_json<T: serde::Serialize>(
        &self,
        path: &str,
        body: &T,
        timeout: Duration,
    ) -> Result<String, GenerationError> {
        let url = self.endpoint(path);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .timeout(timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| map_transport_error(e, timeout))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| map_transport_error(e, timeout))?;

        if !status.is_success() {
            let err = classify_error_status(status.as_u16(), &body);
            tracing::error!(
                url = %url,
                status_code = status.as_u16(),
                error = %err,
                "OpenAI API returned error status"
            );
            return Err(err);
        }

        Ok(body)
    }
}

#[async_trait]
impl GenerationClient for OpenAiClient {
    async fn generate_text(
        &self,
        prompt: &str,
        params: &TextParams,
    ) -> Result<String, GenerationError> {
        self.ensure_api_key()?;

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &params.system_prompt {
            messages.push(ChatMessage {
                role: "system",
                content: system.clone(),
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: prompt.to_string(),
        });

        let request = ChatCompletionRequest {
            model: self.settings.text_model.clone(),
            messages,
            max_tokens: params.max_tokens,
            response_format: params.force_json.then_some(ResponseFormat {
                format_type: "json_object",
            }),
        };

        tracing::debug!(
            model = %self.settings.text_model,
            force_json = params.force_json,
            prompt_len = prompt.len(),
            "Calling OpenAI chat completions"
        );

        let body = self
            .post_json("chat/completions", &request, self.settings.text_timeout)
            .await?;

        let parsed: ChatCompletionResponse = serde_json::from_str(&body).map_err(|e| {
            GenerationError::MalformedResponse(format!(
                "Failed to parse chat completion JSON: {} - Response body: {}",
                e,
                truncate(&body)
            ))
        })?;

        let choice = parsed.choices.into_iter().next().ok_or_else(|| {
            GenerationError::MalformedResponse("Response contains no choices".to_string())
        })?;

        if let Some(refusal) = choice.message.refusal {
            return Err(GenerationError::InvalidRequest(format!(
                "Model refused the prompt: {}",
                refusal
            )));
        }

        let text = choice.message.content.unwrap_or_default();
        if text.trim().is_empty() {
            return Err(GenerationError::MalformedResponse(
                "Response text is empty".to_string(),
            ));
        }

        tracing::debug!(
            response_len = text.len(),
            finish_reason = ?choice.finish_reason,
            "Received chat completion"
        );

        Ok(text)
    }

    async fn generate_image(
        &self,
        prompt: &str,
        params: &ImageParams,
    ) -> Result<ImageRef, GenerationError> {
        self.ensure_api_key()?;

        let request = ImageGenerationRequest {
            model: self.settings.image_model.clone(),
            prompt: prompt.to_string(),
            size: params.size.clone(),
            style: params.style.as_str(),
            quality: "standard",
            n: 1,
        };

        tracing::debug!(
            model = %self.settings.image_model,
            style = %params.style,
            prompt_len = prompt.len(),
            "Calling OpenAI image generations"
        );

        let body = self
            .post_json("images/generations", &request, self.settings.image_timeout)
            .await?;

        let parsed: ImageGenerationResponse = serde_json::from_str(&body).map_err(|e| {
            GenerationError::MalformedResponse(format!(
                "Failed to parse image generation JSON: {} - Response body: {}",
                e,
                truncate(&body)
            ))
        })?;

        parsed
            .data
            .into_iter()
            .next()
            .and_then(|image| image.url)
            .filter(|url| !url.is_empty())
            .map(ImageRef::Remote)
            .ok_or_else(|| {
                GenerationError::MalformedResponse("No image URL in response".to_string())
            })
    }
}

/// Map a non-success HTTP status and body onto a [`GenerationError`]
pub fn classify_error_status(status: u16, body: &str) -> GenerationError {
    let envelope = serde_json::from_str::<ApiErrorEnvelope>(body).ok();
    let message = envelope
        .as_ref()
        .map(|e| e.error.message.clone())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| truncate(body));
    let code = envelope.and_then(|e| e.error.code);

    match status {
        429 if code.as_deref() == Some("insufficient_quota") => {
            GenerationError::QuotaExceeded(message)
        }
        429 => GenerationError::RateLimited(message),
        401 | 403 => GenerationError::Authentication(message),
        400 => GenerationError::InvalidRequest(message),
        _ => GenerationError::Upstream { status, message },
    }
}

fn map_transport_error(err: reqwest::Error, timeout: Duration) -> GenerationError {
    if err.is_timeout() {
        GenerationError::Timeout(timeout.as_secs())
    } else {
        GenerationError::Network(err.to_string())
    }
}

fn truncate(body: &str) -> String {
    if body.chars().count() <= MAX_ERROR_BODY_CHARS {
        body.to_string()
    } else {
        let cut: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
        format!("{}...", cut)
    }
}
