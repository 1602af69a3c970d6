//! OpenAI API request/response types
//!
//! Structs that mirror the chat-completions and image-generations JSON
//! formats. Only the fields the pipeline reads are modelled; unknown fields
//! are ignored on deserialization.

use serde::{Deserialize, Serialize};

/// Chat completions request body
#[derive(Serialize, Debug)]
pub struct ChatCompletionRequest {
    /// Model name (e.g. "gpt-4o")
    pub model: String,
    /// Conversation, system message first when present
    pub messages: Vec<ChatMessage>,
    /// Maximum tokens in the response
    pub max_tokens: u32,
    /// Optional response format (JSON mode)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
}

/// A single chat message
#[derive(Serialize, Debug)]
pub struct ChatMessage {
    /// "system" or "user"
    pub role: &'static str,
    /// Message text
    pub content: String,
}

/// Response format selector
#[derive(Serialize, Debug)]
pub struct ResponseFormat {
    /// "json_object" forces a JSON response
    #[serde(rename = "type")]
    pub format_type: &'static str,
}

/// Chat completions response body
#[derive(Deserialize, Debug)]
pub struct ChatCompletionResponse {
    /// Candidate completions (the pipeline uses the first)
    #[serde(default)]
    pub choices: Vec<Choice>,
}

/// One completion choice
#[derive(Deserialize, Debug)]
pub struct Choice {
    /// Generated message
    pub message: ChoiceMessage,
    /// Why the model stopped ("stop", "length", ...)
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Message inside a choice
#[derive(Deserialize, Debug)]
pub struct ChoiceMessage {
    /// Text content; absent on refusals
    #[serde(default)]
    pub content: Option<String>,
    /// Refusal text, if the model declined
    #[serde(default)]
    pub refusal: Option<String>,
}

/// Image generations request body
#[derive(Serialize, Debug)]
pub struct ImageGenerationRequest {
    /// Model name (e.g. "dall-e-3")
    pub model: String,
    /// Image prompt
    pub prompt: String,
    /// Size, e.g. "1024x1024"
    pub size: String,
    /// "natural" or "vivid"
    pub style: &'static str,
    /// Always "standard"
    pub quality: &'static str,
    /// Number of images (always 1)
    pub n: u8,
}

/// Image generations response body
#[derive(Deserialize, Debug)]
pub struct ImageGenerationResponse {
    /// Generated images
    #[serde(default)]
    pub data: Vec<ImageData>,
}

/// One generated image
#[derive(Deserialize, Debug)]
pub struct ImageData {
    /// Download URL
    #[serde(default)]
    pub url: Option<String>,
}

/// Error envelope returned with non-success statuses
#[derive(Deserialize, Debug)]
pub struct ApiErrorEnvelope {
    /// Error details
    pub error: ApiErrorBody,
}

/// Error details
#[derive(Deserialize, Debug)]
pub struct ApiErrorBody {
    /// Human-readable message
    #[serde(default)]
    pub message: String,
    /// Machine-readable code, e.g. "insufficient_quota"
    #[serde(default)]
    pub code: Option<String>,
}
