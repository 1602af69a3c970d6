//! Generation client contract
//!
//! The pipeline only sees this trait. Anything that can turn a prompt into
//! text or an image (the hosted OpenAI API, a scripted test double) plugs in
//! here.

use crate::generation::GenerationError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Parameters for a text generation call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextParams {
    /// Optional system prompt guiding the model
    pub system_prompt: Option<String>,
    /// Maximum tokens in the response
    pub max_tokens: u32,
    /// When true, ask the model for a JSON object response
    pub force_json: bool,
}

impl Default for TextParams {
    fn default() -> Self {
        Self {
            system_prompt: None,
            max_tokens: 4000,
            force_json: false,
        }
    }
}

/// Visual style of generated images
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ImageStyle {
    /// Photographic, muted look
    #[default]
    Natural,
    /// Hyper-real, dramatic look
    Vivid,
}

impl ImageStyle {
    /// Wire name of the style
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageStyle::Natural => "natural",
            ImageStyle::Vivid => "vivid",
        }
    }
}

impl fmt::Display for ImageStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters for an image generation call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageParams {
    /// Image size, e.g. "1024x1024"
    pub size: String,
    /// Visual style
    pub style: ImageStyle,
}

impl Default for ImageParams {
    fn default() -> Self {
        Self {
            size: "1024x1024".to_string(),
            style: ImageStyle::Natural,
        }
    }
}

/// Reference to a generated image
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "location", rename_all = "lowercase")]
pub enum ImageRef {
    /// URL returned by the image API (short-lived)
    Remote(String),
    /// Path relative to an export session directory
    Local(String),
}

impl ImageRef {
    /// The URL or path used when linking the image from Markdown
    pub fn location(&self) -> &str {
        match self {
            ImageRef::Remote(url) => url,
            ImageRef::Local(path) => path,
        }
    }
}

/// A hosted text/image generation capability
///
/// Implementations must be cheap to share across tasks; the orchestrator
/// holds one behind an `Arc` and calls it from many jobs at once.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Generate text for a prompt
    async fn generate_text(
        &self,
        prompt: &str,
        params: &TextParams,
    ) -> Result<String, GenerationError>;

    /// Generate a single image for a prompt
    async fn generate_image(
        &self,
        prompt: &str,
        params: &ImageParams,
    ) -> Result<ImageRef, GenerationError>;
}
