//! Outline builder
//!
//! Turns a [`GenerationRequest`] into an ordered [`Outline`] with one
//! generation call. The model's answer is checked against an explicit
//! expected shape; anything that does not fit is a parse failure rather
//! than data passed downstream.

use crate::generation::{GenerationClient, TextParams};
use crate::pipeline::config::PipelineConfig;
use crate::pipeline::error::OutlineError;
use crate::pipeline::prompts::{outline_prompt, OUTLINE_SYSTEM_PROMPT};
use crate::pipeline::types::{GenerationRequest, Outline, SectionDescriptor};
use crate::pipeline::utils::hash_topic;
use serde::Deserialize;
use std::sync::Arc;

/// Expected top-level shape of the outline response
#[derive(Deserialize, Debug)]
struct RawOutline {
    outline: Vec<RawSection>,
}

#[derive(Deserialize, Debug)]
struct RawSection {
    #[serde(alias = "title")]
    heading: String,
    #[serde(default)]
    brief: String,
    #[serde(default)]
    subheadings: Vec<String>,
}

/// Validate a generation request against configured bounds
///
/// # Errors
/// * `OutlineError::InvalidInput` - topic empty or too long, section count
///   zero or above `max_sections`
pub fn validate_request(
    request: &GenerationRequest,
    config: &PipelineConfig,
) -> Result<(), OutlineError> {
    let topic = request.topic.trim();
    if topic.is_empty() {
        return Err(OutlineError::InvalidInput(
            "Topic cannot be empty".to_string(),
        ));
    }
    if topic.chars().count() > config.max_topic_length {
        return Err(OutlineError::InvalidInput(format!(
            "Topic exceeds maximum length of {} characters",
            config.max_topic_length
        )));
    }
    if request.section_count == 0 || request.section_count > config.max_sections {
        return Err(OutlineError::InvalidInput(format!(
            "Section count must be between 1 and {} (got {})",
            config.max_sections, request.section_count
        )));
    }
    Ok(())
}

/// Builds outlines with a single generation call
pub struct OutlineBuilder {
    client: Arc<dyn GenerationClient>,
    config: PipelineConfig,
}

impl OutlineBuilder {
    /// Create a builder using the given client and settings
    pub fn new(client: Arc<dyn GenerationClient>, config: PipelineConfig) -> Self {
        Self { client, config }
    }

    /// Generate and parse an outline
    ///
    /// Generation failures are not retried here; the caller decides.
    ///
    /// # Errors
    /// * `OutlineError::InvalidInput` - request out of bounds
    /// * `OutlineError::UpstreamUnavailable` - the generation call failed
    /// * `OutlineError::Parse` - response is not an outline of roughly the
    ///   requested size
    /// * `OutlineError::Empty` - response has zero sections
    pub async fn build(&self, request: &GenerationRequest) -> Result<Outline, OutlineError> {
        validate_request(request, &self.config)?;

        let topic = request.topic.trim();
        let prompt = outline_prompt(topic, &request.target_audience, request.section_count);
        let params = TextParams {
            system_prompt: Some(OUTLINE_SYSTEM_PROMPT.to_string()),
            max_tokens: self.config.outline_max_tokens,
            force_json: true,
        };

        tracing::info!(
            topic_hash = %hash_topic(topic),
            section_count = request.section_count,
            "Generating outline"
        );

        let response = self.client.generate_text(&prompt, &params).await?;

        let outline = parse_outline(
            &response,
            topic,
            request.section_count,
            self.config.outline_tolerance,
        )?;

        tracing::info!(
            topic_hash = %hash_topic(topic),
            sections = outline.len(),
            "Outline ready"
        );

        Ok(outline)
    }
}

/// Parse a model response into an outline
///
/// Accepts the JSON object on its own, inside a fenced code block, or
/// embedded in surrounding prose. Extra sections are truncated; a shortfall
/// of up to `tolerance` sections is accepted.
pub fn parse_outline(
    response: &str,
    topic: &str,
    requested: usize,
    tolerance: usize,
) -> Result<Outline, OutlineError> {
    let raw = extract_outline_json(response)?;

    let mut sections = Vec::with_capacity(raw.outline.len().min(requested));
    for (position, raw_section) in raw.outline.into_iter().take(requested).enumerate() {
        let title = raw_section.heading.trim().to_string();
        if title.is_empty() {
            return Err(OutlineError::Parse(format!(
                "Section {} has an empty heading",
                position + 1
            )));
        }
        sections.push(SectionDescriptor {
            index: position,
            title,
            brief: raw_section.brief.trim().to_string(),
            subheadings: raw_section
                .subheadings
                .into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        });
    }

    if sections.is_empty() {
        return Err(OutlineError::Empty);
    }

    let minimum = requested.saturating_sub(tolerance).max(1);
    if sections.len() < minimum {
        return Err(OutlineError::Parse(format!(
            "Expected {} sections (at least {}), got {}",
            requested,
            minimum,
            sections.len()
        )));
    }

    if sections.len() != requested {
        tracing::warn!(
            requested = requested,
            received = sections.len(),
            "Outline section count differs from request, within tolerance"
        );
    }

    Ok(Outline {
        topic: topic.to_string(),
        sections,
    })
}

/// Try the candidate JSON fragments of a response in order
fn extract_outline_json(response: &str) -> Result<RawOutline, OutlineError> {
    let trimmed = response.trim();

    let first_error = match serde_json::from_str::<RawOutline>(trimmed) {
        Ok(raw) => return Ok(raw),
        Err(e) => e,
    };

    let candidates = [fenced_block(trimmed), braced_span(trimmed)];
    for candidate in candidates.into_iter().flatten() {
        if let Ok(raw) = serde_json::from_str::<RawOutline>(candidate) {
            return Ok(raw);
        }
    }

    Err(OutlineError::Parse(format!(
        "Response is not an outline object: {}",
        first_error
    )))
}

/// Contents of the first ``` fenced block (language tag skipped)
fn fenced_block(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after_fence = &text[start + 3..];
    // skip the info string ("json") up to the end of the line
    let body_start = after_fence.find('\n')? + 1;
    let body = &after_fence[body_start..];
    let end = body.find("```")?;
    Some(body[..end].trim())
}

/// Substring from the first `{` to the last `}`
fn braced_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}
