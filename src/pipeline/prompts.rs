//! Prompt templates
//!
//! All model-facing text lives here so the rest of the pipeline deals only
//! in typed values.

use crate::generation::ImageStyle;
use crate::pipeline::constants::{END_SECTION_MARKER, IMAGE_BRIEF_CHARS};
use crate::pipeline::types::SectionDescriptor;

/// System prompt for the outline call
pub const OUTLINE_SYSTEM_PROMPT: &str = "You are an expert content strategist and SEO specialist. \
You design outlines for long-form articles that cover a topic thoroughly, \
progressing from introductory concepts to advanced applications. \
You always answer with a single valid JSON object and nothing else.";

/// System prompt for section calls
pub const SECTION_SYSTEM_PROMPT: &str = "You are an expert long-form content writer. \
You write detailed, engaging sections of a larger article, with practical examples, \
data points and research where relevant. Write in the language of the topic.";

/// Build the user prompt for the outline call
pub fn outline_prompt(topic: &str, target_audience: &str, section_count: usize) -> String {
    format!(
        r#"Create an outline for a long-form article about "{topic}" targeting {target_audience}.

Requirements:
- Exactly {section_count} main sections, in a logical order
- Each section explores a different aspect of "{topic}"
- Each section has a short "brief" (1-2 sentences) telling the writer what to cover
- Each section has 2 subheadings

Return ONLY a JSON object in this exact shape:
{{
  "outline": [
    {{
      "heading": "Section heading",
      "brief": "What this section should cover",
      "subheadings": ["Subheading 1", "Subheading 2"]
    }}
  ]
}}"#
    )
}

/// Build the user prompt for one section
pub fn section_prompt(topic: &str, target_audience: &str, section: &SectionDescriptor) -> String {
    let subheadings = if section.subheadings.is_empty() {
        "- (choose suitable subheadings)".to_string()
    } else {
        section
            .subheadings
            .iter()
            .map(|s| format!("- {}", s))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        r#"Write one section of an article about "{topic}" for {target_audience}.

Section heading: {title}
Section brief: {brief}

Subheadings to cover:
{subheadings}

Rules:
- Do NOT repeat the section heading; start directly with the content
- Use ### for each subheading, Markdown for lists and emphasis
- Include practical tips, examples and findings where relevant
- End with a brief summary followed by {marker} on its own line"#,
        title = section.title,
        brief = if section.brief.is_empty() {
            "(none)"
        } else {
            section.brief.as_str()
        },
        marker = END_SECTION_MARKER,
    )
}

/// Build the image prompt for one section
pub fn image_prompt(topic: &str, section: &SectionDescriptor, style: ImageStyle) -> String {
    let brief: String = section.brief.chars().take(IMAGE_BRIEF_CHARS).collect();
    format!(
        "A detailed illustration for an article about \"{topic}\", section \"{title}\". \
{brief} Focus on scenery, objects, colors and mood; no text or lettering in the image. \
Style: {style}.",
        title = section.title,
    )
}
