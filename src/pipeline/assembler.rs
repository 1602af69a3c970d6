//! Document assembler
//!
//! Renders section results into one Markdown document in outline order.
//! Rendering is a pure function of its input, so the same results always
//! produce byte-identical output.

use crate::pipeline::constants::{PLACEHOLDER_PREFIX, SECTION_SEPARATOR};
use crate::pipeline::types::{
    AggregateStatus, Document, ErrorInfo, FailureKind, ImageManifestEntry, Outline,
    SectionDescriptor, SectionResult,
};

/// Assemble a document from an outline and its section results
///
/// Results are placed by `index`. Results whose index is outside the
/// outline are ignored; outline entries without a result are rendered as
/// `Internal` failures. Never fails.
pub fn assemble(outline: &Outline, results: Vec<SectionResult>) -> Document {
    let mut slots: Vec<Option<SectionResult>> = vec![None; outline.len()];
    for result in results {
        match slots.get_mut(result.index) {
            Some(slot) if slot.is_none() => *slot = Some(result),
            Some(_) => {
                tracing::warn!(index = result.index, "Duplicate section result ignored");
            }
            None => {
                tracing::warn!(index = result.index, "Section result outside the outline ignored");
            }
        }
    }

    let sections: Vec<SectionResult> = slots
        .into_iter()
        .enumerate()
        .map(|(index, slot)| {
            slot.unwrap_or_else(|| {
                SectionResult::failed(
                    index,
                    ErrorInfo::new(FailureKind::Internal, "no result for section"),
                    0,
                )
            })
        })
        .collect();

    let markdown = render_markdown(outline, &sections);

    let images = outline
        .sections
        .iter()
        .zip(&sections)
        .filter_map(|(descriptor, result)| {
            result.image.as_ref().map(|image| ImageManifestEntry {
                index: descriptor.index,
                title: descriptor.title.clone(),
                image: image.clone(),
            })
        })
        .collect();

    let status = AggregateStatus::from_results(&sections);

    Document {
        topic: outline.topic.clone(),
        sections,
        markdown,
        images,
        status,
    }
}

fn render_markdown(outline: &Outline, sections: &[SectionResult]) -> String {
    let mut blocks = vec![format!("# {}", outline.topic)];

    for (descriptor, result) in outline.sections.iter().zip(sections) {
        blocks.push(format!("## {}. {}", descriptor.index + 1, descriptor.title));
        match (&result.text, result.is_succeeded()) {
            (Some(text), true) => {
                if let Some(image) = &result.image {
                    blocks.push(format!("![{}]({})", alt_text(descriptor), image.location()));
                }
                blocks.push(text.trim_end().to_string());
            }
            _ => blocks.push(placeholder(result)),
        }
        blocks.push(SECTION_SEPARATOR.to_string());
    }

    let mut markdown = blocks.join("\n\n");
    markdown.push('\n');
    markdown
}

fn placeholder(result: &SectionResult) -> String {
    let kind = result
        .error
        .as_ref()
        .map(|e| e.kind)
        .unwrap_or(FailureKind::Internal);
    format!("{} ({}).", PLACEHOLDER_PREFIX, kind)
}

/// Image alt text for a section: its title without brackets
pub(crate) fn alt_text(descriptor: &SectionDescriptor) -> String {
    descriptor.title.replace(['[', ']'], "")
}
