//! Pipeline data model
//!
//! Types that flow from the outline through the orchestrator into the final
//! document. Everything here is plain data: serializable, cloneable, and
//! never mutated after the stage that creates it.

use crate::generation::{GenerationError, ImageRef, ImageStyle};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Default audience used when the caller does not name one
pub const DEFAULT_TARGET_AUDIENCE: &str = "general readers";

/// What the caller wants written
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Article topic / main keyword
    pub topic: String,
    /// Number of outline sections to generate
    pub section_count: usize,
    /// Who the article is written for
    #[serde(default = "default_target_audience")]
    pub target_audience: String,
    /// Style of the per-section illustrations
    #[serde(default)]
    pub image_style: ImageStyle,
}

fn default_target_audience() -> String {
    DEFAULT_TARGET_AUDIENCE.to_string()
}

impl GenerationRequest {
    /// Create a request with the default audience and image style
    pub fn new(topic: impl Into<String>, section_count: usize) -> Self {
        Self {
            topic: topic.into(),
            section_count,
            target_audience: default_target_audience(),
            image_style: ImageStyle::default(),
        }
    }
}

/// One entry of the outline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionDescriptor {
    /// 0-based position in the outline; defines document order
    pub index: usize,
    /// Section heading
    pub title: String,
    /// Guidance for the writer
    pub brief: String,
    /// Sub-topics the section should cover
    #[serde(default)]
    pub subheadings: Vec<String>,
}

/// Ordered list of sections for a topic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outline {
    /// Topic the outline was built for
    pub topic: String,
    /// Sections, `sections[i].index == i`
    pub sections: Vec<SectionDescriptor>,
}

impl Outline {
    /// Number of sections
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    /// Whether the outline has no sections
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

/// Terminal state of one section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionStatus {
    /// Text was generated (image may still be missing)
    Succeeded,
    /// No usable text; rendered as a placeholder
    Failed,
}

/// Why a section failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Network, authentication, quota, or other upstream refusal
    UpstreamUnavailable,
    /// Rate limit or call timeout that persisted through the retry budget
    TransientFailure,
    /// Upstream answered but the payload was unusable
    ParseFailure,
    /// The run deadline elapsed before the section finished
    Timeout,
    /// The section job was lost (panicked or never reported)
    Internal,
}

impl FailureKind {
    /// Classify a client error that ended a section
    pub fn from_generation_error(err: &GenerationError) -> Self {
        match err {
            GenerationError::RateLimited(_) | GenerationError::Timeout(_) => {
                FailureKind::TransientFailure
            }
            GenerationError::MalformedResponse(_) => FailureKind::ParseFailure,
            GenerationError::QuotaExceeded(_)
            | GenerationError::Authentication(_)
            | GenerationError::InvalidRequest(_)
            | GenerationError::Network(_)
            | GenerationError::Upstream { .. } => FailureKind::UpstreamUnavailable,
        }
    }

    /// Short human label
    pub fn label(&self) -> &'static str {
        match self {
            FailureKind::UpstreamUnavailable => "upstream unavailable",
            FailureKind::TransientFailure => "transient failure",
            FailureKind::ParseFailure => "unusable response",
            FailureKind::Timeout => "timed out",
            FailureKind::Internal => "internal error",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Failure detail attached to a failed section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Failure class
    pub kind: FailureKind,
    /// Underlying message
    pub message: String,
}

impl ErrorInfo {
    /// Create a new error info
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Outcome of generating one section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionResult {
    /// Outline index of the section
    pub index: usize,
    /// Terminal status
    pub status: SectionStatus,
    /// Generated body (Markdown), present when succeeded
    pub text: Option<String>,
    /// Generated illustration, if any
    pub image: Option<ImageRef>,
    /// Failure detail, present when failed
    pub error: Option<ErrorInfo>,
    /// Soft-failure note (e.g. the image call failed)
    pub warning: Option<String>,
    /// Number of text generation attempts made
    pub attempts: u32,
}

impl SectionResult {
    /// A section whose text was generated
    pub fn succeeded(
        index: usize,
        text: String,
        image: Option<ImageRef>,
        warning: Option<String>,
        attempts: u32,
    ) -> Self {
        Self {
            index,
            status: SectionStatus::Succeeded,
            text: Some(text),
            image,
            error: None,
            warning,
            attempts,
        }
    }

    /// A section that terminally failed
    pub fn failed(index: usize, error: ErrorInfo, attempts: u32) -> Self {
        Self {
            index,
            status: SectionStatus::Failed,
            text: None,
            image: None,
            error: Some(error),
            warning: None,
            attempts,
        }
    }

    /// A section abandoned at the run deadline
    pub fn timed_out(index: usize) -> Self {
        Self::failed(
            index,
            ErrorInfo::new(
                FailureKind::Timeout,
                "run deadline elapsed before the section completed",
            ),
            0,
        )
    }

    /// Whether the section produced text
    pub fn is_succeeded(&self) -> bool {
        self.status == SectionStatus::Succeeded
    }
}

/// Aggregate outcome of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "failed", rename_all = "snake_case")]
pub enum AggregateStatus {
    /// Every section succeeded
    AllSucceeded,
    /// Some sections failed (count of failed sections)
    PartialFailure(usize),
    /// No section succeeded
    AllFailed,
}

impl AggregateStatus {
    /// Compute the status of a set of results
    pub fn from_results(results: &[SectionResult]) -> Self {
        let failed = results.iter().filter(|r| !r.is_succeeded()).count();
        if failed == 0 {
            AggregateStatus::AllSucceeded
        } else if failed == results.len() {
            AggregateStatus::AllFailed
        } else {
            AggregateStatus::PartialFailure(failed)
        }
    }
}

impl fmt::Display for AggregateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregateStatus::AllSucceeded => write!(f, "all sections succeeded"),
            AggregateStatus::PartialFailure(n) => write!(f, "{} section(s) failed", n),
            AggregateStatus::AllFailed => write!(f, "all sections failed"),
        }
    }
}

/// What the orchestrator hands back
#[derive(Debug, Clone)]
pub struct RunReport {
    /// One result per descriptor, in descriptor order
    pub results: Vec<SectionResult>,
    /// Aggregate status of `results`
    pub status: AggregateStatus,
    /// Wall time spent in the orchestrator
    pub elapsed: Duration,
}

/// Image manifest entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageManifestEntry {
    /// Outline index
    pub index: usize,
    /// Section title (used as alt text)
    pub title: String,
    /// Where the image lives
    pub image: ImageRef,
}

/// The assembled article
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Article topic (rendered as the top-level heading)
    pub topic: String,
    /// One entry per outline section, in outline order
    pub sections: Vec<SectionResult>,
    /// Rendered Markdown
    pub markdown: String,
    /// Images in section order
    pub images: Vec<ImageManifestEntry>,
    /// Aggregate status of `sections`
    pub status: AggregateStatus,
}

/// Live progress notification for a presentation layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// Outline parsed; section generation is about to start
    OutlineReady {
        /// Number of sections in the outline
        section_count: usize,
    },
    /// A section job acquired a concurrency slot
    SectionStarted {
        /// Outline index
        index: usize,
    },
    /// A section reached its terminal status
    SectionCompleted {
        /// Outline index
        index: usize,
        /// Terminal status
        status: SectionStatus,
    },
    /// The document has been assembled
    Finished {
        /// Aggregate run status
        status: AggregateStatus,
    },
}
