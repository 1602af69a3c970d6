//! Article pipeline
//!
//! Topic → outline → parallel section generation → assembled document.
//!
//! ## Module Organization
//!
//! - `types` - data model shared by every stage
//! - `outline` - outline generation and parsing
//! - `section` - one section's text and image, with retries
//! - `orchestrator` - bounded fan-out under a run deadline
//! - `assembler` - deterministic Markdown rendering
//! - `builder` - `build_document` entry point
//! - `config` / `constants` / `prompts` / `utils` - supporting pieces

pub mod assembler;
pub mod builder;
pub mod config;
pub mod constants;
pub mod error;
pub mod orchestrator;
pub mod outline;
pub mod prompts;
pub mod section;
pub mod types;
pub mod utils;

pub use assembler::assemble;
pub use builder::{build_document, build_document_with_outline, PipelineContext, RunOptions};
pub use config::{validate_and_apply_config_update, ConfigUpdateRequest, PipelineConfig};
pub use error::{OutlineError, PipelineError};
pub use outline::{parse_outline, OutlineBuilder};
pub use section::{RetryPolicy, SectionContext, SectionGenerator, SectionRunner};
pub use types::{
    AggregateStatus, Document, ErrorInfo, FailureKind, GenerationRequest, ImageManifestEntry,
    Outline, ProgressEvent, RunReport, SectionDescriptor, SectionResult, SectionStatus,
};
