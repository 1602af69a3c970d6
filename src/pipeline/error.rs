//! Pipeline error types
//!
//! Only outline-level failures are errors. Section failures are data: they
//! are recorded in the section's result and never surface here.

use crate::generation::GenerationError;
use thiserror::Error;

/// Errors that can occur while building an outline
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OutlineError {
    /// The request itself is unusable (empty topic, bad section count, ...)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The generation call failed (network, auth, quota, timeout)
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(#[from] GenerationError),

    /// The model answered with something that is not a usable outline
    #[error("Failed to parse outline: {0}")]
    Parse(String),

    /// The model answered with an outline that has no sections
    #[error("Outline contains no sections")]
    Empty,
}

/// Errors that abort a document run
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// No document can be produced without an outline
    #[error("Outline generation failed: {0}")]
    Outline(#[from] OutlineError),
}
