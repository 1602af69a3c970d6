//! Generation client module
//!
//! The hosted-model boundary: the [`GenerationClient`] trait consumed by the
//! pipeline, its error taxonomy, and the OpenAI-backed implementation.

pub mod client;
pub mod error;
pub mod openai_client;
pub mod openai_types;

pub use client::{GenerationClient, ImageParams, ImageRef, ImageStyle, TextParams};
pub use error::GenerationError;
pub use openai_client::{OpenAiClient, OpenAiSettings, OPENAI_API_BASE_URL};
