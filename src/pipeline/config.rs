//! Pipeline configuration
//!
//! Tunable settings for outline building, section generation and the
//! orchestrator. Seeded from the environment at startup (see
//! [`crate::config::Config`]) and adjustable at runtime through the config
//! endpoint.

use crate::error::AppError;
use crate::generation::{ImageParams, ImageStyle};
use crate::pipeline::section::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Pipeline configuration
#[derive(Debug, Clone, Serialize)]
pub struct PipelineConfig {
    /// Chat model for outlines and sections
    pub text_model: String,
    /// Image model
    pub image_model: String,
    /// Maximum number of sections generated at once
    pub concurrency_limit: usize,
    /// Retries per call for transient failures
    pub max_retries: u32,
    /// Wait before a retry, in milliseconds
    pub retry_backoff_ms: u64,
    /// Deadline for a whole run, in seconds
    pub run_deadline_secs: u64,
    /// Accepted shortfall of outline sections below the requested count
    pub outline_tolerance: usize,
    /// Upper bound for the requested section count
    pub max_sections: usize,
    /// Maximum topic length in characters
    pub max_topic_length: usize,
    /// Token budget for the outline call
    pub outline_max_tokens: u32,
    /// Token budget for each section call
    pub section_max_tokens: u32,
    /// Generated image size
    pub image_size: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            text_model: "gpt-4o".to_string(),
            image_model: "dall-e-3".to_string(),
            concurrency_limit: 5,
            max_retries: 1,
            retry_backoff_ms: 2000,
            run_deadline_secs: 900, // 15 minutes
            outline_tolerance: 2,
            max_sections: 50,
            max_topic_length: 500,
            outline_max_tokens: 4000,
            section_max_tokens: 4000,
            image_size: "1024x1024".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Retry policy for section calls
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            backoff: Duration::from_millis(self.retry_backoff_ms),
        }
    }

    /// Deadline for a whole run
    pub fn run_deadline(&self) -> Duration {
        Duration::from_secs(self.run_deadline_secs)
    }

    /// Image parameters for a given style
    pub fn image_params(&self, style: ImageStyle) -> ImageParams {
        ImageParams {
            size: self.image_size.clone(),
            style,
        }
    }
}

/// Request body for updating pipeline configuration
#[derive(Debug, Default, Deserialize)]
pub struct ConfigUpdateRequest {
    /// Maximum number of sections generated at once (optional)
    pub concurrency_limit: Option<usize>,
    /// Retries per call for transient failures (optional, 0 allowed)
    pub max_retries: Option<u32>,
    /// Wait before a retry in milliseconds (optional, 0 allowed)
    pub retry_backoff_ms: Option<u64>,
    /// Run deadline in seconds (optional)
    pub run_deadline_secs: Option<u64>,
    /// Outline shortfall tolerance (optional, 0 allowed)
    pub outline_tolerance: Option<usize>,
    /// Chat model name (optional)
    pub text_model: Option<String>,
    /// Image model name (optional)
    pub image_model: Option<String>,
}

/// Validate and apply configuration updates
///
/// Validates the update request and applies valid changes to the config.
/// Nothing is applied if any field is invalid.
///
/// # Arguments
/// * `config` - The current config to update
/// * `request` - The update request with optional fields
///
/// # Returns
/// * `Ok(PipelineConfig)` - The updated configuration
/// * `Err(AppError)` - If validation fails
pub fn validate_and_apply_config_update(
    mut config: PipelineConfig,
    request: ConfigUpdateRequest,
) -> Result<PipelineConfig, AppError> {
    if let Some(limit) = request.concurrency_limit {
        if limit == 0 {
            return Err(AppError::InvalidRequest(
                "concurrency_limit must be > 0".to_string(),
            ));
        }
        config.concurrency_limit = limit;
    }

    if let Some(retries) = request.max_retries {
        if retries > 5 {
            return Err(AppError::InvalidRequest(
                "max_retries must be <= 5".to_string(),
            ));
        }
        config.max_retries = retries;
    }

    if let Some(backoff) = request.retry_backoff_ms {
        config.retry_backoff_ms = backoff;
    }

    if let Some(deadline) = request.run_deadline_secs {
        if deadline == 0 {
            return Err(AppError::InvalidRequest(
                "run_deadline_secs must be > 0".to_string(),
            ));
        }
        config.run_deadline_secs = deadline;
    }

    if let Some(tolerance) = request.outline_tolerance {
        config.outline_tolerance = tolerance;
    }

    if let Some(model) = request.text_model {
        if model.trim().is_empty() {
            return Err(AppError::InvalidRequest(
                "text_model cannot be empty".to_string(),
            ));
        }
        config.text_model = model;
    }

    if let Some(model) = request.image_model {
        if model.trim().is_empty() {
            return Err(AppError::InvalidRequest(
                "image_model cannot be empty".to_string(),
            ));
        }
        config.image_model = model;
    }

    Ok(config)
}
