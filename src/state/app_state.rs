//! Application state
//!
//! Shared server state: runtime-adjustable pipeline settings, OpenAI
//! connection settings, the shared HTTP pool and the export service.

use crate::config::{Config, OpenAiConfig};
use crate::error::AppError;
use crate::generation::{GenerationClient, OpenAiClient, OpenAiSettings};
use crate::pipeline::PipelineConfig;
use crate::services::ExportService;
use std::sync::Arc;
use tokio::sync::RwLock;

/// State shared by all handlers
pub type SharedState = Arc<RwLock<AppState>>;

/// Main application state
#[derive(Debug, Clone)]
pub struct AppState {
    /// Pipeline settings, updated through the config endpoint
    pub pipeline: PipelineConfig,
    /// OpenAI endpoint, timeouts and fallback key
    pub openai: OpenAiConfig,
    /// Connection pool shared by every upstream call
    pub http: reqwest::Client,
    /// Writes runs to disk when a request asks for it
    pub export: ExportService,
}

impl AppState {
    /// Build state from the loaded configuration
    pub fn new(config: &Config, http: reqwest::Client) -> Self {
        Self {
            pipeline: config.pipeline.clone(),
            openai: config.openai.clone(),
            export: ExportService::new(
                &config.export.output_dir,
                http.clone(),
                config.export.download_timeout,
            ),
            http,
        }
    }

    /// Wrap in the shared handle handlers expect
    pub fn into_shared(self) -> SharedState {
        Arc::new(RwLock::new(self))
    }

    /// Create a generation client for one run
    ///
    /// A non-blank `request_key` wins over the configured key. Model names
    /// come from the current pipeline settings.
    ///
    /// # Errors
    /// * `AppError::MissingApiKey` - neither key is available
    pub fn generation_client(
        &self,
        request_key: Option<&str>,
    ) -> Result<Arc<dyn GenerationClient>, AppError> {
        let api_key = request_key
            .filter(|key| !key.trim().is_empty())
            .or(self.openai.api_key.as_deref())
            .ok_or(AppError::MissingApiKey)?;

        let settings = OpenAiSettings {
            text_model: self.pipeline.text_model.clone(),
            image_model: self.pipeline.image_model.clone(),
            ..self.openai.settings.clone()
        };

        Ok(Arc::new(OpenAiClient::new(
            self.http.clone(),
            api_key.trim(),
            settings,
        )))
    }
}
