//! Application configuration
//!
//! Centralized configuration management with environment variable support
//! and sensible defaults.

use crate::generation::{OpenAiSettings, OPENAI_API_BASE_URL};
use crate::pipeline::PipelineConfig;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// OpenAI connection configuration
    pub openai: OpenAiConfig,
    /// Initial pipeline settings (adjustable at runtime)
    pub pipeline: PipelineConfig,
    /// Export configuration
    pub export: ExportConfig,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind the server to
    pub port: u16,
    /// Host address to bind to
    pub host: String,
}

/// OpenAI configuration
#[derive(Clone)]
pub struct OpenAiConfig {
    /// Fallback API key when a request carries none
    pub api_key: Option<String>,
    /// Endpoint and timeouts
    pub settings: OpenAiSettings,
}

impl std::fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("settings", &self.settings)
            .finish()
    }
}

/// Export configuration
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Directory holding session directories
    pub output_dir: String,
    /// Sessions older than this are removed at startup
    pub session_max_age: Duration,
    /// Per-image download timeout
    pub download_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let pipeline_defaults = PipelineConfig::default();
        let text_model =
            env::var("TEXT_MODEL").unwrap_or_else(|_| pipeline_defaults.text_model.clone());
        let image_model =
            env::var("IMAGE_MODEL").unwrap_or_else(|_| pipeline_defaults.image_model.clone());

        Self {
            server: ServerConfig {
                port: env_parse("PORT", 8080),
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            },
            openai: OpenAiConfig {
                api_key: env::var("OPENAI_API_KEY")
                    .ok()
                    .filter(|key| !key.trim().is_empty()),
                settings: OpenAiSettings {
                    base_url: env::var("OPENAI_BASE_URL")
                        .unwrap_or_else(|_| OPENAI_API_BASE_URL.to_string()),
                    text_model: text_model.clone(),
                    image_model: image_model.clone(),
                    text_timeout: Duration::from_secs(env_parse("TEXT_TIMEOUT_SECS", 180)),
                    image_timeout: Duration::from_secs(env_parse("IMAGE_TIMEOUT_SECS", 120)),
                },
            },
            pipeline: PipelineConfig {
                text_model,
                image_model,
                concurrency_limit: env_parse("CONCURRENCY_LIMIT", pipeline_defaults.concurrency_limit)
                    .max(1),
                max_retries: env_parse("MAX_RETRIES", pipeline_defaults.max_retries),
                retry_backoff_ms: env_parse("RETRY_BACKOFF_MS", pipeline_defaults.retry_backoff_ms),
                run_deadline_secs: env_parse("RUN_DEADLINE_SECS", pipeline_defaults.run_deadline_secs)
                    .max(1),
                outline_tolerance: env_parse("OUTLINE_TOLERANCE", pipeline_defaults.outline_tolerance),
                max_sections: env_parse("MAX_SECTIONS", pipeline_defaults.max_sections).max(1),
                ..pipeline_defaults
            },
            export: ExportConfig {
                output_dir: env::var("OUTPUT_DIR").unwrap_or_else(|_| "output".to_string()),
                session_max_age: Duration::from_secs(
                    env_parse::<u64>("SESSION_MAX_AGE_HOURS", 24).saturating_mul(3600),
                ),
                download_timeout: Duration::from_secs(env_parse("DOWNLOAD_TIMEOUT_SECS", 60)),
            },
        }
    }

    /// Get the server address as a string
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Parse an environment variable, falling back to `default` when unset or invalid
fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const KEYS: &[&str] = &[
        "PORT",
        "HOST",
        "OPENAI_API_KEY",
        "OPENAI_BASE_URL",
        "TEXT_MODEL",
        "CONCURRENCY_LIMIT",
        "MAX_RETRIES",
        "RUN_DEADLINE_SECS",
        "OUTPUT_DIR",
        "SESSION_MAX_AGE_HOURS",
        "DOWNLOAD_TIMEOUT_SECS",
    ];

    fn clear_env() {
        for key in KEYS {
            env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();
        let config = Config::from_env();

        assert_eq!(config.server_addr(), "0.0.0.0:8080");
        assert!(config.openai.api_key.is_none());
        assert_eq!(config.openai.settings.base_url, OPENAI_API_BASE_URL);
        assert_eq!(config.openai.settings.text_timeout, Duration::from_secs(180));
        assert_eq!(config.pipeline.concurrency_limit, 5);
        assert_eq!(config.pipeline.max_retries, 1);
        assert_eq!(config.pipeline.run_deadline_secs, 900);
        assert_eq!(config.export.output_dir, "output");
        assert_eq!(config.export.session_max_age, Duration::from_secs(24 * 3600));
        assert_eq!(config.export.download_timeout, Duration::from_secs(60));
    }

    #[test]
    #[serial]
    fn test_overrides_and_invalid_values() {
        clear_env();
        env::set_var("PORT", "9000");
        env::set_var("OPENAI_API_KEY", "sk-test");
        env::set_var("TEXT_MODEL", "gpt-4o-mini");
        env::set_var("CONCURRENCY_LIMIT", "0");
        env::set_var("MAX_RETRIES", "not-a-number");

        let config = Config::from_env();
        clear_env();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.openai.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.openai.settings.text_model, "gpt-4o-mini");
        assert_eq!(config.pipeline.text_model, "gpt-4o-mini");
        assert_eq!(config.pipeline.concurrency_limit, 1);
        assert_eq!(config.pipeline.max_retries, 1);
        assert!(!format!("{:?}", config.openai).contains("sk-test"));
    }

    #[test]
    #[serial]
    fn test_huge_session_age_saturates() {
        clear_env();
        env::set_var("SESSION_MAX_AGE_HOURS", u64::MAX.to_string());
        env::set_var("DOWNLOAD_TIMEOUT_SECS", "5");

        let config = Config::from_env();
        clear_env();

        assert_eq!(config.export.session_max_age, Duration::from_secs(u64::MAX));
        assert_eq!(config.export.download_timeout, Duration::from_secs(5));
    }
}
