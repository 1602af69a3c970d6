//! Section generator
//!
//! Produces exactly one [`SectionResult`] per [`SectionDescriptor`]. The
//! text call and the image call run side by side; an image failure only
//! downgrades the section to a soft failure, a text failure fails it.

use crate::generation::{GenerationClient, GenerationError, ImageParams, ImageStyle, TextParams};
use crate::pipeline::config::PipelineConfig;
use crate::pipeline::constants::END_SECTION_MARKER;
use crate::pipeline::prompts::{image_prompt, section_prompt, SECTION_SYSTEM_PROMPT};
use crate::pipeline::types::{ErrorInfo, FailureKind, SectionDescriptor, SectionResult};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Retry policy for transient generation failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first one
    pub max_retries: u32,
    /// Wait before each retry
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 1,
            backoff: Duration::from_secs(2),
        }
    }
}

/// Something that turns a descriptor into a terminal result
///
/// The orchestrator only depends on this trait, so tests can drive it with
/// jobs that sleep, fail, or panic on demand.
#[async_trait]
pub trait SectionRunner: Send + Sync {
    /// Generate one section; must always return a result, never panic
    async fn generate(&self, section: &SectionDescriptor) -> SectionResult;
}

/// Per-run values every section prompt needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionContext {
    /// Article topic
    pub topic: String,
    /// Target audience
    pub target_audience: String,
    /// Illustration style
    pub image_style: ImageStyle,
}

/// [`SectionRunner`] that calls a [`GenerationClient`]
pub struct SectionGenerator {
    client: Arc<dyn GenerationClient>,
    context: SectionContext,
    text_params: TextParams,
    image_params: ImageParams,
    retry: RetryPolicy,
}

impl SectionGenerator {
    /// Create a generator for one run
    pub fn new(
        client: Arc<dyn GenerationClient>,
        context: SectionContext,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            text_params: TextParams {
                system_prompt: Some(SECTION_SYSTEM_PROMPT.to_string()),
                max_tokens: config.section_max_tokens,
                force_json: false,
            },
            image_params: config.image_params(context.image_style),
            retry: config.retry_policy(),
            client,
            context,
        }
    }
}

#[async_trait]
impl SectionRunner for SectionGenerator {
    async fn generate(&self, section: &SectionDescriptor) -> SectionResult {
        let index = section.index;
        let text_prompt = section_prompt(&self.context.topic, &self.context.target_audience, section);
        let image_prompt = image_prompt(&self.context.topic, section, self.context.image_style);

        tracing::debug!(index = index, title = %section.title, "Generating section");

        let text_call = retry_transient(&self.retry, index, "text", || {
            self.client.generate_text(&text_prompt, &self.text_params)
        });
        let image_call = retry_transient(&self.retry, index, "image", || {
            self.client.generate_image(&image_prompt, &self.image_params)
        });
        let ((text, attempts), (image, _)) = tokio::join!(text_call, image_call);

        let text = text.and_then(|raw| {
            clean_section_text(&raw, &section.title).ok_or_else(|| {
                GenerationError::MalformedResponse("Section text is empty".to_string())
            })
        });

        match text {
            Ok(text) => {
                let (image, warning) = match image {
                    Ok(image) => (Some(image), None),
                    Err(e) => {
                        tracing::warn!(index = index, error = %e, "Image generation failed, keeping text");
                        (None, Some(format!("Image generation failed: {}", e)))
                    }
                };
                tracing::debug!(
                    index = index,
                    text_len = text.len(),
                    has_image = image.is_some(),
                    attempts = attempts,
                    "Section generated"
                );
                SectionResult::succeeded(index, text, image, warning, attempts)
            }
            Err(e) => {
                tracing::error!(index = index, error = %e, attempts = attempts, "Section failed");
                SectionResult::failed(
                    index,
                    ErrorInfo::new(FailureKind::from_generation_error(&e), e.to_string()),
                    attempts,
                )
            }
        }
    }
}

/// Run a call, retrying transient failures per `policy`
///
/// Returns the final outcome and the number of attempts made.
pub async fn retry_transient<T, F, Fut>(
    policy: &RetryPolicy,
    index: usize,
    call_kind: &'static str,
    mut call: F,
) -> (Result<T, GenerationError>, u32)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, GenerationError>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match call().await {
            Ok(value) => return (Ok(value), attempt),
            Err(e) if e.is_transient() && attempt <= policy.max_retries => {
                tracing::warn!(
                    index = index,
                    call_kind = call_kind,
                    attempt = attempt,
                    error = %e,
                    "Transient generation failure, retrying"
                );
                if !policy.backoff.is_zero() {
                    tokio::time::sleep(policy.backoff).await;
                }
            }
            Err(e) => return (Err(e), attempt),
        }
    }
}

/// Normalize generated section text
///
/// Removes the end marker and a leading heading that repeats the section
/// title. Returns `None` when nothing is left.
pub fn clean_section_text(raw: &str, title: &str) -> Option<String> {
    let without_marker = raw.replace(END_SECTION_MARKER, "");
    let mut body = without_marker.trim();

    if let Some(first_line) = body.lines().next() {
        let heading = first_line.trim_start_matches('#');
        if heading.len() < first_line.len() && heading.trim() == title.trim() {
            body = body[first_line.len()..].trim_start();
        }
    }

    let body = body.trim_end();
    (!body.is_empty()).then(|| body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::ImageRef;
    use crate::pipeline::types::SectionStatus;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Client answering from per-call queues
    struct QueueClient {
        texts: Mutex<VecDeque<Result<String, GenerationError>>>,
        images: Mutex<VecDeque<Result<ImageRef, GenerationError>>>,
        text_calls: Mutex<u32>,
        image_calls: Mutex<u32>,
    }

    impl QueueClient {
        fn new(
            texts: Vec<Result<String, GenerationError>>,
            images: Vec<Result<ImageRef, GenerationError>>,
        ) -> Arc<Self> {
            Arc::new(Self {
                texts: Mutex::new(texts.into()),
                images: Mutex::new(images.into()),
                text_calls: Mutex::new(0),
                image_calls: Mutex::new(0),
            })
        }
    }

    #[async_trait]
    impl GenerationClient for QueueClient {
        async fn generate_text(
            &self,
            _prompt: &str,
            _params: &TextParams,
        ) -> Result<String, GenerationError> {
            *self.text_calls.lock().unwrap() += 1;
            self.texts
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected text call")
        }

        async fn generate_image(
            &self,
            _prompt: &str,
            _params: &ImageParams,
        ) -> Result<ImageRef, GenerationError> {
            *self.image_calls.lock().unwrap() += 1;
            self.images
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected image call")
        }
    }

    fn generator(client: Arc<QueueClient>) -> SectionGenerator {
        let config = PipelineConfig {
            retry_backoff_ms: 0,
            ..Default::default()
        };
        SectionGenerator::new(
            client,
            SectionContext {
                topic: "日本のカレーの歴史".to_string(),
                target_audience: "food lovers".to_string(),
                image_style: ImageStyle::Natural,
            },
            &config,
        )
    }

    fn descriptor() -> SectionDescriptor {
        SectionDescriptor {
            index: 4,
            title: "カレーの伝来".to_string(),
            brief: "How curry reached Japan".to_string(),
            subheadings: vec![],
        }
    }

    fn image() -> ImageRef {
        ImageRef::Remote("https://img.example/4.png".to_string())
    }

    #[tokio::test]
    async fn test_text_and_image_succeed() {
        let client = QueueClient::new(
            vec![Ok("## カレーの伝来\n\n明治時代に伝わった。\n\n<!--END_SECTION-->".to_string())],
            vec![Ok(image())],
        );
        let result = generator(client.clone()).generate(&descriptor()).await;

        assert_eq!(result.index, 4);
        assert_eq!(result.status, SectionStatus::Succeeded);
        assert_eq!(result.text.as_deref(), Some("明治時代に伝わった。"));
        assert_eq!(result.image, Some(image()));
        assert!(result.warning.is_none());
        assert_eq!(result.attempts, 1);
    }

    #[tokio::test]
    async fn test_image_failure_is_soft() {
        let client = QueueClient::new(
            vec![Ok("本文".to_string())],
            vec![Err(GenerationError::InvalidRequest("content policy".to_string()))],
        );
        let result = generator(client.clone()).generate(&descriptor()).await;

        assert!(result.is_succeeded());
        assert!(result.image.is_none());
        assert!(result.warning.unwrap().contains("content policy"));
        assert_eq!(*client.image_calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_transient_text_failure_retried_once_then_fails() {
        let client = QueueClient::new(
            vec![
                Err(GenerationError::RateLimited("busy".to_string())),
                Err(GenerationError::Timeout(180)),
            ],
            vec![Ok(image())],
        );
        let result = generator(client.clone()).generate(&descriptor()).await;

        assert_eq!(result.status, SectionStatus::Failed);
        assert_eq!(result.attempts, 2);
        assert!(result.image.is_none());
        let error = result.error.unwrap();
        assert_eq!(error.kind, FailureKind::TransientFailure);
        assert!(error.message.contains("180"));
        assert_eq!(*client.text_calls.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_transient_text_failure_recovers_on_retry() {
        let client = QueueClient::new(
            vec![
                Err(GenerationError::RateLimited("busy".to_string())),
                Ok("二回目で成功".to_string()),
            ],
            vec![Ok(image())],
        );
        let result = generator(client).generate(&descriptor()).await;

        assert!(result.is_succeeded());
        assert_eq!(result.attempts, 2);
        assert_eq!(result.text.as_deref(), Some("二回目で成功"));
    }

    #[tokio::test]
    async fn test_non_transient_failure_not_retried() {
        let client = QueueClient::new(
            vec![Err(GenerationError::Authentication("bad key".to_string()))],
            vec![Err(GenerationError::Authentication("bad key".to_string()))],
        );
        let result = generator(client.clone()).generate(&descriptor()).await;

        assert_eq!(result.status, SectionStatus::Failed);
        assert_eq!(result.attempts, 1);
        assert_eq!(result.error.unwrap().kind, FailureKind::UpstreamUnavailable);
        assert_eq!(*client.text_calls.lock().unwrap(), 1);
        assert_eq!(*client.image_calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_empty_text_is_parse_failure() {
        let client = QueueClient::new(
            vec![Ok("  <!--END_SECTION-->  ".to_string())],
            vec![Ok(image())],
        );
        let result = generator(client).generate(&descriptor()).await;

        assert_eq!(result.status, SectionStatus::Failed);
        assert_eq!(result.error.unwrap().kind, FailureKind::ParseFailure);
    }

    #[tokio::test]
    async fn test_transient_image_failure_retried() {
        let client = QueueClient::new(
            vec![Ok("本文".to_string())],
            vec![Err(GenerationError::Timeout(120)), Ok(image())],
        );
        let result = generator(client.clone()).generate(&descriptor()).await;

        assert_eq!(result.image, Some(image()));
        assert_eq!(*client.image_calls.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_retry_transient_respects_budget() {
        let policy = RetryPolicy {
            max_retries: 3,
            backoff: Duration::ZERO,
        };
        let mut calls = 0;
        let (result, attempts) = retry_transient(&policy, 0, "text", || {
            calls += 1;
            async { Err::<(), _>(GenerationError::Timeout(1)) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts, 4);
        assert_eq!(calls, 4);
    }

    #[test]
    fn test_clean_section_text() {
        assert_eq!(
            clean_section_text("# Title\nBody text\n<!--END_SECTION-->", "Title").as_deref(),
            Some("Body text")
        );
        // a different heading is content, not a repeated title
        assert_eq!(
            clean_section_text("### Other\nBody", "Title").as_deref(),
            Some("### Other\nBody")
        );
        assert_eq!(
            clean_section_text("Title\nBody", "Title").as_deref(),
            Some("Title\nBody")
        );
        assert_eq!(clean_section_text("## Title", "Title"), None);
        assert_eq!(clean_section_text("\n\n", "Title"), None);
    }
}
