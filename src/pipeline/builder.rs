//! Document builder
//!
//! Entry point that runs outline → orchestrator → assembler for one request.

use crate::generation::{GenerationClient, GenerationError};
use crate::pipeline::assembler::assemble;
use crate::pipeline::config::PipelineConfig;
use crate::pipeline::error::{OutlineError, PipelineError};
use crate::pipeline::orchestrator;
use crate::pipeline::outline::OutlineBuilder;
use crate::pipeline::section::{SectionContext, SectionGenerator};
use crate::pipeline::types::{Document, GenerationRequest, Outline, ProgressEvent};
use crate::pipeline::utils::hash_topic;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::Instant;

/// Everything a run needs from its caller
///
/// Passed explicitly so no run depends on process-global state.
#[derive(Clone)]
pub struct PipelineContext {
    /// Client used for every generation call of the run
    pub client: Arc<dyn GenerationClient>,
    /// Settings snapshot for the run
    pub config: PipelineConfig,
}

/// Per-run limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Maximum number of sections generated at once
    pub concurrency_limit: usize,
    /// Time budget for the whole run, outline included
    pub deadline: Duration,
}

impl RunOptions {
    /// Limits taken from the pipeline settings
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            concurrency_limit: config.concurrency_limit,
            deadline: config.run_deadline(),
        }
    }
}

/// Build a complete document for `request`
///
/// Only outline failures are errors; failed sections become placeholders in
/// the returned document.
pub async fn build_document(
    ctx: &PipelineContext,
    request: &GenerationRequest,
    options: &RunOptions,
    progress: Option<&UnboundedSender<ProgressEvent>>,
) -> Result<Document, PipelineError> {
    build_document_with_outline(ctx, request, options, progress)
        .await
        .map(|(_, document)| document)
}

/// Same as [`build_document`], also returning the outline for export
pub async fn build_document_with_outline(
    ctx: &PipelineContext,
    request: &GenerationRequest,
    options: &RunOptions,
    progress: Option<&UnboundedSender<ProgressEvent>>,
) -> Result<(Outline, Document), PipelineError> {
    let deadline = Instant::now() + options.deadline;
    let topic_hash = hash_topic(request.topic.trim());

    tracing::info!(
        topic_hash = %topic_hash,
        section_count = request.section_count,
        concurrency_limit = options.concurrency_limit,
        deadline_secs = options.deadline.as_secs(),
        "Starting document run"
    );

    let outline_builder = OutlineBuilder::new(ctx.client.clone(), ctx.config.clone());
    let outline = match tokio::time::timeout_at(deadline, outline_builder.build(request)).await {
        Ok(outline) => outline?,
        Err(_) => {
            tracing::error!(topic_hash = %topic_hash, "Run deadline elapsed while building outline");
            return Err(OutlineError::UpstreamUnavailable(GenerationError::Timeout(
                options.deadline.as_secs(),
            ))
            .into());
        }
    };

    if let Some(tx) = progress {
        let _ = tx.send(ProgressEvent::OutlineReady {
            section_count: outline.len(),
        });
    }

    let generator = SectionGenerator::new(
        ctx.client.clone(),
        SectionContext {
            topic: outline.topic.clone(),
            target_audience: request.target_audience.clone(),
            image_style: request.image_style,
        },
        &ctx.config,
    );

    let report = orchestrator::run(
        &outline.sections,
        Arc::new(generator),
        options.concurrency_limit,
        deadline,
        progress,
    )
    .await;

    let document = assemble(&outline, report.results);

    tracing::info!(
        topic_hash = %topic_hash,
        status = %document.status,
        images = document.images.len(),
        elapsed_ms = report.elapsed.as_millis() as u64,
        "Document assembled"
    );

    if let Some(tx) = progress {
        let _ = tx.send(ProgressEvent::Finished {
            status: document.status,
        });
    }

    Ok((outline, document))
}
