//! Article generation endpoint
//!
//! `POST /api/generate` validates the request up front, then runs the
//! pipeline in a background task and streams its progress as SSE.

use crate::api::streaming::{create_sse_response, sse_json, SSE_DONE_SIGNAL};
use crate::error::AppError;
use crate::pipeline::outline::validate_request;
use crate::pipeline::utils::hash_topic;
use crate::pipeline::{
    build_document_with_outline, Document, GenerationRequest, PipelineContext, RunOptions,
};
use crate::services::ExportSummary;
use crate::state::SharedState;
use axum::{extract::State, response::Response, Json};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::StreamExt;

/// Request body for the generate endpoint
#[derive(Deserialize)]
pub struct GenerateRequest {
    /// What to write
    #[serde(flatten)]
    pub request: GenerationRequest,
    /// API key for this run (falls back to the configured key)
    #[serde(default)]
    pub api_key: Option<String>,
    /// Write the run to a session directory
    #[serde(default)]
    pub export: bool,
}

/// Last message of a generate stream before `[DONE]`
#[derive(Serialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FinalMessage {
    /// The assembled document
    Document {
        /// Document fields
        #[serde(flatten)]
        document: Document,
        /// Written paths when export was requested and succeeded
        #[serde(skip_serializing_if = "Option::is_none")]
        export: Option<ExportSummary>,
        /// Export failure, when export was requested and failed
        #[serde(skip_serializing_if = "Option::is_none")]
        export_error: Option<String>,
    },
    /// The run aborted before any section was generated
    Error {
        /// Human-readable reason
        error: String,
    },
}

/// Aborts the run when the response stream is dropped early
struct AbortOnDrop(AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Generate an article and stream progress
///
/// Input problems are returned as 400 before the stream starts. After that
/// the stream carries progress events, one final message, then `[DONE]`.
pub async fn generate(
    State(state): State<SharedState>,
    Json(body): Json<GenerateRequest>,
) -> Result<Response, AppError> {
    let GenerateRequest {
        request,
        api_key,
        export,
    } = body;

    let (ctx, export_service) = {
        let state = state.read().await;
        validate_request(&request, &state.pipeline)
            .map_err(|e| AppError::InvalidRequest(e.to_string()))?;
        let client = state.generation_client(api_key.as_deref())?;
        (
            PipelineContext {
                client,
                config: state.pipeline.clone(),
            },
            export.then(|| state.export.clone()),
        )
    };
    let options = RunOptions::from_config(&ctx.config);

    tracing::info!(
        topic_hash = %hash_topic(request.topic.trim()),
        section_count = request.section_count,
        export = export,
        "Generate request accepted"
    );

    let (tx, rx) = mpsc::unbounded_channel();
    let run = tokio::spawn(async move {
        let (outline, document) =
            match build_document_with_outline(&ctx, &request, &options, Some(&tx)).await {
                Ok(built) => built,
                Err(e) => {
                    tracing::error!(error = %e, "Document run failed");
                    return FinalMessage::Error {
                        error: e.to_string(),
                    };
                }
            };

        let (export, export_error) = match export_service {
            None => (None, None),
            Some(service) => {
                let exported = match service.create_session_dir().await {
                    Ok(session_dir) => service.export(&session_dir, &outline, &document).await,
                    Err(e) => Err(e),
                };
                match exported {
                    Ok(summary) => (Some(summary), None),
                    Err(e) => {
                        tracing::error!(error = %e, "Export failed");
                        (None, Some(e.to_string()))
                    }
                }
            }
        };

        FinalMessage::Document {
            document,
            export,
            export_error,
        }
    });
    let guard = AbortOnDrop(run.abort_handle());

    let progress = UnboundedReceiverStream::new(rx).map(|event| sse_json(&event));
    let tail = async_stream::stream! {
        let _guard = guard;
        let message = match run.await {
            Ok(message) => message,
            Err(e) => {
                tracing::error!(error = %e, "Generate task failed");
                FinalMessage::Error {
                    error: "internal error while generating".to_string(),
                }
            }
        };
        yield sse_json(&message);
        yield SSE_DONE_SIGNAL.to_string();
    };

    create_sse_response(progress.chain(tail))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{AggregateStatus, SectionResult};

    #[test]
    fn test_request_body_defaults() {
        let body: GenerateRequest =
            serde_json::from_str(r#"{"topic": "Rust", "section_count": 3}"#).unwrap();
        assert_eq!(body.request, GenerationRequest::new("Rust", 3));
        assert!(body.api_key.is_none());
        assert!(!body.export);
    }

    #[test]
    fn test_final_message_shape() {
        let message = FinalMessage::Document {
            document: Document {
                topic: "Rust".to_string(),
                sections: vec![SectionResult::succeeded(0, "x".to_string(), None, None, 1)],
                markdown: "# Rust\n".to_string(),
                images: vec![],
                status: AggregateStatus::AllSucceeded,
            },
            export: None,
            export_error: None,
        };
        let json: serde_json::Value = serde_json::from_str(&sse_json(&message)).unwrap();
        assert_eq!(json["type"], "document");
        assert_eq!(json["markdown"], "# Rust\n");
        assert_eq!(json["status"]["outcome"], "all_succeeded");
        assert!(json.get("export").is_none());

        let error = FinalMessage::Error {
            error: "Outline contains no sections".to_string(),
        };
        assert_eq!(
            sse_json(&error),
            r#"{"type":"error","error":"Outline contains no sections"}"#
        );
    }
}
