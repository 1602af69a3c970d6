//! Streaming utilities for Server-Sent Events (SSE)
//!
//! Wraps a stream of JSON payloads in a `text/event-stream` response.

use crate::error::AppError;
use axum::{
    body::Body,
    http::{header, StatusCode},
    response::Response,
};
use futures_util::{stream::Stream, StreamExt};
use serde::Serialize;

/// Final SSE payload signalling the end of the stream
pub const SSE_DONE_SIGNAL: &str = "[DONE]";

/// Serialize a value as one SSE `data:` payload
pub fn sse_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to serialize SSE payload");
        serde_json::json!({"type": "error", "error": "failed to serialize event"}).to_string()
    })
}

/// Create an SSE response from a stream of payloads
///
/// Each item is sent as one `data:` event.
///
/// # Returns
/// * `Result<Response, AppError>` - SSE HTTP response or error
pub fn create_sse_response<S>(payloads: S) -> Result<Response, AppError>
where
    S: Stream<Item = String> + Send + 'static,
{
    let sse_stream =
        payloads.map(|data| Ok::<_, std::io::Error>(format!("data: {}\n\n", data)));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "keep-alive")
        .body(Body::from_stream(sse_stream))
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to build SSE response: {}", e)))
}
