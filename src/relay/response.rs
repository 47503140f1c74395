//! Response relay
//!
//! Copies the upstream response back to the original caller. Two modes:
//! buffered (read the whole body, then respond once) and streaming (mirror
//! the status from the header phase and forward body chunks verbatim as
//! they arrive).

use std::convert::Infallible;

use axum::body::Body;
use axum::http::{header, Response, StatusCode};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde_json::Value;
use tracing::warn;

use crate::error::{AppError, AppResult};

/// Relay a fully buffered upstream response.
///
/// The upstream status code is mirrored exactly, including 4xx/5xx. A JSON
/// content-type is parsed and re-serialized; anything else is treated as
/// opaque text.
pub async fn buffered(upstream: reqwest::Response) -> AppResult<Response<Body>> {
    let status = StatusCode::from_u16(upstream.status().as_u16())
        .unwrap_or(StatusCode::BAD_GATEWAY);
    let content_type = upstream
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    let is_json = content_type
        .as_deref()
        .map(|ct| ct.contains("application/json"))
        .unwrap_or(false);

    let body = if is_json {
        let value: Value = upstream
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to read upstream body: {}", e)))?;
        serde_json::to_vec(&value)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize body: {}", e)))?
    } else {
        upstream
            .text()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to read upstream body: {}", e)))?
            .into_bytes()
    };

    let mut builder = Response::builder().status(status);
    if let Some(ct) = content_type {
        builder = builder.header(header::CONTENT_TYPE, ct);
    }

    builder
        .body(Body::from(body))
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to build response: {}", e)))
}

/// Relay an upstream response incrementally.
///
/// The status code is committed as soon as upstream headers are in; after
/// the first chunk is flushed it cannot change. Chunks pass through
/// unmodified, one at a time, so a slow client naturally throttles the
/// upstream read. A mid-stream upstream failure is surfaced as one terminal
/// `event: error` frame so clients can tell it apart from a clean
/// end-of-stream.
pub fn streaming(upstream: reqwest::Response) -> AppResult<Response<Body>> {
    let status = StatusCode::from_u16(upstream.status().as_u16())
        .unwrap_or(StatusCode::BAD_GATEWAY);
    let content_type = upstream
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("text/event-stream")
        .to_owned();

    let body = Body::from_stream(relay_stream(upstream.bytes_stream()));

    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "keep-alive")
        .header("X-Accel-Buffering", "no")
        .body(body)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to build response: {}", e)))
}

/// Forward upstream chunks verbatim, converting a mid-stream failure into a
/// terminal `event: error` frame followed by end-of-stream.
pub fn relay_stream<S, E>(upstream: S) -> impl Stream<Item = Result<Bytes, Infallible>> + Send
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    async_stream::stream! {
        futures::pin_mut!(upstream);
        while let Some(chunk) = upstream.next().await {
            match chunk {
                Ok(bytes) => yield Ok(bytes),
                Err(e) => {
                    warn!(error = %e, "Upstream body failed mid-stream");
                    yield Ok(error_event(&e.to_string()));
                    break;
                }
            }
        }
    }
}

/// Frame an error message as a server-sent event.
fn error_event(message: &str) -> Bytes {
    let payload = serde_json::json!({ "error": message });
    Bytes::from(format!("event: error\ndata: {}\n\n", payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use std::io;

    #[tokio::test]
    async fn test_chunks_pass_through_in_order() {
        let upstream = stream::iter(vec![
            Ok::<_, io::Error>(Bytes::from_static(b"data: one\n\n")),
            Ok(Bytes::from_static(b"data: two\n\n")),
            Ok(Bytes::from_static(b"data: [DONE]\n\n")),
        ]);

        let chunks: Vec<Bytes> = relay_stream(upstream)
            .map(|chunk| chunk.unwrap())
            .collect()
            .await;

        assert_eq!(
            chunks,
            vec![
                Bytes::from_static(b"data: one\n\n"),
                Bytes::from_static(b"data: two\n\n"),
                Bytes::from_static(b"data: [DONE]\n\n"),
            ]
        );
    }

    #[tokio::test]
    async fn test_mid_stream_failure_emits_terminal_error_event() {
        let upstream = stream::iter(vec![
            Ok(Bytes::from_static(b"data: one\n\n")),
            Ok(Bytes::from_static(b"data: two\n\n")),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "connection reset")),
        ]);

        let chunks: Vec<Bytes> = relay_stream(upstream)
            .map(|chunk| chunk.unwrap())
            .collect()
            .await;

        // Delivered chunks survive verbatim, then exactly one error frame
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0], Bytes::from_static(b"data: one\n\n"));
        assert_eq!(chunks[1], Bytes::from_static(b"data: two\n\n"));

        let frame = String::from_utf8(chunks[2].to_vec()).unwrap();
        assert!(frame.starts_with("event: error\n"));
        let data_line = frame
            .lines()
            .find_map(|line| line.strip_prefix("data: "))
            .unwrap();
        let payload: Value = serde_json::from_str(data_line).unwrap();
        assert_eq!(payload["error"], "connection reset");
    }

    #[tokio::test]
    async fn test_clean_end_has_no_error_frame() {
        let upstream = stream::iter(vec![Ok::<_, io::Error>(Bytes::from_static(b"data: fin\n\n"))]);

        let chunks: Vec<Bytes> = relay_stream(upstream)
            .map(|chunk| chunk.unwrap())
            .collect()
            .await;

        assert_eq!(chunks, vec![Bytes::from_static(b"data: fin\n\n")]);
    }

    #[test]
    fn test_error_event_escapes_message() {
        let frame = String::from_utf8(error_event("quote \" and\nnewline").to_vec()).unwrap();
        // The JSON payload must stay on a single data line
        assert_eq!(frame.matches('\n').count(), 3);
        let data_line = frame
            .lines()
            .find_map(|line| line.strip_prefix("data: "))
            .unwrap();
        let payload: Value = serde_json::from_str(data_line).unwrap();
        assert_eq!(payload["error"], "quote \" and\nnewline");
    }
}
