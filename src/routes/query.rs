//! Query relay endpoint
//!
//! Accepts a chat request from the browser, forwards it upstream with the
//! injected credential, and relays the upstream response back in the
//! configured mode.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::Response,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{config::RelayMode, error::AppError, relay, AppState};

/// Inbound query request
///
/// Only `query` is required; every other field rides through to the
/// upstream untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    #[serde(rename = "topK", skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    // Pass through any extra fields
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Handle query relay requests
///
/// The `:provider` path segment identifies the provider the frontend thinks
/// it is talking to; all providers dispatch to the configured upstream URL.
pub async fn relay_query(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<String>,
    request: axum::extract::Request,
) -> Result<Response, AppError> {
    let body = axum::body::to_bytes(request.into_body(), usize::MAX)
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to read request body: {}", e)))?;

    let query_request: QueryRequest = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Invalid request body: {}", e)))?;

    info!(
        provider = %provider,
        query_len = query_request.query.len(),
        mode = ?state.config.mode,
        "Processing relay request"
    );

    let payload = serde_json::to_value(&query_request)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize request: {}", e)))?;

    let upstream = state.upstream.dispatch(&payload).await?;
    let status = upstream.status();

    let response = match state.config.mode {
        RelayMode::Buffered => relay::response::buffered(upstream).await?,
        RelayMode::Streaming => relay::response::streaming(upstream)?,
    };

    info!(provider = %provider, status = %status, "Relay request completed");

    Ok(response)
}
