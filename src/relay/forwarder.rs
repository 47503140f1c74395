//! Upstream forwarder
//!
//! Builds the authenticated upstream request from an inbound body and
//! dispatches it. The secret credential is injected here and never travels
//! anywhere else.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;
use tracing::debug;

use crate::{
    config::{Config, RelayMode},
    error::{AppError, AppResult},
};

/// Client for the configured upstream chat-completion endpoint
pub struct UpstreamClient {
    client: reqwest::Client,
    target_url: String,
    api_key: String,
    mode: RelayMode,
    header_timeout: Duration,
}

impl UpstreamClient {
    /// Create a new upstream client
    pub fn new(client: reqwest::Client, config: &Config) -> Self {
        Self {
            client,
            target_url: config.target_url.clone(),
            api_key: config.api_key.clone(),
            mode: config.mode,
            header_timeout: Duration::from_secs(config.upstream_header_timeout_secs),
        }
    }

    /// Dispatch an inbound body to the upstream endpoint.
    ///
    /// Returns once upstream response headers are in; the body has not been
    /// read yet. In streaming mode a `stream: true` member is force-injected
    /// into the outbound payload so the upstream emits an incremental
    /// response regardless of what the caller asked for. Any transport
    /// failure before headers, including the header-wait timeout, becomes
    /// [`AppError::UpstreamUnreachable`].
    pub async fn dispatch(&self, body: &Value) -> AppResult<reqwest::Response> {
        let payload = match self.mode {
            RelayMode::Streaming => force_stream_flag(body.clone()),
            RelayMode::Buffered => body.clone(),
        };

        debug!(url = %self.target_url, mode = ?self.mode, "Dispatching upstream request");

        let send = self
            .client
            .post(&self.target_url)
            .headers(self.default_headers())
            .json(&payload)
            .send();

        tokio::time::timeout(self.header_timeout, send)
            .await
            .map_err(|_| {
                AppError::UpstreamUnreachable(format!(
                    "timed out after {}s waiting for upstream response headers",
                    self.header_timeout.as_secs()
                ))
            })?
            .map_err(|e| AppError::UpstreamUnreachable(e.to_string()))
    }

    /// Build default headers for upstream requests
    fn default_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.api_key))
                .expect("Invalid API key"),
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers
    }
}

/// Force `stream: true` into an outbound JSON object.
///
/// Non-object bodies are left untouched; the upstream will reject them on
/// its own terms.
pub(crate) fn force_stream_flag(mut body: Value) -> Value {
    if let Value::Object(ref mut map) = body {
        map.insert("stream".to_string(), Value::Bool(true));
    }
    body
}
