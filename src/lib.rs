//! Umbra Relay - credential-shielding dev proxy for the Umbra site
//!
//! This library provides the core functionality for the relay server. It
//! forwards browser chat requests to an upstream LLM API with the secret
//! credential injected server-side, and relays the response back either
//! buffered or as a live byte stream.

pub mod config;
pub mod error;
pub mod relay;
pub mod routes;

use anyhow::Result;

pub use crate::config::{Config, RelayMode};
pub use crate::relay::UpstreamClient;

/// Application state shared across all request handlers
pub struct AppState {
    pub config: Config,
    pub http_client: reqwest::Client,
    pub upstream: UpstreamClient,
}

impl AppState {
    /// Create a new application state
    pub fn new(config: Config) -> Result<Self> {
        // No whole-request timeout: it would sever long-lived streaming
        // bodies. Connection setup and the header wait are bounded instead.
        let http_client = reqwest::Client::builder()
            .pool_max_idle_per_host(100)
            .connect_timeout(std::time::Duration::from_secs(10))
            .build()?;

        let upstream = UpstreamClient::new(http_client.clone(), &config);

        Ok(Self {
            config,
            http_client,
            upstream,
        })
    }
}
