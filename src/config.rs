//! Configuration management for the Umbra relay
//!
//! Configuration is loaded from environment variables. The upstream target
//! URL and API key are required; the relay refuses to start without them so
//! it can never accept traffic in a half-configured state.

use anyhow::{bail, Context, Result};
use std::env;
use std::str::FromStr;

/// How the relay returns the upstream response to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayMode {
    /// Read the full upstream body before responding.
    Buffered,
    /// Forward upstream bytes to the client as they arrive.
    Streaming,
}

impl FromStr for RelayMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "buffered" => Ok(RelayMode::Buffered),
            "streaming" => Ok(RelayMode::Streaming),
            other => bail!(
                "Invalid RELAY_MODE '{}': expected 'buffered' or 'streaming'",
                other
            ),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,

    /// Full upstream chat-completion URL requests are dispatched to
    pub target_url: String,
    /// Secret bearer credential for the upstream API
    pub api_key: String,

    /// Buffered or streaming response relay
    pub mode: RelayMode,

    /// Origins allowed to call the relay from a browser
    pub allowed_origins: Vec<String>,

    /// Bound on waiting for upstream response headers (seconds).
    /// Does not bound the streaming body itself.
    pub upstream_header_timeout_secs: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            host: env::var("RELAY_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("DEV_PROXY_PORT")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()
                .context("Invalid DEV_PROXY_PORT")?,

            target_url: env::var("DEEPSEEK_TARGET_URL")
                .context("DEEPSEEK_TARGET_URL must be set")?,
            api_key: env::var("DEEPSEEK_API_KEY").context("DEEPSEEK_API_KEY must be set")?,

            mode: env::var("RELAY_MODE")
                .unwrap_or_else(|_| "streaming".to_string())
                .parse()?,

            allowed_origins: env::var("ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:5500,http://127.0.0.1:5500".to_string())
                .split(',')
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect(),

            upstream_header_timeout_secs: env::var("UPSTREAM_HEADER_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .context("Invalid UPSTREAM_HEADER_TIMEOUT_SECS")?,
        })
    }
}
