//! Common test utilities for the relay integration tests
//!
//! Provides a harness that wires a real relay router to a wiremock upstream.

#![allow(dead_code)]

use std::sync::Arc;

use axum_test::TestServer;
use wiremock::MockServer;

use umbra_relay::{routes, AppState, Config, RelayMode};

/// Test credential injected into upstream requests. Must never appear in a
/// client-visible response.
pub const TEST_API_KEY: &str = "test-deepseek-api-key";

/// Origin on the CORS allow-list in test configs
pub const ALLOWED_ORIGIN: &str = "http://localhost:5500";

/// Build a Config pointing the relay at the given upstream URL
pub fn test_config(target_url: &str, mode: RelayMode) -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        target_url: target_url.to_string(),
        api_key: TEST_API_KEY.to_string(),
        mode,
        allowed_origins: vec![ALLOWED_ORIGIN.to_string()],
        upstream_header_timeout_secs: 5,
    }
}

/// Relay test harness: a TestServer wired to a wiremock upstream
pub struct RelayHarness {
    pub server: TestServer,
    pub upstream: MockServer,
}

impl RelayHarness {
    /// Start a mock upstream and a relay configured to dispatch to it
    pub async fn new(mode: RelayMode) -> Self {
        let upstream = MockServer::start().await;
        let config = test_config(
            &format!("{}/v1/chat/completions", upstream.uri()),
            mode,
        );
        let server = spawn_relay(config);
        Self { server, upstream }
    }
}

/// Build a TestServer around a relay with the given config
pub fn spawn_relay(config: Config) -> TestServer {
    let state = Arc::new(AppState::new(config).expect("Failed to build app state"));
    let app = routes::create_router(state);
    TestServer::new(app).expect("Failed to create test server")
}
