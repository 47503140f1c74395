//! Liveness endpoint
//!
//! A fixed plaintext confirmation so developers can check the relay is up
//! before pointing the frontend at it.

/// Liveness check endpoint
pub async fn liveness() -> &'static str {
    "Umbra relay running"
}
