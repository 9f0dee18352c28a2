//! Health check endpoint for container orchestration.
//!
//! Liveness only: answers 200 while the process can serve HTTP. It does not
//! contact the API server, so a cluster outage does not get the pod killed.

/// Health check handler.
pub async fn health() -> &'static str {
    "ok"
}
