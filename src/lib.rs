//! Kickover: a webhook that triggers rolling restarts of Kubernetes Deployments.
//!
//! `POST /` with `{"namespace": ..., "deploymentName": ...}` and a bearer token
//! stamps the Deployment's pod template with `kubectl.kubernetes.io/restartedAt`,
//! the same signal `kubectl rollout restart` uses.

pub mod cluster;
pub mod config;
pub mod error;
pub mod http;
pub mod middleware;
pub mod restart;
pub mod routes;
pub mod state;

pub use error::AppError;
pub use restart::{RestartRequest, Restarter};
pub use routes::create_router;
pub use state::AppState;
