//! HTTP server module.
//!
//! Plain HTTP only; TLS is expected to terminate at the ingress or service
//! mesh in front of the webhook. The server includes:
//! - Graceful shutdown on SIGTERM/SIGINT
//! - A bounded drain period for in-flight restarts

mod server;
mod shutdown;

pub use server::{serve, ServerError};
