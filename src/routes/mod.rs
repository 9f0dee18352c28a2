//! HTTP routes for the webhook.
//!
//! `POST /` triggers a restart; every other method on `/` gets 405 before any
//! authentication happens. `/health` is an unauthenticated liveness probe.
//!
//! Request tracing is enabled via middleware that assigns a request ID to each
//! incoming request, allowing correlation of all logs within a request.

pub mod health;
pub mod webhook;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::middleware::{request_id_layer, require_bearer};
use crate::state::AppState;

/// Creates the Axum router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    // The bearer check is a route layer on the POST endpoint only, so the
    // method fallback answers 405 without looking at credentials.
    let webhook_routes = Router::new().route(
        "/",
        post(webhook::restart)
            .route_layer(middleware::from_fn_with_state(state.clone(), require_bearer))
            .fallback(webhook::method_not_allowed),
    );

    // Health check - always fresh for liveness probes
    let health_routes = Router::new().route("/health", get(health::health));

    Router::new()
        .merge(webhook_routes)
        .merge(health_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        // Request ID middleware - creates root span with request_id for correlation
        .layer(middleware::from_fn(request_id_layer))
}
