//! # Routes
//!
//! Axum router configuration for the payment API.
//!
//! `/payment` and `/webhook` are registered with `any()` so the gate
//! chain's method gate answers disallowed methods itself (405 with a JSON
//! body) and sees every request in order.

use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{any, get},
    Router,
};
use tower_http::trace::TraceLayer;

/// Create the main application router
///
/// Routes:
/// - POST/OPTIONS /payment — create a checkout session (+ CORS preflight)
/// - POST /webhook — provider webhook ingestion
/// - GET /health — liveness check
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/payment", any(handlers::payment))
        .route("/webhook", any(handlers::webhook))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
