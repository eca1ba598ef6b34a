//! # fitpay-api
//!
//! HTTP API layer for missfit-pay-rs.
//!
//! This crate provides:
//! - Axum-based HTTP server
//! - The checkout endpoint behind the shared gate chain
//! - Webhook ingestion with signature verification
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/health` | Health check |
//! | POST | `/payment` | Create checkout session |
//! | OPTIONS | `/payment` | CORS preflight |
//! | POST | `/webhook` | Stripe webhook |

pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::{AppConfig, AppState};
