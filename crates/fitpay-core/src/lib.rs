//! # fitpay-core
//!
//! Core types and traits for the missfit-pay payment pipeline.
//!
//! This crate provides:
//! - The shared request gate chain (`GateChain`, `GateChainConfig`)
//! - `CheckoutRequest` validation and money conversion
//! - Per-IP rate limiting over a TTL counter store (`RateLimiter`)
//! - Capability traits for the external services (`CheckoutSessionCreator`,
//!   `CaptchaVerifier`, `SignatureVerifier`, `Notifier`)
//! - `WebhookEvent` for verified provider events
//! - `PaymentError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use fitpay_core::{GateChain, GateChainConfig, GateDecision, RequestContext};
//!
//! let chain = GateChain::new(GateChainConfig::default());
//!
//! let ctx = RequestContext::new("POST")
//!     .with_origin("https://missfitcoaching.com")
//!     .with_content_type("application/json");
//!
//! match chain.evaluate(&ctx) {
//!     GateDecision::Allow { origin } => { /* run the checkout pipeline */ }
//!     GateDecision::Preflight { origin } => { /* CORS preflight response */ }
//!     GateDecision::Reject(rejection) => { /* error response */ }
//! }
//! ```

pub mod error;
pub mod event;
pub mod gate;
pub mod limiter;
pub mod provider;
pub mod request;

// Re-exports for convenience
pub use error::{PaymentError, PaymentResult};
pub use event::{WebhookEvent, WebhookEventKind};
pub use gate::{
    AllowedOriginSet, CaptchaConfig, GateChain, GateChainConfig, GateDecision, RateLimitConfig,
    Rejection, RequestContext,
};
pub use limiter::{MemoryRateLimitStore, RateLimitStore, RateLimiter};
pub use provider::{
    CaptchaVerifier, CheckoutOrder, CheckoutSession, CheckoutSessionCreator, LoggingNotifier,
    Notifier, SignatureVerifier,
};
pub use request::{to_minor_units, CheckoutRequest, PaymentType, ValidatedCheckout, CURRENCY};
