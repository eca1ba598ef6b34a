//! # fitpay-stripe
//!
//! Stripe integration for missfit-pay-rs.
//!
//! This crate provides:
//!
//! 1. **StripeCheckoutClient** — Checkout Sessions API client
//!    implementing `CheckoutSessionCreator`
//! 2. **StripeSignatureVerifier** — HMAC-SHA256 verification of the
//!    `stripe-signature` header against the raw webhook bytes
//! 3. **StripeWebhookProcessor** — the verify → parse → dispatch pipeline,
//!    with a `WebhookHandler` trait for the per-event side effects
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use fitpay_stripe::{StripeCheckoutClient, StripeConfig};
//! use fitpay_core::CheckoutSessionCreator;
//!
//! let config = StripeConfig::from_env()?;
//! let client = StripeCheckoutClient::new(&config)?;
//!
//! let session = client.create_session(&order).await?;
//! // Return session.id to the caller for redirect
//! ```
//!
//! ## Webhook Handling
//!
//! ```rust,ignore
//! use fitpay_stripe::{NotifyingWebhookHandler, StripeWebhookProcessor};
//!
//! let handler = Arc::new(NotifyingWebhookHandler::new("MissFit", notifier));
//! let processor = StripeWebhookProcessor::from_config(&config, handler)?;
//!
//! // In the webhook endpoint:
//! let event = processor.process(&body, signature).await?;
//! ```

pub mod checkout;
pub mod config;
pub mod webhook;

// Re-exports
pub use checkout::StripeCheckoutClient;
pub use config::StripeConfig;
pub use webhook::{
    dispatch_event, parse_event, plan_name_from_session, NotifyingWebhookHandler,
    StripeSignatureVerifier, StripeWebhookProcessor, WebhookHandler,
};
