//! # fitpay-turnstile
//!
//! Cloudflare Turnstile challenge verification for missfit-pay-rs.
//!
//! Implements the `CaptchaVerifier` capability against the Turnstile
//! `siteverify` endpoint: token + server-side secret + client IP in,
//! pass/reject out.
//!
//! ```rust,ignore
//! use fitpay_turnstile::{TurnstileConfig, TurnstileVerifier};
//! use fitpay_core::CaptchaVerifier;
//!
//! let verifier = TurnstileVerifier::new(&TurnstileConfig::from_env()?)?;
//! verifier.verify(&token, &client_ip).await?;
//! ```

pub mod config;
pub mod verifier;

// Re-exports
pub use config::TurnstileConfig;
pub use verifier::TurnstileVerifier;
