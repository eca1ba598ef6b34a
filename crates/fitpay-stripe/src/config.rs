//! # Stripe Configuration
//!
//! Configuration management for the Stripe integration.
//! All secrets are loaded from environment variables.

use fitpay_core::{PaymentError, PaymentResult};
use std::env;

/// Stripe API configuration.
///
/// Credentials are optional at load time: a missing secret disables the
/// affected endpoint (which then fails closed with a configuration error at
/// request time) instead of taking the whole service down.
#[derive(Debug, Clone)]
pub struct StripeConfig {
    /// Secret API key (sk_test_... or sk_live_...)
    pub secret_key: Option<String>,

    /// Webhook signing secret (whsec_...)
    pub webhook_secret: Option<String>,

    /// API base URL (for testing/mocking)
    pub api_base_url: String,

    /// API version
    pub api_version: String,
}

const API_BASE_URL: &str = "https://api.stripe.com";
const API_VERSION: &str = "2024-12-18.acacia";

impl StripeConfig {
    /// Load configuration from environment variables.
    ///
    /// Reads `STRIPE_SECRET_KEY` and `STRIPE_WEBHOOK_SECRET`. A variable
    /// that is set but malformed is an error; an absent variable is not.
    pub fn from_env() -> PaymentResult<Self> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let secret_key = env::var("STRIPE_SECRET_KEY").ok();
        let webhook_secret = env::var("STRIPE_WEBHOOK_SECRET").ok();

        if let Some(ref key) = secret_key {
            if !key.starts_with("sk_test_") && !key.starts_with("sk_live_") {
                return Err(PaymentError::Configuration(
                    "STRIPE_SECRET_KEY must start with sk_test_ or sk_live_".to_string(),
                ));
            }
        }

        if let Some(ref secret) = webhook_secret {
            if !secret.starts_with("whsec_") {
                return Err(PaymentError::Configuration(
                    "STRIPE_WEBHOOK_SECRET must start with whsec_".to_string(),
                ));
            }
        }

        Ok(Self {
            secret_key,
            webhook_secret,
            api_base_url: API_BASE_URL.to_string(),
            api_version: API_VERSION.to_string(),
        })
    }

    /// Create config with explicit values (for testing)
    pub fn new(secret_key: impl Into<String>, webhook_secret: impl Into<String>) -> Self {
        Self {
            secret_key: Some(secret_key.into()),
            webhook_secret: Some(webhook_secret.into()),
            api_base_url: API_BASE_URL.to_string(),
            api_version: API_VERSION.to_string(),
        }
    }

    /// Check if using test keys
    pub fn is_test_mode(&self) -> bool {
        self.secret_key
            .as_deref()
            .is_some_and(|key| key.starts_with("sk_test_"))
    }

    /// Builder: set custom API base URL (for testing)
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_config() {
        let config = StripeConfig::new("sk_test_abc123", "whsec_secret");
        assert!(config.is_test_mode());
        assert_eq!(config.api_base_url, "https://api.stripe.com");
    }

    #[test]
    fn test_live_mode() {
        let config = StripeConfig::new("sk_live_abc123", "whsec_secret");
        assert!(!config.is_test_mode());
    }

    #[test]
    fn test_api_base_url_override() {
        let config =
            StripeConfig::new("sk_test_abc", "whsec_x").with_api_base_url("http://localhost:9999");
        assert_eq!(config.api_base_url, "http://localhost:9999");
    }
}
