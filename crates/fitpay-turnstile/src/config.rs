//! # Turnstile Configuration

use fitpay_core::{PaymentError, PaymentResult};
use std::env;

const SITEVERIFY_BASE_URL: &str = "https://challenges.cloudflare.com";

/// Cloudflare Turnstile configuration
#[derive(Debug, Clone)]
pub struct TurnstileConfig {
    /// Server-side secret key for the siteverify API
    pub secret_key: Option<String>,

    /// API base URL (for testing/mocking)
    pub api_base_url: String,
}

impl TurnstileConfig {
    /// Load configuration from the `TURNSTILE_SECRET_KEY` environment
    /// variable. Absence is not an error here; it disables verification
    /// and the checkout endpoint fails closed when CAPTCHA is required.
    pub fn from_env() -> PaymentResult<Self> {
        dotenvy::dotenv().ok();

        let secret_key = match env::var("TURNSTILE_SECRET_KEY") {
            Ok(key) if key.trim().is_empty() => {
                return Err(PaymentError::Configuration(
                    "TURNSTILE_SECRET_KEY is set but empty".to_string(),
                ))
            }
            Ok(key) => Some(key),
            Err(_) => None,
        };

        Ok(Self {
            secret_key,
            api_base_url: SITEVERIFY_BASE_URL.to_string(),
        })
    }

    /// Create config with an explicit secret (for testing)
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            secret_key: Some(secret_key.into()),
            api_base_url: SITEVERIFY_BASE_URL.to_string(),
        }
    }

    /// Builder: set custom API base URL (for testing)
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }
}
