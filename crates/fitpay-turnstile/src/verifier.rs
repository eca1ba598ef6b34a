//! # Turnstile Token Verification
//!
//! Server-side verification of client-supplied challenge tokens against
//! Cloudflare's siteverify API. Every failure path, including transport
//! errors, rejects the request: an unverifiable token is treated the same
//! as an invalid one.

use crate::config::TurnstileConfig;
use async_trait::async_trait;
use fitpay_core::{CaptchaVerifier, PaymentError, PaymentResult};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Cloudflare Turnstile verifier
pub struct TurnstileVerifier {
    secret_key: String,
    api_base_url: String,
    client: Client,
}

impl TurnstileVerifier {
    /// Create a verifier from configuration.
    ///
    /// Fails when the secret key is not configured.
    pub fn new(config: &TurnstileConfig) -> PaymentResult<Self> {
        let secret_key = config.secret_key.clone().ok_or_else(|| {
            PaymentError::Configuration("TURNSTILE_SECRET_KEY not set".to_string())
        })?;

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| PaymentError::Internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            secret_key,
            api_base_url: config.api_base_url.clone(),
            client,
        })
    }
}

#[derive(Debug, Deserialize)]
struct SiteverifyResponse {
    success: bool,

    #[serde(rename = "error-codes", default)]
    error_codes: Vec<String>,
}

#[async_trait]
impl CaptchaVerifier for TurnstileVerifier {
    #[instrument(skip(self, token))]
    async fn verify(&self, token: &str, client_ip: &str) -> PaymentResult<()> {
        let url = format!("{}/turnstile/v0/siteverify", self.api_base_url);

        let form = [
            ("secret", self.secret_key.as_str()),
            ("response", token),
            ("remoteip", client_ip),
        ];

        let response = self
            .client
            .post(&url)
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                warn!("Turnstile siteverify transport error: {e}");
                PaymentError::CaptchaRejected(format!("siteverify unreachable: {e}"))
            })?;

        let status = response.status();
        let outcome: SiteverifyResponse = response.json().await.map_err(|e| {
            warn!("Turnstile siteverify returned unparseable body (status {status}): {e}");
            PaymentError::CaptchaRejected(format!("siteverify response invalid: {e}"))
        })?;

        if !outcome.success {
            debug!(
                "Turnstile rejected token for {client_ip}: {:?}",
                outcome.error_codes
            );
            return Err(PaymentError::CaptchaRejected(
                outcome.error_codes.join(", "),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn verifier_against(server: &MockServer) -> TurnstileVerifier {
        let config = TurnstileConfig::new("0x_secret").with_api_base_url(server.uri());
        TurnstileVerifier::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_valid_token_passes() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/turnstile/v0/siteverify"))
            .and(body_string_contains("response=tok_valid"))
            .and(body_string_contains("remoteip=203.0.113.7"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "success": true })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let verifier = verifier_against(&server).await;
        assert!(verifier.verify("tok_valid", "203.0.113.7").await.is_ok());
    }

    #[tokio::test]
    async fn test_rejected_token_maps_to_403() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/turnstile/v0/siteverify"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": false,
                "error-codes": ["invalid-input-response"]
            })))
            .mount(&server)
            .await;

        let verifier = verifier_against(&server).await;
        let err = verifier.verify("tok_bad", "203.0.113.7").await.unwrap_err();

        assert_eq!(err.status_code(), 403);
        assert_eq!(err.client_message(), "Bot verification failed");
    }

    #[tokio::test]
    async fn test_transport_error_also_rejects() {
        // Point at a server that is no longer listening
        let server = MockServer::start().await;
        let uri = server.uri();
        drop(server);

        let config = TurnstileConfig::new("0x_secret").with_api_base_url(uri);
        let verifier = TurnstileVerifier::new(&config).unwrap();

        let err = verifier.verify("tok_any", "203.0.113.7").await.unwrap_err();
        assert_eq!(err.status_code(), 403);
    }

    #[test]
    fn test_verifier_requires_secret() {
        let config = TurnstileConfig {
            secret_key: None,
            api_base_url: "https://challenges.cloudflare.com".to_string(),
        };
        assert!(TurnstileVerifier::new(&config).is_err());
    }
}
