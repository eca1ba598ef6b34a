//! # Stripe Checkout Sessions
//!
//! Implementation of the Stripe Checkout Sessions API. Exchanges a
//! validated checkout order for a hosted-checkout session.

use crate::config::StripeConfig;
use async_trait::async_trait;
use fitpay_core::{
    CheckoutOrder, CheckoutSession, CheckoutSessionCreator, PaymentError, PaymentResult, CURRENCY,
};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

/// Timeout on calls to the Stripe API. A timeout surfaces as a transport
/// failure and takes the same rejection path as any other provider error.
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Stripe Checkout Sessions client
///
/// Uses Stripe's hosted checkout page for secure payments; the caller is
/// redirected with the returned session ID.
pub struct StripeCheckoutClient {
    secret_key: String,
    api_base_url: String,
    api_version: String,
    client: Client,
}

impl StripeCheckoutClient {
    /// Create a client from configuration.
    ///
    /// Fails when the secret API key is not configured.
    pub fn new(config: &StripeConfig) -> PaymentResult<Self> {
        let secret_key = config.secret_key.clone().ok_or_else(|| {
            PaymentError::Configuration("STRIPE_SECRET_KEY not set".to_string())
        })?;

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| PaymentError::Internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            secret_key,
            api_base_url: config.api_base_url.clone(),
            api_version: config.api_version.clone(),
            client,
        })
    }

    /// Build the form-encoded session parameters for the Stripe API
    fn build_form_params(order: &CheckoutOrder) -> Vec<(String, String)> {
        let mut params: Vec<(String, String)> = vec![
            ("payment_method_types[]".to_string(), "card".to_string()),
            (
                "line_items[0][price_data][currency]".to_string(),
                CURRENCY.to_string(),
            ),
            (
                "line_items[0][price_data][product_data][name]".to_string(),
                order.product_name.clone(),
            ),
            (
                "line_items[0][price_data][product_data][description]".to_string(),
                order.description.clone(),
            ),
            (
                "line_items[0][price_data][unit_amount]".to_string(),
                order.amount_minor.to_string(),
            ),
        ];

        if order.payment_type.is_subscription() {
            params.push((
                "line_items[0][price_data][recurring][interval]".to_string(),
                "month".to_string(),
            ));
            params.push((
                "line_items[0][price_data][recurring][interval_count]".to_string(),
                order.interval_count.to_string(),
            ));
        }

        params.push(("line_items[0][quantity]".to_string(), "1".to_string()));
        params.push((
            "mode".to_string(),
            if order.payment_type.is_subscription() {
                "subscription".to_string()
            } else {
                "payment".to_string()
            },
        ));
        params.push(("success_url".to_string(), order.success_url.clone()));
        params.push(("cancel_url".to_string(), order.cancel_url.clone()));
        params.push(("metadata[planName]".to_string(), order.plan_name.clone()));

        params
    }
}

#[async_trait]
impl CheckoutSessionCreator for StripeCheckoutClient {
    #[instrument(skip(self, order), fields(plan = %order.plan_name))]
    async fn create_session(&self, order: &CheckoutOrder) -> PaymentResult<CheckoutSession> {
        let form_params = Self::build_form_params(order);

        debug!(
            "Creating Stripe checkout session: plan={}, amount={}, type={}",
            order.plan_name,
            order.amount_minor,
            order.payment_type.as_str()
        );

        let url = format!("{}/v1/checkout/sessions", self.api_base_url);
        let idempotency_key = Uuid::new_v4().to_string();

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.secret_key))
            .header("Stripe-Version", &self.api_version)
            .header("Idempotency-Key", &idempotency_key)
            .form(&form_params)
            .send()
            .await
            .map_err(|e| PaymentError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PaymentError::Network(e.to_string()))?;

        if !status.is_success() {
            // Raw provider errors stay in the logs; callers get a generic message
            error!("Stripe API error: status={}, body={}", status, body);

            let message = match serde_json::from_str::<StripeErrorResponse>(&body) {
                Ok(error_response) => error_response.error.message,
                Err(_) => format!("HTTP {status}: {body}"),
            };

            return Err(PaymentError::Provider {
                provider: "stripe".to_string(),
                message,
            });
        }

        let session: StripeCheckoutSessionResponse = serde_json::from_str(&body)
            .map_err(|e| PaymentError::Serialization(format!("Failed to parse Stripe response: {e}")))?;

        info!("Created Stripe checkout session: id={}", session.id);

        Ok(CheckoutSession {
            id: session.id,
            url: session.url,
        })
    }

    fn provider_name(&self) -> &'static str {
        "stripe"
    }
}

// =============================================================================
// Stripe API Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct StripeCheckoutSessionResponse {
    id: String,
    url: String,
}

#[derive(Debug, Deserialize)]
struct StripeErrorResponse {
    error: StripeError,
}

#[derive(Debug, Deserialize)]
struct StripeError {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use fitpay_core::{to_minor_units, PaymentType};
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn order(payment_type: PaymentType, interval_count: u32) -> CheckoutOrder {
        CheckoutOrder {
            plan_name: "Gold".to_string(),
            product_name: "MissFit - Gold Plan".to_string(),
            description: "Gold Package".to_string(),
            amount_minor: to_minor_units(19.99),
            payment_type,
            interval_count,
            success_url: "https://missfitcoaching.com/success.html?plan=Gold&type=onetime"
                .to_string(),
            cancel_url: "https://missfitcoaching.com".to_string(),
        }
    }

    fn param_value<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
        params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_onetime_params_have_no_recurring_fields() {
        let params = StripeCheckoutClient::build_form_params(&order(PaymentType::Onetime, 1));

        assert_eq!(param_value(&params, "mode"), Some("payment"));
        assert_eq!(
            param_value(&params, "line_items[0][price_data][unit_amount]"),
            Some("1999")
        );
        assert!(params.iter().all(|(k, _)| !k.contains("recurring")));
    }

    #[test]
    fn test_subscription_params_carry_interval_count() {
        let params = StripeCheckoutClient::build_form_params(&order(PaymentType::Subscription, 3));

        assert_eq!(param_value(&params, "mode"), Some("subscription"));
        assert_eq!(
            param_value(&params, "line_items[0][price_data][recurring][interval]"),
            Some("month")
        );
        assert_eq!(
            param_value(&params, "line_items[0][price_data][recurring][interval_count]"),
            Some("3")
        );
    }

    #[test]
    fn test_amount_conversion_is_exact() {
        let mut order = order(PaymentType::Onetime, 1);
        order.amount_minor = to_minor_units(10.0);
        let params = StripeCheckoutClient::build_form_params(&order);
        assert_eq!(
            param_value(&params, "line_items[0][price_data][unit_amount]"),
            Some("1000")
        );
    }

    #[tokio::test]
    async fn test_create_session_success() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/checkout/sessions"))
            .and(header("Stripe-Version", API_VERSION_FOR_TEST))
            .and(body_string_contains("mode=payment"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "cs_test_abc123",
                "url": "https://checkout.stripe.com/c/pay/cs_test_abc123"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let config = StripeConfig::new("sk_test_abc", "whsec_x").with_api_base_url(server.uri());
        let client = StripeCheckoutClient::new(&config).unwrap();

        let session = client
            .create_session(&order(PaymentType::Onetime, 1))
            .await
            .unwrap();

        assert_eq!(session.id, "cs_test_abc123");
    }

    const API_VERSION_FOR_TEST: &str = "2024-12-18.acacia";

    #[tokio::test]
    async fn test_provider_error_is_logged_not_leaked() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/checkout/sessions"))
            .respond_with(ResponseTemplate::new(402).set_body_json(serde_json::json!({
                "error": { "message": "Your card was declined (internal detail)." }
            })))
            .mount(&server)
            .await;

        let config = StripeConfig::new("sk_test_abc", "whsec_x").with_api_base_url(server.uri());
        let client = StripeCheckoutClient::new(&config).unwrap();

        let err = client
            .create_session(&order(PaymentType::Onetime, 1))
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), 500);
        assert_eq!(err.client_message(), "Payment processing error");
        // The raw detail is preserved internally for the server-side log
        assert!(err.to_string().contains("declined"));
    }

    #[test]
    fn test_client_requires_secret_key() {
        let config = StripeConfig {
            secret_key: None,
            webhook_secret: Some("whsec_x".to_string()),
            api_base_url: "https://api.stripe.com".to_string(),
            api_version: API_VERSION_FOR_TEST.to_string(),
        };

        assert!(StripeCheckoutClient::new(&config).is_err());
    }
}
