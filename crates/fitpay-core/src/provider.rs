//! # Provider Capability Traits
//!
//! Narrow interfaces over the external services the pipeline calls:
//! checkout-session creation, CAPTCHA verification, webhook signature
//! verification, and customer notification. Each is a single concern so
//! tests can substitute deterministic fakes for the network clients.

use crate::error::PaymentResult;
use crate::request::PaymentType;
use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, warn};

/// A checkout order ready to exchange for a provider session.
///
/// URLs are already resolved: the success URL embeds plan name and payment
/// type, the cancel URL is the caller's return URL or its origin.
#[derive(Debug, Clone)]
pub struct CheckoutOrder {
    pub plan_name: String,
    /// Display name on the provider's checkout page
    pub product_name: String,
    pub description: String,
    /// Amount in minor units (cents)
    pub amount_minor: i64,
    pub payment_type: PaymentType,
    /// Months per billing period (subscriptions only)
    pub interval_count: u32,
    pub success_url: String,
    pub cancel_url: String,
}

/// A checkout session created by the payment provider
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutSession {
    /// Provider's session ID, returned to the caller for redirect
    pub id: String,
    /// Hosted checkout URL
    pub url: String,
}

/// Creates checkout sessions with the payment provider
#[async_trait]
pub trait CheckoutSessionCreator: Send + Sync {
    async fn create_session(&self, order: &CheckoutOrder) -> PaymentResult<CheckoutSession>;

    /// Provider name (for logging)
    fn provider_name(&self) -> &'static str;
}

/// Verifies a client-supplied bot-challenge token
#[async_trait]
pub trait CaptchaVerifier: Send + Sync {
    /// `client_ip` is forwarded to the verification service.
    /// Any failure, including transport errors, rejects the request.
    async fn verify(&self, token: &str, client_ip: &str) -> PaymentResult<()>;
}

/// Verifies a webhook payload's signature against the raw request bytes
pub trait SignatureVerifier: Send + Sync {
    fn verify(&self, payload: &[u8], signature: &str) -> PaymentResult<()>;
}

/// Sends customer-facing notifications from webhook handlers.
///
/// Deliveries are best-effort and must tolerate duplicates: the provider
/// redelivers events on any non-2xx acknowledgment.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_welcome(
        &self,
        email: &str,
        plan_name: &str,
        purchase: PaymentType,
    ) -> PaymentResult<()>;

    async fn send_payment_failure(&self, email: &str) -> PaymentResult<()>;
}

/// Default notifier: logs instead of sending
pub struct LoggingNotifier;

#[async_trait]
impl Notifier for LoggingNotifier {
    async fn send_welcome(
        &self,
        email: &str,
        plan_name: &str,
        purchase: PaymentType,
    ) -> PaymentResult<()> {
        info!(
            "Welcome email to {email} for {plan_name} ({})",
            purchase.as_str()
        );
        Ok(())
    }

    async fn send_payment_failure(&self, email: &str) -> PaymentResult<()> {
        warn!("Payment failure email to {email}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_logging_notifier_never_fails() {
        let notifier = LoggingNotifier;
        assert!(notifier
            .send_welcome("client@example.com", "Gold", PaymentType::Subscription)
            .await
            .is_ok());
        assert!(notifier
            .send_payment_failure("client@example.com")
            .await
            .is_ok());
    }
}
