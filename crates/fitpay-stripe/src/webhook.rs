//! # Stripe Webhook Handling
//!
//! Signature verification, typed event parsing, and the dispatch table
//! that fans provider events out to handlers. Verification runs against
//! the exact raw request bytes; the body is only parsed as trusted data
//! after the signature checks out.

use crate::config::StripeConfig;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fitpay_core::{
    Notifier, PaymentError, PaymentResult, PaymentType, SignatureVerifier, WebhookEvent,
    WebhookEventKind,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Maximum age of a webhook timestamp before it's rejected (replay guard)
const TIMESTAMP_TOLERANCE_SECS: i64 = 300;

// =============================================================================
// Signature Verification
// =============================================================================

/// HMAC-SHA256 verifier for the `stripe-signature` header
pub struct StripeSignatureVerifier {
    webhook_secret: String,
}

impl StripeSignatureVerifier {
    pub fn new(webhook_secret: impl Into<String>) -> Self {
        Self {
            webhook_secret: webhook_secret.into(),
        }
    }
}

impl SignatureVerifier for StripeSignatureVerifier {
    fn verify(&self, payload: &[u8], signature: &str) -> PaymentResult<()> {
        let sig_parts = parse_signature_header(signature)?;

        let now = Utc::now().timestamp();
        if (now - sig_parts.timestamp).abs() > TIMESTAMP_TOLERANCE_SECS {
            return Err(PaymentError::SignatureInvalid(
                "Timestamp outside tolerance".to_string(),
            ));
        }

        let signed_payload = format!(
            "{}.{}",
            sig_parts.timestamp,
            String::from_utf8_lossy(payload)
        );
        let expected = compute_hmac_sha256(&self.webhook_secret, &signed_payload);

        let valid = sig_parts
            .signatures
            .iter()
            .any(|sig| constant_time_compare(sig, &expected));

        if !valid {
            return Err(PaymentError::SignatureInvalid(
                "Signature mismatch".to_string(),
            ));
        }

        Ok(())
    }
}

struct SignatureHeader {
    timestamp: i64,
    signatures: Vec<String>,
}

fn parse_signature_header(header: &str) -> PaymentResult<SignatureHeader> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        let kv: Vec<&str> = part.split('=').collect();
        if kv.len() != 2 {
            continue;
        }
        match kv[0] {
            "t" => {
                timestamp = kv[1].parse().ok();
            }
            "v1" => {
                signatures.push(kv[1].to_string());
            }
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or_else(|| {
        PaymentError::SignatureInvalid("Missing timestamp in signature".to_string())
    })?;

    if signatures.is_empty() {
        return Err(PaymentError::SignatureInvalid(
            "No v1 signature found".to_string(),
        ));
    }

    Ok(SignatureHeader {
        timestamp,
        signatures,
    })
}

fn compute_hmac_sha256(secret: &str, message: &str) -> String {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    type HmacSha256 = Hmac<Sha256>;

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(message.as_bytes());
    let result = mac.finalize();
    hex::encode(result.into_bytes())
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0, |acc, (x, y)| acc | (x ^ y))
        == 0
}

// =============================================================================
// Event Parsing
// =============================================================================

#[derive(Debug, Deserialize)]
struct StripeEventEnvelope {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    created: i64,
    data: StripeEventData,
}

#[derive(Debug, Deserialize)]
struct StripeEventData {
    object: serde_json::Map<String, serde_json::Value>,
}

/// Parse verified raw bytes into a typed event.
///
/// Only call this after [`SignatureVerifier::verify`] succeeded.
pub fn parse_event(payload: &[u8]) -> PaymentResult<WebhookEvent> {
    let envelope: StripeEventEnvelope = serde_json::from_slice(payload)
        .map_err(|e| PaymentError::WebhookParse(format!("Failed to parse webhook: {e}")))?;

    Ok(WebhookEvent {
        event_id: envelope.id,
        kind: WebhookEventKind::from_type(&envelope.event_type),
        created: DateTime::from_timestamp(envelope.created, 0).unwrap_or_else(Utc::now),
        object: serde_json::Value::Object(envelope.data.object),
    })
}

// =============================================================================
// Dispatch
// =============================================================================

/// Webhook event handler.
///
/// One method per event kind; defaults just log, so implementors override
/// only the events they act on.
#[allow(unused_variables)]
#[async_trait]
pub trait WebhookHandler: Send + Sync {
    async fn on_checkout_completed(&self, event: &WebhookEvent) -> PaymentResult<()> {
        info!("Checkout completed: {}", event.event_id);
        Ok(())
    }

    async fn on_payment_succeeded(&self, event: &WebhookEvent) -> PaymentResult<()> {
        info!("Payment intent succeeded: {}", event.event_id);
        Ok(())
    }

    async fn on_payment_failed(&self, event: &WebhookEvent) -> PaymentResult<()> {
        warn!("Payment intent failed: {}", event.event_id);
        Ok(())
    }

    async fn on_subscription_created(&self, event: &WebhookEvent) -> PaymentResult<()> {
        info!("Subscription created: {}", event.event_id);
        Ok(())
    }

    async fn on_subscription_updated(&self, event: &WebhookEvent) -> PaymentResult<()> {
        info!("Subscription updated: {}", event.event_id);
        Ok(())
    }

    async fn on_subscription_deleted(&self, event: &WebhookEvent) -> PaymentResult<()> {
        info!("Subscription cancelled: {}", event.event_id);
        Ok(())
    }

    async fn on_invoice_payment_succeeded(&self, event: &WebhookEvent) -> PaymentResult<()> {
        info!("Invoice payment succeeded: {}", event.event_id);
        Ok(())
    }

    async fn on_invoice_payment_failed(&self, event: &WebhookEvent) -> PaymentResult<()> {
        warn!("Invoice payment failed: {}", event.event_id);
        Ok(())
    }

    /// Consolidated handler for customer.created / customer.updated
    async fn on_customer_event(&self, event: &WebhookEvent) -> PaymentResult<()> {
        debug!("Customer event: {} ({})", event.event_id, event.kind.as_type());
        Ok(())
    }

    async fn on_unknown_event(&self, event: &WebhookEvent) -> PaymentResult<()> {
        debug!("Unhandled webhook event type: {}", event.kind.as_type());
        Ok(())
    }
}

/// Route a verified event to its handler method.
///
/// Handler failures are logged and swallowed: once an event is verified
/// and parsed, the provider gets its acknowledgment. The provider retries
/// on any non-2xx, so handlers must tolerate redelivery anyway.
pub async fn dispatch_event(handler: &dyn WebhookHandler, event: &WebhookEvent) {
    let result = match &event.kind {
        WebhookEventKind::CheckoutCompleted => handler.on_checkout_completed(event).await,
        WebhookEventKind::PaymentSucceeded => handler.on_payment_succeeded(event).await,
        WebhookEventKind::PaymentFailed => handler.on_payment_failed(event).await,
        WebhookEventKind::SubscriptionCreated => handler.on_subscription_created(event).await,
        WebhookEventKind::SubscriptionUpdated => handler.on_subscription_updated(event).await,
        WebhookEventKind::SubscriptionDeleted => handler.on_subscription_deleted(event).await,
        WebhookEventKind::InvoicePaymentSucceeded => {
            handler.on_invoice_payment_succeeded(event).await
        }
        WebhookEventKind::InvoicePaymentFailed => handler.on_invoice_payment_failed(event).await,
        WebhookEventKind::CustomerCreated | WebhookEventKind::CustomerUpdated => {
            handler.on_customer_event(event).await
        }
        WebhookEventKind::Unknown(_) => handler.on_unknown_event(event).await,
    };

    if let Err(e) = result {
        error!(
            "Webhook handler error for {} ({}): {e}",
            event.event_id,
            event.kind.as_type()
        );
    }
}

// =============================================================================
// Notification Handler
// =============================================================================

/// Production handler: derives customer-facing notifications from events.
pub struct NotifyingWebhookHandler {
    brand: String,
    notifier: Arc<dyn Notifier>,
}

impl NotifyingWebhookHandler {
    pub fn new(brand: impl Into<String>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            brand: brand.into(),
            notifier,
        }
    }
}

#[async_trait]
impl WebhookHandler for NotifyingWebhookHandler {
    async fn on_checkout_completed(&self, event: &WebhookEvent) -> PaymentResult<()> {
        let session = &event.object;
        let plan_name = plan_name_from_session(&self.brand, session);

        let purchase = match session.get("mode").and_then(|v| v.as_str()) {
            Some("subscription") => PaymentType::Subscription,
            _ => PaymentType::Onetime,
        };

        let email = session
            .get("customer_details")
            .and_then(|cd| cd.get("email"))
            .and_then(|v| v.as_str());

        match email {
            Some(email) => {
                info!(
                    "Checkout completed for plan {plan_name} ({}), notifying {email}",
                    purchase.as_str()
                );
                self.notifier.send_welcome(email, &plan_name, purchase).await
            }
            None => {
                warn!(
                    "Checkout completed without customer email: {}",
                    event.event_id
                );
                Ok(())
            }
        }
    }

    async fn on_payment_failed(&self, event: &WebhookEvent) -> PaymentResult<()> {
        let email = event
            .object
            .get("receipt_email")
            .and_then(|v| v.as_str());

        match email {
            Some(email) => self.notifier.send_payment_failure(email).await,
            None => {
                warn!("Payment failed without receipt email: {}", event.event_id);
                Ok(())
            }
        }
    }

    async fn on_subscription_updated(&self, event: &WebhookEvent) -> PaymentResult<()> {
        let status = event.object.get("status").and_then(|v| v.as_str());
        let cancel_at_period_end = event
            .object
            .get("cancel_at_period_end")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

        match (status, cancel_at_period_end) {
            (Some("active"), true) => info!(
                "Subscription set to cancel at period end: {}",
                event.event_id
            ),
            (Some("past_due"), _) => warn!("Subscription payment past due: {}", event.event_id),
            _ => debug!("Subscription updated: {}", event.event_id),
        }
        Ok(())
    }
}

/// Derive the plan name from a checkout session object.
///
/// Prefers the `planName` session metadata; falls back to parsing the first
/// line item's description against the `"{brand} - {plan} Plan"` product
/// naming convention.
pub fn plan_name_from_session(brand: &str, session: &serde_json::Value) -> String {
    if let Some(name) = session
        .get("metadata")
        .and_then(|m| m.get("planName"))
        .and_then(|v| v.as_str())
    {
        return name.to_string();
    }

    session
        .get("line_items")
        .and_then(|li| li.get("data"))
        .and_then(|d| d.get(0))
        .and_then(|item| item.get("description"))
        .and_then(|v| v.as_str())
        .and_then(|description| plan_from_product_name(brand, description))
        .unwrap_or_else(|| "Unknown Plan".to_string())
}

fn plan_from_product_name(brand: &str, name: &str) -> Option<String> {
    let rest = name.strip_prefix(&format!("{brand} - "))?;
    let plan = rest.strip_suffix(" Plan")?;
    if plan.is_empty() {
        None
    } else {
        Some(plan.to_string())
    }
}

// =============================================================================
// Processor
// =============================================================================

/// The webhook ingestion pipeline: verify, parse, dispatch.
pub struct StripeWebhookProcessor {
    verifier: Arc<dyn SignatureVerifier>,
    handler: Arc<dyn WebhookHandler>,
}

impl StripeWebhookProcessor {
    pub fn new(verifier: Arc<dyn SignatureVerifier>, handler: Arc<dyn WebhookHandler>) -> Self {
        Self { verifier, handler }
    }

    /// Build from configuration.
    ///
    /// Both the webhook signing secret and the API credential must be
    /// configured; missing either is a configuration error so the endpoint
    /// fails closed instead of skipping verification.
    pub fn from_config(
        config: &StripeConfig,
        handler: Arc<dyn WebhookHandler>,
    ) -> PaymentResult<Self> {
        let webhook_secret = config.webhook_secret.clone().ok_or_else(|| {
            PaymentError::Configuration("STRIPE_WEBHOOK_SECRET not set".to_string())
        })?;

        if config.secret_key.is_none() {
            return Err(PaymentError::Configuration(
                "STRIPE_SECRET_KEY not set".to_string(),
            ));
        }

        Ok(Self::new(
            Arc::new(StripeSignatureVerifier::new(webhook_secret)),
            handler,
        ))
    }

    /// Verify the payload against the raw bytes, parse it, and dispatch.
    ///
    /// Verification and parse failures propagate (the caller's 4xx);
    /// dispatched-handler failures never do.
    pub async fn process(&self, payload: &[u8], signature: &str) -> PaymentResult<WebhookEvent> {
        self.verifier.verify(payload, signature)?;

        let event = parse_event(payload)?;

        info!(
            "Received webhook: type={}, id={}",
            event.kind.as_type(),
            event.event_id
        );

        dispatch_event(self.handler.as_ref(), &event).await;

        Ok(event)
    }
}
