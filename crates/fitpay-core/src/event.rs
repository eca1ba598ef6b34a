//! # Webhook Event Types
//!
//! Typed view of a provider webhook event. Events are constructed only
//! after signature verification succeeds and live for a single request.

use chrono::{DateTime, Utc};

/// Event kinds the dispatcher routes to handlers.
///
/// Unrecognized dot-namespaced types map to `Unknown` and are acknowledged
/// without side effects, so new provider event kinds never break ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEventKind {
    CheckoutCompleted,
    PaymentSucceeded,
    PaymentFailed,
    SubscriptionCreated,
    SubscriptionUpdated,
    SubscriptionDeleted,
    InvoicePaymentSucceeded,
    InvoicePaymentFailed,
    CustomerCreated,
    CustomerUpdated,
    Unknown(String),
}

impl WebhookEventKind {
    pub fn from_type(event_type: &str) -> Self {
        match event_type {
            "checkout.session.completed" => WebhookEventKind::CheckoutCompleted,
            "payment_intent.succeeded" => WebhookEventKind::PaymentSucceeded,
            "payment_intent.payment_failed" => WebhookEventKind::PaymentFailed,
            "customer.subscription.created" => WebhookEventKind::SubscriptionCreated,
            "customer.subscription.updated" => WebhookEventKind::SubscriptionUpdated,
            "customer.subscription.deleted" => WebhookEventKind::SubscriptionDeleted,
            "invoice.payment_succeeded" => WebhookEventKind::InvoicePaymentSucceeded,
            "invoice.payment_failed" => WebhookEventKind::InvoicePaymentFailed,
            "customer.created" => WebhookEventKind::CustomerCreated,
            "customer.updated" => WebhookEventKind::CustomerUpdated,
            other => WebhookEventKind::Unknown(other.to_string()),
        }
    }

    /// The provider's dot-namespaced type string
    pub fn as_type(&self) -> &str {
        match self {
            WebhookEventKind::CheckoutCompleted => "checkout.session.completed",
            WebhookEventKind::PaymentSucceeded => "payment_intent.succeeded",
            WebhookEventKind::PaymentFailed => "payment_intent.payment_failed",
            WebhookEventKind::SubscriptionCreated => "customer.subscription.created",
            WebhookEventKind::SubscriptionUpdated => "customer.subscription.updated",
            WebhookEventKind::SubscriptionDeleted => "customer.subscription.deleted",
            WebhookEventKind::InvoicePaymentSucceeded => "invoice.payment_succeeded",
            WebhookEventKind::InvoicePaymentFailed => "invoice.payment_failed",
            WebhookEventKind::CustomerCreated => "customer.created",
            WebhookEventKind::CustomerUpdated => "customer.updated",
            WebhookEventKind::Unknown(other) => other,
        }
    }
}

/// A verified, parsed webhook event
#[derive(Debug, Clone)]
pub struct WebhookEvent {
    /// Event ID from the provider
    pub event_id: String,

    pub kind: WebhookEventKind,

    pub created: DateTime<Utc>,

    /// The event's `data.object` payload; shape is keyed by event kind
    pub object: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_types_round_trip() {
        for event_type in [
            "checkout.session.completed",
            "payment_intent.succeeded",
            "payment_intent.payment_failed",
            "customer.subscription.created",
            "customer.subscription.updated",
            "customer.subscription.deleted",
            "invoice.payment_succeeded",
            "invoice.payment_failed",
            "customer.created",
            "customer.updated",
        ] {
            let kind = WebhookEventKind::from_type(event_type);
            assert!(!matches!(kind, WebhookEventKind::Unknown(_)), "{event_type}");
            assert_eq!(kind.as_type(), event_type);
        }
    }

    #[test]
    fn test_unknown_type_passthrough() {
        let kind = WebhookEventKind::from_type("charge.refund.updated");
        assert_eq!(
            kind,
            WebhookEventKind::Unknown("charge.refund.updated".to_string())
        );
        assert_eq!(kind.as_type(), "charge.refund.updated");
    }
}
