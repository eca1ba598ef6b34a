//! # Checkout Request Types
//!
//! Wire-level request model for the checkout endpoint, plus shape
//! validation and money conversion. All prices are USD.

use crate::error::{PaymentError, PaymentResult};
use serde::{Deserialize, Serialize};

/// The only currency the checkout pipeline charges in (ISO 4217, lowercase)
pub const CURRENCY: &str = "usd";

/// Convert a decimal USD amount to integer minor units (cents).
///
/// Exact for two-decimal inputs: 19.99 becomes 1999, 10 becomes 1000.
pub fn to_minor_units(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

/// How the caller wants to pay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentType {
    /// Single charge
    Onetime,
    /// Monthly recurring charge
    Subscription,
}

impl Default for PaymentType {
    fn default() -> Self {
        PaymentType::Onetime
    }
}

impl PaymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentType::Onetime => "onetime",
            PaymentType::Subscription => "subscription",
        }
    }

    pub fn is_subscription(&self) -> bool {
        matches!(self, PaymentType::Subscription)
    }
}

/// Checkout request body as received on `POST /payment`.
///
/// Every field is optional at the wire level so that a missing field is a
/// shape rejection with a useful message rather than a bare parse error.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    #[serde(default)]
    pub plan_name: Option<String>,

    #[serde(default)]
    pub amount: Option<f64>,

    #[serde(default)]
    pub payment_type: Option<PaymentType>,

    /// Number of months per billing period (subscription only)
    #[serde(default)]
    pub interval_count: Option<u32>,

    /// Where to send the customer if they abandon checkout
    #[serde(default)]
    pub return_url: Option<String>,

    /// Client-supplied bot-challenge token
    #[serde(default)]
    pub turnstile_token: Option<String>,
}

/// A checkout request that passed the shape gate
#[derive(Debug, Clone)]
pub struct ValidatedCheckout {
    pub plan_name: String,
    pub amount: f64,
    pub payment_type: PaymentType,
    pub interval_count: u32,
    pub return_url: Option<String>,
    pub captcha_token: Option<String>,
}

impl CheckoutRequest {
    /// Shape gate: required fields present and well-formed.
    ///
    /// `captcha_required` adds the challenge token to the required set.
    /// `intervalCount` is validated only for subscriptions and defaults to 1;
    /// one-time payments ignore it entirely.
    pub fn validate(self, captcha_required: bool) -> PaymentResult<ValidatedCheckout> {
        let plan_name = match self.plan_name {
            Some(name) if !name.trim().is_empty() => name,
            _ => {
                return Err(PaymentError::InvalidRequest(
                    "Missing planName or amount".to_string(),
                ))
            }
        };

        let amount = self.amount.ok_or_else(|| {
            PaymentError::InvalidRequest("Missing planName or amount".to_string())
        })?;

        if !amount.is_finite() || amount <= 0.0 {
            return Err(PaymentError::InvalidRequest(
                "amount must be a positive number".to_string(),
            ));
        }

        let payment_type = self.payment_type.unwrap_or_default();

        let interval_count = if payment_type.is_subscription() {
            let count = self.interval_count.unwrap_or(1);
            if count < 1 {
                return Err(PaymentError::InvalidRequest(
                    "intervalCount must be at least 1".to_string(),
                ));
            }
            count
        } else {
            1
        };

        let captcha_token = self.turnstile_token.filter(|t| !t.trim().is_empty());
        if captcha_required && captcha_token.is_none() {
            return Err(PaymentError::InvalidRequest(
                "Missing bot verification token".to_string(),
            ));
        }

        Ok(ValidatedCheckout {
            plan_name,
            amount,
            payment_type,
            interval_count,
            return_url: self.return_url,
            captcha_token,
        })
    }
}
