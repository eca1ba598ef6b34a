//! # Payment Error Types
//!
//! Typed error handling for the payment pipeline.
//! All fallible operations return `Result<T, PaymentError>`.

use thiserror::Error;

/// Core error type for checkout and webhook operations
#[derive(Debug, Error)]
pub enum PaymentError {
    /// Configuration errors (missing secrets, invalid config)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// CAPTCHA challenge verification failed (or could not be performed)
    #[error("Bot verification failed: {0}")]
    CaptchaRejected(String),

    /// Webhook signature verification failed
    #[error("Webhook signature verification failed: {0}")]
    SignatureInvalid(String),

    /// Webhook payload parsing error
    #[error("Webhook parse error: {0}")]
    WebhookParse(String),

    /// Payment provider API error
    #[error("Provider error [{provider}]: {message}")]
    Provider { provider: String, message: String },

    /// Network/HTTP error communicating with an external service
    #[error("Network error: {0}")]
    Network(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error (should not happen)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PaymentError {
    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            PaymentError::Configuration(_) => 500,
            PaymentError::InvalidRequest(_) => 400,
            PaymentError::CaptchaRejected(_) => 403,
            PaymentError::SignatureInvalid(_) => 400,
            PaymentError::WebhookParse(_) => 400,
            PaymentError::Provider { .. } => 500,
            PaymentError::Network(_) => 500,
            PaymentError::Serialization(_) => 500,
            PaymentError::Internal(_) => 500,
        }
    }

    /// The message safe to return to the caller.
    ///
    /// Client errors describe the caller's own input; everything upstream
    /// collapses to a generic message, with the detail logged server-side.
    pub fn client_message(&self) -> String {
        match self {
            PaymentError::InvalidRequest(message) => message.clone(),
            PaymentError::CaptchaRejected(_) => "Bot verification failed".to_string(),
            PaymentError::SignatureInvalid(_) => "Invalid webhook signature".to_string(),
            PaymentError::WebhookParse(_) => "Webhook processing error".to_string(),
            PaymentError::Configuration(_) => "Server configuration error".to_string(),
            PaymentError::Provider { .. }
            | PaymentError::Network(_)
            | PaymentError::Serialization(_)
            | PaymentError::Internal(_) => "Payment processing error".to_string(),
        }
    }
}

/// Result type alias for payment operations
pub type PaymentResult<T> = Result<T, PaymentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            PaymentError::InvalidRequest("test".into()).status_code(),
            400
        );
        assert_eq!(
            PaymentError::CaptchaRejected("token expired".into()).status_code(),
            403
        );
        assert_eq!(
            PaymentError::Configuration("STRIPE_SECRET_KEY not set".into()).status_code(),
            500
        );
        assert_eq!(
            PaymentError::SignatureInvalid("mismatch".into()).status_code(),
            400
        );
    }

    #[test]
    fn test_upstream_detail_never_reaches_client() {
        let err = PaymentError::Provider {
            provider: "stripe".into(),
            message: "No such price: price_123; request id req_abc".into(),
        };
        assert_eq!(err.client_message(), "Payment processing error");

        let err = PaymentError::Network("connection reset by api.stripe.com".into());
        assert_eq!(err.client_message(), "Payment processing error");
    }

    #[test]
    fn test_client_errors_keep_their_message() {
        let err = PaymentError::InvalidRequest("Missing planName or amount".into());
        assert_eq!(err.client_message(), "Missing planName or amount");
    }
}
