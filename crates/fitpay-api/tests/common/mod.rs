//! Shared test infrastructure: capability fakes and request plumbing.
#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::{to_bytes, Body, Bytes};
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use fitpay_api::state::{AppConfig, AppState, AppStateBuilder};
use fitpay_core::{
    CaptchaVerifier, CheckoutOrder, CheckoutSession, CheckoutSessionCreator, GateChainConfig,
    PaymentError, PaymentResult,
};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

/// Checkout creator fake that records calls instead of talking to Stripe
#[derive(Default)]
pub struct FakeCheckout {
    pub calls: AtomicU32,
    pub last_order: Mutex<Option<CheckoutOrder>>,
    pub fail: bool,
}

impl FakeCheckout {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            ..Self::default()
        })
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CheckoutSessionCreator for FakeCheckout {
    async fn create_session(&self, order: &CheckoutOrder) -> PaymentResult<CheckoutSession> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_order.lock().unwrap() = Some(order.clone());

        if self.fail {
            return Err(PaymentError::Provider {
                provider: "stripe".to_string(),
                message: "Your card was declined (internal detail)".to_string(),
            });
        }

        Ok(CheckoutSession {
            id: "cs_test_fake123".to_string(),
            url: "https://checkout.stripe.com/c/pay/cs_test_fake123".to_string(),
        })
    }

    fn provider_name(&self) -> &'static str {
        "stripe"
    }
}

/// CAPTCHA verifier fake with a fixed verdict
pub struct FakeCaptcha {
    pub calls: AtomicU32,
    pub accept: bool,
}

impl FakeCaptcha {
    pub fn accepting() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicU32::new(0),
            accept: true,
        })
    }

    pub fn rejecting() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicU32::new(0),
            accept: false,
        })
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CaptchaVerifier for FakeCaptcha {
    async fn verify(&self, _token: &str, _client_ip: &str) -> PaymentResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.accept {
            Ok(())
        } else {
            Err(PaymentError::CaptchaRejected(
                "invalid-input-response".to_string(),
            ))
        }
    }
}

/// Gate config with CAPTCHA and rate limiting toggled per test
pub fn gate_config(captcha: bool, rate_limit: bool) -> GateChainConfig {
    let mut config = GateChainConfig::default();
    config.captcha.enabled = captcha;
    config.rate_limit.enabled = rate_limit;
    config
}

pub fn state_builder(config: GateChainConfig) -> AppStateBuilder {
    AppState::builder(AppConfig::default(), config)
}

pub fn router(state: AppState) -> Router {
    fitpay_api::create_router(state)
}

/// Drive one request through the router and collect the response
pub async fn call(app: &Router, request: Request<Body>) -> (StatusCode, HeaderMap, Bytes) {
    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("router call failed");

    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read body");

    (status, headers, body)
}

pub fn json_body(bytes: &Bytes) -> serde_json::Value {
    serde_json::from_slice(bytes).expect("response body is not JSON")
}

/// A browser-shaped POST /payment request
pub fn payment_request(origin: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/payment")
        .header("content-type", "application/json")
        .header("user-agent", "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7)")
        .header("cf-connecting-ip", "203.0.113.7");

    if let Some(origin) = origin {
        builder = builder.header("origin", origin);
    }

    builder.body(Body::from(body.to_string())).unwrap()
}
