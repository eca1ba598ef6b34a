//! # Request Handlers
//!
//! Axum request handlers for the payment API. Both endpoints take the raw
//! method/headers/body so the gate chain sees exactly what arrived: the
//! webhook signature must be computed over the unmodified bytes, and the
//! checkout pipeline's parse and shape gates produce their own rejections
//! rather than the framework's.

use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use fitpay_core::{
    to_minor_units, CheckoutOrder, GateDecision, PaymentType, Rejection, RequestContext,
    ValidatedCheckout,
};
use serde_json::json;
use tracing::{error, info, instrument, warn};

// =============================================================================
// Request context extraction
// =============================================================================

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Client IP as reported by the edge: `CF-Connecting-IP`, then the first
/// hop of `X-Forwarded-For`.
fn client_ip(headers: &HeaderMap) -> String {
    if let Some(ip) = header_value(headers, "cf-connecting-ip") {
        return ip;
    }

    if let Some(forwarded) = header_value(headers, "x-forwarded-for") {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }

    "0.0.0.0".to_string()
}

fn request_context(method: &Method, headers: &HeaderMap) -> RequestContext {
    RequestContext {
        method: method.as_str().to_string(),
        origin: header_value(headers, "origin"),
        referer: header_value(headers, "referer"),
        user_agent: header_value(headers, "user-agent"),
        content_type: header_value(headers, "content-type"),
        client_ip: client_ip(headers),
    }
}

// =============================================================================
// Response helpers
// =============================================================================

fn rejection_response(rejection: Rejection) -> Response {
    let status =
        StatusCode::from_u16(rejection.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    match rejection.message {
        Some(message) => (status, Json(json!({ "error": message }))).into_response(),
        None => status.into_response(),
    }
}

/// CORS preflight response for a validated origin
fn preflight_response(origin: &str) -> Response {
    (
        StatusCode::NO_CONTENT,
        [
            ("access-control-allow-origin", origin),
            ("access-control-allow-methods", "POST, OPTIONS"),
            ("access-control-allow-headers", "Content-Type"),
            ("access-control-max-age", "86400"),
            ("vary", "Origin"),
        ],
    )
        .into_response()
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "missfit-pay",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Checkout session endpoint: `POST /payment` (and its CORS preflight).
///
/// Runs the shared gate chain, then the rate-limit and CAPTCHA steps, then
/// exchanges the validated request for a provider checkout session.
#[instrument(skip_all, fields(ip))]
pub async fn payment(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let ctx = request_context(&method, &headers);
    tracing::Span::current().record("ip", ctx.client_ip.as_str());

    // Header gates: method, bot heuristic, origin, preflight, content type
    let origin = match state.gates.evaluate(&ctx) {
        GateDecision::Allow { origin } => origin,
        GateDecision::Preflight { origin } => return preflight_response(&origin),
        GateDecision::Reject(rejection) => return rejection_response(rejection),
    };

    // Body gates: parse, then shape
    let request = match state.gates.parse_body(&body) {
        Ok(request) => request,
        Err(rejection) => return rejection_response(rejection),
    };

    let checkout = match state.gates.validate_shape(request) {
        Ok(checkout) => checkout,
        Err(rejection) => return rejection_response(rejection),
    };

    // Rate-limit gate
    if let Some(rejection) = state.limiter.check(&ctx.client_ip).await {
        warn!("Rate limited {}", ctx.client_ip);
        return rejection_response(rejection);
    }

    // CAPTCHA verification. Required-but-unconfigured fails closed.
    if state.gates.captcha_required() {
        let Some(verifier) = state.captcha.as_ref() else {
            error!("CAPTCHA verification required but no verifier is configured");
            return rejection_response(Rejection::new(500, "Server configuration error"));
        };

        // The shape gate guarantees the token is present here
        let token = checkout.captcha_token.as_deref().unwrap_or_default();
        if let Err(e) = verifier.verify(token, &ctx.client_ip).await {
            warn!("Bot verification rejected {}: {e}", ctx.client_ip);
            return rejection_response(Rejection::from_error(&e));
        }
    }

    let Some(creator) = state.checkout.as_ref() else {
        error!("Checkout requested but no payment provider is configured");
        return rejection_response(Rejection::new(500, "Server configuration error"));
    };

    let order = build_order(&state.config.brand, &checkout, &origin);

    info!(
        "Creating checkout: plan={}, type={}, amount_minor={}",
        order.plan_name,
        order.payment_type.as_str(),
        order.amount_minor
    );

    match creator.create_session(&order).await {
        Ok(session) => {
            info!(
                "Created checkout session {} via {}",
                session.id,
                creator.provider_name()
            );
            (
                StatusCode::OK,
                [
                    ("access-control-allow-origin", origin.as_str()),
                    ("vary", "Origin"),
                ],
                Json(json!({ "sessionId": session.id })),
            )
                .into_response()
        }
        Err(e) => {
            error!("Checkout session creation failed: {e}");
            rejection_response(Rejection::from_error(&e))
        }
    }
}

/// Assemble the provider order from a validated request.
///
/// The success URL embeds plan name and payment type for the landing page;
/// the cancel URL is the caller's return URL or its origin.
fn build_order(brand: &str, checkout: &ValidatedCheckout, origin: &str) -> CheckoutOrder {
    let description = match checkout.payment_type {
        PaymentType::Subscription => format!("{} Package - Monthly Payments", checkout.plan_name),
        PaymentType::Onetime => format!("{} Package", checkout.plan_name),
    };

    let success_url = format!(
        "{origin}/success.html?plan={}&type={}",
        urlencoding::encode(&checkout.plan_name),
        checkout.payment_type.as_str()
    );

    CheckoutOrder {
        plan_name: checkout.plan_name.clone(),
        product_name: format!("{brand} - {} Plan", checkout.plan_name),
        description,
        amount_minor: to_minor_units(checkout.amount),
        payment_type: checkout.payment_type,
        interval_count: checkout.interval_count,
        success_url,
        cancel_url: checkout
            .return_url
            .clone()
            .unwrap_or_else(|| origin.to_string()),
    }
}

/// Webhook ingestion endpoint: `POST /webhook`.
///
/// The body stays raw bytes end to end; signature verification happens
/// before anything parses it as trusted data.
#[instrument(skip_all)]
pub async fn webhook(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if method != Method::POST {
        return rejection_response(Rejection::new(405, "Method not allowed"));
    }

    let Some(signature) = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
    else {
        return rejection_response(Rejection::new(400, "Missing stripe-signature header"));
    };

    let Some(processor) = state.webhook.as_ref() else {
        error!("Webhook received but signing secret or API credential is not configured");
        return rejection_response(Rejection::new(500, "Server configuration error"));
    };

    match processor.process(&body, signature).await {
        Ok(_event) => (StatusCode::OK, Json(json!({ "received": true }))).into_response(),
        Err(e) => {
            error!("Webhook rejected: {e}");
            rejection_response(Rejection::from_error(&e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_client_ip_prefers_cf_header() {
        let mut headers = HeaderMap::new();
        headers.insert("cf-connecting-ip", HeaderValue::from_static("203.0.113.7"));
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("198.51.100.1, 10.0.0.1"),
        );

        assert_eq!(client_ip(&headers), "203.0.113.7");
    }

    #[test]
    fn test_client_ip_falls_back_to_first_forwarded_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("198.51.100.1, 10.0.0.1"),
        );

        assert_eq!(client_ip(&headers), "198.51.100.1");
    }

    #[test]
    fn test_client_ip_defaults_when_absent() {
        assert_eq!(client_ip(&HeaderMap::new()), "0.0.0.0");
    }

    fn validated(plan: &str, amount: f64, payment_type: PaymentType) -> ValidatedCheckout {
        ValidatedCheckout {
            plan_name: plan.to_string(),
            amount,
            payment_type,
            interval_count: 1,
            return_url: None,
            captcha_token: None,
        }
    }

    #[test]
    fn test_build_order_onetime() {
        let order = build_order(
            "MissFit",
            &validated("Gold", 19.99, PaymentType::Onetime),
            "https://missfitcoaching.com",
        );

        assert_eq!(order.product_name, "MissFit - Gold Plan");
        assert_eq!(order.description, "Gold Package");
        assert_eq!(order.amount_minor, 1999);
        assert_eq!(
            order.success_url,
            "https://missfitcoaching.com/success.html?plan=Gold&type=onetime"
        );
        assert_eq!(order.cancel_url, "https://missfitcoaching.com");
    }

    #[test]
    fn test_build_order_subscription_and_return_url() {
        let mut checkout = validated("Total Fit", 49.0, PaymentType::Subscription);
        checkout.interval_count = 3;
        checkout.return_url = Some("https://missfitcoaching.com/pricing.html".to_string());

        let order = build_order("MissFit", &checkout, "https://missfitcoaching.com");

        assert_eq!(order.description, "Total Fit Package - Monthly Payments");
        assert_eq!(order.interval_count, 3);
        // Plan names are percent-encoded into the success URL
        assert_eq!(
            order.success_url,
            "https://missfitcoaching.com/success.html?plan=Total%20Fit&type=subscription"
        );
        assert_eq!(order.cancel_url, "https://missfitcoaching.com/pricing.html");
    }
}
