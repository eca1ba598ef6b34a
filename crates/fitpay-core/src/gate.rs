//! # Shared Gate Chain
//!
//! Ordered pass/reject checks applied to inbound requests before any
//! business step runs. The order is fixed because later gates assume
//! earlier invariants: method, bot heuristic, origin/referer, OPTIONS
//! short-circuit, content type. The body gates (`parse_body`,
//! `validate_shape`) and the rate-limit gate run once the header chain
//! allows the request.
//!
//! The whole chain is parameterized by [`GateChainConfig`] so the same
//! handler serves hardened and development deployments without duplicated
//! variants.

use crate::error::PaymentError;
use crate::request::{CheckoutRequest, ValidatedCheckout};
use serde::Deserialize;

/// Header-level view of an inbound request, as consumed by the gate chain
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: String,
    pub origin: Option<String>,
    pub referer: Option<String>,
    pub user_agent: Option<String>,
    pub content_type: Option<String>,
    pub client_ip: String,
}

impl RequestContext {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            origin: None,
            referer: None,
            user_agent: None,
            content_type: None,
            client_ip: "0.0.0.0".to_string(),
        }
    }

    /// Builder: set the Origin header value
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Builder: set the Referer header value
    pub fn with_referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = Some(referer.into());
        self
    }

    /// Builder: set the User-Agent header value
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Builder: set the Content-Type header value
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Builder: set the client IP
    pub fn with_client_ip(mut self, ip: impl Into<String>) -> Self {
        self.client_ip = ip.into();
        self
    }
}

/// A rejection produced by a gate.
///
/// `message` is `None` for silent rejections (empty response body).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub status: u16,
    pub message: Option<String>,
}

impl Rejection {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: Some(message.into()),
        }
    }

    pub fn silent(status: u16) -> Self {
        Self {
            status,
            message: None,
        }
    }

    pub fn from_error(err: &PaymentError) -> Self {
        Self::new(err.status_code(), err.client_message())
    }
}

/// Outcome of the header gate chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// All header gates passed; `origin` is the validated request origin
    Allow { origin: String },
    /// OPTIONS preflight for a validated origin; respond and stop
    Preflight { origin: String },
    /// A gate rejected the request
    Reject(Rejection),
}

/// Configured set of domains whose origins may call the checkout endpoint.
///
/// A request origin is allowed when its host equals an allow-listed domain
/// or is a subdomain of one. Consulted read-only per request.
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct AllowedOriginSet {
    domains: Vec<String>,
}

impl AllowedOriginSet {
    pub fn new(domains: Vec<String>) -> Self {
        Self { domains }
    }

    /// Check a full origin value (e.g. `https://www.missfitcoaching.com`)
    pub fn allows_origin(&self, origin: &str) -> bool {
        match host_of(origin) {
            Some(host) => self.allows_host(host),
            None => false,
        }
    }

    /// Check a bare host (e.g. `www.missfitcoaching.com`)
    pub fn allows_host(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        self.domains.iter().any(|domain| {
            let domain = domain.to_ascii_lowercase();
            host == domain || host.ends_with(&format!(".{domain}"))
        })
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}

/// Extract the host from an origin or referer value.
///
/// Accepts `scheme://host[:port][/path...]`; returns `None` when there is
/// no scheme or the host is empty.
pub fn host_of(url: &str) -> Option<&str> {
    let rest = url.split("://").nth(1)?;
    let host_port = rest.split('/').next().unwrap_or(rest);
    let host = host_port.split(':').next().unwrap_or(host_port);
    if host.is_empty() {
        None
    } else {
        Some(host)
    }
}

fn default_true() -> bool {
    true
}

fn default_max_requests() -> u32 {
    5
}

fn default_window_secs() -> u64 {
    60
}

/// Rate-limit gate tuning
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Requests allowed per client IP within one window
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,

    /// Window length in seconds
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: 5,
            window_secs: 60,
        }
    }
}

/// CAPTCHA gate tuning
#[derive(Debug, Clone, Deserialize)]
pub struct CaptchaConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for CaptchaConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

fn default_allowed_origins() -> Vec<String> {
    vec![
        "missfitcoaching.com".to_string(),
        "missfitcoaching.pages.dev".to_string(),
        "localhost".to_string(),
    ]
}

fn default_bot_patterns() -> Vec<String> {
    // Advisory heuristic only. Intentionally coarse: it false-positives on
    // legitimate automated clients, which is acceptable for an endpoint
    // that only browsers should call.
    [
        "bot", "crawler", "spider", "pingdom", "headless", "facebook", "whatsapp", "linkedinbot",
        "slackbot", "telegram", "twitter", "semrush", "ahrefsbot", "bingbot", "googlebot",
        "yandex", "baidu", "curl", "wget", "python-requests",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// Configuration for the whole gate chain.
///
/// Loadable from `config/gates.toml`; every field has a production default.
#[derive(Debug, Clone, Deserialize)]
pub struct GateChainConfig {
    /// Domains whose origins may call the checkout endpoint
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,

    /// Case-insensitive User-Agent substrings treated as bots
    #[serde(default = "default_bot_patterns")]
    pub bot_patterns: Vec<String>,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    #[serde(default)]
    pub captcha: CaptchaConfig,
}

impl Default for GateChainConfig {
    fn default() -> Self {
        Self {
            allowed_origins: default_allowed_origins(),
            bot_patterns: default_bot_patterns(),
            rate_limit: RateLimitConfig::default(),
            captcha: CaptchaConfig::default(),
        }
    }
}

impl GateChainConfig {
    /// Load configuration from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }
}

/// The shared gate chain, parameterized by [`GateChainConfig`]
#[derive(Debug, Clone)]
pub struct GateChain {
    config: GateChainConfig,
    origins: AllowedOriginSet,
}

impl GateChain {
    pub fn new(config: GateChainConfig) -> Self {
        let origins = AllowedOriginSet::new(config.allowed_origins.clone());
        Self { config, origins }
    }

    pub fn config(&self) -> &GateChainConfig {
        &self.config
    }

    pub fn captcha_required(&self) -> bool {
        self.config.captcha.enabled
    }

    /// Run the header gates in order; first rejection wins.
    pub fn evaluate(&self, ctx: &RequestContext) -> GateDecision {
        // 1. Method gate
        if ctx.method != "POST" && ctx.method != "OPTIONS" {
            return GateDecision::Reject(Rejection::new(405, "Method Not Allowed"));
        }

        // 2. Bot heuristic gate (advisory; empty 403 body)
        if self.is_likely_bot(ctx.user_agent.as_deref()) {
            return GateDecision::Reject(Rejection::silent(403));
        }

        // 3. Origin/referer gate (strict: absent origin with no allowed
        //    referer host is rejected)
        let origin = match self.validated_origin(ctx) {
            Some(origin) => origin,
            None => return GateDecision::Reject(Rejection::new(403, "Forbidden")),
        };

        // 4. OPTIONS short-circuit: preflight for the validated origin
        if ctx.method == "OPTIONS" {
            return GateDecision::Preflight { origin };
        }

        // 5. Content-type gate
        if !declares_json(ctx.content_type.as_deref()) {
            return GateDecision::Reject(Rejection::new(
                400,
                "Content-Type must be application/json",
            ));
        }

        GateDecision::Allow { origin }
    }

    /// Parse gate: the body must be valid JSON of the checkout shape
    pub fn parse_body(&self, body: &[u8]) -> Result<CheckoutRequest, Rejection> {
        serde_json::from_slice(body).map_err(|_| Rejection::new(400, "Invalid JSON body"))
    }

    /// Shape gate: required fields present (including the challenge token
    /// when CAPTCHA verification is enabled)
    pub fn validate_shape(&self, request: CheckoutRequest) -> Result<ValidatedCheckout, Rejection> {
        request
            .validate(self.captcha_required())
            .map_err(|e| Rejection::from_error(&e))
    }

    fn is_likely_bot(&self, user_agent: Option<&str>) -> bool {
        let Some(user_agent) = user_agent else {
            return false;
        };
        let user_agent = user_agent.to_ascii_lowercase();
        self.config
            .bot_patterns
            .iter()
            .any(|pattern| user_agent.contains(&pattern.to_ascii_lowercase()))
    }

    /// Resolve the origin the rest of the pipeline should trust.
    ///
    /// A present `Origin` header must match the allow-list; the `Referer`
    /// host is consulted only when `Origin` is absent.
    fn validated_origin(&self, ctx: &RequestContext) -> Option<String> {
        if let Some(origin) = &ctx.origin {
            if self.origins.allows_origin(origin) {
                return Some(origin.clone());
            }
            return None;
        }

        let referer = ctx.referer.as_deref()?;
        let host = host_of(referer)?;
        if self.origins.allows_host(host) {
            return Some(format!("https://{host}"));
        }
        None
    }
}

fn declares_json(content_type: Option<&str>) -> bool {
    match content_type {
        Some(value) => value
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .eq_ignore_ascii_case("application/json"),
        None => false,
    }
}
