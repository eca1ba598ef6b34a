//! # Application State
//!
//! Shared state for the Axum application: gate chain, rate limiter, and
//! the configured provider capabilities. A capability that could not be
//! configured is `None`; its endpoint fails closed with a configuration
//! error instead of skipping the step.

use fitpay_core::{
    CaptchaVerifier, CheckoutSessionCreator, GateChain, GateChainConfig, LoggingNotifier,
    MemoryRateLimitStore, RateLimitStore, RateLimiter,
};
use fitpay_stripe::{
    NotifyingWebhookHandler, StripeCheckoutClient, StripeConfig, StripeWebhookProcessor,
};
use fitpay_turnstile::{TurnstileConfig, TurnstileVerifier};
use std::sync::Arc;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Environment (development, staging, production)
    pub environment: String,
    /// Brand used in product names ("{brand} - {plan} Plan")
    pub brand: String,
}

impl AppConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            environment: std::env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
            brand: std::env::var("BRAND_NAME").unwrap_or_else(|_| "MissFit".to_string()),
        }
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<std::net::SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            environment: "development".to_string(),
            brand: "MissFit".to_string(),
        }
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    /// The shared gate chain for the checkout path
    pub gates: GateChain,
    /// Per-IP rate limiter (checkout path only)
    pub limiter: RateLimiter,
    /// CAPTCHA verifier; `None` when disabled or unconfigured
    pub captcha: Option<Arc<dyn CaptchaVerifier>>,
    /// Checkout session creator; `None` when the provider is unconfigured
    pub checkout: Option<Arc<dyn CheckoutSessionCreator>>,
    /// Webhook pipeline; `None` when signing secrets are unconfigured
    pub webhook: Option<Arc<StripeWebhookProcessor>>,
}

impl AppState {
    /// Assemble the full production state from the environment.
    ///
    /// Malformed configuration aborts startup; merely absent credentials
    /// only disable the affected endpoint, which then reports a
    /// configuration error per request.
    pub fn from_env() -> anyhow::Result<Self> {
        let config = AppConfig::from_env();
        let gate_config = load_gate_config();

        let stripe_config =
            StripeConfig::from_env().map_err(|e| anyhow::anyhow!("Stripe config: {e}"))?;
        let turnstile_config =
            TurnstileConfig::from_env().map_err(|e| anyhow::anyhow!("Turnstile config: {e}"))?;

        let checkout = match StripeCheckoutClient::new(&stripe_config) {
            Ok(client) => Some(Arc::new(client) as Arc<dyn CheckoutSessionCreator>),
            Err(e) => {
                tracing::warn!("Checkout disabled: {e}");
                None
            }
        };

        let handler = Arc::new(NotifyingWebhookHandler::new(
            config.brand.clone(),
            Arc::new(LoggingNotifier),
        ));
        let webhook = match StripeWebhookProcessor::from_config(&stripe_config, handler) {
            Ok(processor) => Some(Arc::new(processor)),
            Err(e) => {
                tracing::warn!("Webhook ingestion disabled: {e}");
                None
            }
        };

        let captcha = if gate_config.captcha.enabled {
            match TurnstileVerifier::new(&turnstile_config) {
                Ok(verifier) => Some(Arc::new(verifier) as Arc<dyn CaptchaVerifier>),
                Err(e) => {
                    tracing::warn!("CAPTCHA verifier unavailable, checkout will fail closed: {e}");
                    None
                }
            }
        } else {
            None
        };

        Ok(Self::builder(config, gate_config)
            .with_store(Arc::new(MemoryRateLimitStore::new()))
            .maybe_checkout(checkout)
            .maybe_captcha(captcha)
            .maybe_webhook(webhook)
            .build())
    }

    pub fn builder(config: AppConfig, gate_config: GateChainConfig) -> AppStateBuilder {
        AppStateBuilder {
            config,
            gate_config,
            store: None,
            captcha: None,
            checkout: None,
            webhook: None,
        }
    }
}

/// Builder for [`AppState`]; tests plug in deterministic fakes here.
pub struct AppStateBuilder {
    config: AppConfig,
    gate_config: GateChainConfig,
    store: Option<Arc<dyn RateLimitStore>>,
    captcha: Option<Arc<dyn CaptchaVerifier>>,
    checkout: Option<Arc<dyn CheckoutSessionCreator>>,
    webhook: Option<Arc<StripeWebhookProcessor>>,
}

impl AppStateBuilder {
    pub fn with_store(mut self, store: Arc<dyn RateLimitStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_checkout(mut self, checkout: Arc<dyn CheckoutSessionCreator>) -> Self {
        self.checkout = Some(checkout);
        self
    }

    pub fn with_captcha(mut self, captcha: Arc<dyn CaptchaVerifier>) -> Self {
        self.captcha = Some(captcha);
        self
    }

    pub fn with_webhook(mut self, webhook: Arc<StripeWebhookProcessor>) -> Self {
        self.webhook = Some(webhook);
        self
    }

    fn maybe_checkout(mut self, checkout: Option<Arc<dyn CheckoutSessionCreator>>) -> Self {
        self.checkout = checkout;
        self
    }

    fn maybe_captcha(mut self, captcha: Option<Arc<dyn CaptchaVerifier>>) -> Self {
        self.captcha = captcha;
        self
    }

    fn maybe_webhook(mut self, webhook: Option<Arc<StripeWebhookProcessor>>) -> Self {
        self.webhook = webhook;
        self
    }

    pub fn build(self) -> AppState {
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryRateLimitStore::new()));
        let limiter = RateLimiter::new(store, &self.gate_config.rate_limit);
        let gates = GateChain::new(self.gate_config);

        AppState {
            config: self.config,
            gates,
            limiter,
            captcha: self.captcha,
            checkout: self.checkout,
            webhook: self.webhook,
        }
    }
}

/// Load the gate-chain configuration.
///
/// Probes `config/gates.toml` relative to the working directory, then falls
/// back to built-in defaults. `ALLOWED_ORIGINS` (comma-separated domains)
/// overrides the origin allow-list either way.
pub fn load_gate_config() -> GateChainConfig {
    let config_paths = [
        "config/gates.toml",
        "../config/gates.toml",
        "../../config/gates.toml",
    ];

    let mut config = GateChainConfig::default();

    for path in config_paths {
        if let Ok(content) = std::fs::read_to_string(path) {
            match GateChainConfig::from_toml(&content) {
                Ok(parsed) => {
                    tracing::info!("Loaded gate configuration from {path}");
                    config = parsed;
                    break;
                }
                Err(e) => {
                    tracing::warn!("Ignoring invalid gate configuration {path}: {e}");
                }
            }
        }
    }

    if let Ok(origins) = std::env::var("ALLOWED_ORIGINS") {
        let domains: Vec<String> = origins
            .split(',')
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .collect();
        if !domains.is_empty() {
            config.allowed_origins = domains;
        }
    }

    config
}
