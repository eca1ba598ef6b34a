//! # MissFit-Pay RS
//!
//! Payment backend for missfitcoaching.com: checkout session creation
//! behind the shared gate chain, plus Stripe webhook ingestion.
//!
//! ## Usage
//!
//! ```bash
//! # Set environment variables
//! export STRIPE_SECRET_KEY=sk_test_...
//! export STRIPE_WEBHOOK_SECRET=whsec_...
//! export TURNSTILE_SECRET_KEY=0x...
//!
//! # Run the server
//! missfit-pay
//! ```

use fitpay_api::{routes, state::AppState};
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    // Initialize application state
    let state = AppState::from_env()?;

    let addr = state.config.socket_addr()?;
    let is_prod = state.config.is_production();

    info!("Environment: {}", state.config.environment);
    info!("Brand: {}", state.config.brand);
    info!(
        "Checkout provider: {}",
        state
            .checkout
            .as_ref()
            .map(|c| c.provider_name())
            .unwrap_or("NOT CONFIGURED")
    );
    if state.webhook.is_none() {
        warn!("Webhook ingestion NOT CONFIGURED (missing signing secret or API key)");
    }
    if state.gates.captcha_required() && state.captcha.is_none() {
        warn!("CAPTCHA required but verifier NOT CONFIGURED; checkout will fail closed");
    }

    // Create router
    let app = routes::create_router(state);

    // Start server
    info!("missfit-pay starting on http://{}", addr);

    if !is_prod {
        info!("Checkout: POST http://{}/payment", addr);
        info!("Webhook:  POST http://{}/webhook", addr);
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
