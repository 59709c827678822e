//! Call gateway: answers phone calls and bridges each one to a realtime speech session.

mod config;
mod realtime;
mod routes;
mod telephony;

use crate::config::GatewayConfig;
use crate::realtime::RealtimeConnector;
use crate::routes::{router, AppState};
use anyhow::Context;
use pagi_call::CallBridge;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("[pagi-call-gateway] .env not loaded: {} (using system environment)", e);
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Only one provider is compiled in, so this cannot race another install.
    let _ = rustls::crypto::ring::default_provider().install_default();

    let config = GatewayConfig::load().context("loading gateway configuration")?;
    if config.api_key.is_none() {
        tracing::warn!("OPENAI_API_KEY not set: calls will be answered but not bridged");
    }

    let bridge = CallBridge::new(config.bridge.clone()).context("invalid bridge configuration")?;
    let connector = RealtimeConnector::new(
        config.realtime_url.clone(),
        config.api_key.clone(),
        config.voice.clone(),
        config.instructions.clone(),
    );
    let app = router(AppState::new(
        bridge,
        connector,
        config.ws_url.clone(),
        config.content_type.clone(),
    ));

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    tracing::info!("📡 Call gateway listening on {} (answer webhook points at {})", addr, config.ws_url);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Ctrl+C handler failed: {}", e);
            }
            tracing::info!("Shutdown initiated (Ctrl+C received)");
        })
        .await
        .context("server error")?;

    Ok(())
}
