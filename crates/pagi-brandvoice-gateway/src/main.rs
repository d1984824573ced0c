//! PAGI Brand Voice Gateway: brand-voice conversion API at the configured bind address.
//! Refuses to start until the generation key and feedback destination are configured.

use anyhow::Context;
use pagi_brandvoice_core::{BrandVoiceConfig, ChatEngine};
use pagi_brandvoice_gateway::{build_router, AppState};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = BrandVoiceConfig::load().context("failed to load brand voice configuration")?;
    if let Err(e) = config.validate() {
        tracing::error!("[BRANDVOICE] startup blocked: {}", e);
        return Err(e).context("brand voice configuration is incomplete");
    }

    let engine = ChatEngine::from_config(&config).context("failed to build the conversation engine")?;
    let idle = Duration::from_secs(config.session_idle_secs);
    let state = Arc::new(AppState::with_idle_timeout(engine, idle));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    tracing::info!(
        "[BRANDVOICE] gateway v{} listening on {}",
        pagi_brandvoice_core::version(),
        config.bind_addr
    );

    axum::serve(listener, app).await.context("gateway server stopped")?;
    Ok(())
}
