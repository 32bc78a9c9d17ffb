//! ErpSync service entry point

use std::sync::Arc;

use anyhow::Context;
use erpsync_api::utils::logging::init_tracing;
use erpsync_api::{router, AppContext};
use erpsync_infra::config::loader;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Missing .env is fine; real deployments set the environment directly.
    let _ = dotenvy::dotenv();
    init_tracing();

    let config = loader::load().context("failed to load configuration")?;
    let bind_addr = config.server.bind_addr.clone();

    let ctx = Arc::new(AppContext::new(config).await.context("failed to initialize application")?);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    info!(addr = %bind_addr, "ErpSync console listening");

    axum::serve(listener, router(Arc::clone(&ctx)))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    ctx.shutdown().await;
    info!("ErpSync stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
