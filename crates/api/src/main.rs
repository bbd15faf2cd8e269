use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;

use albiero_api::app::{build_app, build_services};
use albiero_api::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Config errors are reported before logging is configured, so read the
    // environment first and fall back to the default format on failure.
    let config = AppConfig::from_env();
    let format = config
        .as_ref()
        .map(|c| c.environment.log_format())
        .unwrap_or_default();
    albiero_observability::init(format);

    let config = config.context("loading configuration")?;
    tracing::info!(environment = config.environment.as_str(), port = config.port, "starting");
    if config.uses_dev_secret() {
        tracing::warn!("JWT_SECRET not set; using insecure dev default");
    }

    let services = Arc::new(build_services(&config).await?);
    let db = services.db.clone();
    let app = build_app(services, config.environment);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    db.close().await;
    tracing::info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
