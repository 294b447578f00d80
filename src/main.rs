use anyhow::Result;
use az_cli_sidecar::{app, config::Config, types::AppState};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug")),
        )
        .init();

    let config = Config::from_env()?;
    tracing::info!(
        staging_path = %config.staging_path.display(),
        package_dir = %config.package_dir.display(),
        "configured upgrade script paths"
    );

    let app = app::build_router(AppState::from_config(&config));

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    // Wait for the CTRL+C signal
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to install CTRL+C signal handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("signal received, starting graceful shutdown");
}
