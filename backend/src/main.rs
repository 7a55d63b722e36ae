// main.rs

use clap::Parser;
use katapult_device::{DeviceConfig, SimulatedHall, router, spawn_device};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = DeviceConfig::parse();

    let (state, _tasks) = spawn_device(SimulatedHall::new(config.rpm, config.jitter));

    // --- Webserver ---
    let app = router(state.clone(), &config.static_dir);
    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    info!("device listening on http://{}", listener.local_addr()?);

    let shutdown_state = state.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
            shutdown_state.close_sessions();
        })
        .await?;

    Ok(())
}
