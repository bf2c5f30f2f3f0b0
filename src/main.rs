use std::sync::Arc;

use compute::{
    features,
    services::{deployment::DeploymentService, docker::DockerRuntime, runtime::ContainerRuntime},
    utilities::app_state::AppState,
};
use shared::utilities::config::Config;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, filter::LevelFilter, fmt, prelude::*};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::init().await?;

    tracing_subscriber::registry()
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::from_level(config.tracing_level).into())
                .from_env_lossy(),
        )
        .with(fmt::layer())
        .init();

    let runtime = Arc::new(DockerRuntime::new()?);

    // Each operation probes again, so an unreachable daemon here is not fatal.
    match runtime.ping().await {
        Ok(()) => info!("✅ Docker connection established."),
        Err(e) => warn!(error = %e, "Docker is not reachable yet"),
    }

    let deployments = DeploymentService::from_config(runtime, &config);

    info!(
        base_domain = %config.base_domain,
        nginx_config_dir = %config.nginx_config_dir.display(),
        port_range = %format!("{}-{}", config.port_range_min, config.port_range_max),
        "Deployment orchestrator configured"
    );

    let state = AppState { deployments };

    let app = features::routes()
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = TcpListener::bind(&config.server_address).await?;
    info!("🚀 Listening on {}", config.server_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutting down");
}
