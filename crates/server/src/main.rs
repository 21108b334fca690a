use anyhow::Context;
use server::{HostConfig, default_registry};
use services::{Capabilities, ServicesConfig};
use tracing_subscriber::{EnvFilter, prelude::*};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let filter_string = format!(
        "warn,server={level},services={level},tool_client={level},utils={level}",
        level = log_level
    );
    let env_filter = EnvFilter::try_new(filter_string).context("invalid tracing filter")?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_filter(env_filter))
        .init();

    let host = HostConfig::from_env()?;
    utils::assets::ensure_dir(&host.artifact_dir)?;
    let services = ServicesConfig {
        artifact_dir: host.artifact_dir.clone(),
        ..ServicesConfig::from_env()?
    };
    let capabilities = Capabilities::from_config(&services);
    let registry = default_registry(&capabilities)?;

    let listener = tokio::net::TcpListener::bind(host.bind_addr())
        .await
        .with_context(|| format!("could not bind {}", host.bind_addr()))?;
    tracing::info!(
        "[TOOL_HOST] Serving {:?} on http://{}",
        registry.operations(),
        listener.local_addr()?
    );
    tracing::info!("[TOOL_HOST] Artifacts go to {}", host.artifact_dir.display());

    axum::serve(listener, server::app(registry))
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("[TOOL_HOST] Shutting down");
        })
        .await?;
    Ok(())
}
