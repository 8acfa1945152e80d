use std::net::SocketAddr;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use notihub::api::{self, AppState};
use notihub::config::Config;
use notihub::generator;
use notihub::hub::Hub;
use notihub::shutdown::{self, ShutdownCoordinator};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "notihub=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(?config, "notihub starting");

    let (hub, pump) = Hub::new(config.hub_config());
    let pump_handle = tokio::spawn(pump.run());

    let coordinator = ShutdownCoordinator::new();

    let generator_handle = config.periodic_interval().map(|interval| {
        tokio::spawn(generator::run(hub.clone(), interval, coordinator.token()))
    });

    let state = AppState {
        hub: hub.clone(),
        shutdown: coordinator.clone(),
        subscriber_buffer: config.subscriber_buffer,
    };
    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    tracing::info!(addr = %config.bind, "notification service listening");

    let signal_coordinator = coordinator.clone();
    let signal_hub = hub.clone();
    let serve = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        shutdown::signal().await;
        signal_coordinator.shutdown();
        // Closing the hub closes every subscriber, which ends the
        // long-lived WebSocket connections the server would wait on.
        signal_hub.shutdown();
    });

    serve.await.context("server error")?;

    coordinator.shutdown();
    hub.shutdown();

    if let Some(handle) = generator_handle {
        let _ = handle.await;
    }
    if let Err(e) = pump_handle.await {
        tracing::error!("broadcast pump task failed: {}", e);
    }
    if !coordinator.wait_for_all_closed(config.shutdown_grace()).await {
        tracing::warn!(
            remaining = coordinator.active_count(),
            "connections still open after grace period"
        );
    }

    tracing::info!("notihub stopped");
    Ok(())
}
