use std::net::SocketAddr;

use notihub::api::{AppState, DEFAULT_SUBSCRIBER_BUFFER};
use notihub::hub::{Hub, HubConfig};
use notihub::shutdown::ShutdownCoordinator;

/// Hub with its pump running, wrapped in router state.
#[allow(dead_code)]
pub fn create_test_state() -> (AppState, tokio::task::JoinHandle<()>) {
    create_test_state_with(HubConfig::default())
}

#[allow(dead_code)]
pub fn create_test_state_with(config: HubConfig) -> (AppState, tokio::task::JoinHandle<()>) {
    let (hub, pump) = Hub::new(config);
    let pump = tokio::spawn(pump.run());
    let state = AppState {
        hub,
        shutdown: ShutdownCoordinator::new(),
        subscriber_buffer: DEFAULT_SUBSCRIBER_BUFFER,
    };
    (state, pump)
}

/// Serve the router on an ephemeral local port.
#[allow(dead_code)]
pub async fn spawn_server(state: AppState) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = notihub::api::router(state);
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });
    addr
}
