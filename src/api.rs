use std::net::SocketAddr;

use axum::{
    extract::{
        rejection::JsonRejection,
        ws::{Message, WebSocket, WebSocketUpgrade},
        ConnectInfo, Path, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::hub::{Hub, HubError};
use crate::registry::Subscriber;
use crate::shutdown::ShutdownCoordinator;
use crate::store::Notification;

pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 32;

#[derive(Clone)]
pub struct AppState {
    pub hub: Hub,
    pub shutdown: ShutdownCoordinator,
    /// Outbound buffer size for each WebSocket subscriber.
    pub subscriber_buffer: usize,
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("invalid json: {0}")]
    InvalidInput(String),

    #[error("invalid id: {0}")]
    InvalidId(String),

    #[error("notification {0} not found")]
    NotFound(u64),

    #[error("service busy, retry later")]
    Busy,

    #[error("service shutting down")]
    Unavailable,
}

impl From<HubError> for ApiError {
    fn from(e: HubError) -> Self {
        match e {
            HubError::Busy => ApiError::Busy,
            HubError::Closed => ApiError::Unavailable,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    code: &'static str,
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "invalid_input"),
            ApiError::InvalidId(_) => (StatusCode::BAD_REQUEST, "invalid_id"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::Busy => (StatusCode::SERVICE_UNAVAILABLE, "busy"),
            ApiError::Unavailable => (StatusCode::SERVICE_UNAVAILABLE, "unavailable"),
        };
        let body = ErrorResponse {
            code,
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    subscribers: usize,
    notifications: usize,
}

async fn ping() -> &'static str {
    "Notification Service is running ✅"
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        subscribers: state.hub.subscriber_count(),
        notifications: state.hub.notification_count(),
    })
}

async fn notify(
    State(state): State<AppState>,
    payload: Result<Json<SubmitRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Notification>), ApiError> {
    let Json(req) = payload.map_err(|e| ApiError::InvalidInput(e.body_text()))?;
    let notification = state.hub.submit(req.title, req.message).await?;
    Ok((StatusCode::CREATED, Json(notification)))
}

async fn list_notifications(State(state): State<AppState>) -> Json<Vec<Notification>> {
    Json(state.hub.list())
}

async fn delete_notification(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id: u64 = raw_id.parse().map_err(|_| ApiError::InvalidId(raw_id))?;
    if state.hub.delete(id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(id))
    }
}

async fn ws_subscribe(
    ws: WebSocketUpgrade,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let tracker = state.shutdown.clone();
    ws.on_upgrade(move |socket| tracker.track(handle_subscriber(socket, state, peer)))
}

async fn handle_subscriber(mut socket: WebSocket, state: AppState, peer: SocketAddr) {
    let (subscriber, mut outbound) = Subscriber::channel(state.subscriber_buffer);
    let subscriber = subscriber.with_peer(peer);
    let id = subscriber.id();

    if !state.hub.subscribe(subscriber) {
        tracing::debug!(%peer, "rejecting subscriber, hub shut down");
        let _ = socket.send(Message::Close(None)).await;
        return;
    }
    tracing::info!(subscriber = %id, %peer, "websocket client connected");

    let (mut ws_tx, mut ws_rx) = socket.split();

    // Task: delivered notifications -> WebSocket. Sole writer to the socket.
    let mut tx_task = tokio::spawn(async move {
        while let Some(notification) = outbound.recv().await {
            let text = match serde_json::to_string(&*notification) {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!(id = notification.id, "failed to encode notification: {}", e);
                    continue;
                }
            };
            if ws_tx.send(Message::Text(text.into())).await.is_err() {
                return;
            }
        }
        let _ = ws_tx.send(Message::Close(None)).await;
    });

    // Task: read until the client goes away. Inbound frames are ignored.
    let mut rx_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_rx.next().await {
            if let Message::Close(_) = msg {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut tx_task => rx_task.abort(),
        _ = &mut rx_task => tx_task.abort(),
    }

    state.hub.unsubscribe(id);
    tracing::info!(subscriber = %id, %peer, "websocket client disconnected");
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ping", get(ping))
        .route("/health", get(health))
        .route("/notify", post(notify))
        .route("/notifications", get(list_notifications))
        .route("/notifications/{id}", delete(delete_notification))
        .route("/ws", get(ws_subscribe))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
