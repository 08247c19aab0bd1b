//! HTTP and WebSocket transport
//!
//! - `GET /ws` upgrades to a WebSocket carrying one goal session
//! - `GET /health` liveness probe
//! - `GET /status` server status with headline metrics
//! - `GET /metrics` Prometheus text format

use crate::metrics::MetricsSnapshot;
use crate::protocol::SessionServer;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;
use tracing::{debug, error, info, warn};

/// Server version from Cargo.toml
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Server name from Cargo.toml
pub const SERVER_NAME: &str = env!("CARGO_PKG_NAME");

/// Liveness response
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always "healthy" if responding
    pub status: String,
}

/// Detailed status response
#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    /// Server name
    pub name: String,
    /// Server version
    pub version: String,
    /// Always "running" if responding
    pub status: String,
    /// Headline counters
    pub metrics: MetricsSnapshot,
    /// RFC 3339 time the status was generated
    pub timestamp: String,
}

/// Build the router
pub fn create_router(server: SessionServer) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/metrics", get(metrics_handler))
        .layer(CorsLayer::permissive())
        .with_state(server)
}

/// Bind `addr` and serve until the process stops
pub async fn serve(server: SessionServer, addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{} (WebSocket at /ws)", addr);
    axum::serve(listener, create_router(server)).await
}

async fn ws_handler(ws: WebSocketUpgrade, State(server): State<SessionServer>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, server))
}

/// Run one session over an upgraded socket
async fn handle_socket(socket: WebSocket, server: SessionServer) {
    let mut session = server.connect();
    let (mut sender, mut receiver) = socket.split();

    while let Some(frame) = receiver.next().await {
        let text = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Binary(bytes)) => match String::from_utf8(bytes) {
                Ok(text) => text,
                Err(e) => {
                    warn!("Ignoring non-UTF-8 binary frame: {}", e);
                    continue;
                }
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                warn!(session = %session.id(), "WebSocket receive error: {}", e);
                break;
            }
        };

        for message in session.handle_text(&text).await {
            let json = message.to_json();
            debug!(kind = message.kind(), "Sending {} bytes", json.len());
            if let Err(e) = sender.send(Message::Text(json)).await {
                error!(session = %session.id(), "WebSocket send failed: {}", e);
                server.disconnect(session);
                return;
            }
        }
    }

    server.disconnect(session);
}

async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
    })
}

async fn status_handler(State(server): State<SessionServer>) -> impl IntoResponse {
    Json(build_status(&server))
}

/// Current status of `server`
pub fn build_status(server: &SessionServer) -> StatusResponse {
    StatusResponse {
        name: SERVER_NAME.to_string(),
        version: SERVER_VERSION.to_string(),
        status: "running".to_string(),
        metrics: server.orchestrator().metrics().snapshot(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    }
}

async fn metrics_handler(State(server): State<SessionServer>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        server.orchestrator().metrics().to_prometheus_format(),
    )
}
