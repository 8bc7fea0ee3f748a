use crate::{
    ConnectionConfig, ConnectionIdentity, ConnectionRegistry, Metrics, ShutdownCoordinator,
    WebSocketConnection, extract_identity,
};

use relay_auth::JwtValidator;

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{
        Query, State,
        ws::{WebSocket, WebSocketUpgrade},
    },
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::Response,
};
use log::{debug, error, warn};

/// Shared application state for WebSocket handlers
#[derive(Clone)]
pub struct AppState {
    /// Present when authentication is enabled
    pub jwt_validator: Option<Arc<JwtValidator>>,
    pub registry: ConnectionRegistry,
    pub metrics: Metrics,
    pub shutdown: ShutdownCoordinator,
    pub config: ConnectionConfig,
}

/// WebSocket upgrade handler
pub async fn handler(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Result<Response, StatusCode> {
    let authorization = headers.get(AUTHORIZATION).and_then(|h| h.to_str().ok());

    let identity = extract_identity(&params, authorization, state.jwt_validator.as_deref())
        .map_err(|e| {
            warn!("Rejected WebSocket upgrade: {e}");
            state.metrics.connection_rejected(e.error_code());
            e.status_code()
        })?;
    debug!("WebSocket upgrade request from user {}", identity.user_id);

    if !state.registry.has_capacity().await {
        warn!("Rejected WebSocket upgrade from user {}: at capacity", identity.user_id);
        state.metrics.connection_rejected("connection_limit");
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, identity, state)))
}

/// Handle WebSocket connection after upgrade
async fn handle_socket(socket: WebSocket, identity: ConnectionIdentity, state: AppState) {
    let shutdown_guard = state.shutdown.subscribe_guard();

    let connection = WebSocketConnection::new(
        identity,
        state.config,
        state.metrics,
        state.registry,
    );

    if let Err(e) = connection.handle(socket, shutdown_guard).await {
        error!("Connection for user {} ended with error: {e}", identity.user_id);
    }
}
