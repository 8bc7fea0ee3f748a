use crate::{
    ConnectionConfig, ConnectionHandle, ConnectionIdentity, ConnectionRegistry, Metrics,
    Result as WsErrorResult, ShutdownGuard, WsError,
};

use std::panic::Location;

use axum::extract::ws::{Message, WebSocket};
use bytes::Bytes;
use error_location::ErrorLocation;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};

/// Manages a single WebSocket session from registration to disconnect
pub struct WebSocketConnection {
    identity: ConnectionIdentity,
    config: ConnectionConfig,
    metrics: Metrics,
    registry: ConnectionRegistry,
}

impl WebSocketConnection {
    pub fn new(
        identity: ConnectionIdentity,
        config: ConnectionConfig,
        metrics: Metrics,
        registry: ConnectionRegistry,
    ) -> Self {
        Self {
            identity,
            config,
            metrics,
            registry,
        }
    }

    /// Handle the WebSocket connection lifecycle.
    ///
    /// The session is removed from the registry exactly once, whichever way
    /// the loop exits.
    pub async fn handle(self, socket: WebSocket, mut shutdown_guard: ShutdownGuard) -> WsErrorResult<()> {
        let user_id = self.identity.user_id;

        // Split socket into sender and receiver
        let (mut ws_sender, mut ws_receiver) = socket.split();

        // Create bounded channel for outgoing messages (backpressure handling)
        let (tx, mut rx) = mpsc::channel::<Message>(self.config.send_buffer_size);
        let handle = ConnectionHandle::new(tx.clone());
        let connection_id = handle.connection_id();

        if let Err(e) = self
            .registry
            .connect(handle.clone(), user_id, self.identity.team_id)
            .await
        {
            self.metrics.connection_rejected(e.error_code());
            let _ = ws_sender.close().await;
            return Err(e);
        }

        log::info!(
            "WebSocket connection {connection_id} established for user {user_id} (team {:?})",
            self.identity.team_id.map(|team| team.value())
        );
        self.metrics.connection_established();

        // Spawn send task
        let send_task = tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                if ws_sender.send(msg).await.is_err() {
                    break;
                }
            }
            let _ = ws_sender.close().await;
        });

        let mut heartbeat = tokio::time::interval(self.config.heartbeat_interval());
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
        heartbeat.tick().await;
        let mut last_seen = Instant::now();

        let result = loop {
            tokio::select! {
                // Handle incoming messages from client
                msg = ws_receiver.next() => {
                    match msg {
                        Some(Ok(Message::Close(_))) | None => {
                            log::info!("Connection {connection_id} closed by client");
                            break Ok(());
                        }
                        Some(Ok(msg)) => {
                            last_seen = Instant::now();
                            if let Err(e) = self.handle_client_message(msg, &tx).await {
                                log::error!("Error handling message from connection {connection_id}: {e}");
                                break Err(e);
                            }
                        }
                        Some(Err(e)) => {
                            log::error!("WebSocket error on connection {connection_id}: {e}");
                            break Err(WsError::ConnectionClosed {
                                reason: format!("WebSocket error: {e}"),
                                location: ErrorLocation::from(Location::caller()),
                            });
                        }
                    }
                }

                _ = heartbeat.tick() => {
                    if last_seen.elapsed() > self.config.heartbeat_timeout() {
                        log::warn!("Connection {connection_id} missed heartbeat");
                        break Err(WsError::HeartbeatTimeout {
                            timeout_secs: self.config.heartbeat_timeout_secs,
                            location: ErrorLocation::from(Location::caller()),
                        });
                    }
                    if tx.try_send(Message::Ping(Bytes::new())).is_err() {
                        log::debug!("Send buffer full on {connection_id}, skipping ping");
                    }
                }

                // Dropped by the registry after a failed write
                _ = handle.evicted() => {
                    log::info!("Connection {connection_id} evicted after failed delivery");
                    break Err(WsError::ConnectionClosed {
                        reason: "evicted after failed delivery".to_string(),
                        location: ErrorLocation::from(Location::caller()),
                    });
                }

                // Handle graceful shutdown
                _ = shutdown_guard.wait() => {
                    log::info!("Shutting down connection {connection_id} gracefully");
                    break Ok(());
                }
            }
        };

        // Cleanup
        self.registry.disconnect(connection_id, user_id).await;
        let session = handle.connected_for();
        drop(handle);
        drop(tx); // Close channel to terminate send task
        let _ = send_task.await;

        self.metrics.connection_closed(match &result {
            Ok(()) => "normal",
            Err(e) => e.error_code(),
        });

        log::info!(
            "WebSocket connection {connection_id} closed for user {user_id} after {}s",
            session.num_seconds()
        );

        result
    }

    /// Handle a message from the client. The relay is push-only, so data
    /// frames are logged and ignored.
    async fn handle_client_message(
        &self,
        msg: Message,
        tx: &mpsc::Sender<Message>,
    ) -> WsErrorResult<()> {
        match msg {
            Message::Text(text) => {
                log::debug!("Ignoring text message ({} bytes) from client", text.len());
                self.metrics.message_received("text");
                Ok(())
            }
            Message::Binary(data) => {
                log::debug!("Ignoring binary message ({} bytes) from client", data.len());
                self.metrics.message_received("binary");
                Ok(())
            }
            Message::Ping(data) => {
                tx.send(Message::Pong(data))
                    .await
                    .map_err(|_| WsError::ConnectionClosed {
                        reason: "outbound channel closed".to_string(),
                        location: ErrorLocation::from(Location::caller()),
                    })
            }
            Message::Pong(_) => Ok(()),
            Message::Close(_) => Ok(()),
        }
    }
}
