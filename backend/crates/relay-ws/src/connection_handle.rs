use crate::{ConnectionId, Result as WsErrorResult, WsError};

use std::panic::Location;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::Message;
use chrono::{DateTime, TimeDelta, Utc};
use error_location::ErrorLocation;
use tokio::sync::{Notify, mpsc};

/// Send side of one live session, shared between the registry and its socket task
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    connection_id: ConnectionId,
    connected_at: DateTime<Utc>,
    sender: mpsc::Sender<Message>,
    evicted: Arc<Notify>,
}

impl ConnectionHandle {
    pub fn new(sender: mpsc::Sender<Message>) -> Self {
        Self {
            connection_id: ConnectionId::new(),
            connected_at: Utc::now(),
            sender,
            evicted: Arc::new(Notify::new()),
        }
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    pub fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }

    /// Time since the session was registered
    pub fn connected_for(&self) -> TimeDelta {
        Utc::now() - self.connected_at
    }

    /// Queue one frame for the socket, giving up after `write_timeout`
    pub async fn transmit(&self, message: Message, write_timeout: Duration) -> WsErrorResult<()> {
        match tokio::time::timeout(write_timeout, self.sender.send(message)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(WsError::ConnectionClosed {
                reason: "outbound channel closed".to_string(),
                location: ErrorLocation::from(Location::caller()),
            }),
            Err(_) => Err(WsError::WriteTimeout {
                timeout_ms: write_timeout.as_millis(),
                location: ErrorLocation::from(Location::caller()),
            }),
        }
    }

    /// Ask the owning socket task to close the session
    pub fn evict(&self) {
        self.evicted.notify_one();
    }

    /// Resolves once `evict` has been called
    pub async fn evicted(&self) {
        self.evicted.notified().await;
    }
}

impl PartialEq for ConnectionHandle {
    fn eq(&self, other: &Self) -> bool {
        self.connection_id == other.connection_id
    }
}

impl Eq for ConnectionHandle {}
