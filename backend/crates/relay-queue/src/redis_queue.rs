use crate::{NotificationQueue, QueueError, Result as QueueErrorResult};

use std::panic::Location;

use async_trait::async_trait;
use error_location::ErrorLocation;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

/// Redis list used as a FIFO: producers `RPUSH`, the relay `LPOP`s.
///
/// `ConnectionManager` reconnects on its own after a dropped connection,
/// so a Redis restart shows up as a few failed pops rather than a dead loop.
#[derive(Clone)]
pub struct RedisQueue {
    manager: ConnectionManager,
    key: String,
}

impl RedisQueue {
    pub async fn connect(redis_url: &str, key: String) -> QueueErrorResult<Self> {
        let client = Client::open(redis_url).map_err(|source| QueueError::InvalidUrl {
            source,
            location: ErrorLocation::from(Location::caller()),
        })?;

        let manager = ConnectionManager::new(client)
            .await
            .map_err(|source| QueueError::Connection {
                source,
                location: ErrorLocation::from(Location::caller()),
            })?;

        Ok(Self { manager, key })
    }

    #[track_caller]
    fn command_error(&self, command: &'static str, source: redis::RedisError) -> QueueError {
        QueueError::Command {
            command,
            key: self.key.clone(),
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

#[async_trait]
impl NotificationQueue for RedisQueue {
    async fn pop(&self) -> QueueErrorResult<Option<String>> {
        let mut conn = self.manager.clone();
        let popped = conn
            .lpop::<_, Option<Vec<u8>>>(&self.key, None)
            .await
            .map_err(|e| self.command_error("LPOP", e))?;

        popped.map(|bytes| decode_item(&self.key, bytes)).transpose()
    }

    async fn push(&self, item: String) -> QueueErrorResult<()> {
        let mut conn = self.manager.clone();
        conn.rpush::<_, _, ()>(&self.key, item)
            .await
            .map_err(|e| self.command_error("RPUSH", e))
    }

    fn name(&self) -> &str {
        &self.key
    }
}

/// The item is already off the list once LPOP returns, so bad bytes are
/// reported as that item's problem rather than a failed command.
pub(crate) fn decode_item(key: &str, bytes: Vec<u8>) -> QueueErrorResult<String> {
    String::from_utf8(bytes).map_err(|source| QueueError::InvalidEncoding {
        key: key.to_string(),
        source,
        location: ErrorLocation::from(Location::caller()),
    })
}
