//! Adapters for the external FIFO queue that upstream producers write
//! notifications into.

pub mod error;
pub mod memory_queue;
pub mod notification_queue;
pub mod redis_queue;

pub use error::{QueueError, Result};
pub use memory_queue::MemoryQueue;
pub use notification_queue::NotificationQueue;
pub use redis_queue::RedisQueue;

use relay_config::{QueueBackend, QueueConfig};

use std::sync::Arc;

use log::{info, warn};

#[cfg(test)]
mod tests;

/// Build the configured queue backend
pub async fn connect(config: &QueueConfig) -> Result<Arc<dyn NotificationQueue>> {
    match config.backend {
        QueueBackend::Redis => {
            let queue = RedisQueue::connect(&config.redis_url, config.key.clone()).await?;
            info!(
                "Connected to Redis queue {} at {}",
                config.key,
                config.redacted_url()
            );
            Ok(Arc::new(queue))
        }
        QueueBackend::Memory => {
            warn!("Using in-process memory queue - items are lost on restart");
            Ok(Arc::new(MemoryQueue::new()))
        }
    }
}
