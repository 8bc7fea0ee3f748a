use crate::Result as QueueErrorResult;

use async_trait::async_trait;

/// Durable FIFO queue holding serialized notifications.
///
/// The relay only consumes; `push` exists for producers living in the same
/// process and for tests.
#[async_trait]
pub trait NotificationQueue: Send + Sync {
    /// Remove and return the oldest item, or `None` right away when the
    /// queue is empty. Never blocks waiting for an item.
    ///
    /// An item that was removed but is not text comes back as
    /// `QueueError::InvalidEncoding`; the queue itself is still healthy.
    async fn pop(&self) -> QueueErrorResult<Option<String>>;

    /// Append an item at the tail
    async fn push(&self, item: String) -> QueueErrorResult<()>;

    /// Short label for logs
    fn name(&self) -> &str;
}
