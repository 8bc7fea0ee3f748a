use crate::{NotificationQueue, Result as QueueErrorResult};

use std::collections::VecDeque;

use async_trait::async_trait;
use tokio::sync::Mutex;

/// In-process queue (nothing survives a restart)
#[derive(Default)]
pub struct MemoryQueue {
    items: Mutex<VecDeque<String>>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue pre-filled with `items`, oldest first
    pub fn with_items<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            items: Mutex::new(items.into_iter().map(Into::into).collect()),
        }
    }

    pub async fn len(&self) -> usize {
        self.items.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.lock().await.is_empty()
    }
}

#[async_trait]
impl NotificationQueue for MemoryQueue {
    async fn pop(&self) -> QueueErrorResult<Option<String>> {
        Ok(self.items.lock().await.pop_front())
    }

    async fn push(&self, item: String) -> QueueErrorResult<()> {
        self.items.lock().await.push_back(item);
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
