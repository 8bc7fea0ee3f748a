use crate::{ConnectionRegistry, DeliveryResult, DispatchConfig, Metrics, MetricsTimer, ShutdownGuard};

use relay_core::{QueueItem, UserId};
use relay_queue::{NotificationQueue, QueueError};

use std::sync::Arc;

use log::{debug, error, info, warn};

/// What one poll of the queue amounted to
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchStep {
    /// Nothing was waiting
    Empty,
    /// The item was routed to the registry
    Dispatched {
        user_id: UserId,
        result: DeliveryResult,
    },
    /// The item was not UTF-8 JSON, had no user id, or could not be encoded
    Malformed,
    /// The bounded frame was still larger than the hard frame limit
    Oversized { user_id: UserId, frame_length: usize },
    /// The queue itself failed
    QueueFailed,
}

impl DispatchStep {
    /// Whether the loop should wait one poll interval before the next pop
    pub fn should_back_off(&self) -> bool {
        matches!(self, Self::Empty | Self::QueueFailed)
    }
}

/// Drains the external queue and hands each item to the registry
pub struct DispatchLoop {
    queue: Arc<dyn NotificationQueue>,
    registry: ConnectionRegistry,
    config: DispatchConfig,
    metrics: Metrics,
}

impl DispatchLoop {
    pub fn new(
        queue: Arc<dyn NotificationQueue>,
        registry: ConnectionRegistry,
        config: DispatchConfig,
        metrics: Metrics,
    ) -> Self {
        Self {
            queue,
            registry,
            config,
            metrics,
        }
    }

    /// Poll until shutdown. Shutdown is observed between items, never
    /// between popping an item and handing it to the registry.
    pub async fn run(self, mut shutdown_guard: ShutdownGuard) {
        info!(
            "Dispatch loop started on queue '{}' (poll every {}ms)",
            self.queue.name(),
            self.config.poll_interval.as_millis()
        );

        while !shutdown_guard.poll_shutdown() {
            let step = self.dispatch_next().await;
            if step.should_back_off() {
                tokio::select! {
                    _ = tokio::time::sleep(self.config.poll_interval) => {}
                    _ = shutdown_guard.wait() => break,
                }
            }
        }

        info!("Dispatch loop stopped");
    }

    /// Pop at most one item and deliver it
    pub async fn dispatch_next(&self) -> DispatchStep {
        let raw = match self.queue.pop().await {
            Ok(Some(raw)) => raw,
            Ok(None) => return DispatchStep::Empty,
            Err(e @ QueueError::InvalidEncoding { .. }) => {
                warn!("Skipping malformed queue item: {e}");
                self.metrics.notification_dropped("malformed");
                return DispatchStep::Malformed;
            }
            Err(e) => {
                error!("Failed to pop from queue '{}': {e}", self.queue.name());
                self.metrics.error_occurred("queue_pop");
                return DispatchStep::QueueFailed;
            }
        };

        let item = match QueueItem::parse(&raw) {
            Ok(item) => item,
            Err(e) => {
                warn!("Skipping malformed queue item: {e}");
                self.metrics.notification_dropped("malformed");
                return DispatchStep::Malformed;
            }
        };
        let user_id = item.user_id;

        // Bounding walks the whole payload, keep it off the runtime workers
        let budget = self.config.max_payload_length;
        let bounded = tokio::task::spawn_blocking(move || item.to_bounded_frame(budget)).await;
        let frame = match bounded {
            Ok(Ok(frame)) => frame,
            Ok(Err(e)) => {
                warn!("Skipping queue item for user {user_id}: {e}");
                self.metrics.notification_dropped("encode");
                return DispatchStep::Malformed;
            }
            Err(e) => {
                error!("Bounding task for user {user_id} did not complete: {e}");
                self.metrics.notification_dropped("encode");
                return DispatchStep::Malformed;
            }
        };

        if frame.truncated {
            debug!(
                "Payload for user {user_id} bounded to a {} byte frame",
                frame.text.len()
            );
            self.metrics.payload_truncated();
        }

        let frame_length = frame.text.len();
        self.metrics.frame_size(frame_length);

        if frame_length > self.config.max_frame_length {
            warn!(
                "Dropping notification for user {user_id}: frame of {frame_length} bytes exceeds limit {}",
                self.config.max_frame_length
            );
            self.metrics.notification_dropped("oversized");
            return DispatchStep::Oversized {
                user_id,
                frame_length,
            };
        }

        // Latency covers delivery only; dropped items never reach the timer
        let timer = MetricsTimer::new(self.metrics.clone());
        let result = self.registry.send_to_user(frame.text, user_id).await;
        match &result {
            DeliveryResult::NoRecipient => {
                debug!("User {user_id} not connected, notification discarded")
            }
            DeliveryResult::PartialFailure { delivered, failed } => warn!(
                "Notification for user {user_id} reached {delivered} connections, {} failed",
                failed.len()
            ),
            DeliveryResult::Delivered(count) => {
                debug!("Notification for user {user_id} reached {count} connections")
            }
        }

        self.metrics
            .notification_dispatched(result.label(), result.delivered_count());
        timer.finish();

        DispatchStep::Dispatched {
            user_id,
            result,
        }
    }
}
