use metrics::{counter, gauge, histogram};

/// Metrics collector for the relay
#[derive(Clone)]
pub struct Metrics {
    prefix: &'static str,
}

impl Metrics {
    pub fn new() -> Self {
        Self { prefix: "relay_ws" }
    }

    /// Record new connection established
    pub fn connection_established(&self) {
        counter!(format!("{}.connections.established", self.prefix)).increment(1);
        gauge!(format!("{}.connections.active", self.prefix)).increment(1.0);
    }

    /// Record connection closed
    pub fn connection_closed(&self, reason: &str) {
        counter!(format!("{}.connections.closed", self.prefix)).increment(1);
        counter!(format!("{}.connections.closed.{}", self.prefix, reason)).increment(1);
        gauge!(format!("{}.connections.active", self.prefix)).decrement(1.0);
    }

    /// Record connection rejected before upgrade
    pub fn connection_rejected(&self, reason: &str) {
        counter!(format!("{}.connections.rejected.{}", self.prefix, reason)).increment(1);
    }

    /// Record message received from client
    pub fn message_received(&self, message_type: &str) {
        counter!(format!("{}.messages.received", self.prefix)).increment(1);
        counter!(format!(
            "{}.messages.received.{}",
            self.prefix, message_type
        ))
        .increment(1);
    }

    /// Record the outcome of one dispatched notification
    pub fn notification_dispatched(&self, outcome: &str, delivered: usize) {
        counter!(format!("{}.notifications.dispatched", self.prefix)).increment(1);
        counter!(format!("{}.notifications.{}", self.prefix, outcome)).increment(1);
        counter!(format!("{}.frames.sent", self.prefix)).increment(delivered as u64);
    }

    /// Record a notification dropped before delivery
    pub fn notification_dropped(&self, reason: &str) {
        counter!(format!("{}.notifications.dropped", self.prefix)).increment(1);
        counter!(format!("{}.notifications.dropped.{}", self.prefix, reason)).increment(1);
    }

    /// Record a payload that was reduced to fit the frame budget
    pub fn payload_truncated(&self) {
        counter!(format!("{}.payloads.truncated", self.prefix)).increment(1);
    }

    /// Record frame size after bounding
    pub fn frame_size(&self, bytes: usize) {
        histogram!(format!("{}.frames.size_bytes", self.prefix)).record(bytes as f64);
    }

    /// Record error occurrence
    pub fn error_occurred(&self, error_type: &str) {
        counter!(format!("{}.errors.total", self.prefix)).increment(1);
        counter!(format!("{}.errors.{}", self.prefix, error_type)).increment(1);
    }

    /// Record time spent handing one frame to the registry. Items dropped
    /// before delivery are not timed.
    pub fn dispatch_latency(&self, duration: std::time::Duration) {
        histogram!(format!("{}.dispatch.latency_ms", self.prefix))
            .record(duration.as_millis() as f64);
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
