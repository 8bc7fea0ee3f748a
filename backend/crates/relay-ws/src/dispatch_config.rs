use std::time::Duration;

/// Configuration for the queue dispatch loop
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Sleep between polls when the queue is empty or failing
    pub poll_interval: Duration,
    /// Byte budget the payload is bounded against
    pub max_payload_length: usize,
    /// Frames still larger than this after bounding are dropped
    pub max_frame_length: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(1000),
            max_payload_length: 64 * 1024,
            max_frame_length: 1024 * 1024,
        }
    }
}
