use crate::{ConfigError, ConfigErrorResult};

use serde::Deserialize;

// Soft payload budget constraints (bytes)
pub const MIN_MAX_PAYLOAD_LENGTH: usize = 256;
pub const MAX_MAX_PAYLOAD_LENGTH: usize = 16 * 1024 * 1024;
pub const DEFAULT_MAX_PAYLOAD_LENGTH: usize = 64 * 1024;

// Hard frame limit constraints (bytes)
pub const MAX_MAX_FRAME_LENGTH: usize = 64 * 1024 * 1024;
pub const DEFAULT_MAX_FRAME_LENGTH: usize = 1024 * 1024;

/// Size limits applied to outbound notifications
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    /// Target frame size the encoder reduces towards (soft limit)
    pub max_payload_length: usize,
    /// Frames still larger than this after bounding are dropped (hard limit)
    pub max_frame_length: usize,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            max_payload_length: DEFAULT_MAX_PAYLOAD_LENGTH,
            max_frame_length: DEFAULT_MAX_FRAME_LENGTH,
        }
    }
}

impl DeliveryConfig {
    pub fn validate(&self) -> ConfigErrorResult<()> {
        if self.max_payload_length < MIN_MAX_PAYLOAD_LENGTH
            || self.max_payload_length > MAX_MAX_PAYLOAD_LENGTH
        {
            return Err(ConfigError::delivery(format!(
                "delivery.max_payload_length must be {}-{}, got {}",
                MIN_MAX_PAYLOAD_LENGTH, MAX_MAX_PAYLOAD_LENGTH, self.max_payload_length
            )));
        }

        if self.max_frame_length < self.max_payload_length
            || self.max_frame_length > MAX_MAX_FRAME_LENGTH
        {
            return Err(ConfigError::delivery(format!(
                "delivery.max_frame_length must be between max_payload_length ({}) and {}, got {}",
                self.max_payload_length, MAX_MAX_FRAME_LENGTH, self.max_frame_length
            )));
        }

        Ok(())
    }
}
