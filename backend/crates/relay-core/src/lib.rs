pub mod error;
pub mod models;
pub mod payload;

pub use error::{CoreError, Result};
pub use error_location::ErrorLocation;
pub use models::queue_item::{BoundedFrame, QueueItem, UserIdKey};
pub use models::team_id::TeamId;
pub use models::user_id::UserId;
pub use payload::bounded_encoder::{
    STRING_SHRINK_CHUNK, STRING_SHRINK_THRESHOLD, TRUNCATION_MARKER, bound,
};
pub use payload::{Payload, Scalar};

#[cfg(test)]
mod tests;
