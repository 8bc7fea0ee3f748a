use error_location::ErrorLocation;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Invalid queue URL: {source} {location}")]
    InvalidUrl {
        #[source]
        source: redis::RedisError,
        location: ErrorLocation,
    },

    #[error("Queue connection failed: {source} {location}")]
    Connection {
        #[source]
        source: redis::RedisError,
        location: ErrorLocation,
    },

    #[error("Queue command '{command}' failed on {key}: {source} {location}")]
    Command {
        command: &'static str,
        key: String,
        #[source]
        source: redis::RedisError,
        location: ErrorLocation,
    },

    #[error("Item popped from {key} is not valid UTF-8: {source} {location}")]
    InvalidEncoding {
        key: String,
        #[source]
        source: std::string::FromUtf8Error,
        location: ErrorLocation,
    },
}

pub type Result<T> = std::result::Result<T, QueueError>;
