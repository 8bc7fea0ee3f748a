pub mod error;
pub mod health;
pub mod logger;
pub mod metrics;
pub mod routes;
pub mod signal;


pub use crate::error::{Result, ServerError};
pub use crate::routes::build_router;
