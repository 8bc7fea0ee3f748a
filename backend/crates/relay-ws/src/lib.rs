pub mod app_state;
pub mod connection_config;
pub mod connection_handle;
pub mod connection_id;
pub mod connection_limits;
pub mod connection_registry;
pub mod delivery_result;
pub mod dispatch_config;
pub mod dispatch_loop;
pub mod error;
pub mod identity;
pub mod metrics;
pub mod metrics_timer;
pub mod shutdown_coordinator;
pub mod shutdown_guard;
pub mod web_socket_connection;

pub use app_state::{AppState, handler};
pub use connection_config::ConnectionConfig;
pub use connection_handle::ConnectionHandle;
pub use connection_id::ConnectionId;
pub use connection_limits::ConnectionLimits;
pub use connection_registry::ConnectionRegistry;
pub use delivery_result::DeliveryResult;
pub use dispatch_config::DispatchConfig;
pub use dispatch_loop::{DispatchLoop, DispatchStep};
pub use error::{Result, WsError};
pub use identity::{ConnectionIdentity, extract_identity};
pub use metrics::Metrics;
pub use metrics_timer::MetricsTimer;
pub use shutdown_coordinator::ShutdownCoordinator;
pub use shutdown_guard::ShutdownGuard;
pub use web_socket_connection::WebSocketConnection;

#[cfg(test)]
mod tests;
