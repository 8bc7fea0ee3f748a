#![allow(dead_code)]

use relay_auth::JwtValidator;
use relay_core::UserId;
use relay_ws::{
    AppState, ConnectionConfig, ConnectionLimits, ConnectionRegistry, Metrics, ShutdownCoordinator,
};

use std::sync::Arc;
use std::time::Duration;

use axum::{Router, routing::get};
use axum_test::TestServer;

/// Default JWT secret for all tests (HS256 requires at least 32 bytes)
pub const TEST_JWT_SECRET: &[u8] = b"test-secret-key-for-integration-tests-min-32-bytes-long";

/// Configuration for test server instances
#[derive(Debug, Clone)]
pub struct TestServerConfig {
    pub jwt_secret: Option<Vec<u8>>,
    pub max_connections_total: usize,
}

impl Default for TestServerConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            max_connections_total: 100,
        }
    }
}

impl TestServerConfig {
    /// Identity is taken from the JWT only
    pub fn with_auth() -> Self {
        Self {
            jwt_secret: Some(TEST_JWT_SECRET.to_vec()),
            ..Default::default()
        }
    }

    /// Create config with strict connection limits (for limit tests)
    pub fn with_strict_limits(max_connections_total: usize) -> Self {
        Self {
            max_connections_total,
            ..Default::default()
        }
    }
}

/// Test server with access to AppState for testing
pub struct TestServerWithState {
    pub server: TestServer,
    pub app_state: AppState,
}

impl TestServerWithState {
    /// Wait until the registry holds `expected` connections for the user
    pub async fn wait_for_connections(&self, user_id: UserId, expected: usize) {
        let registry = &self.app_state.registry;
        for _ in 0..200 {
            if registry.user_connection_count(user_id).await == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!(
            "user {user_id} never reached {expected} connections (has {})",
            registry.user_connection_count(user_id).await
        );
    }
}

/// Create a TestServer with default configuration
pub fn create_test_server() -> TestServerWithState {
    create_test_server_with_config(TestServerConfig::default())
}

/// Create a TestServer with custom configuration
pub fn create_test_server_with_config(config: TestServerConfig) -> TestServerWithState {
    let (app, app_state) = create_app(config);
    let server = TestServer::builder()
        .http_transport()
        .build(app)
        .expect("Failed to create test server");

    TestServerWithState { server, app_state }
}

/// Build the Axum Router with AppState
fn create_app(config: TestServerConfig) -> (Router, AppState) {
    let jwt_validator: Option<Arc<JwtValidator>> = config
        .jwt_secret
        .map(|secret| Arc::new(JwtValidator::with_hs256(&secret)));

    let limits = ConnectionLimits {
        max_total: config.max_connections_total,
    };
    let registry = ConnectionRegistry::new(limits, Duration::from_millis(500));

    let app_state = AppState {
        jwt_validator,
        registry,
        metrics: Metrics::default(),
        shutdown: ShutdownCoordinator::new(),
        config: ConnectionConfig::default(),
    };

    let router = Router::new()
        .route("/ws", get(relay_ws::handler))
        .with_state(app_state.clone());

    (router, app_state)
}
