mod common;

use common::test_client::WsTestClient;
use common::test_server::{TestServerConfig, create_test_server_with_config};

use relay_core::UserId;

use axum::http::StatusCode;

#[tokio::test]
async fn given_server_at_capacity_when_connecting_then_service_unavailable() {
    // Given
    let server = create_test_server_with_config(TestServerConfig::with_strict_limits(2));
    let _first = WsTestClient::connect(&server.server, 1, None).await;
    let _second = WsTestClient::connect(&server.server, 2, None).await;
    server.wait_for_connections(UserId(1), 1).await;
    server.wait_for_connections(UserId(2), 1).await;

    // When
    let response = server
        .server
        .get_websocket("/ws")
        .add_query_param("user_id", 3)
        .expect_failure()
        .await;

    // Then
    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn given_slot_freed_when_connecting_again_then_succeeds() {
    // Given
    let server = create_test_server_with_config(TestServerConfig::with_strict_limits(1));
    let first = WsTestClient::connect(&server.server, 1, None).await;
    server.wait_for_connections(UserId(1), 1).await;

    // When
    first.close().await;
    server.wait_for_connections(UserId(1), 0).await;
    let _second = WsTestClient::connect(&server.server, 2, None).await;

    // Then
    server.wait_for_connections(UserId(2), 1).await;
}
