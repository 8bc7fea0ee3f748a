#![allow(dead_code)]

use crate::common::jwt_helper::create_test_token;
use crate::common::test_server::TEST_JWT_SECRET;

use std::time::Duration;

use axum_test::{TestServer, TestWebSocket};

/// WebSocket test client wrapper
pub struct WsTestClient {
    ws: TestWebSocket,
    pub user_id: i64,
}

impl WsTestClient {
    /// Connect with identity query parameters (authentication disabled)
    pub async fn connect(server: &TestServer, user_id: i64, team_id: Option<i64>) -> Self {
        let mut request = server.get_websocket("/ws").add_query_param("user_id", user_id);
        if let Some(team_id) = team_id {
            request = request.add_query_param("team_id", team_id);
        }

        let ws = request.await.into_websocket().await;

        Self { ws, user_id }
    }

    /// Connect with a bearer JWT (authentication enabled)
    pub async fn connect_with_jwt(server: &TestServer, user_id: i64, team_id: Option<i64>) -> Self {
        let token = create_test_token(user_id, team_id, TEST_JWT_SECRET);

        let ws = server
            .get_websocket("/ws")
            .add_header("Authorization", format!("Bearer {token}"))
            .await
            .into_websocket()
            .await;

        Self { ws, user_id }
    }

    /// Receive text message
    pub async fn receive_text(&mut self) -> String {
        tokio::time::timeout(Duration::from_secs(2), self.ws.receive_text())
            .await
            .expect("timed out waiting for a frame")
    }

    /// Receive a text frame and parse it as JSON
    pub async fn receive_json(&mut self) -> serde_json::Value {
        serde_json::from_str(&self.receive_text().await).expect("frame is not JSON")
    }

    /// Send text message (ignored by the server)
    pub async fn send_text(&mut self, text: impl std::fmt::Display) {
        self.ws.send_text(text).await;
    }

    /// Close the WebSocket connection
    pub async fn close(self) {
        self.ws.close().await;
    }
}
