#![allow(dead_code)]

use relay_auth::Claims;

use jsonwebtoken::{EncodingKey, Header, encode};

/// Create a valid JWT token for testing
pub fn create_test_token(user_id: i64, team_id: Option<i64>, jwt_secret: &[u8]) -> String {
    create_token_expiring_in(user_id, team_id, jwt_secret, 3600)
}

/// Create an expired JWT token (for auth rejection tests)
pub fn create_expired_token(user_id: i64, jwt_secret: &[u8]) -> String {
    create_token_expiring_in(user_id, None, jwt_secret, -3600)
}

fn create_token_expiring_in(
    user_id: i64,
    team_id: Option<i64>,
    jwt_secret: &[u8],
    expires_in_secs: i64,
) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        team_id,
        exp: now + expires_in_secs,
        iat: now,
    };

    encode(
        &Header::default(), // HS256 by default
        &claims,
        &EncodingKey::from_secret(jwt_secret),
    )
    .expect("Failed to encode JWT")
}
