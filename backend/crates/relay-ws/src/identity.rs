use crate::{Result as WsErrorResult, WsError};

use relay_auth::JwtValidator;
use relay_core::{TeamId, UserId};

use std::collections::HashMap;

pub const USER_ID_PARAM: &str = "user_id";
pub const TEAM_ID_PARAM: &str = "team_id";
pub const TOKEN_PARAM: &str = "token";

/// Who a new session belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionIdentity {
    pub user_id: UserId,
    pub team_id: Option<TeamId>,
}

/// Resolve the identity of an upgrade request.
///
/// With a validator the identity comes only from the JWT, taken from the
/// `Authorization: Bearer` header or the `token` query parameter. Without one
/// it is read from the `user_id` and `team_id` query parameters.
pub fn extract_identity(
    query: &HashMap<String, String>,
    authorization: Option<&str>,
    validator: Option<&JwtValidator>,
) -> WsErrorResult<ConnectionIdentity> {
    match validator {
        Some(validator) => from_token(query, authorization, validator),
        None => from_query(query),
    }
}

fn from_token(
    query: &HashMap<String, String>,
    authorization: Option<&str>,
    validator: &JwtValidator,
) -> WsErrorResult<ConnectionIdentity> {
    if query.contains_key(USER_ID_PARAM) || query.contains_key(TEAM_ID_PARAM) {
        return Err(WsError::unauthorized(
            "identity parameters are not accepted when authentication is enabled",
        ));
    }

    let claims = match (authorization, query.get(TOKEN_PARAM)) {
        (Some(header), _) => validator.validate_bearer(header)?,
        (None, Some(token)) => validator.validate(token)?,
        (None, None) => return Err(WsError::unauthorized("missing token")),
    };

    Ok(ConnectionIdentity {
        user_id: claims.user_id()?,
        team_id: claims.team_id(),
    })
}

fn from_query(query: &HashMap<String, String>) -> WsErrorResult<ConnectionIdentity> {
    let user_id = query
        .get(USER_ID_PARAM)
        .ok_or_else(|| WsError::invalid_message("missing user_id query parameter"))?
        .parse::<UserId>()
        .map_err(|e| WsError::invalid_message(e.to_string()))?;

    let team_id = query
        .get(TEAM_ID_PARAM)
        .filter(|value| !value.trim().is_empty())
        .map(|value| value.parse::<TeamId>())
        .transpose()
        .map_err(|e| WsError::invalid_message(e.to_string()))?;

    Ok(ConnectionIdentity { user_id, team_id })
}
