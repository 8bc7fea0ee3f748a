use crate::{AuthError, Result as AuthErrorResult};

use relay_core::{TeamId, UserId};

use std::panic::Location;
use std::str::FromStr;

use error_location::ErrorLocation;
use serde::{Deserialize, Serialize};

/// JWT claims issued by the platform for relay connections
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (numeric user id)
    pub sub: String,
    /// Team the connection joins for team broadcasts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<i64>,
    /// Expiration timestamp (Unix)
    pub exp: i64,
    /// Issued at timestamp (Unix)
    pub iat: i64,
}

impl Claims {
    /// Validate claims after JWT signature verification
    #[track_caller]
    pub fn validate(&self) -> AuthErrorResult<()> {
        self.user_id().map(|_| ())
    }

    /// User identity carried in `sub`
    #[track_caller]
    pub fn user_id(&self) -> AuthErrorResult<UserId> {
        if self.sub.is_empty() {
            return Err(AuthError::InvalidClaim {
                claim: "sub".to_string(),
                message: "sub (user_id) cannot be empty".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        UserId::from_str(&self.sub).map_err(|_| AuthError::InvalidClaim {
            claim: "sub".to_string(),
            message: format!("sub must be an integer user id, got '{}'", self.sub),
            location: ErrorLocation::from(Location::caller()),
        })
    }

    pub fn team_id(&self) -> Option<TeamId> {
        self.team_id.map(TeamId)
    }
}
