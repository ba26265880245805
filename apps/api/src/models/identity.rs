use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The authenticated principal issued by the remote auth service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    pub id: Uuid,
    pub email: Option<String>,
}

/// Tokens plus the identity they were issued for.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    /// Unix timestamp (seconds) at which the access token stops being accepted.
    pub expires_at: Option<i64>,
    pub user: Identity,
}

impl Session {
    /// True when the access token expires within `margin_secs` of `now`.
    pub fn expires_within(&self, now: i64, margin_secs: i64) -> bool {
        match self.expires_at {
            Some(at) => at - now <= margin_secs,
            None => false,
        }
    }
}
