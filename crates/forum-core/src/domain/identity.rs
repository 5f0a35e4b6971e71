use serde::{Deserialize, Serialize};

/// A caller whose identity was verified at the authentication boundary.
///
/// Only the auth layer constructs this; services take it as an explicit
/// parameter instead of looking the user up from request state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub user_id: i64,
    pub username: String,
}

impl AuthenticatedUser {
    pub fn new(user_id: i64, username: impl Into<String>) -> Self {
        Self {
            user_id,
            username: username.into(),
        }
    }
}
