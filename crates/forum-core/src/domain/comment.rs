use serde::{Deserialize, Serialize};

use super::identity::AuthenticatedUser;

/// Comment on a post, joined with its author's username.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub user_id: i64,
    pub username: String,
    pub data: String,
}

/// A comment to be created.
#[derive(Debug, Clone)]
pub struct NewComment {
    pub author: AuthenticatedUser,
    pub post_id: i64,
    pub data: String,
}
