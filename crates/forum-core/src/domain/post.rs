use serde::{Deserialize, Serialize};

use super::comment::Comment;
use super::identity::AuthenticatedUser;
use super::vote::{VoteState, VoteValue};

/// Post row as stored, joined with its author's username.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRecord {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
    pub title: String,
    pub data: String,
}

/// A post to be created.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub author: AuthenticatedUser,
    pub title: String,
    pub data: String,
    pub categories: Vec<String>,
}

impl NewPost {
    /// Create a new post draft, trimming category names and dropping blanks.
    pub fn new(
        author: AuthenticatedUser,
        title: String,
        data: String,
        categories: Vec<String>,
    ) -> Self {
        let mut categories: Vec<String> = categories
            .into_iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
        categories.sort();
        categories.dedup();

        Self {
            author,
            title,
            data,
            categories,
        }
    }
}

/// Name of the pseudo-category that matches every post.
pub const ALL_CATEGORIES: &str = "ALL";

/// Limit/offset window for list reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: u64,
    pub offset: u64,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: 20,
            offset: 0,
        }
    }
}

/// Which posts a list read selects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostQuery {
    /// Posts tagged with a category, or every post for [`ALL_CATEGORIES`].
    Category { name: String, page: Page },
    /// Posts written by a user.
    Author(i64),
    /// Posts a user liked or disliked.
    VotedBy { user_id: i64, value: VoteValue },
}

/// Read-time view of a post with derived counts.
///
/// Never stored; each count is evaluated by its own query, so the triple is
/// not guaranteed to come from one snapshot under concurrent writes.
#[derive(Debug, Clone)]
pub struct PostAggregate {
    pub post: PostRecord,
    pub likes: u64,
    pub dislikes: u64,
    pub comments_count: u64,
    pub categories: Vec<String>,
    /// Filled only for single-post reads.
    pub comments: Vec<Comment>,
    /// The requesting user's own vote, when known.
    pub viewer_vote: VoteState,
}
