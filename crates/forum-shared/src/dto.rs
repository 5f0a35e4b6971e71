//! Data Transfer Objects - request/response types for the API.

use serde::{Deserialize, Serialize};

/// Vote submission. `vote` is 1 for a like and 0 for a dislike.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteRequest {
    /// Ignored unless it disagrees with the authenticated caller.
    #[serde(default)]
    pub user_id: Option<i64>,
    pub post_id: i64,
    pub vote: i64,
}

/// Request to create a post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePostRequest {
    pub title: String,
    pub data: String,
    #[serde(default)]
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePostResponse {
    pub post_id: i64,
}

/// Request to comment on a post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCommentRequest {
    pub post_id: i64,
    pub data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCommentResponse {
    pub comment_id: i64,
}

/// Pagination for category listings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageParams {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentResponse {
    pub comment_id: i64,
    pub post_id: i64,
    pub user_id: i64,
    pub username: String,
    pub data: String,
}

/// A post with counts computed at read time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostResponse {
    pub post_id: i64,
    pub user_id: i64,
    pub username: String,
    pub title: String,
    pub data: String,
    pub likes: u64,
    pub dislikes: u64,
    /// 0 no vote, 1 like, 2 dislike - from the caller's point of view.
    pub vote_status: u8,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub comments: Vec<CommentResponse>,
    pub comments_count: u64,
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryResponse {
    pub id: i64,
    pub name: String,
    pub description: String,
}
