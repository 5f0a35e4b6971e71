use async_trait::async_trait;

use crate::domain::{
    Category, Comment, NewComment, NewPost, PostQuery, PostRecord, VoteKey, VoteValue,
};
use crate::error::RepoError;

/// Post persistence.
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Find a post with its author's username.
    async fn find_by_id(&self, id: i64) -> Result<Option<PostRecord>, RepoError>;

    /// List posts matching a query, ordered by id.
    async fn list(&self, query: &PostQuery) -> Result<Vec<PostRecord>, RepoError>;

    /// Category names attached to a post.
    async fn categories_of(&self, post_id: i64) -> Result<Vec<String>, RepoError>;

    /// Create a post, creating any categories that do not exist yet.
    async fn create(&self, post: NewPost) -> Result<i64, RepoError>;

    /// Delete a post owned by `user_id`. Returns false when nothing matched.
    async fn delete(&self, post_id: i64, user_id: i64) -> Result<bool, RepoError>;
}

/// Comment persistence.
#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn create(&self, comment: NewComment) -> Result<i64, RepoError>;

    async fn list_for_post(&self, post_id: i64) -> Result<Vec<Comment>, RepoError>;

    async fn count_for_post(&self, post_id: i64) -> Result<u64, RepoError>;
}

/// Category persistence.
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn list_all(&self) -> Result<Vec<Category>, RepoError>;
}

/// Vote persistence.
///
/// Writes only happen inside a [`VoteTransaction`], so a read and the write
/// decided from it are applied as one unit. Implementations must reject a
/// second row for the same [`VoteKey`] at the storage level.
#[async_trait]
pub trait VoteStore: Send + Sync {
    /// Open a unit of work. Dropping it without [`VoteTransaction::commit`]
    /// discards every write made through it.
    async fn begin(&self) -> Result<Box<dyn VoteTransaction>, RepoError>;

    /// Read a vote outside of any transaction.
    async fn find(&self, key: VoteKey) -> Result<Option<VoteValue>, RepoError>;

    /// Count votes of one polarity on a post.
    async fn count(&self, post_id: i64, value: VoteValue) -> Result<u64, RepoError>;
}

/// One isolated read-then-write sequence against the vote table.
#[async_trait]
pub trait VoteTransaction: Send {
    async fn post_exists(&mut self, post_id: i64) -> Result<bool, RepoError>;

    /// Read the current vote, locking the slot against concurrent writers.
    async fn current(&mut self, key: VoteKey) -> Result<Option<VoteValue>, RepoError>;

    async fn insert(&mut self, key: VoteKey, value: VoteValue) -> Result<(), RepoError>;

    async fn update(&mut self, key: VoteKey, value: VoteValue) -> Result<(), RepoError>;

    async fn delete(&mut self, key: VoteKey) -> Result<(), RepoError>;

    async fn commit(self: Box<Self>) -> Result<(), RepoError>;
}
