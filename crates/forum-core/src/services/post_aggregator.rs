//! Read-side aggregation of post counts.

use std::sync::Arc;

use crate::domain::{
    AuthenticatedUser, PostAggregate, PostQuery, PostRecord, VoteKey, VoteState, VoteValue,
};
use crate::error::{DomainError, RepoError};
use crate::ports::{CommentRepository, PostRepository, VoteStore};

/// Computes like, dislike and comment counts for posts at read time.
///
/// Counts are never cached. Each one is its own query against the committed
/// state, so under concurrent writes the three numbers of one aggregate may
/// be taken at slightly different instants. Use them for display only.
pub struct PostAggregator {
    posts: Arc<dyn PostRepository>,
    votes: Arc<dyn VoteStore>,
    comments: Arc<dyn CommentRepository>,
}

impl PostAggregator {
    pub fn new(
        posts: Arc<dyn PostRepository>,
        votes: Arc<dyn VoteStore>,
        comments: Arc<dyn CommentRepository>,
    ) -> Self {
        Self {
            posts,
            votes,
            comments,
        }
    }

    /// Aggregate one post.
    pub async fn aggregate(&self, post_id: i64) -> Result<PostAggregate, DomainError> {
        self.aggregate_for_viewer(post_id, None).await
    }

    /// Aggregate one post with its comments and the viewer's own vote.
    pub async fn aggregate_for_viewer(
        &self,
        post_id: i64,
        viewer: Option<&AuthenticatedUser>,
    ) -> Result<PostAggregate, DomainError> {
        let post = self
            .posts
            .find_by_id(post_id)
            .await?
            .ok_or_else(|| DomainError::post_not_found(post_id))?;

        let mut aggregate = self.summarize(post).await?;
        aggregate.comments = self.comments.list_for_post(post_id).await?;

        if let Some(viewer) = viewer {
            let vote = self
                .votes
                .find(VoteKey::new(viewer.user_id, post_id))
                .await?;
            aggregate.viewer_vote = vote.into();
        }

        Ok(aggregate)
    }

    /// Aggregate every post matching `query`. An empty result is not an error.
    pub async fn list(&self, query: &PostQuery) -> Result<Vec<PostAggregate>, DomainError> {
        let posts = self.posts.list(query).await?;

        let mut aggregates = Vec::with_capacity(posts.len());
        for post in posts {
            aggregates.push(self.summarize(post).await?);
        }

        Ok(aggregates)
    }

    async fn summarize(&self, post: PostRecord) -> Result<PostAggregate, RepoError> {
        let likes = self.votes.count(post.id, VoteValue::Like).await?;
        let dislikes = self.votes.count(post.id, VoteValue::Dislike).await?;
        let comments_count = self.comments.count_for_post(post.id).await?;
        let categories = self.posts.categories_of(post.id).await?;

        Ok(PostAggregate {
            post,
            likes,
            dislikes,
            comments_count,
            categories,
            comments: Vec::new(),
            viewer_vote: VoteState::NoVote,
        })
    }
}
