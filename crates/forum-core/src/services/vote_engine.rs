//! Vote toggle engine.

use std::sync::Arc;

use crate::domain::{AuthenticatedUser, Transition, VoteKey, VoteOutcome, VoteState, VoteValue};
use crate::error::{DomainError, RepoError};
use crate::ports::VoteStore;

/// Attempts made before a persistent write conflict is reported.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Applies the like/dislike toggle for a `(user, post)` pair.
///
/// Each call reads the current vote and issues the matching insert, update or
/// delete inside one [`VoteTransaction`](crate::ports::VoteTransaction). When
/// the store reports that a concurrent writer got there first, the whole
/// read-then-write is retried against the new state, so every call is
/// applied exactly once against the vote it actually observed.
pub struct VoteEngine {
    votes: Arc<dyn VoteStore>,
    max_attempts: u32,
}

impl VoteEngine {
    pub fn new(votes: Arc<dyn VoteStore>) -> Self {
        Self {
            votes,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Toggle `voter`'s vote on a post towards `requested`.
    ///
    /// The caller has already authenticated `voter`; no authorization is
    /// performed here.
    pub async fn apply_vote(
        &self,
        voter: &AuthenticatedUser,
        post_id: i64,
        requested: VoteValue,
    ) -> Result<VoteOutcome, DomainError> {
        let key = VoteKey::new(voter.user_id, post_id);
        let mut attempt = 1;

        loop {
            match self.try_apply(key, requested).await {
                Ok(outcome) => return Ok(outcome),
                Err(err) if err.is_retryable() && attempt < self.max_attempts => {
                    attempt += 1;
                }
                Err(RepoError::NotFound) => return Err(DomainError::post_not_found(post_id)),
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// The viewer's current vote on a post.
    pub async fn current_vote(&self, user_id: i64, post_id: i64) -> Result<VoteState, DomainError> {
        let value = self.votes.find(VoteKey::new(user_id, post_id)).await?;
        Ok(value.into())
    }

    async fn try_apply(&self, key: VoteKey, requested: VoteValue) -> Result<VoteOutcome, RepoError> {
        let mut tx = self.votes.begin().await?;

        if !tx.post_exists(key.post_id).await? {
            return Err(RepoError::NotFound);
        }

        let state = VoteState::from(tx.current(key).await?);
        let transition = state.transition(requested);

        match transition {
            Transition::Insert(value) => tx.insert(key, value).await?,
            Transition::Update(value) => tx.update(key, value).await?,
            Transition::Delete => tx.delete(key).await?,
        }

        tx.commit().await?;
        Ok(transition.outcome())
    }
}
