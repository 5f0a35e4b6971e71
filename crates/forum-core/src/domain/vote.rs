//! Votes and the toggle state machine.

use crate::error::DomainError;

/// A vote a user can cast on a post.
///
/// Stored and transmitted as `1` for a like and `0` for a dislike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoteValue {
    Like,
    Dislike,
}

impl VoteValue {
    pub fn code(self) -> i16 {
        match self {
            VoteValue::Like => 1,
            VoteValue::Dislike => 0,
        }
    }

    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            1 => Some(VoteValue::Like),
            0 => Some(VoteValue::Dislike),
            _ => None,
        }
    }
}

impl TryFrom<i64> for VoteValue {
    type Error = DomainError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        i16::try_from(value)
            .ok()
            .and_then(VoteValue::from_code)
            .ok_or_else(|| {
                DomainError::Validation(format!(
                    "vote must be 0 (dislike) or 1 (like), got {value}"
                ))
            })
    }
}

/// Identifies the single vote slot a user has on a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VoteKey {
    pub user_id: i64,
    pub post_id: i64,
}

impl VoteKey {
    pub fn new(user_id: i64, post_id: i64) -> Self {
        Self { user_id, post_id }
    }
}

/// The three mutually exclusive states of a `(user, post)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteState {
    NoVote,
    Liked,
    Disliked,
}

impl VoteState {
    /// Decide which write moves this state towards the requested vote.
    pub fn transition(self, requested: VoteValue) -> Transition {
        match (self, requested) {
            (VoteState::NoVote, v) => Transition::Insert(v),
            (VoteState::Liked, VoteValue::Like) | (VoteState::Disliked, VoteValue::Dislike) => {
                Transition::Delete
            }
            (VoteState::Liked, VoteValue::Dislike) | (VoteState::Disliked, VoteValue::Like) => {
                Transition::Update(requested)
            }
        }
    }

    /// Status code exposed to clients: 0 no vote, 1 like, 2 dislike.
    pub fn status_code(self) -> u8 {
        match self {
            VoteState::NoVote => 0,
            VoteState::Liked => 1,
            VoteState::Disliked => 2,
        }
    }
}

impl From<Option<VoteValue>> for VoteState {
    fn from(value: Option<VoteValue>) -> Self {
        match value {
            None => VoteState::NoVote,
            Some(VoteValue::Like) => VoteState::Liked,
            Some(VoteValue::Dislike) => VoteState::Disliked,
        }
    }
}

/// The single store write a vote submission resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Insert(VoteValue),
    Update(VoteValue),
    Delete,
}

impl Transition {
    pub fn outcome(self) -> VoteOutcome {
        match self {
            Transition::Insert(_) => VoteOutcome::Created,
            Transition::Update(_) => VoteOutcome::Updated,
            Transition::Delete => VoteOutcome::Retracted,
        }
    }

    pub fn resulting_state(self) -> VoteState {
        match self {
            Transition::Insert(v) | Transition::Update(v) => Some(v).into(),
            Transition::Delete => VoteState::NoVote,
        }
    }
}

/// What a vote submission did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    Created,
    Updated,
    Retracted,
}
