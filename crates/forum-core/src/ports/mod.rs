//! Ports - trait definitions for external dependencies.
//! These are the "interfaces" that infrastructure must implement.

mod admission;
mod auth;
mod repository;

pub use admission::{Admission, AdmissionLimiter, RateLimitError};
pub use auth::{AuthError, TokenClaims, TokenService};
pub use repository::{
    CategoryRepository, CommentRepository, PostRepository, VoteStore, VoteTransaction,
};
