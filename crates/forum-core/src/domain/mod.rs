//! Domain entities - the core business objects.

mod category;
mod comment;
mod identity;
mod post;
mod vote;

pub use category::Category;
pub use comment::{Comment, NewComment};
pub use identity::AuthenticatedUser;
pub use post::{ALL_CATEGORIES, NewPost, Page, PostAggregate, PostQuery, PostRecord};
pub use vote::{Transition, VoteKey, VoteOutcome, VoteState, VoteValue};
