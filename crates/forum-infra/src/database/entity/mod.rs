//! SeaORM entities for the forum schema.

pub mod category;
pub mod category_and_post;
pub mod comment;
pub mod post;
pub mod post_vote;
pub mod user;
