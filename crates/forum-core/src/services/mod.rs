//! Domain services built on top of the ports.

mod post_aggregator;
mod vote_engine;

#[cfg(test)]
mod fakes;

pub use post_aggregator::PostAggregator;
pub use vote_engine::{DEFAULT_MAX_ATTEMPTS, VoteEngine};
