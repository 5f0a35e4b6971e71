//! # Forum Core
//!
//! The domain layer of the forum backend.
//! This crate contains pure business logic with zero infrastructure dependencies:
//! the vote toggle engine, the read-side post aggregator and the ports their
//! adapters implement.

pub mod domain;
pub mod error;
pub mod ports;
pub mod services;

pub use error::{DomainError, RepoError};
pub use services::{PostAggregator, VoteEngine};
