//! Middleware modules.

pub mod admission;
pub mod auth;
pub mod error;
