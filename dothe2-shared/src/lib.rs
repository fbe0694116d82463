//! # Dothe2 Shared Library
//!
//! Core of the Dothe2 task tracker, shared by the API server and the worker.
//!
//! ## Module Organization
//!
//! - `auth`: passwordless login tokens, session JWTs, Axum middleware
//! - `services`: quadrant registry and task store
//! - `store`: persistence ports with PostgreSQL and in-memory implementations
//! - `models`: rows and inputs
//! - `notify`: outbound notification port and message bodies
//! - `db`: connection pool and migrations
//! - `clock`: injectable time source
//! - `soft_delete`: shared soft-delete capability
//! - `error`: the core error type

pub mod auth;
pub mod clock;
pub mod db;
pub mod error;
pub mod models;
pub mod notify;
pub mod services;
pub mod soft_delete;
pub mod store;

pub use error::{CoreError, CoreResult};

/// Current version of the Dothe2 shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
