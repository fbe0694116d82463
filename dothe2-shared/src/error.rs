//! Core error type
//!
//! Every service operation returns [`CoreResult`]. The HTTP layer maps each
//! variant onto a status code; binaries wrap it in `anyhow` at the top.

use crate::store::StoreError;
use thiserror::Error;

/// Errors produced by the auth, quadrant and task services
#[derive(Debug, Error)]
pub enum CoreError {
    /// Entity absent or soft-deleted
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// Task references a quadrant that does not exist
    #[error("Quadrant {quadrant_id} does not exist")]
    InvalidReference { quadrant_id: i64 },

    /// Mutation of a default quadrant
    #[error("{0}")]
    Forbidden(String),

    /// Quadrant still used by visible tasks
    #[error("Cannot delete quadrant that is in use by {count} tasks")]
    Conflict { count: u64 },

    /// No live token matches the email and code
    #[error("Invalid or expired code")]
    InvalidOrExpiredCode,

    /// No live token matches the bearer token
    #[error("Invalid or expired token")]
    InvalidOrExpiredToken,

    /// Input failed a shape or length check
    #[error("{0}")]
    Validation(String),

    /// Field-level failures from a `validator` derive
    #[error("Validation failed: {0}")]
    Invalid(#[from] validator::ValidationErrors),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CoreError {
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        CoreError::NotFound { entity, id }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
