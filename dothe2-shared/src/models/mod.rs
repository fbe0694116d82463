/// Domain models for Dothe2
///
/// Plain data types shared by the stores, the services and the HTTP layer.
/// Persistence lives behind the traits in [`crate::store`]; the models only
/// carry rows, inputs and the invariants that can be checked without storage.
///
/// # Models
///
/// - `user`: accounts created on first login request
/// - `auth_token`: magic-link / one-time-code tokens and their state machine
/// - `quadrant`: task buckets, default vs custom
/// - `task`: tasks with soft delete

pub mod auth_token;
pub mod quadrant;
pub mod task;
pub mod user;

use validator::ValidationError;

/// Rejects strings that are empty after trimming
pub(crate) fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("must not be blank".into());
        return Err(err);
    }
    Ok(())
}
