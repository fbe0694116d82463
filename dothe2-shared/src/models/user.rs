//! User model
//!
//! Users are the identities that auth tokens are issued for. There is no
//! password: an account is created the first time an unknown email asks for a
//! login link, and every later login goes through the same token flow.
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE users (
//!     id BIGSERIAL PRIMARY KEY,
//!     uuid UUID NOT NULL UNIQUE DEFAULT gen_random_uuid(),
//!     name VARCHAR(30) NOT NULL,
//!     username VARCHAR(20) NOT NULL UNIQUE,
//!     email VARCHAR(254) NOT NULL UNIQUE,
//!     profile_image_url TEXT NOT NULL DEFAULT '',
//!     is_superuser BOOLEAN NOT NULL DEFAULT FALSE,
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     is_deleted BOOLEAN NOT NULL DEFAULT FALSE,
//!     deleted_at TIMESTAMPTZ
//! );
//! ```

use crate::soft_delete::{SoftDeletable, SoftDelete};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum display name length
pub const NAME_MAX_CHARS: usize = 30;

/// Maximum username length
pub const USERNAME_MAX_CHARS: usize = 20;

/// User account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Primary key
    pub id: i64,

    /// Stable public identifier
    pub uuid: Uuid,

    /// Display name
    pub name: String,

    /// Unique handle derived from the email local part
    pub username: String,

    /// Email address, stored lower-cased
    pub email: String,

    /// Avatar URL (empty when unset)
    pub profile_image_url: String,

    /// Administrative flag
    pub is_superuser: bool,

    /// When the account was created
    pub created_at: DateTime<Utc>,

    /// When the account was last changed
    pub updated_at: DateTime<Utc>,

    /// Soft-delete marker
    #[sqlx(flatten)]
    #[serde(skip)]
    pub deletion: SoftDelete,
}

impl SoftDeletable for User {
    fn deletion(&self) -> &SoftDelete {
        &self.deletion
    }

    fn deletion_mut(&mut self) -> &mut SoftDelete {
        &mut self.deletion
    }
}

/// Input for creating a user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    /// Normalized email
    pub email: String,

    /// Display name
    pub name: String,

    /// Unique handle
    pub username: String,
}

/// Trims and lower-cases an email address
///
/// Lookups and inserts both go through this so `Alice@Example.com` and
/// `alice@example.com` resolve to the same account.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Derives the base display name / username from an email address
///
/// Takes the local part, truncated to [`USERNAME_MAX_CHARS`] characters. An
/// empty local part falls back to `"user"`.
pub fn username_base(email: &str) -> String {
    let local = email.split('@').next().unwrap_or_default();
    let base: String = local.chars().take(USERNAME_MAX_CHARS).collect();
    if base.is_empty() {
        "user".to_string()
    } else {
        base
    }
}

/// Builds the `attempt`-th username candidate for a base
///
/// Attempt 0 is the base itself; later attempts append the counter, shortening
/// the base so the result never exceeds [`USERNAME_MAX_CHARS`].
pub fn username_candidate(base: &str, attempt: u32) -> String {
    if attempt == 0 {
        return base.chars().take(USERNAME_MAX_CHARS).collect();
    }

    let suffix = attempt.to_string();
    let keep = USERNAME_MAX_CHARS.saturating_sub(suffix.len());
    let mut candidate: String = base.chars().take(keep).collect();
    candidate.push_str(&suffix);
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Alice@Example.COM "), "alice@example.com");
    }

    #[test]
    fn test_username_base_uses_local_part() {
        assert_eq!(username_base("alice@example.com"), "alice");
        assert_eq!(
            username_base("a.very.long.local.part.indeed@example.com"),
            "a.very.long.local.pa"
        );
        assert_eq!(username_base("@example.com"), "user");
    }

    #[test]
    fn test_username_candidate_stays_within_limit() {
        assert_eq!(username_candidate("alice", 0), "alice");
        assert_eq!(username_candidate("alice", 1), "alice1");

        let base = "abcdefghijklmnopqrst";
        assert_eq!(base.len(), USERNAME_MAX_CHARS);
        assert_eq!(username_candidate(base, 1), "abcdefghijklmnopqrs1");
        assert_eq!(username_candidate(base, 12), "abcdefghijklmnopqr12");
    }
}
