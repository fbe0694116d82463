//! Soft-delete capability shared by tasks and users
//!
//! A soft-deleted record stays in storage with `is_deleted = TRUE` and a
//! deletion timestamp, and disappears from every default query. Entities embed
//! a [`SoftDelete`] value (flattened into their row) and implement
//! [`SoftDeletable`] to get the predicates and the transition for free.
//!
//! # Schema
//!
//! ```sql
//! is_deleted BOOLEAN NOT NULL DEFAULT FALSE,
//! deleted_at TIMESTAMPTZ
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Deletion marker embedded in soft-deletable rows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SoftDelete {
    /// Whether the record is logically absent
    pub is_deleted: bool,

    /// When the record was soft-deleted
    pub deleted_at: Option<DateTime<Utc>>,
}

impl SoftDelete {
    /// Marker for a live record
    pub fn active() -> Self {
        Self::default()
    }

    /// Marker for a record deleted at `at`
    pub fn deleted(at: DateTime<Utc>) -> Self {
        Self {
            is_deleted: true,
            deleted_at: Some(at),
        }
    }
}

/// Entities that are deleted by flagging rather than removal
pub trait SoftDeletable {
    /// Read access to the embedded marker
    fn deletion(&self) -> &SoftDelete;

    /// Write access to the embedded marker
    fn deletion_mut(&mut self) -> &mut SoftDelete;

    /// True once the record has been soft-deleted
    fn is_deleted(&self) -> bool {
        self.deletion().is_deleted
    }

    /// True while the record should appear in default queries
    fn is_visible(&self) -> bool {
        !self.is_deleted()
    }

    /// When the record was soft-deleted, if it was
    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deletion().deleted_at
    }

    /// Flags the record as deleted
    ///
    /// Returns `false` (and leaves the original timestamp) when the record was
    /// already deleted.
    fn soft_delete(&mut self, at: DateTime<Utc>) -> bool {
        if self.is_deleted() {
            return false;
        }
        *self.deletion_mut() = SoftDelete::deleted(at);
        true
    }
}
