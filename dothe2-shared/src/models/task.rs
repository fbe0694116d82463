//! Task model
//!
//! A task belongs to exactly one quadrant. Deletion is soft: the row keeps its
//! `quadrant_id` and disappears from every default query.
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE tasks (
//!     id BIGSERIAL PRIMARY KEY,
//!     title VARCHAR(200) NOT NULL,
//!     description TEXT,
//!     due_date TIMESTAMPTZ,
//!     completed BOOLEAN NOT NULL DEFAULT FALSE,
//!     quadrant_id BIGINT NOT NULL,
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     is_deleted BOOLEAN NOT NULL DEFAULT FALSE,
//!     deleted_at TIMESTAMPTZ
//! );
//! ```

use crate::soft_delete::{SoftDeletable, SoftDelete};
use chrono::{DateTime, Utc};
use super::not_blank;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Maximum task title length
pub const TITLE_MAX_CHARS: usize = 200;

/// Task row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    /// Primary key
    pub id: i64,

    /// Short summary
    pub title: String,

    /// Longer notes
    pub description: Option<String>,

    /// Optional deadline
    pub due_date: Option<DateTime<Utc>>,

    /// Completion flag
    pub completed: bool,

    /// Owning quadrant
    pub quadrant_id: i64,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,

    /// Soft-delete marker
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub deletion: SoftDelete,
}

impl SoftDeletable for Task {
    fn deletion(&self) -> &SoftDelete {
        &self.deletion
    }

    fn deletion_mut(&mut self) -> &mut SoftDelete {
        &mut self.deletion
    }
}

/// Input for creating a task
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct NewTask {
    #[validate(
        length(min = 1, max = 200, message = "Title must be 1-200 characters"),
        custom(function = "not_blank")
    )]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    pub quadrant_id: i64,
    #[serde(default)]
    pub completed: bool,
}

/// Partial task update
///
/// Outer `None` leaves a field unchanged; `Some(None)` clears a nullable one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Validate)]
pub struct UpdateTask {
    #[validate(
        length(min = 1, max = 200, message = "Title must be 1-200 characters"),
        custom(function = "not_blank")
    )]
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub quadrant_id: Option<i64>,
    pub completed: Option<bool>,
}

impl UpdateTask {
    /// Update that only moves the task
    pub fn move_to(quadrant_id: i64) -> Self {
        Self {
            quadrant_id: Some(quadrant_id),
            ..Default::default()
        }
    }

    /// Update that only sets the completion flag
    pub fn completion(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..Default::default()
        }
    }

    /// Applies the present fields to an in-memory row
    pub fn apply_to(&self, task: &mut Task, now: DateTime<Utc>) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(description) = &self.description {
            task.description = description.clone();
        }
        if let Some(due_date) = self.due_date {
            task.due_date = due_date;
        }
        if let Some(quadrant_id) = self.quadrant_id {
            task.quadrant_id = quadrant_id;
        }
        if let Some(completed) = self.completed {
            task.completed = completed;
        }
        task.updated_at = now;
    }
}

/// Listing filter; absent fields do not constrain
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFilter {
    pub quadrant_id: Option<i64>,
    pub completed: Option<bool>,
}

impl TaskFilter {
    /// True when a visible task passes the filter
    pub fn matches(&self, task: &Task) -> bool {
        task.is_visible()
            && self.quadrant_id.map_or(true, |id| task.quadrant_id == id)
            && self.completed.map_or(true, |c| task.completed == c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task() -> Task {
        let now = Utc::now();
        Task {
            id: 1,
            title: "Write report".to_string(),
            description: Some("Q3 numbers".to_string()),
            due_date: None,
            completed: false,
            quadrant_id: 2,
            created_at: now,
            updated_at: now,
            deletion: SoftDelete::active(),
        }
    }

    #[test]
    fn test_title_validation() {
        let mut new = NewTask {
            title: "Write report".to_string(),
            quadrant_id: 1,
            ..Default::default()
        };
        assert!(new.validate().is_ok());

        new.title = String::new();
        assert!(new.validate().is_err());

        new.title = " \t ".to_string();
        assert!(new.validate().is_err());

        new.title = "x".repeat(TITLE_MAX_CHARS + 1);
        let errors = new.validate().unwrap_err();
        assert_eq!(errors.field_errors()["title"][0].code, "length");

        new.title = "x".repeat(TITLE_MAX_CHARS);
        assert!(new.validate().is_ok());
    }

    #[test]
    fn test_update_title_validated_only_when_present() {
        assert!(UpdateTask::move_to(3).validate().is_ok());

        let blank = UpdateTask {
            title: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(blank.validate().is_err());
    }

    #[test]
    fn test_partial_update_leaves_other_fields() {
        let mut row = task();
        let later = row.updated_at + chrono::Duration::seconds(5);

        UpdateTask {
            title: Some("Write final report".to_string()),
            description: Some(None),
            ..Default::default()
        }
        .apply_to(&mut row, later);

        assert_eq!(row.title, "Write final report");
        assert_eq!(row.description, None);
        assert_eq!(row.quadrant_id, 2);
        assert!(!row.completed);
        assert_eq!(row.updated_at, later);
    }

    #[test]
    fn test_filter_excludes_deleted_and_mismatches() {
        let mut row = task();
        let all = TaskFilter::default();
        assert!(all.matches(&row));

        let other_quadrant = TaskFilter {
            quadrant_id: Some(9),
            completed: None,
        };
        assert!(!other_quadrant.matches(&row));

        let done = TaskFilter {
            quadrant_id: None,
            completed: Some(true),
        };
        assert!(!done.matches(&row));

        row.soft_delete(Utc::now());
        assert!(!all.matches(&row));
    }
}
