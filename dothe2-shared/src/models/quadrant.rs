//! Quadrant model
//!
//! Quadrants are the buckets tasks are filed under. Four of them are seeded at
//! bootstrap (the Eisenhower matrix) and are immutable; everything else is
//! user-created and can be edited or removed as long as no visible task still
//! points at it.
//!
//! A loaded row is split into [`DefaultQuadrant`] or [`CustomQuadrant`] by
//! [`Quadrant::classify`]. The store's mutation primitives only accept a
//! `CustomQuadrant`, and the only way to obtain one is through
//! classification, so a default quadrant cannot reach an update or delete.
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE quadrants (
//!     id BIGSERIAL PRIMARY KEY,
//!     name VARCHAR(100) NOT NULL,
//!     description TEXT,
//!     color VARCHAR(7),
//!     is_default BOOLEAN NOT NULL DEFAULT FALSE,
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
//! );
//! ```

use chrono::{DateTime, Utc};
use super::not_blank;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Maximum quadrant name length
pub const NAME_MAX_CHARS: usize = 100;

/// Quadrant row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Quadrant {
    /// Primary key
    pub id: i64,

    /// Display name
    pub name: String,

    /// Free-form description
    pub description: Option<String>,

    /// Hex color, stored as given
    pub color: Option<String>,

    /// Seeded default bucket
    pub is_default: bool,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
}

impl Quadrant {
    /// Splits the row into its default or custom variant
    pub fn classify(self) -> ClassifiedQuadrant {
        if self.is_default {
            ClassifiedQuadrant::Default(DefaultQuadrant(self))
        } else {
            ClassifiedQuadrant::Custom(CustomQuadrant(self))
        }
    }
}

/// Result of [`Quadrant::classify`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassifiedQuadrant {
    Default(DefaultQuadrant),
    Custom(CustomQuadrant),
}

/// A seeded quadrant; read-only
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultQuadrant(Quadrant);

impl DefaultQuadrant {
    pub fn id(&self) -> i64 {
        self.0.id
    }

    pub fn quadrant(&self) -> &Quadrant {
        &self.0
    }

    pub fn into_inner(self) -> Quadrant {
        self.0
    }
}

/// A user-created quadrant; the only kind the store will mutate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomQuadrant(Quadrant);

impl CustomQuadrant {
    pub fn id(&self) -> i64 {
        self.0.id
    }

    pub fn quadrant(&self) -> &Quadrant {
        &self.0
    }

    pub fn into_inner(self) -> Quadrant {
        self.0
    }
}

/// Fixed attributes of one seeded quadrant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultQuadrantSeed {
    pub name: &'static str,
    pub description: &'static str,
    pub color: &'static str,
}

/// The four seeded quadrants, in seeding order
pub const DEFAULT_QUADRANTS: [DefaultQuadrantSeed; 4] = [
    DefaultQuadrantSeed {
        name: "Urgent & Important",
        description: "Crisis tasks that need immediate attention",
        color: "#ff4d4d",
    },
    DefaultQuadrantSeed {
        name: "Important, Not Urgent",
        description: "Strategic planning and long-term goals",
        color: "#4da6ff",
    },
    DefaultQuadrantSeed {
        name: "Urgent, Not Important",
        description: "Interruptions and distractions",
        color: "#ffcc00",
    },
    DefaultQuadrantSeed {
        name: "Not Urgent, Not Important",
        description: "Time wasters",
        color: "#b3b3b3",
    },
];

/// Input for creating a custom quadrant
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct NewQuadrant {
    #[validate(
        length(min = 1, max = 100, message = "Name must be 1-100 characters"),
        custom(function = "not_blank")
    )]
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    #[validate(custom(function = "hex_color"))]
    pub color: Option<String>,
}

/// Partial update of a custom quadrant
///
/// The outer `Option` means "leave unchanged"; for nullable columns the inner
/// `None` clears the value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Validate)]
pub struct UpdateQuadrant {
    #[validate(
        length(min = 1, max = 100, message = "Name must be 1-100 characters"),
        custom(function = "not_blank")
    )]
    pub name: Option<String>,

    pub description: Option<Option<String>>,

    #[validate(custom(function = "hex_color"))]
    pub color: Option<Option<String>>,
}

impl UpdateQuadrant {
    /// True when no field would change
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.color.is_none()
    }

    /// Applies the present fields to an in-memory row
    pub fn apply_to(&self, quadrant: &mut Quadrant, now: DateTime<Utc>) {
        if let Some(name) = &self.name {
            quadrant.name = name.clone();
        }
        if let Some(description) = &self.description {
            quadrant.description = description.clone();
        }
        if let Some(color) = &self.color {
            quadrant.color = color.clone();
        }
        quadrant.updated_at = now;
    }
}

/// Accepts `#rgb` and `#rrggbb`
pub fn is_hex_color(value: &str) -> bool {
    match value.strip_prefix('#') {
        Some(hex) => {
            (hex.len() == 3 || hex.len() == 6) && hex.chars().all(|c| c.is_ascii_hexdigit())
        }
        None => false,
    }
}

fn hex_color(value: &str) -> Result<(), ValidationError> {
    if is_hex_color(value) {
        return Ok(());
    }
    let mut err = ValidationError::new("hex_color");
    err.message = Some("Color must be #rgb or #rrggbb".into());
    Err(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quadrant(is_default: bool) -> Quadrant {
        let now = Utc::now();
        Quadrant {
            id: 3,
            name: "Deep Work".to_string(),
            description: None,
            color: Some("#123456".to_string()),
            is_default,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_classify() {
        assert!(matches!(
            quadrant(true).classify(),
            ClassifiedQuadrant::Default(q) if q.id() == 3
        ));
        assert!(matches!(
            quadrant(false).classify(),
            ClassifiedQuadrant::Custom(q) if q.id() == 3
        ));
    }

    #[test]
    fn test_hex_color() {
        assert!(is_hex_color("#fff"));
        assert!(is_hex_color("#4DA6FF"));
        assert!(!is_hex_color("4da6ff"));
        assert!(!is_hex_color("#4da6f"));
        assert!(!is_hex_color("#ggg"));
    }

    #[test]
    fn test_new_quadrant_validation() {
        let ok = NewQuadrant {
            name: "Deep Work".to_string(),
            description: None,
            color: Some("#abc".to_string()),
        };
        assert!(ok.validate().is_ok());

        let blank = NewQuadrant {
            name: "   ".to_string(),
            ..ok.clone()
        };
        assert!(blank.validate().unwrap_err().field_errors().contains_key("name"));

        let long = NewQuadrant {
            name: "é".repeat(NAME_MAX_CHARS + 1),
            ..ok.clone()
        };
        assert!(long.validate().is_err());

        let at_limit = NewQuadrant {
            name: "é".repeat(NAME_MAX_CHARS),
            ..ok.clone()
        };
        assert!(at_limit.validate().is_ok());

        let bad_color = NewQuadrant {
            color: Some("red".to_string()),
            ..ok
        };
        let errors = bad_color.validate().unwrap_err();
        assert_eq!(errors.field_errors()["color"][0].code, "hex_color");
    }

    #[test]
    fn test_update_validation_checks_present_fields_only() {
        assert!(UpdateQuadrant::default().validate().is_ok());

        let clear_color = UpdateQuadrant {
            color: Some(None),
            ..Default::default()
        };
        assert!(clear_color.validate().is_ok());

        let bad_color = UpdateQuadrant {
            color: Some(Some("#12345".to_string())),
            ..Default::default()
        };
        assert!(bad_color.validate().is_err());

        let empty_name = UpdateQuadrant {
            name: Some(String::new()),
            ..Default::default()
        };
        assert!(empty_name.validate().is_err());
    }

    #[test]
    fn test_update_applies_only_present_fields() {
        let mut row = quadrant(false);
        let later = row.updated_at + chrono::Duration::minutes(1);
        let update = UpdateQuadrant {
            description: Some(Some("Focus blocks".to_string())),
            color: Some(None),
            ..Default::default()
        };

        update.apply_to(&mut row, later);

        assert_eq!(row.name, "Deep Work");
        assert_eq!(row.description.as_deref(), Some("Focus blocks"));
        assert_eq!(row.color, None);
        assert_eq!(row.updated_at, later);
    }

    #[test]
    fn test_defaults_are_well_formed() {
        for seed in DEFAULT_QUADRANTS {
            assert!(is_hex_color(seed.color));
            assert!(seed.name.len() <= NAME_MAX_CHARS);
        }
    }
}
