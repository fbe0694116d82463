/// API route handlers
///
/// Handlers are organized by resource:
///
/// - `health`: liveness and store connectivity
/// - `auth`: passwordless login (request, verify code, verify link, me)
/// - `quadrants`: quadrant management
/// - `tasks`: task management
pub mod auth;
pub mod health;
pub mod quadrants;
pub mod tasks;

use serde::{Deserialize, Deserializer};

/// Distinguishes an explicit `null` from an absent field
///
/// Use with `#[serde(default, deserialize_with = "deserialize_some")]` on an
/// `Option<Option<T>>`: absent → `None`, `null` → `Some(None)`.
pub(crate) fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}
