//! Persistence ports
//!
//! The services talk to storage only through the traits below. Each method is
//! one atomic primitive: anything that must check-then-write (redeeming a
//! token, filing a task under a quadrant, deleting a quadrant) happens inside
//! a single call so the implementation can make it indivisible.
//!
//! Two implementations ship with the crate:
//!
//! - [`postgres::PgStore`]: sqlx over PostgreSQL, using row locks and
//!   conditional updates
//! - [`memory::MemoryStore`]: one lock over in-process tables, for tests and
//!   local development

pub mod memory;
pub mod postgres;

use crate::models::auth_token::{AuthToken, NewAuthToken};
use crate::models::quadrant::{
    CustomQuadrant, DefaultQuadrantSeed, NewQuadrant, Quadrant, UpdateQuadrant,
};
use crate::models::task::{NewTask, Task, TaskFilter, UpdateTask};
use crate::models::user::{NewUser, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Storage failures
#[derive(Debug, Error)]
pub enum StoreError {
    /// Referenced quadrant does not exist
    #[error("quadrant {0} does not exist")]
    MissingQuadrant(i64),

    /// Unique constraint violated
    #[error("duplicate value for {0}")]
    Duplicate(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Backend cannot serve the request
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Outcome of [`QuadrantRepository::delete_custom_quadrant`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuadrantDeletion {
    Deleted,
    Missing,
    /// Number of visible tasks still filed under the quadrant
    InUse(u64),
}

/// User lookup and creation; soft-deleted users are never returned
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_user_by_id(&self, id: i64) -> StoreResult<Option<User>>;

    /// `email` must already be normalized
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Checks against every user, deleted or not
    async fn username_taken(&self, username: &str) -> StoreResult<bool>;

    /// Fails with [`StoreError::Duplicate`] on an email or username clash
    async fn insert_user(&self, user: NewUser, now: DateTime<Utc>) -> StoreResult<User>;
}

/// Auth token persistence
#[async_trait]
pub trait AuthTokenRepository: Send + Sync {
    async fn insert_token(&self, token: NewAuthToken) -> StoreResult<AuthToken>;

    /// True if an unredeemed token with `expires_at > now` carries `code`
    async fn live_code_exists(&self, code: &str, now: DateTime<Utc>) -> StoreResult<bool>;

    /// Atomically marks the newest live token of `email` with `code` redeemed
    ///
    /// Of two concurrent calls for the same token at most one gets `Some`.
    async fn redeem_by_code(
        &self,
        email: &str,
        code: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<AuthToken>>;

    /// Same as [`AuthTokenRepository::redeem_by_code`], keyed by bearer token
    async fn redeem_by_token(&self, token: &str, now: DateTime<Utc>)
        -> StoreResult<Option<AuthToken>>;

    /// Physically removes tokens with `expires_at < now`, redeemed or not
    async fn delete_expired(&self, now: DateTime<Utc>) -> StoreResult<u64>;
}

/// Quadrant persistence
#[async_trait]
pub trait QuadrantRepository: Send + Sync {
    async fn find_quadrant(&self, id: i64) -> StoreResult<Option<Quadrant>>;

    /// Ordered by id
    async fn list_quadrants(&self, include_default: bool) -> StoreResult<Vec<Quadrant>>;

    /// Always creates a custom quadrant
    async fn insert_quadrant(&self, quadrant: &NewQuadrant, now: DateTime<Utc>)
        -> StoreResult<Quadrant>;

    /// Inserts `defaults` unless any default quadrant exists; returns how many
    /// rows were created
    async fn seed_default_quadrants(
        &self,
        defaults: &[DefaultQuadrantSeed],
        now: DateTime<Utc>,
    ) -> StoreResult<usize>;

    /// `None` when the quadrant vanished since it was classified
    async fn update_custom_quadrant(
        &self,
        quadrant: &CustomQuadrant,
        update: &UpdateQuadrant,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Quadrant>>;

    /// Counts visible tasks and deletes only when there are none, atomically
    async fn delete_custom_quadrant(&self, quadrant: &CustomQuadrant)
        -> StoreResult<QuadrantDeletion>;
}

/// Task persistence
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Visible tasks only
    async fn find_task(&self, id: i64) -> StoreResult<Option<Task>>;

    /// Visible tasks matching `filter`, ordered by id
    async fn list_tasks(&self, filter: &TaskFilter) -> StoreResult<Vec<Task>>;

    /// Fails with [`StoreError::MissingQuadrant`] when the quadrant is gone at
    /// insert time
    async fn insert_task(&self, task: &NewTask, now: DateTime<Utc>) -> StoreResult<Task>;

    /// `Ok(None)` for a missing or deleted task; [`StoreError::MissingQuadrant`]
    /// when a new `quadrant_id` does not exist
    async fn update_task(
        &self,
        id: i64,
        update: &UpdateTask,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Task>>;

    /// `false` when the task is missing or already deleted
    async fn soft_delete_task(&self, id: i64, now: DateTime<Utc>) -> StoreResult<bool>;
}

/// Liveness probe
#[async_trait]
pub trait StoreHealth: Send + Sync {
    async fn ping(&self) -> StoreResult<()>;
}
