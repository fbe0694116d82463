//! PostgreSQL store
//!
//! Each trait method maps to one statement or one transaction:
//!
//! - token redemption is a single conditional `UPDATE` whose subquery picks
//!   the newest live row with `FOR UPDATE SKIP LOCKED`, so two racing
//!   redeemers cannot both get the same row
//! - task insert/move take `FOR SHARE` on the quadrant row, quadrant deletion
//!   takes `FOR UPDATE`; the two serialize against each other
//! - default seeding holds a transaction-scoped advisory lock
//!
//! # Example
//!
//! ```no_run
//! use dothe2_shared::db::pool::{create_pool, DatabaseConfig};
//! use dothe2_shared::store::postgres::PgStore;
//! use dothe2_shared::store::StoreHealth;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = create_pool(DatabaseConfig::default()).await?;
//! let store = PgStore::new(pool);
//! store.ping().await?;
//! # Ok(())
//! # }
//! ```

use super::{
    AuthTokenRepository, QuadrantDeletion, QuadrantRepository, StoreError, StoreHealth,
    StoreResult, TaskRepository, UserDirectory,
};
use crate::models::auth_token::{AuthToken, NewAuthToken, RequestMetadata};
use crate::models::quadrant::{
    CustomQuadrant, DefaultQuadrantSeed, NewQuadrant, Quadrant, UpdateQuadrant,
};
use crate::models::task::{NewTask, Task, TaskFilter, UpdateTask};
use crate::models::user::{NewUser, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;

const USER_COLUMNS: &str = "id, uuid, name, username, email, profile_image_url, is_superuser, \
     created_at, updated_at, is_deleted, deleted_at";

const TOKEN_COLUMNS: &str =
    "id, user_id, token, code, created_at, expires_at, redeemed_at, ip_address, user_agent";

const QUADRANT_COLUMNS: &str = "id, name, description, color, is_default, created_at, updated_at";

const TASK_COLUMNS: &str = "id, title, description, due_date, completed, quadrant_id, \
     created_at, updated_at, is_deleted, deleted_at";

/// Advisory lock key serializing default-quadrant seeding
const SEED_LOCK_KEY: i64 = 0x646f_7468_6532;

/// `auth_tokens` row as stored; `redeemed_at` becomes [`TokenState`](crate::models::auth_token::TokenState)
#[derive(Debug, sqlx::FromRow)]
struct AuthTokenRow {
    id: i64,
    user_id: i64,
    token: String,
    code: String,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    redeemed_at: Option<DateTime<Utc>>,
    ip_address: Option<String>,
    user_agent: Option<String>,
}

impl From<AuthTokenRow> for AuthToken {
    fn from(row: AuthTokenRow) -> Self {
        let record = NewAuthToken {
            user_id: row.user_id,
            token: row.token,
            code: row.code,
            created_at: row.created_at,
            expires_at: row.expires_at,
            metadata: RequestMetadata {
                ip_address: row.ip_address,
                user_agent: row.user_agent,
            },
        };
        AuthToken::from_record(row.id, record, row.redeemed_at)
    }
}

/// Maps unique violations onto [`StoreError::Duplicate`]
fn map_unique(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            let constraint = db.constraint().unwrap_or("unique").to_string();
            return StoreError::Duplicate(constraint);
        }
    }
    StoreError::Database(err)
}

/// Store backed by a PostgreSQL pool
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn lock_quadrant_shared(
        tx: &mut Transaction<'_, Postgres>,
        quadrant_id: i64,
    ) -> StoreResult<()> {
        let found: Option<i64> =
            sqlx::query_scalar("SELECT id FROM quadrants WHERE id = $1 FOR SHARE")
                .bind(quadrant_id)
                .fetch_optional(&mut **tx)
                .await?;

        match found {
            Some(_) => Ok(()),
            None => Err(StoreError::MissingQuadrant(quadrant_id)),
        }
    }
}

#[async_trait]
impl UserDirectory for PgStore {
    async fn find_user_by_id(&self, id: i64) -> StoreResult<Option<User>> {
        let sql = format!(
            "SELECT {} FROM users WHERE id = $1 AND is_deleted = FALSE",
            USER_COLUMNS
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let sql = format!(
            "SELECT {} FROM users WHERE email = $1 AND is_deleted = FALSE",
            USER_COLUMNS
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn username_taken(&self, username: &str) -> StoreResult<bool> {
        let taken: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)")
                .bind(username)
                .fetch_one(&self.pool)
                .await?;
        Ok(taken)
    }

    async fn insert_user(&self, user: NewUser, now: DateTime<Utc>) -> StoreResult<User> {
        let sql = format!(
            r#"
            INSERT INTO users (name, username, email, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $4)
            RETURNING {}
            "#,
            USER_COLUMNS
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(&user.name)
            .bind(&user.username)
            .bind(&user.email)
            .bind(now)
            .fetch_one(&self.pool)
            .await
            .map_err(map_unique)
    }
}

#[async_trait]
impl AuthTokenRepository for PgStore {
    async fn insert_token(&self, token: NewAuthToken) -> StoreResult<AuthToken> {
        let sql = format!(
            r#"
            INSERT INTO auth_tokens
                (user_id, token, code, created_at, expires_at, ip_address, user_agent)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            TOKEN_COLUMNS
        );
        let row = sqlx::query_as::<_, AuthTokenRow>(&sql)
            .bind(token.user_id)
            .bind(&token.token)
            .bind(&token.code)
            .bind(token.created_at)
            .bind(token.expires_at)
            .bind(&token.metadata.ip_address)
            .bind(&token.metadata.user_agent)
            .fetch_one(&self.pool)
            .await
            .map_err(map_unique)?;
        Ok(row.into())
    }

    async fn live_code_exists(&self, code: &str, now: DateTime<Utc>) -> StoreResult<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM auth_tokens
                WHERE code = $1 AND redeemed_at IS NULL AND expires_at > $2
            )
            "#,
        )
        .bind(code)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn redeem_by_code(
        &self,
        email: &str,
        code: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<AuthToken>> {
        let sql = format!(
            r#"
            UPDATE auth_tokens SET redeemed_at = $3
            WHERE id = (
                SELECT t.id FROM auth_tokens t
                JOIN users u ON u.id = t.user_id
                WHERE u.email = $1
                  AND u.is_deleted = FALSE
                  AND t.code = $2
                  AND t.redeemed_at IS NULL
                  AND t.expires_at > $3
                ORDER BY t.created_at DESC, t.id DESC
                LIMIT 1
                FOR UPDATE OF t SKIP LOCKED
            )
            AND redeemed_at IS NULL
            RETURNING {}
            "#,
            TOKEN_COLUMNS
        );
        let row = sqlx::query_as::<_, AuthTokenRow>(&sql)
            .bind(email)
            .bind(code)
            .bind(now)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    async fn redeem_by_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<AuthToken>> {
        let sql = format!(
            r#"
            UPDATE auth_tokens SET redeemed_at = $2
            WHERE id = (
                SELECT t.id FROM auth_tokens t
                JOIN users u ON u.id = t.user_id
                WHERE t.token = $1
                  AND u.is_deleted = FALSE
                  AND t.redeemed_at IS NULL
                  AND t.expires_at > $2
                FOR UPDATE OF t SKIP LOCKED
            )
            AND redeemed_at IS NULL
            RETURNING {}
            "#,
            TOKEN_COLUMNS
        );
        let row = sqlx::query_as::<_, AuthTokenRow>(&sql)
            .bind(token)
            .bind(now)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM auth_tokens WHERE expires_at < $1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl QuadrantRepository for PgStore {
    async fn find_quadrant(&self, id: i64) -> StoreResult<Option<Quadrant>> {
        let sql = format!("SELECT {} FROM quadrants WHERE id = $1", QUADRANT_COLUMNS);
        let quadrant = sqlx::query_as::<_, Quadrant>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(quadrant)
    }

    async fn list_quadrants(&self, include_default: bool) -> StoreResult<Vec<Quadrant>> {
        let sql = format!(
            "SELECT {} FROM quadrants WHERE ($1 OR is_default = FALSE) ORDER BY id",
            QUADRANT_COLUMNS
        );
        let quadrants = sqlx::query_as::<_, Quadrant>(&sql)
            .bind(include_default)
            .fetch_all(&self.pool)
            .await?;
        Ok(quadrants)
    }

    async fn insert_quadrant(
        &self,
        quadrant: &NewQuadrant,
        now: DateTime<Utc>,
    ) -> StoreResult<Quadrant> {
        let sql = format!(
            r#"
            INSERT INTO quadrants (name, description, color, is_default, created_at, updated_at)
            VALUES ($1, $2, $3, FALSE, $4, $4)
            RETURNING {}
            "#,
            QUADRANT_COLUMNS
        );
        let row = sqlx::query_as::<_, Quadrant>(&sql)
            .bind(&quadrant.name)
            .bind(&quadrant.description)
            .bind(&quadrant.color)
            .bind(now)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn seed_default_quadrants(
        &self,
        defaults: &[DefaultQuadrantSeed],
        now: DateTime<Utc>,
    ) -> StoreResult<usize> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(SEED_LOCK_KEY)
            .execute(&mut *tx)
            .await?;

        let existing: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM quadrants WHERE is_default = TRUE")
                .fetch_one(&mut *tx)
                .await?;
        if existing > 0 {
            tx.commit().await?;
            debug!(existing, "Default quadrants already present");
            return Ok(0);
        }

        for seed in defaults {
            sqlx::query(
                r#"
                INSERT INTO quadrants (name, description, color, is_default, created_at, updated_at)
                VALUES ($1, $2, $3, TRUE, $4, $4)
                "#,
            )
            .bind(seed.name)
            .bind(seed.description)
            .bind(seed.color)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(defaults.len())
    }

    async fn update_custom_quadrant(
        &self,
        quadrant: &CustomQuadrant,
        update: &UpdateQuadrant,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Quadrant>> {
        let mut query = String::from("UPDATE quadrants SET updated_at = $2");
        let mut bind_count = 2;

        if update.name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", name = ${}", bind_count));
        }
        if update.description.is_some() {
            bind_count += 1;
            query.push_str(&format!(", description = ${}", bind_count));
        }
        if update.color.is_some() {
            bind_count += 1;
            query.push_str(&format!(", color = ${}", bind_count));
        }

        query.push_str(&format!(
            " WHERE id = $1 AND is_default = FALSE RETURNING {}",
            QUADRANT_COLUMNS
        ));

        let mut q = sqlx::query_as::<_, Quadrant>(&query)
            .bind(quadrant.id())
            .bind(now);
        if let Some(name) = &update.name {
            q = q.bind(name);
        }
        if let Some(description) = &update.description {
            q = q.bind(description);
        }
        if let Some(color) = &update.color {
            q = q.bind(color);
        }

        let row = q.fetch_optional(&self.pool).await?;
        Ok(row)
    }

    async fn delete_custom_quadrant(
        &self,
        quadrant: &CustomQuadrant,
    ) -> StoreResult<QuadrantDeletion> {
        let mut tx = self.pool.begin().await?;

        let locked: Option<i64> = sqlx::query_scalar(
            "SELECT id FROM quadrants WHERE id = $1 AND is_default = FALSE FOR UPDATE",
        )
        .bind(quadrant.id())
        .fetch_optional(&mut *tx)
        .await?;
        if locked.is_none() {
            tx.rollback().await?;
            return Ok(QuadrantDeletion::Missing);
        }

        let in_use: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM tasks WHERE quadrant_id = $1 AND is_deleted = FALSE",
        )
        .bind(quadrant.id())
        .fetch_one(&mut *tx)
        .await?;
        if in_use > 0 {
            tx.rollback().await?;
            return Ok(QuadrantDeletion::InUse(in_use as u64));
        }

        sqlx::query("DELETE FROM quadrants WHERE id = $1")
            .bind(quadrant.id())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(QuadrantDeletion::Deleted)
    }
}

#[async_trait]
impl TaskRepository for PgStore {
    async fn find_task(&self, id: i64) -> StoreResult<Option<Task>> {
        let sql = format!(
            "SELECT {} FROM tasks WHERE id = $1 AND is_deleted = FALSE",
            TASK_COLUMNS
        );
        let task = sqlx::query_as::<_, Task>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(task)
    }

    async fn list_tasks(&self, filter: &TaskFilter) -> StoreResult<Vec<Task>> {
        let sql = format!(
            r#"
            SELECT {} FROM tasks
            WHERE is_deleted = FALSE
              AND ($1::BIGINT IS NULL OR quadrant_id = $1)
              AND ($2::BOOLEAN IS NULL OR completed = $2)
            ORDER BY id
            "#,
            TASK_COLUMNS
        );
        let tasks = sqlx::query_as::<_, Task>(&sql)
            .bind(filter.quadrant_id)
            .bind(filter.completed)
            .fetch_all(&self.pool)
            .await?;
        Ok(tasks)
    }

    async fn insert_task(&self, task: &NewTask, now: DateTime<Utc>) -> StoreResult<Task> {
        let mut tx = self.pool.begin().await?;
        Self::lock_quadrant_shared(&mut tx, task.quadrant_id).await?;

        let sql = format!(
            r#"
            INSERT INTO tasks
                (title, description, due_date, completed, quadrant_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            RETURNING {}
            "#,
            TASK_COLUMNS
        );
        let row = sqlx::query_as::<_, Task>(&sql)
            .bind(&task.title)
            .bind(&task.description)
            .bind(task.due_date)
            .bind(task.completed)
            .bind(task.quadrant_id)
            .bind(now)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(row)
    }

    async fn update_task(
        &self,
        id: i64,
        update: &UpdateTask,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Task>> {
        let mut tx = self.pool.begin().await?;

        let live: Option<i64> = sqlx::query_scalar(
            "SELECT id FROM tasks WHERE id = $1 AND is_deleted = FALSE FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        if live.is_none() {
            tx.rollback().await?;
            return Ok(None);
        }

        if let Some(quadrant_id) = update.quadrant_id {
            Self::lock_quadrant_shared(&mut tx, quadrant_id).await?;
        }

        let mut query = String::from("UPDATE tasks SET updated_at = $2");
        let mut bind_count = 2;

        if update.title.is_some() {
            bind_count += 1;
            query.push_str(&format!(", title = ${}", bind_count));
        }
        if update.description.is_some() {
            bind_count += 1;
            query.push_str(&format!(", description = ${}", bind_count));
        }
        if update.due_date.is_some() {
            bind_count += 1;
            query.push_str(&format!(", due_date = ${}", bind_count));
        }
        if update.quadrant_id.is_some() {
            bind_count += 1;
            query.push_str(&format!(", quadrant_id = ${}", bind_count));
        }
        if update.completed.is_some() {
            bind_count += 1;
            query.push_str(&format!(", completed = ${}", bind_count));
        }

        query.push_str(&format!(" WHERE id = $1 RETURNING {}", TASK_COLUMNS));

        let mut q = sqlx::query_as::<_, Task>(&query).bind(id).bind(now);
        if let Some(title) = &update.title {
            q = q.bind(title);
        }
        if let Some(description) = &update.description {
            q = q.bind(description);
        }
        if let Some(due_date) = update.due_date {
            q = q.bind(due_date);
        }
        if let Some(quadrant_id) = update.quadrant_id {
            q = q.bind(quadrant_id);
        }
        if let Some(completed) = update.completed {
            q = q.bind(completed);
        }

        let row = q.fetch_one(&mut *tx).await?;
        tx.commit().await?;
        Ok(Some(row))
    }

    async fn soft_delete_task(&self, id: i64, now: DateTime<Utc>) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE tasks SET is_deleted = TRUE, deleted_at = $2
            WHERE id = $1 AND is_deleted = FALSE
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl StoreHealth for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
