//! In-process store
//!
//! All tables sit behind one [`RwLock`], and every compound primitive runs
//! under a single write guard, which gives the same atomicity the PostgreSQL
//! store gets from row locks. Data lives as long as the store.

use super::{
    AuthTokenRepository, QuadrantDeletion, QuadrantRepository, StoreError, StoreHealth,
    StoreResult, TaskRepository, UserDirectory,
};
use crate::models::auth_token::{AuthToken, NewAuthToken};
use crate::models::quadrant::{
    CustomQuadrant, DefaultQuadrantSeed, NewQuadrant, Quadrant, UpdateQuadrant,
};
use crate::models::task::{NewTask, Task, TaskFilter, UpdateTask};
use crate::models::user::{NewUser, User};
use crate::soft_delete::{SoftDeletable, SoftDelete};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    tokens: BTreeMap<i64, AuthToken>,
    quadrants: BTreeMap<i64, Quadrant>,
    tasks: BTreeMap<i64, Task>,
    next_user_id: i64,
    next_token_id: i64,
    next_quadrant_id: i64,
    next_task_id: i64,
}

fn next_id(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

impl Tables {
    fn visible_user(&self, id: i64) -> Option<&User> {
        self.users.get(&id).filter(|u| u.is_visible())
    }

    fn visible_user_by_email(&self, email: &str) -> Option<&User> {
        self.users
            .values()
            .find(|u| u.is_visible() && u.email == email)
    }

    /// Newest live token matching `pred`, redeemed in place
    fn redeem_newest<F>(&mut self, now: DateTime<Utc>, pred: F) -> Option<AuthToken>
    where
        F: Fn(&AuthToken) -> bool,
    {
        let id = self
            .tokens
            .values()
            .filter(|t| t.is_redeemable(now) && pred(t))
            .filter(|t| self.visible_user(t.user_id).is_some())
            .max_by_key(|t| (t.created_at, t.id))
            .map(|t| t.id)?;

        let token = self.tokens.get_mut(&id)?;
        token.redeem(now).ok()?;
        Some(token.clone())
    }

    fn live_tasks_in(&self, quadrant_id: i64) -> u64 {
        self.tasks
            .values()
            .filter(|t| t.is_visible() && t.quadrant_id == quadrant_id)
            .count() as u64
    }
}

/// Store keeping every table in memory
///
/// Cloning shares the same tables.
///
/// # Example
///
/// ```
/// use dothe2_shared::store::memory::MemoryStore;
///
/// let store = MemoryStore::new();
/// assert_eq!(store.token_count(), 0);
/// ```
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {e}")))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {e}")))
    }

    /// Number of stored tokens, expired ones included
    ///
    /// Returns `0` if the lock is poisoned.
    pub fn token_count(&self) -> usize {
        self.tables.read().map(|t| t.tokens.len()).unwrap_or(0)
    }

    /// Every stored token, for inspection in tests
    pub fn tokens(&self) -> Vec<AuthToken> {
        self.tables
            .read()
            .map(|t| t.tokens.values().cloned().collect())
            .unwrap_or_default()
    }

    /// A task row regardless of its deletion state
    pub fn raw_task(&self, id: i64) -> Option<Task> {
        self.tables.read().ok()?.tasks.get(&id).cloned()
    }

    /// Soft-deletes a user directly; there is no service operation for it
    pub fn soft_delete_user(&self, id: i64, at: DateTime<Utc>) -> bool {
        match self.tables.write() {
            Ok(mut tables) => tables
                .users
                .get_mut(&id)
                .map_or(false, |user| user.soft_delete(at)),
            Err(_) => false,
        }
    }
}

#[async_trait]
impl UserDirectory for MemoryStore {
    async fn find_user_by_id(&self, id: i64) -> StoreResult<Option<User>> {
        Ok(self.read()?.visible_user(id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.read()?.visible_user_by_email(email).cloned())
    }

    async fn username_taken(&self, username: &str) -> StoreResult<bool> {
        Ok(self.read()?.users.values().any(|u| u.username == username))
    }

    async fn insert_user(&self, user: NewUser, now: DateTime<Utc>) -> StoreResult<User> {
        let mut tables = self.write()?;

        if tables.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate("users.email".to_string()));
        }
        if tables.users.values().any(|u| u.username == user.username) {
            return Err(StoreError::Duplicate("users.username".to_string()));
        }

        let id = next_id(&mut tables.next_user_id);
        let row = User {
            id,
            uuid: Uuid::new_v4(),
            name: user.name,
            username: user.username,
            email: user.email,
            profile_image_url: String::new(),
            is_superuser: false,
            created_at: now,
            updated_at: now,
            deletion: SoftDelete::active(),
        };
        tables.users.insert(id, row.clone());
        Ok(row)
    }
}

#[async_trait]
impl AuthTokenRepository for MemoryStore {
    async fn insert_token(&self, token: NewAuthToken) -> StoreResult<AuthToken> {
        let mut tables = self.write()?;

        if tables.tokens.values().any(|t| t.token == token.token) {
            return Err(StoreError::Duplicate("auth_tokens.token".to_string()));
        }

        let id = next_id(&mut tables.next_token_id);
        let row = AuthToken::from_record(id, token, None);
        tables.tokens.insert(id, row.clone());
        Ok(row)
    }

    async fn live_code_exists(&self, code: &str, now: DateTime<Utc>) -> StoreResult<bool> {
        Ok(self
            .read()?
            .tokens
            .values()
            .any(|t| t.code == code && t.is_redeemable(now)))
    }

    async fn redeem_by_code(
        &self,
        email: &str,
        code: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<AuthToken>> {
        let mut tables = self.write()?;
        let user_id = match tables.visible_user_by_email(email) {
            Some(user) => user.id,
            None => return Ok(None),
        };
        Ok(tables.redeem_newest(now, |t| t.user_id == user_id && t.code == code))
    }

    async fn redeem_by_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<AuthToken>> {
        let mut tables = self.write()?;
        Ok(tables.redeem_newest(now, |t| t.token == token))
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let mut tables = self.write()?;
        let before = tables.tokens.len();
        tables.tokens.retain(|_, t| t.expires_at >= now);
        Ok((before - tables.tokens.len()) as u64)
    }
}

#[async_trait]
impl QuadrantRepository for MemoryStore {
    async fn find_quadrant(&self, id: i64) -> StoreResult<Option<Quadrant>> {
        Ok(self.read()?.quadrants.get(&id).cloned())
    }

    async fn list_quadrants(&self, include_default: bool) -> StoreResult<Vec<Quadrant>> {
        Ok(self
            .read()?
            .quadrants
            .values()
            .filter(|q| include_default || !q.is_default)
            .cloned()
            .collect())
    }

    async fn insert_quadrant(
        &self,
        quadrant: &NewQuadrant,
        now: DateTime<Utc>,
    ) -> StoreResult<Quadrant> {
        let mut tables = self.write()?;
        let id = next_id(&mut tables.next_quadrant_id);
        let row = Quadrant {
            id,
            name: quadrant.name.clone(),
            description: quadrant.description.clone(),
            color: quadrant.color.clone(),
            is_default: false,
            created_at: now,
            updated_at: now,
        };
        tables.quadrants.insert(id, row.clone());
        Ok(row)
    }

    async fn seed_default_quadrants(
        &self,
        defaults: &[DefaultQuadrantSeed],
        now: DateTime<Utc>,
    ) -> StoreResult<usize> {
        let mut tables = self.write()?;
        if tables.quadrants.values().any(|q| q.is_default) {
            return Ok(0);
        }

        for seed in defaults {
            let id = next_id(&mut tables.next_quadrant_id);
            tables.quadrants.insert(
                id,
                Quadrant {
                    id,
                    name: seed.name.to_string(),
                    description: Some(seed.description.to_string()),
                    color: Some(seed.color.to_string()),
                    is_default: true,
                    created_at: now,
                    updated_at: now,
                },
            );
        }
        Ok(defaults.len())
    }

    async fn update_custom_quadrant(
        &self,
        quadrant: &CustomQuadrant,
        update: &UpdateQuadrant,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Quadrant>> {
        let mut tables = self.write()?;
        match tables.quadrants.get_mut(&quadrant.id()) {
            Some(row) if !row.is_default => {
                update.apply_to(row, now);
                Ok(Some(row.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn delete_custom_quadrant(
        &self,
        quadrant: &CustomQuadrant,
    ) -> StoreResult<QuadrantDeletion> {
        let mut tables = self.write()?;
        let id = quadrant.id();

        match tables.quadrants.get(&id) {
            Some(row) if !row.is_default => {}
            _ => return Ok(QuadrantDeletion::Missing),
        }

        let in_use = tables.live_tasks_in(id);
        if in_use > 0 {
            return Ok(QuadrantDeletion::InUse(in_use));
        }

        tables.quadrants.remove(&id);
        Ok(QuadrantDeletion::Deleted)
    }
}

#[async_trait]
impl TaskRepository for MemoryStore {
    async fn find_task(&self, id: i64) -> StoreResult<Option<Task>> {
        Ok(self
            .read()?
            .tasks
            .get(&id)
            .filter(|t| t.is_visible())
            .cloned())
    }

    async fn list_tasks(&self, filter: &TaskFilter) -> StoreResult<Vec<Task>> {
        Ok(self
            .read()?
            .tasks
            .values()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect())
    }

    async fn insert_task(&self, task: &NewTask, now: DateTime<Utc>) -> StoreResult<Task> {
        let mut tables = self.write()?;
        if !tables.quadrants.contains_key(&task.quadrant_id) {
            return Err(StoreError::MissingQuadrant(task.quadrant_id));
        }

        let id = next_id(&mut tables.next_task_id);
        let row = Task {
            id,
            title: task.title.clone(),
            description: task.description.clone(),
            due_date: task.due_date,
            completed: task.completed,
            quadrant_id: task.quadrant_id,
            created_at: now,
            updated_at: now,
            deletion: SoftDelete::active(),
        };
        tables.tasks.insert(id, row.clone());
        Ok(row)
    }

    async fn update_task(
        &self,
        id: i64,
        update: &UpdateTask,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Task>> {
        let mut tables = self.write()?;

        if !tables.tasks.get(&id).map_or(false, |t| t.is_visible()) {
            return Ok(None);
        }
        if let Some(quadrant_id) = update.quadrant_id {
            if !tables.quadrants.contains_key(&quadrant_id) {
                return Err(StoreError::MissingQuadrant(quadrant_id));
            }
        }

        let row = match tables.tasks.get_mut(&id) {
            Some(row) => row,
            None => return Ok(None),
        };
        update.apply_to(row, now);
        Ok(Some(row.clone()))
    }

    async fn soft_delete_task(&self, id: i64, now: DateTime<Utc>) -> StoreResult<bool> {
        let mut tables = self.write()?;
        Ok(tables
            .tasks
            .get_mut(&id)
            .map_or(false, |task| task.soft_delete(now)))
    }
}

#[async_trait]
impl StoreHealth for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        self.read().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::auth_token::RequestMetadata;
    use crate::models::quadrant::{ClassifiedQuadrant, DEFAULT_QUADRANTS};
    use chrono::Duration;

    async fn user(store: &MemoryStore, email: &str) -> User {
        store
            .insert_user(
                NewUser {
                    email: email.to_string(),
                    name: "alice".to_string(),
                    username: email.split('@').next().unwrap().to_string(),
                },
                Utc::now(),
            )
            .await
            .unwrap()
    }

    fn new_token(user_id: i64, token: &str, code: &str, now: DateTime<Utc>) -> NewAuthToken {
        NewAuthToken {
            user_id,
            token: token.to_string(),
            code: code.to_string(),
            created_at: now,
            expires_at: now + Duration::minutes(15),
            metadata: RequestMetadata::default(),
        }
    }

    fn custom(q: Quadrant) -> CustomQuadrant {
        match q.classify() {
            ClassifiedQuadrant::Custom(c) => c,
            ClassifiedQuadrant::Default(_) => panic!("expected custom quadrant"),
        }
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let store = MemoryStore::new();
        user(&store, "alice@example.com").await;

        let err = store
            .insert_user(
                NewUser {
                    email: "alice@example.com".to_string(),
                    name: "alice".to_string(),
                    username: "alice2".to_string(),
                },
                Utc::now(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
    }

    #[tokio::test]
    async fn test_redeem_by_token_once() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice@example.com").await;
        let now = Utc::now();
        store
            .insert_token(new_token(alice.id, "tok", "123456", now))
            .await
            .unwrap();

        assert!(store.redeem_by_token("tok", now).await.unwrap().is_some());
        assert!(store.redeem_by_token("tok", now).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_redeem_by_code_picks_newest() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice@example.com").await;
        let now = Utc::now();
        store
            .insert_token(new_token(alice.id, "old", "111111", now))
            .await
            .unwrap();
        store
            .insert_token(new_token(alice.id, "new", "111111", now + Duration::seconds(1)))
            .await
            .unwrap();

        let redeemed = store
            .redeem_by_code("alice@example.com", "111111", now + Duration::seconds(2))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(redeemed.token, "new");
    }

    #[tokio::test]
    async fn test_delete_expired_keeps_boundary() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice@example.com").await;
        let now = Utc::now();
        store
            .insert_token(new_token(alice.id, "a", "111111", now))
            .await
            .unwrap();

        let expiry = now + Duration::minutes(15);
        assert_eq!(store.delete_expired(expiry).await.unwrap(), 0);
        assert_eq!(
            store
                .delete_expired(expiry + Duration::seconds(1))
                .await
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let store = MemoryStore::new();
        let now = Utc::now();
        assert_eq!(
            store
                .seed_default_quadrants(&DEFAULT_QUADRANTS, now)
                .await
                .unwrap(),
            4
        );
        assert_eq!(
            store
                .seed_default_quadrants(&DEFAULT_QUADRANTS, now)
                .await
                .unwrap(),
            0
        );
        assert_eq!(store.list_quadrants(true).await.unwrap().len(), 4);
        assert!(store.list_quadrants(false).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_quadrant_counts_only_visible_tasks() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let quadrant = store
            .insert_quadrant(
                &NewQuadrant {
                    name: "Deep Work".to_string(),
                    ..Default::default()
                },
                now,
            )
            .await
            .unwrap();
        let task = store
            .insert_task(
                &NewTask {
                    title: "Write".to_string(),
                    quadrant_id: quadrant.id,
                    ..Default::default()
                },
                now,
            )
            .await
            .unwrap();
        let quadrant = custom(quadrant);

        assert_eq!(
            store.delete_custom_quadrant(&quadrant).await.unwrap(),
            QuadrantDeletion::InUse(1)
        );

        assert!(store.soft_delete_task(task.id, now).await.unwrap());
        assert_eq!(
            store.delete_custom_quadrant(&quadrant).await.unwrap(),
            QuadrantDeletion::Deleted
        );
        assert_eq!(
            store.raw_task(task.id).unwrap().quadrant_id,
            quadrant.id()
        );
    }

    #[tokio::test]
    async fn test_insert_task_requires_quadrant() {
        let store = MemoryStore::new();
        let err = store
            .insert_task(
                &NewTask {
                    title: "Orphan".to_string(),
                    quadrant_id: 42,
                    ..Default::default()
                },
                Utc::now(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::MissingQuadrant(42)));
    }
}
