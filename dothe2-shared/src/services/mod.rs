//! Service layer
//!
//! [`Services`] bundles the three services over one store so binaries and
//! tests wire them the same way.

pub mod quadrants;
pub mod tasks;

pub use quadrants::QuadrantRegistry;
pub use tasks::TaskStore;

use crate::auth::manager::{AuthTokenManager, TokenPolicy};
use crate::auth::secret::SecretSource;
use crate::clock::SharedClock;
use crate::notify::NotificationSender;
use crate::store::{
    AuthTokenRepository, QuadrantRepository, StoreHealth, TaskRepository, UserDirectory,
};
use std::sync::Arc;

/// Every service, sharing a store, clock and notifier
#[derive(Clone)]
pub struct Services {
    pub auth: AuthTokenManager,
    pub quadrants: QuadrantRegistry,
    pub tasks: TaskStore,
    pub health: Arc<dyn StoreHealth>,
}

impl Services {
    pub fn new<S>(
        store: Arc<S>,
        notifier: Arc<dyn NotificationSender>,
        secrets: Arc<dyn SecretSource>,
        clock: SharedClock,
        policy: TokenPolicy,
    ) -> Self
    where
        S: UserDirectory
            + AuthTokenRepository
            + QuadrantRepository
            + TaskRepository
            + StoreHealth
            + 'static,
    {
        let auth = AuthTokenManager::new(
            store.clone(),
            store.clone(),
            notifier,
            secrets,
            clock.clone(),
            policy,
        );
        let quadrants = QuadrantRegistry::new(store.clone(), clock.clone());
        let tasks = TaskStore::new(store.clone(), store.clone(), clock);

        Self {
            auth,
            quadrants,
            tasks,
            health: store,
        }
    }
}
