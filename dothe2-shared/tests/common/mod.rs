//! Shared fixtures for the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Duration;
use dothe2_shared::auth::manager::TokenPolicy;
use dothe2_shared::auth::secret::SecretSource;
use dothe2_shared::clock::{ManualClock, SharedClock};
use dothe2_shared::notify::{Notification, NotificationSender, NotifyError};
use dothe2_shared::services::Services;
use dothe2_shared::store::memory::MemoryStore;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

pub const BASE_URL: &str = "http://localhost:8080";

/// Keeps every notification it is asked to send
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }

    pub fn subjects_for(&self, recipient: &str) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter(|n| n.recipient == recipient)
            .map(|n| n.subject)
            .collect()
    }
}

#[async_trait]
impl NotificationSender for RecordingNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

/// Rejects every send
#[derive(Debug, Default)]
pub struct FailingNotifier;

#[async_trait]
impl NotificationSender for FailingNotifier {
    async fn send(&self, _notification: &Notification) -> Result<(), NotifyError> {
        Err(NotifyError::Delivery("smtp server unreachable".to_string()))
    }
}

/// Deterministic secrets: numbered tokens and scripted codes
///
/// Once the scripted codes run out, codes count up from `000001`.
#[derive(Debug, Default)]
pub struct ScriptedSecrets {
    codes: Mutex<VecDeque<String>>,
    counter: AtomicU64,
}

impl ScriptedSecrets {
    pub fn with_codes(codes: &[&str]) -> Self {
        Self {
            codes: Mutex::new(codes.iter().map(|c| c.to_string()).collect()),
            counter: AtomicU64::new(0),
        }
    }
}

impl SecretSource for ScriptedSecrets {
    fn bearer_token(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        format!("token-{:039}", n)
    }

    fn code(&self) -> String {
        if let Some(code) = self.codes.lock().unwrap().pop_front() {
            return code;
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{:06}", n % 1_000_000)
    }
}

pub struct Harness {
    pub store: MemoryStore,
    pub clock: Arc<ManualClock>,
    pub notifier: Arc<RecordingNotifier>,
    pub services: Services,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_secrets(ScriptedSecrets::default())
    }

    pub fn with_secrets(secrets: ScriptedSecrets) -> Self {
        let notifier = Arc::new(RecordingNotifier::default());
        Self::build(notifier.clone(), notifier, secrets)
    }

    fn build(
        notifier: Arc<RecordingNotifier>,
        sender: Arc<dyn NotificationSender>,
        secrets: ScriptedSecrets,
    ) -> Self {
        let store = MemoryStore::new();
        let clock = Arc::new(ManualClock::starting_now());
        let shared_clock: SharedClock = clock.clone();
        let policy = TokenPolicy::new(Duration::minutes(15), BASE_URL).unwrap();

        let services = Services::new(
            Arc::new(store.clone()),
            sender,
            Arc::new(secrets),
            shared_clock,
            policy,
        );

        Self {
            store,
            clock,
            notifier,
            services,
        }
    }

    /// Harness whose notifier always fails
    pub fn with_failing_notifier() -> Self {
        let recorder = Arc::new(RecordingNotifier::default());
        Self::build(recorder, Arc::new(FailingNotifier), ScriptedSecrets::default())
    }
}
