//! In-memory test doubles for the external collaborator interfaces
//! (`AccessChecker`, `EventEmitter`, `QuotaStore`, `UserDirectory`) plus
//! `InvocationStore`. `DiagramStore`
//! and `WebhookSubscriptionStore` already have in-memory implementations in
//! `collabhub-storage` (re-exported here for convenience) since they are
//! durable-storage shaped rather than policy-shaped.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use collabhub_core::{AccessChecker, DiagramId, EventEmitter, Quota, QuotaStore, Role, UserId};
use collabhub_ratelimit::InvocationStore;

pub use collabhub_storage::{InMemoryDiagramStore, InMemoryWebhookSubscriptionStore};

/// An [`AccessChecker`] backed by an explicit `(user, diagram) -> role` map.
/// Callers not present in the map have no access — `AccessChecker.role`
/// returns `None`, not `Reader`, for "cannot even observe".
#[derive(Default)]
pub struct FixedAccessChecker {
    roles: Mutex<HashMap<(UserId, DiagramId), Role>>,
}

impl FixedAccessChecker {
    /// An empty checker granting no access to anyone.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant `role` to `user` for `diagram`.
    #[must_use]
    pub fn with(self, user: UserId, diagram: DiagramId, role: Role) -> Self {
        self.roles
            .lock()
            .expect("mutex poisoned")
            .insert((user, diagram), role);
        self
    }
}

#[async_trait]
impl AccessChecker for FixedAccessChecker {
    async fn role(&self, user: UserId, diagram: DiagramId) -> Option<Role> {
        self.roles
            .lock()
            .expect("mutex poisoned")
            .get(&(user, diagram))
            .copied()
    }
}

/// An [`EventEmitter`] that records every payload it receives, for
/// assertions in tests.
#[derive(Default)]
pub struct RecordingEventEmitter {
    emitted: Mutex<Vec<serde_json::Value>>,
}

impl RecordingEventEmitter {
    /// An emitter with nothing recorded yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All payloads emitted so far, in order.
    #[must_use]
    pub fn emitted(&self) -> Vec<serde_json::Value> {
        self.emitted.lock().expect("mutex poisoned").clone()
    }

    /// How many payloads have been emitted.
    #[must_use]
    pub fn count(&self) -> usize {
        self.emitted.lock().expect("mutex poisoned").len()
    }
}

#[async_trait]
impl EventEmitter for RecordingEventEmitter {
    async fn emit(&self, payload: serde_json::Value) {
        self.emitted.lock().expect("mutex poisoned").push(payload);
    }
}

/// A [`QuotaStore`] returning a fixed [`Quota`] for every caller.
pub struct FixedQuotaStore {
    quota: Quota,
}

impl FixedQuotaStore {
    /// A store returning `quota` for every user.
    #[must_use]
    pub fn new(quota: Quota) -> Self {
        Self { quota }
    }
}

impl Default for FixedQuotaStore {
    fn default() -> Self {
        Self::new(Quota::default_quota())
    }
}

#[async_trait]
impl QuotaStore for FixedQuotaStore {
    async fn get_or_default(&self, _owner: UserId) -> Quota {
        self.quota
    }
}

/// A [`collabhub_core::UserDirectory`] backed by an explicit
/// `(provider, provider_id) -> UserId` map, provisioning a fresh id for
/// unseen identities (mirroring a real directory's upsert-on-first-seen
/// behavior) rather than erroring.
#[derive(Default)]
pub struct InMemoryUserDirectory {
    users: Mutex<HashMap<(String, String), UserId>>,
}

impl InMemoryUserDirectory {
    /// An empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl collabhub_core::UserDirectory for InMemoryUserDirectory {
    async fn lookup(&self, provider: &str, provider_id: &str) -> anyhow::Result<UserId> {
        let key = (provider.to_string(), provider_id.to_string());
        let mut users = self.users.lock().expect("mutex poisoned");
        Ok(*users.entry(key).or_insert_with(UserId::new))
    }
}

/// An [`InvocationStore`] backed by an explicit set of "active" invocation
/// ids per owner, settable by tests.
#[derive(Default)]
pub struct FixedInvocationStore {
    active: Mutex<HashMap<UserId, Vec<String>>>,
}

impl FixedInvocationStore {
    /// A store with no active invocations for anyone.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the active invocation ids for `owner`.
    #[must_use]
    pub fn with_active(self, owner: UserId, ids: Vec<String>) -> Self {
        self.active.lock().expect("mutex poisoned").insert(owner, ids);
        self
    }
}

#[async_trait]
impl InvocationStore for FixedInvocationStore {
    async fn active(&self, owner: UserId) -> anyhow::Result<Vec<String>> {
        Ok(self
            .active
            .lock()
            .expect("mutex poisoned")
            .get(&owner)
            .cloned()
            .unwrap_or_default())
    }
}
