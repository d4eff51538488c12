//! Minimal concrete collaborators for a single-node deployment.
//!
//! Authentication, authorization policy, webhook/add-on delivery, and quota
//! bookkeeping are out of scope for the engine itself — those are the seams
//! a real deployment plugs its own systems into. This binary still has to
//! run end to end, so it wires the seams to the smallest honest default:
//! permissive access, a log-sink event emitter, an identity directory that
//! provisions on first sight, and a quota store that always returns the
//! configured default, in the same spirit as `astrid_core::identity::InMemoryIdentityStore`
//! wiring an in-memory default identity store at startup rather than
//! requiring one up front.

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::info;

use collabhub_config::RateLimitConfig;
use collabhub_core::{AccessChecker, DiagramId, EventEmitter, Quota, QuotaStore, Role, UserId};

/// Grants every caller [`Role::Writer`] on every diagram. Appropriate for a
/// trusted, single-tenant deployment; an operator serving multiple tenants
/// replaces this with a real policy lookup.
pub struct PermissiveAccessChecker;

#[async_trait]
impl AccessChecker for PermissiveAccessChecker {
    async fn role(&self, _user: UserId, _diagram: DiagramId) -> Option<Role> {
        Some(Role::Writer)
    }
}

/// Logs every emitted event at `info` level instead of delivering it
/// anywhere. Webhook/add-on delivery is out of scope for the engine; this
/// keeps the side-effect stream observable without requiring a downstream
/// system to be configured.
pub struct LoggingEventEmitter;

#[async_trait]
impl EventEmitter for LoggingEventEmitter {
    async fn emit(&self, payload: serde_json::Value) {
        info!(%payload, "engine event emitted");
    }
}

/// Resolves `(provider, provider_id)` pairs to a stable internal `UserId`,
/// provisioning a new one the first time an identity is seen. Identity
/// issuance itself is out of scope for the engine; this directory assumes
/// whatever sits in front of `collabhubd` has already authenticated the
/// caller and is only asking for the internal id that identity maps to.
pub struct EphemeralUserDirectory {
    identities: DashMap<(String, String), UserId>,
}

impl EphemeralUserDirectory {
    /// An empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self {
            identities: DashMap::new(),
        }
    }
}

impl Default for EphemeralUserDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl collabhub_core::UserDirectory for EphemeralUserDirectory {
    async fn lookup(&self, provider: &str, provider_id: &str) -> anyhow::Result<UserId> {
        let key = (provider.to_string(), provider_id.to_string());
        Ok(*self.identities.entry(key).or_insert_with(UserId::new))
    }
}

/// A [`QuotaStore`] that ignores the caller and always returns the quota
/// built from the resolved `rate_limit` config section. Stands in for a real
/// per-owner quota backing store.
pub struct StaticQuotaStore {
    quota: Quota,
}

impl From<&RateLimitConfig> for StaticQuotaStore {
    fn from(config: &RateLimitConfig) -> Self {
        Self {
            quota: Quota {
                max_concurrent: config.default_concurrent,
                max_per_hour: config.default_per_hour,
                max_per_minute: config.default_per_minute,
            },
        }
    }
}

#[async_trait]
impl QuotaStore for StaticQuotaStore {
    async fn get_or_default(&self, _owner: UserId) -> Quota {
        self.quota
    }
}
