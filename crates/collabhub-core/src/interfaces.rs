//! External collaborator interfaces.
//!
//! These traits are the seams between the realtime collaboration engine and
//! everything declared out of scope for this engine: the REST CRUD surface,
//! authentication, authorization policy, and webhook/add-on plumbing. The
//! engine only ever depends on these traits; concrete implementations (a
//! real database, a real identity provider) live outside this crate. Each
//! trait has an in-memory test double in `collabhub-test`.

use crate::diagram::Diagram;
use crate::ids::{DiagramId, UserId};
use crate::participant::Role;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Resolves what a user is allowed to do with a diagram.
///
/// Backed, in a full deployment, by administrator/group membership lookups
/// that are themselves out of scope for this engine.
#[async_trait]
pub trait AccessChecker: Send + Sync {
    /// The caller's role for `diagram`, or `None` if they have no access at
    /// all (not `Role::Reader` — `None` means "cannot even observe").
    async fn role(&self, user: UserId, diagram: DiagramId) -> Option<Role>;
}

/// Durable storage for diagram snapshots, shared between sessions.
///
/// The engine is not the source of truth between sessions: it reads a
/// snapshot when a session starts and writes one after every accepted
/// mutation, but a failed write never rolls back an in-memory accept
/// — between-session consistency is the REST layer's job.
#[async_trait]
pub trait DiagramStore: Send + Sync {
    /// Load the last durable snapshot for `id`, if one exists.
    async fn get(&self, id: DiagramId) -> anyhow::Result<Option<Diagram>>;

    /// Persist `diagram` as the latest snapshot.
    async fn put(&self, diagram: &Diagram) -> anyhow::Result<()>;
}

/// The side-effect stream the engine emits into: webhooks, add-on
/// invocations, audit logs. Out of scope to implement; the engine only
/// needs to be able to call it.
#[async_trait]
pub trait EventEmitter: Send + Sync {
    /// Emit one structured payload. Implementations must not block the
    /// caller on slow downstream delivery — suspension points must not
    /// starve the session loop; a real implementation
    /// enqueues and returns.
    async fn emit(&self, payload: serde_json::Value);
}

/// A per-owner rate/quota profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quota {
    /// Maximum concurrent invocations (add-on rate limiting).
    pub max_concurrent: u32,
    /// Maximum requests in a rolling hour.
    pub max_per_hour: u32,
    /// Maximum requests in a rolling minute.
    pub max_per_minute: u32,
}

impl Quota {
    /// A conservative default used when no quota row exists yet.
    #[must_use]
    pub fn default_quota() -> Self {
        Self {
            max_concurrent: 5,
            max_per_hour: 1_000,
            max_per_minute: 60,
        }
    }
}

/// Looks up a user's or workspace's [`Quota`], typically cached in front of
/// a durable store.
#[async_trait]
pub trait QuotaStore: Send + Sync {
    /// Return the caller's quota, or [`Quota::default_quota`] if none is on
    /// file.
    async fn get_or_default(&self, owner: UserId) -> Quota;
}

/// One (score, member) row in an ordered-set store, as used by the sliding
/// window rate limiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredMember {
    /// Unix-second score used to trim by age.
    pub score: i64,
    /// A unique token identifying this admitted request.
    pub member: String,
}

/// The minimal Redis-sorted-set-shaped contract the sliding window limiter
/// needs. A min-heap-plus-count would suffice just as well; this trait is
/// that abstraction, so an in-memory implementation and a Redis-backed one
/// are interchangeable.
#[async_trait]
pub trait OrderedSetStore: Send + Sync {
    /// Add `member` at `score` under `key`.
    async fn zadd(&self, key: &str, score: i64, member: &str) -> anyhow::Result<()>;

    /// Count members with `score >= min_score`.
    async fn zcount(&self, key: &str, min_score: i64) -> anyhow::Result<u64>;

    /// Remove members with `score < max_score` (exclusive), returning how
    /// many were removed.
    async fn zremrangebyscore(&self, key: &str, max_score: i64) -> anyhow::Result<u64>;

    /// All members with `score >= min_score`, sorted by score ascending.
    async fn zrange_with_scores(&self, key: &str, min_score: i64)
    -> anyhow::Result<Vec<ScoredMember>>;

    /// Set (or refresh) a TTL on `key`, in seconds. Best-effort bookkeeping;
    /// correctness never depends on expiry firing (the explicit trim step
    /// is what actually bounds the window).
    async fn expire(&self, key: &str, ttl_secs: u64) -> anyhow::Result<()>;
}

/// Resolves a `(provider, provider_id)` pair to this engine's internal user
/// id. Out of scope to implement; the engine consumes an
/// already-authenticated `UserInfo`.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Look up (or provision) the internal id for an external identity.
    async fn lookup(&self, provider: &str, provider_id: &str) -> anyhow::Result<UserId>;
}

/// Status of a webhook subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Healthy and receiving events.
    Active,
    /// Marked for deletion by the cleanup worker; excluded from delivery
    /// immediately.
    PendingDelete,
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::PendingDelete => write!(f, "pending_delete"),
        }
    }
}

/// A webhook subscription row as seen by the cleanup worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookSubscription {
    /// Subscription id.
    pub id: String,
    /// Delivery endpoint (opaque to the engine).
    pub endpoint: String,
    /// Current status.
    pub status: SubscriptionStatus,
    /// Consecutive publication failures since the last success.
    pub failure_count: u32,
    /// Last time a delivery to this endpoint succeeded, if ever.
    pub last_successful_use: Option<DateTime<Utc>>,
    /// When this subscription was created.
    pub created_at: DateTime<Utc>,
}

/// Durable storage for webhook subscriptions and their delivery history,
/// consumed by `WebhookCleanupWorker`.
#[async_trait]
pub trait WebhookSubscriptionStore: Send + Sync {
    /// All subscriptions currently on file.
    async fn list(&self) -> anyhow::Result<Vec<WebhookSubscription>>;

    /// Transition `id` to `status`.
    async fn set_status(&self, id: &str, status: SubscriptionStatus) -> anyhow::Result<()>;

    /// Permanently remove a subscription (after it has sat `pending_delete`).
    async fn delete(&self, id: &str) -> anyhow::Result<()>;

    /// Delete delivery records older than `before`.
    async fn delete_deliveries_older_than(&self, before: DateTime<Utc>) -> anyhow::Result<u64>;
}
