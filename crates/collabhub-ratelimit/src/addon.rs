//! Add-on invocation rate limiting.
//!
//! Adds a concurrent-invocation check on top of [`crate::api::ApiRateLimiter`]'s
//! minute/hour tiers: an add-on may also be capped on how many invocations it
//! has in flight at once, counted against an [`InvocationStore`] rather than
//! the sliding window (concurrency is a gauge, not a rate).

use std::sync::Arc;

use async_trait::async_trait;
use collabhub_core::UserId;
use serde::{Deserialize, Serialize};

use crate::api::{ApiDecision, ApiRateLimiter};
use crate::error::RateLimitResult;

/// Tracks invocations currently in flight per owner.
///
/// A concrete implementation backs this with whatever the add-on runtime
/// already uses to track live work (a process table, a task registry); the
/// limiter only needs counts and the ids currently blocking the quota.
#[async_trait]
pub trait InvocationStore: Send + Sync {
    /// Ids of invocations currently in flight for `owner`.
    async fn active(&self, owner: UserId) -> anyhow::Result<Vec<String>>;
}

/// Outcome of an [`AddonRateLimiter`] check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AddonDecision {
    /// Admitted under the minute/hour tiers and the concurrency cap.
    Allowed,
    /// Denied by the wrapped [`ApiRateLimiter`] (minute or hour tier).
    RateDenied(ApiDecision),
    /// Denied because `max_concurrent` in-flight invocations are already
    /// running; `blocking_invocations` names them.
    ConcurrencyDenied {
        /// The concurrency limit checked against.
        limit: u32,
        /// How many invocations are currently in flight.
        current: u64,
        /// Ids of the invocations currently holding the slots.
        blocking_invocations: Vec<String>,
    },
}

impl AddonDecision {
    /// `true` for [`AddonDecision::Allowed`].
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// Layers a concurrent-invocation cap over [`ApiRateLimiter`]'s minute/hour
/// checks, for add-on (webhook/extension) invocations specifically.
pub struct AddonRateLimiter {
    api: ApiRateLimiter,
    invocations: Arc<dyn InvocationStore>,
    max_concurrent: u32,
}

impl AddonRateLimiter {
    /// Build a limiter wrapping `api`, capping concurrency at
    /// `max_concurrent` in-flight invocations per owner as tracked by
    /// `invocations`.
    #[must_use]
    pub fn new(api: ApiRateLimiter, invocations: Arc<dyn InvocationStore>, max_concurrent: u32) -> Self {
        Self {
            api,
            invocations,
            max_concurrent,
        }
    }

    /// Check an invocation attempt for `owner` at `now` (unix seconds).
    pub async fn check(&self, owner: UserId, now: i64) -> RateLimitResult<AddonDecision> {
        let rate = self.api.check(owner, now).await?;
        if !rate.is_allowed() {
            return Ok(AddonDecision::RateDenied(rate));
        }

        let active = self.invocations.active(owner).await?;
        if active.len() as u64 >= u64::from(self.max_concurrent) {
            return Ok(AddonDecision::ConcurrencyDenied {
                limit: self.max_concurrent,
                current: active.len() as u64,
                blocking_invocations: active,
            });
        }

        Ok(AddonDecision::Allowed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryOrderedSetStore;
    use crate::window::SlidingWindowRateLimiter;
    use collabhub_core::Quota;

    struct FixedQuota(Quota);

    #[async_trait]
    impl collabhub_core::QuotaStore for FixedQuota {
        async fn get_or_default(&self, _owner: UserId) -> Quota {
            self.0
        }
    }

    struct FixedInvocations(Vec<String>);

    #[async_trait]
    impl InvocationStore for FixedInvocations {
        async fn active(&self, _owner: UserId) -> anyhow::Result<Vec<String>> {
            Ok(self.0.clone())
        }
    }

    fn api_limiter() -> ApiRateLimiter {
        let store = Arc::new(InMemoryOrderedSetStore::new());
        let window = SlidingWindowRateLimiter::new(store, 60);
        let quotas = Arc::new(FixedQuota(Quota {
            max_concurrent: 2,
            max_per_hour: 1_000,
            max_per_minute: 60,
        }));
        ApiRateLimiter::new(window, quotas)
    }

    #[tokio::test]
    async fn admits_when_under_concurrency_cap() {
        let invocations = Arc::new(FixedInvocations(vec!["inv-1".into()]));
        let limiter = AddonRateLimiter::new(api_limiter(), invocations, 2);
        let decision = limiter.check(UserId::new(), 0).await.unwrap();
        assert!(decision.is_allowed());
    }

    #[tokio::test]
    async fn denies_with_blocking_invocations_at_cap() {
        let invocations = Arc::new(FixedInvocations(vec!["inv-1".into(), "inv-2".into()]));
        let limiter = AddonRateLimiter::new(api_limiter(), invocations, 2);
        let decision = limiter.check(UserId::new(), 0).await.unwrap();
        assert!(!decision.is_allowed());
        match decision {
            AddonDecision::ConcurrencyDenied {
                limit,
                current,
                blocking_invocations,
            } => {
                assert_eq!(limit, 2);
                assert_eq!(current, 2);
                assert_eq!(blocking_invocations.len(), 2);
            }
            other => panic!("expected concurrency denial, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn rate_denial_short_circuits_before_concurrency_check() {
        let store = Arc::new(InMemoryOrderedSetStore::new());
        let window = SlidingWindowRateLimiter::new(store, 60);
        let quotas = Arc::new(FixedQuota(Quota {
            max_concurrent: 5,
            max_per_hour: 1_000,
            max_per_minute: 1,
        }));
        let api = ApiRateLimiter::new(window, quotas);
        let invocations = Arc::new(FixedInvocations(vec![]));
        let limiter = AddonRateLimiter::new(api, invocations, 5);

        let user = UserId::new();
        assert!(limiter.check(user, 0).await.unwrap().is_allowed());
        let decision = limiter.check(user, 1).await.unwrap();
        assert!(matches!(decision, AddonDecision::RateDenied(_)));
    }
}
