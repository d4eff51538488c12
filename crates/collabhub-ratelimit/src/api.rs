//! Per-user API rate limiting.
//!
//! Layers a per-minute and a per-hour [`SlidingWindowRateLimiter`] check
//! over a single user's quota, matching the two-tier budget-checking style
//! of `astrid-approval::budget::BudgetTracker` (per-action cap + session
//! cap as two independent checks run in sequence, the tighter one wins).

use std::sync::Arc;

use collabhub_core::{QuotaStore, UserId};
use serde::{Deserialize, Serialize};

use crate::error::RateLimitResult;
use crate::window::{Decision, SlidingWindowRateLimiter};

const MINUTE_SECS: i64 = 60;
const HOUR_SECS: i64 = 3_600;

/// Which tier denied the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// The per-minute window.
    Minute,
    /// The per-hour window.
    Hour,
}

/// Outcome of an [`APIRateLimiter`] check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ApiDecision {
    /// Admitted under both tiers.
    Allowed,
    /// Denied by `tier`, with enough structured detail to render a
    /// `retry_after_secs` response.
    Denied {
        /// Which window rejected the request.
        tier: Tier,
        /// The limit checked against.
        limit: u32,
        /// Members currently in that window.
        current: u64,
        /// Seconds the caller should wait before retrying.
        retry_after: u64,
    },
}

impl ApiDecision {
    /// `true` for [`ApiDecision::Allowed`].
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }

    fn from_window(tier: Tier, decision: Decision) -> Option<Self> {
        match decision {
            Decision::Allowed { .. } => None,
            Decision::Denied {
                current,
                limit,
                retry_after_secs,
            } => Some(Self::Denied {
                tier,
                limit,
                current,
                retry_after: retry_after_secs,
            }),
        }
    }
}

/// Checks a user's requests against their per-minute and per-hour quota.
pub struct ApiRateLimiter {
    window: SlidingWindowRateLimiter,
    quotas: Arc<dyn QuotaStore>,
}

impl ApiRateLimiter {
    /// Build a limiter over `window`, reading per-user quotas from `quotas`.
    #[must_use]
    pub fn new(window: SlidingWindowRateLimiter, quotas: Arc<dyn QuotaStore>) -> Self {
        Self { window, quotas }
    }

    /// Check and, if admitted, record a request for `user` at `now`
    /// (unix seconds).
    ///
    /// The per-minute window is checked first: a deny there short-circuits
    /// before the per-hour window is touched, so a user hammering the
    /// minute limit never also consumes hour budget.
    pub async fn check(&self, user: UserId, now: i64) -> RateLimitResult<ApiDecision> {
        let quota = self.quotas.get_or_default(user).await;

        let minute_key = format!("api:{user}:minute");
        let minute = self
            .window
            .check(&minute_key, quota.max_per_minute, MINUTE_SECS, now)
            .await?;
        if let Some(denied) = ApiDecision::from_window(Tier::Minute, minute) {
            return Ok(denied);
        }

        let hour_key = format!("api:{user}:hour");
        let hour = self
            .window
            .check(&hour_key, quota.max_per_hour, HOUR_SECS, now)
            .await?;
        if let Some(denied) = ApiDecision::from_window(Tier::Hour, hour) {
            return Ok(denied);
        }

        Ok(ApiDecision::Allowed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryOrderedSetStore;
    use async_trait::async_trait;
    use collabhub_core::Quota;

    struct FixedQuota(Quota);

    #[async_trait]
    impl QuotaStore for FixedQuota {
        async fn get_or_default(&self, _owner: UserId) -> Quota {
            self.0
        }
    }

    fn limiter(per_minute: u32, per_hour: u32) -> ApiRateLimiter {
        let store = Arc::new(InMemoryOrderedSetStore::new());
        let window = SlidingWindowRateLimiter::new(store, 60);
        let quotas = Arc::new(FixedQuota(Quota {
            max_concurrent: 5,
            max_per_hour: per_hour,
            max_per_minute: per_minute,
        }));
        ApiRateLimiter::new(window, quotas)
    }

    #[tokio::test]
    async fn minute_tier_denies_before_hour_tier_is_touched() {
        let limiter = limiter(1, 1000);
        let user = UserId::new();

        assert!(limiter.check(user, 0).await.unwrap().is_allowed());
        let decision = limiter.check(user, 1).await.unwrap();
        assert!(!decision.is_allowed());
        assert!(matches!(
            decision,
            ApiDecision::Denied {
                tier: Tier::Minute,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn hour_tier_denies_once_minute_budget_resets() {
        let limiter = limiter(1, 1);
        let user = UserId::new();

        assert!(limiter.check(user, 0).await.unwrap().is_allowed());
        // Minute window has slid clear by t=61, hour window has not.
        let decision = limiter.check(user, 61).await.unwrap();
        assert!(matches!(
            decision,
            ApiDecision::Denied {
                tier: Tier::Hour,
                ..
            }
        ));
    }
}
