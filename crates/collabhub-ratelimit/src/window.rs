//! The sliding window rate limiter primitive.
//!
//! Grounded on the trim-then-check-then-push discipline of
//! `astralis-mcp::rate_limit::WindowTracker`, generalized from an in-memory
//! `Vec<DateTime<Utc>>` per key to a store-backed design (`OrderedSetStore`)
//! so the four-step pipeline maps onto concrete trait calls and an
//! out-of-process (Redis) backend is a drop-in replacement for the
//! in-memory one in `store.rs`.

use collabhub_core::OrderedSetStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::RateLimitResult;

/// Outcome of a sliding-window admission check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Decision {
    /// Admitted; a member was recorded.
    Allowed {
        /// Members in the window after admission (including this one).
        current: u64,
        /// The limit checked against.
        limit: u32,
    },
    /// Denied; limit already reached. No member was recorded.
    Denied {
        /// Members currently in the window.
        current: u64,
        /// The limit checked against.
        limit: u32,
        /// Seconds the caller should wait before retrying, clamped to
        /// `>= 1`.
        retry_after_secs: u64,
    },
}

impl Decision {
    /// `true` for [`Decision::Allowed`].
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }
}

/// Checks and admits requests against a sliding time window backed by an
/// [`OrderedSetStore`].
pub struct SlidingWindowRateLimiter {
    store: Arc<dyn OrderedSetStore>,
    /// Extra seconds appended to `window_secs` when setting a key's TTL
    /// (default padding documented in `RateLimitConfig`).
    ttl_padding_secs: u64,
}

impl SlidingWindowRateLimiter {
    /// Build a limiter against `store`, padding every key's TTL by
    /// `ttl_padding_secs` beyond its window.
    #[must_use]
    pub fn new(store: Arc<dyn OrderedSetStore>, ttl_padding_secs: u64) -> Self {
        Self {
            store,
            ttl_padding_secs,
        }
    }

    /// Check `key` against `limit` within `window_secs`, admitting the
    /// request if under limit.
    ///
    /// 1. Trim members older than `now - window`.
    /// 2. Count remaining members.
    /// 3. If `count >= limit`, deny with a retry hint computed from the
    ///    oldest surviving member.
    /// 4. Otherwise add a member scored `now` and refresh the key's TTL.
    ///
    /// Step 4 is a separate conditional step from 1-3 so an over-limit
    /// check never consumes budget.
    pub async fn check(
        &self,
        key: &str,
        limit: u32,
        window_secs: i64,
        now: i64,
    ) -> RateLimitResult<Decision> {
        let min_score = now - window_secs;
        self.store.zremrangebyscore(key, min_score).await?;

        let current = self.store.zcount(key, min_score).await?;

        if current >= u64::from(limit) {
            let oldest = self
                .store
                .zrange_with_scores(key, min_score)
                .await?
                .into_iter()
                .map(|m| m.score)
                .min()
                .unwrap_or(now);
            let retry_after = (oldest + window_secs - now).max(1);
            return Ok(Decision::Denied {
                current,
                limit,
                retry_after_secs: retry_after as u64,
            });
        }

        let member = Uuid::new_v4().to_string();
        self.store.zadd(key, now, &member).await?;
        self.store
            .expire(key, (window_secs as u64) + self.ttl_padding_secs)
            .await?;

        Ok(Decision::Allowed {
            current: current + 1,
            limit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryOrderedSetStore;

    #[tokio::test]
    async fn admits_under_limit_and_denies_at_limit() {
        let store = Arc::new(InMemoryOrderedSetStore::new());
        let limiter = SlidingWindowRateLimiter::new(store, 60);

        for t in 0..3 {
            let decision = limiter.check("user:1", 3, 60, t).await.unwrap();
            assert!(decision.is_allowed(), "request at t={t} should be allowed");
        }

        let decision = limiter.check("user:1", 3, 60, 3).await.unwrap();
        assert!(!decision.is_allowed());
        if let Decision::Denied {
            retry_after_secs, ..
        } = decision
        {
            // Oldest member was at t=0, window=60, now=3 -> retry in 57s.
            assert_eq!(retry_after_secs, 57);
        } else {
            panic!("expected denial");
        }
    }

    #[tokio::test]
    async fn window_slides_and_readmits_after_expiry() {
        let store = Arc::new(InMemoryOrderedSetStore::new());
        let limiter = SlidingWindowRateLimiter::new(store, 60);

        for t in 0..3 {
            assert!(limiter.check("user:1", 3, 60, t).await.unwrap().is_allowed());
        }
        assert!(!limiter.check("user:1", 3, 60, 3).await.unwrap().is_allowed());

        // At t=61 the t=0 member has aged out of the 60s window.
        assert!(
            limiter
                .check("user:1", 3, 60, 61)
                .await
                .unwrap()
                .is_allowed()
        );
    }

    #[tokio::test]
    async fn denial_does_not_consume_budget() {
        let store = Arc::new(InMemoryOrderedSetStore::new());
        let limiter = SlidingWindowRateLimiter::new(store, 60);

        assert!(limiter.check("user:1", 1, 60, 0).await.unwrap().is_allowed());
        // Two consecutive denials must report the same count: step 4 never
        // ran for either.
        let first = limiter.check("user:1", 1, 60, 1).await.unwrap();
        let second = limiter.check("user:1", 1, 60, 2).await.unwrap();
        assert!(matches!(first, Decision::Denied { current: 1, .. }));
        assert!(matches!(second, Decision::Denied { current: 1, .. }));
    }
}
