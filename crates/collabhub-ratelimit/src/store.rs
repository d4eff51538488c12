//! In-process `OrderedSetStore` for tests and single-node deployments.
//!
//! A sorted-set-shaped map keeps the surface identical to a Redis-backed
//! implementation: each key owns an ordered collection of (score, member)
//! pairs, trimmed and counted the same way regardless of backend.

use async_trait::async_trait;
use collabhub_core::{OrderedSetStore, ScoredMember};
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Default)]
struct Set {
    members: BTreeMap<String, i64>,
    expires_at: Option<Instant>,
}

impl Set {
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }
}

/// An `OrderedSetStore` backed by an in-process `BTreeMap`.
///
/// Expiry is evaluated lazily on access rather than by a background sweep;
/// an expired key behaves as if it were empty and is dropped on next write.
#[derive(Default)]
pub struct InMemoryOrderedSetStore {
    sets: Mutex<std::collections::HashMap<String, Set>>,
}

impl InMemoryOrderedSetStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderedSetStore for InMemoryOrderedSetStore {
    async fn zadd(&self, key: &str, score: i64, member: &str) -> anyhow::Result<()> {
        let mut sets = self.sets.lock().expect("store mutex poisoned");
        let set = sets.entry(key.to_string()).or_default();
        if set.is_expired() {
            *set = Set::default();
        }
        set.members.insert(member.to_string(), score);
        Ok(())
    }

    async fn zcount(&self, key: &str, min_score: i64) -> anyhow::Result<u64> {
        let sets = self.sets.lock().expect("store mutex poisoned");
        let Some(set) = sets.get(key) else {
            return Ok(0);
        };
        if set.is_expired() {
            return Ok(0);
        }
        Ok(set.members.values().filter(|&&s| s >= min_score).count() as u64)
    }

    async fn zremrangebyscore(&self, key: &str, max_score: i64) -> anyhow::Result<u64> {
        let mut sets = self.sets.lock().expect("store mutex poisoned");
        let Some(set) = sets.get_mut(key) else {
            return Ok(0);
        };
        if set.is_expired() {
            set.members.clear();
            return Ok(0);
        }
        let before = set.members.len();
        set.members.retain(|_, &mut score| score >= max_score);
        Ok((before - set.members.len()) as u64)
    }

    async fn zrange_with_scores(&self, key: &str, min_score: i64) -> anyhow::Result<Vec<ScoredMember>> {
        let sets = self.sets.lock().expect("store mutex poisoned");
        let Some(set) = sets.get(key) else {
            return Ok(Vec::new());
        };
        if set.is_expired() {
            return Ok(Vec::new());
        }
        let mut out: Vec<ScoredMember> = set
            .members
            .iter()
            .filter(|(_, &score)| score >= min_score)
            .map(|(member, &score)| ScoredMember { score, member: member.clone() })
            .collect();
        out.sort_by_key(|m| m.score);
        Ok(out)
    }

    async fn expire(&self, key: &str, ttl_secs: u64) -> anyhow::Result<()> {
        let mut sets = self.sets.lock().expect("store mutex poisoned");
        if let Some(set) = sets.get_mut(key) {
            set.expires_at = Some(Instant::now() + Duration::from_secs(ttl_secs));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn zadd_and_zcount_round_trip() {
        let store = InMemoryOrderedSetStore::new();
        store.zadd("k", 10, "a").await.unwrap();
        store.zadd("k", 20, "b").await.unwrap();
        assert_eq!(store.zcount("k", 0).await.unwrap(), 2);
        assert_eq!(store.zcount("k", 15).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn zremrangebyscore_trims_old_members() {
        let store = InMemoryOrderedSetStore::new();
        store.zadd("k", 1, "a").await.unwrap();
        store.zadd("k", 100, "b").await.unwrap();
        let removed = store.zremrangebyscore("k", 50).await.unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.zcount("k", 0).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn zrange_with_scores_is_sorted() {
        let store = InMemoryOrderedSetStore::new();
        store.zadd("k", 30, "c").await.unwrap();
        store.zadd("k", 10, "a").await.unwrap();
        store.zadd("k", 20, "b").await.unwrap();
        let members = store.zrange_with_scores("k", 0).await.unwrap();
        let scores: Vec<i64> = members.iter().map(|m| m.score).collect();
        assert_eq!(scores, vec![10, 20, 30]);
    }

    #[tokio::test]
    async fn missing_key_reads_as_empty() {
        let store = InMemoryOrderedSetStore::new();
        assert_eq!(store.zcount("nope", 0).await.unwrap(), 0);
        assert!(store.zrange_with_scores("nope", 0).await.unwrap().is_empty());
    }
}
