//! `WebhookSubscriptionStore` implementations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use collabhub_core::{SubscriptionStatus, WebhookSubscription, WebhookSubscriptionStore};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::db::Database;
use crate::error::StorageError;

const TABLE: &str = "webhook_subscription";

#[derive(Debug, Serialize, Deserialize)]
struct SubscriptionRow {
    id: String,
    endpoint: String,
    status: SubscriptionStatus,
    failure_count: u32,
    last_successful_use: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<&WebhookSubscription> for SubscriptionRow {
    fn from(s: &WebhookSubscription) -> Self {
        Self {
            id: s.id.clone(),
            endpoint: s.endpoint.clone(),
            status: s.status,
            failure_count: s.failure_count,
            last_successful_use: s.last_successful_use,
            created_at: s.created_at,
        }
    }
}

impl From<SubscriptionRow> for WebhookSubscription {
    fn from(row: SubscriptionRow) -> Self {
        Self {
            id: row.id,
            endpoint: row.endpoint,
            status: row.status,
            failure_count: row.failure_count,
            last_successful_use: row.last_successful_use,
            created_at: row.created_at,
        }
    }
}

/// A `SurrealDB`-backed [`WebhookSubscriptionStore`].
///
/// Delivery records are not modeled as a distinct table here — deleting
/// delivery records older than 30 days is scoped to the webhook-emission
/// plumbing this engine does not itself implement; this store only owns
/// the subscription rows the cleanup worker transitions and reaps, and
/// reports the delivery-deletion count as `0` since it has nothing to
/// delete.
pub struct SurrealWebhookSubscriptionStore {
    db: Database,
}

impl SurrealWebhookSubscriptionStore {
    /// Wrap an already-connected [`Database`].
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl WebhookSubscriptionStore for SurrealWebhookSubscriptionStore {
    async fn list(&self) -> anyhow::Result<Vec<WebhookSubscription>> {
        let rows: Vec<SubscriptionRow> = self
            .db
            .client()
            .select(TABLE)
            .await
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        Ok(rows.into_iter().map(WebhookSubscription::from).collect())
    }

    async fn set_status(&self, id: &str, status: SubscriptionStatus) -> anyhow::Result<()> {
        let mut row: SubscriptionRow = self
            .db
            .client()
            .select((TABLE, id))
            .await
            .map_err(|e| StorageError::Internal(e.to_string()))?
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;
        row.status = status;
        let _: Option<SubscriptionRow> = self
            .db
            .client()
            .update((TABLE, id))
            .content(row)
            .await
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> anyhow::Result<()> {
        let _: Option<SubscriptionRow> = self
            .db
            .client()
            .delete((TABLE, id))
            .await
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        Ok(())
    }

    async fn delete_deliveries_older_than(&self, _before: DateTime<Utc>) -> anyhow::Result<u64> {
        Ok(0)
    }
}

/// An in-process [`WebhookSubscriptionStore`] for tests and single-node dev
/// runs without a `SurrealDB` endpoint configured.
#[derive(Default)]
pub struct InMemoryWebhookSubscriptionStore {
    subscriptions: DashMap<String, WebhookSubscription>,
}

impl InMemoryWebhookSubscriptionStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a subscription row, for test setup.
    pub fn seed(&self, subscription: WebhookSubscription) {
        self.subscriptions
            .insert(subscription.id.clone(), subscription);
    }
}

#[async_trait]
impl WebhookSubscriptionStore for InMemoryWebhookSubscriptionStore {
    async fn list(&self) -> anyhow::Result<Vec<WebhookSubscription>> {
        Ok(self.subscriptions.iter().map(|r| r.clone()).collect())
    }

    async fn set_status(&self, id: &str, status: SubscriptionStatus) -> anyhow::Result<()> {
        let mut row = self
            .subscriptions
            .get_mut(id)
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;
        row.status = status;
        Ok(())
    }

    async fn delete(&self, id: &str) -> anyhow::Result<()> {
        self.subscriptions.remove(id);
        Ok(())
    }

    async fn delete_deliveries_older_than(&self, _before: DateTime<Utc>) -> anyhow::Result<u64> {
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subscription(id: &str, status: SubscriptionStatus) -> WebhookSubscription {
        WebhookSubscription {
            id: id.to_string(),
            endpoint: "https://example.test/hook".to_string(),
            status,
            failure_count: 0,
            last_successful_use: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn set_status_transitions_and_delete_removes() {
        let store = InMemoryWebhookSubscriptionStore::new();
        store.seed(subscription("x", SubscriptionStatus::Active));

        store
            .set_status("x", SubscriptionStatus::PendingDelete)
            .await
            .unwrap();
        let rows = store.list().await.unwrap();
        assert_eq!(rows[0].status, SubscriptionStatus::PendingDelete);

        store.delete("x").await.unwrap();
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn set_status_on_unknown_id_errors() {
        let store = InMemoryWebhookSubscriptionStore::new();
        assert!(
            store
                .set_status("nope", SubscriptionStatus::PendingDelete)
                .await
                .is_err()
        );
    }
}
