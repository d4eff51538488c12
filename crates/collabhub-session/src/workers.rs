//! `BackgroundWorkers`: the idle-session reaper and webhook cleanup sweep.
//!
//! Grounded on the monitoring loop trio in
//! `astrid-gateway::server::monitoring` (`spawn_health_loop`,
//! `spawn_ephemeral_monitor`, `spawn_session_cleanup_loop`): each worker is an
//! independent `tokio::spawn`'d `tokio::time::interval` loop holding its own
//! `AbortOnDrop` guard so dropping the `BackgroundWorkers` handle stops every
//! loop, even though the loops themselves never observe a shared shutdown
//! channel.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use collabhub_core::SubscriptionStatus;

use crate::hub::SessionHub;
use crate::services::Services;

/// Guard that aborts its spawned task when dropped, so a `BackgroundWorkers`
/// going out of scope actually stops its loops rather than leaking them.
struct AbortOnDrop(tokio::task::JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Owns the collaboration engine's periodic background loops: the idle
/// session reaper and the webhook subscription cleanup sweep.
pub struct BackgroundWorkers {
    _reaper: AbortOnDrop,
    _webhook_cleanup: AbortOnDrop,
}

impl BackgroundWorkers {
    /// Spawn every background worker against `hub` and `services`.
    #[must_use]
    pub fn spawn(hub: Arc<SessionHub>, services: Arc<Services>) -> Self {
        Self {
            _reaper: AbortOnDrop(spawn_reaper(Arc::clone(&hub), Arc::clone(&services))),
            _webhook_cleanup: AbortOnDrop(spawn_webhook_cleanup(services)),
        }
    }
}

/// Periodically sweep the hub for sessions with no participants or whose
/// last activity exceeds `session.idle_timeout_secs`.
fn spawn_reaper(hub: Arc<SessionHub>, services: Arc<Services>) -> tokio::task::JoinHandle<()> {
    let interval_secs = services.config.workers.reaper_interval_secs;
    let idle_timeout_secs = services.config.session.idle_timeout_secs;
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
        loop {
            ticker.tick().await;
            let reaped = hub.reap_inactive(idle_timeout_secs).await;
            if reaped > 0 {
                info!(reaped, "session reaper closed idle sessions");
            }
        }
    })
}

/// Run the hourly webhook subscription sweep:
/// 1. Delete delivery records older than `delivery_retention_days`.
/// 2. Mark subscriptions idle longer than `idle_threshold_days` as
///    `pending_delete`.
/// 3. Mark subscriptions with `failure_count >= failure_count_threshold` and
///    no success within `failure_window_days` as `pending_delete`.
/// 4. Permanently delete every `pending_delete` subscription.
fn spawn_webhook_cleanup(services: Arc<Services>) -> tokio::task::JoinHandle<()> {
    let interval_secs = services.config.workers.webhook_cleanup_interval_secs;
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
        loop {
            ticker.tick().await;
            if let Err(e) = run_webhook_cleanup(&services).await {
                warn!(error = %e, "webhook cleanup sweep failed");
            }
        }
    })
}

async fn run_webhook_cleanup(services: &Services) -> anyhow::Result<()> {
    let cfg = &services.config.workers;
    let now = Utc::now();

    let retention_cutoff = now - chrono::Duration::days(cfg.delivery_retention_days);
    let deleted = services
        .webhook_store
        .delete_deliveries_older_than(retention_cutoff)
        .await?;
    if deleted > 0 {
        info!(deleted, "deleted old webhook delivery records");
    }

    let idle_cutoff = now - chrono::Duration::days(cfg.idle_threshold_days);
    let failure_window_cutoff = now - chrono::Duration::days(cfg.failure_window_days);

    let subscriptions = services.webhook_store.list().await?;
    for subscription in &subscriptions {
        if subscription.status != SubscriptionStatus::Active {
            continue;
        }

        let idle = subscription
            .last_successful_use
            .is_none_or(|last| last < idle_cutoff);
        let failing = subscription.failure_count >= cfg.failure_count_threshold
            && subscription
                .last_successful_use
                .is_none_or(|last| last < failure_window_cutoff);

        if idle || failing {
            services
                .webhook_store
                .set_status(&subscription.id, SubscriptionStatus::PendingDelete)
                .await?;
        }
    }

    let pending: Vec<String> = services
        .webhook_store
        .list()
        .await?
        .into_iter()
        .filter(|s| s.status == SubscriptionStatus::PendingDelete)
        .map(|s| s.id)
        .collect();
    for id in pending {
        services.webhook_store.delete(&id).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use collabhub_core::WebhookSubscription;
    use collabhub_test::prelude::InMemoryWebhookSubscriptionStore;

    fn subscription(id: &str, failure_count: u32, last_success: Option<chrono::DateTime<Utc>>) -> WebhookSubscription {
        WebhookSubscription {
            id: id.to_string(),
            endpoint: "https://example.test/hook".to_string(),
            status: SubscriptionStatus::Active,
            failure_count,
            last_successful_use: last_success,
            created_at: Utc::now(),
        }
    }

    fn workers_config() -> collabhub_config::WorkersConfig {
        collabhub_config::WorkersConfig::default()
    }

    #[tokio::test]
    async fn idle_subscription_is_marked_pending_then_deleted() {
        let store = InMemoryWebhookSubscriptionStore::new();
        let old = Utc::now() - chrono::Duration::days(200);
        store.seed(subscription("idle-sub", 0, Some(old)));

        let services = Services::new(
            Arc::new(collabhub_test::prelude::FixedAccessChecker::new()),
            Arc::new(collabhub_test::prelude::InMemoryDiagramStore::new()),
            Arc::new(collabhub_test::prelude::RecordingEventEmitter::new()),
            Arc::new(store),
            Arc::new(collabhub_test::prelude::InMemoryUserDirectory::new()),
            Arc::new(collabhub_ratelimit::ApiRateLimiter::new(
                collabhub_ratelimit::SlidingWindowRateLimiter::new(
                    Arc::new(collabhub_ratelimit::InMemoryOrderedSetStore::new()),
                    60,
                ),
                Arc::new(collabhub_test::prelude::FixedQuotaStore::default()),
            )),
            collabhub_events::EventBus::new(),
            collabhub_config::Config {
                workers: workers_config(),
                ..Default::default()
            },
        );

        run_webhook_cleanup(&services).await.unwrap();
        assert!(services.webhook_store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn healthy_subscription_survives_the_sweep() {
        let store = InMemoryWebhookSubscriptionStore::new();
        store.seed(subscription("healthy-sub", 0, Some(Utc::now())));

        let services = Services::new(
            Arc::new(collabhub_test::prelude::FixedAccessChecker::new()),
            Arc::new(collabhub_test::prelude::InMemoryDiagramStore::new()),
            Arc::new(collabhub_test::prelude::RecordingEventEmitter::new()),
            Arc::new(store),
            Arc::new(collabhub_test::prelude::InMemoryUserDirectory::new()),
            Arc::new(collabhub_ratelimit::ApiRateLimiter::new(
                collabhub_ratelimit::SlidingWindowRateLimiter::new(
                    Arc::new(collabhub_ratelimit::InMemoryOrderedSetStore::new()),
                    60,
                ),
                Arc::new(collabhub_test::prelude::FixedQuotaStore::default()),
            )),
            collabhub_events::EventBus::new(),
            collabhub_config::Config {
                workers: workers_config(),
                ..Default::default()
            },
        );

        run_webhook_cleanup(&services).await.unwrap();
        let remaining = services.webhook_store.list().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].status, SubscriptionStatus::Active);
    }
}
