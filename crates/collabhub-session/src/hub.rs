//! `SessionHub`: the registry of live `DiagramSession`s, keyed by diagram
//! id.
//!
//! Grounded on `astrid-gateway::server::inbound_router::InboundRouterCtx`'s
//! `sessions: Arc<RwLock<HashMap<SessionId, SessionHandle>>>` field —
//! generalized from routing chat messages to a connected agent session to
//! routing diagram operations to a connected `DiagramSession`, and extended
//! with an idle-reap sweep.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;

use collabhub_core::{Diagram, DiagramId};

use crate::error::{SessionError, SessionResult};
use crate::services::Services;
use crate::session::{self, SessionHandle};

/// The registry of live sessions, one per diagram currently being
/// collaborated on.
pub struct SessionHub {
    sessions: RwLock<HashMap<DiagramId, SessionHandle>>,
    services: Arc<Services>,
}

impl SessionHub {
    /// Build an empty hub over `services`.
    #[must_use]
    pub fn new(services: Arc<Services>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            services,
        }
    }

    /// Parse a wire-supplied diagram id, rejecting malformed ones before
    /// they ever reach the session map — malformed ids never show up in
    /// the active-session roster.
    pub fn parse_diagram_id(raw: &str) -> SessionResult<DiagramId> {
        DiagramId::from_str(raw).map_err(|_| SessionError::InvalidDiagramId(raw.to_string()))
    }

    /// Look up the live session for `diagram_id`, if one exists, without
    /// creating it.
    pub async fn get(&self, diagram_id: DiagramId) -> Option<SessionHandle> {
        self.sessions.read().await.get(&diagram_id).cloned()
    }

    /// Look up the live session for `diagram_id`, spawning one (loaded from
    /// `DiagramStore`, or empty if no snapshot exists) if none is running.
    pub async fn get_or_create(&self, diagram_id: DiagramId) -> SessionResult<SessionHandle> {
        if let Some(handle) = self.get(diagram_id).await {
            return Ok(handle);
        }

        let mut sessions = self.sessions.write().await;
        // Re-check under the exclusive lock: another caller may have won the
        // race while we were waiting on it.
        if let Some(handle) = sessions.get(&diagram_id) {
            return Ok(handle.clone());
        }

        let initial = self
            .services
            .diagram_store
            .get(diagram_id)
            .await
            .map_err(SessionError::Internal)?
            .unwrap_or_else(|| Diagram::empty(diagram_id));

        let handle = session::spawn(diagram_id, initial, Arc::clone(&self.services));
        sessions.insert(diagram_id, handle.clone());
        Ok(handle)
    }

    /// Stop and remove the session for `diagram_id`, if one is running.
    pub async fn close(&self, diagram_id: DiagramId) {
        let handle = self.sessions.write().await.remove(&diagram_id);
        if let Some(handle) = handle {
            handle.stop().await;
        }
    }

    /// Snapshot of every live session's summary.
    pub async fn active_sessions(&self) -> Vec<session::SessionSummary> {
        self.sessions.read().await.values().map(SessionHandle::summary).collect()
    }

    /// Close every session that has no participants or whose last activity
    /// is older than `idle_timeout_secs`. Returns how many were reaped.
    pub async fn reap_inactive(&self, idle_timeout_secs: u64) -> usize {
        let cutoff = chrono::Utc::now() - chrono::Duration::seconds(idle_timeout_secs as i64);
        let stale: Vec<DiagramId> = {
            let sessions = self.sessions.read().await;
            sessions
                .values()
                .filter(|handle| {
                    let summary = handle.summary();
                    summary.participant_count == 0 || summary.last_activity < cutoff
                })
                .map(|handle| handle.diagram_id)
                .collect()
        };

        for diagram_id in &stale {
            self.close(*diagram_id).await;
            info!(diagram_id = %diagram_id, "reaped idle session");
        }
        stale.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use collabhub_test::prelude::*;
    use std::time::Duration;

    fn services() -> Arc<Services> {
        use collabhub_config::Config;
        use collabhub_events::EventBus;
        use collabhub_ratelimit::{ApiRateLimiter, InMemoryOrderedSetStore, SlidingWindowRateLimiter};

        Arc::new(Services::new(
            Arc::new(FixedAccessChecker::new()),
            Arc::new(InMemoryDiagramStore::new()),
            Arc::new(RecordingEventEmitter::new()),
            Arc::new(InMemoryWebhookSubscriptionStore::new()),
            Arc::new(InMemoryUserDirectory::new()),
            Arc::new(ApiRateLimiter::new(
                SlidingWindowRateLimiter::new(Arc::new(InMemoryOrderedSetStore::new()), 60),
                Arc::new(FixedQuotaStore::default()),
            )),
            EventBus::new(),
            Config::default(),
        ))
    }

    #[test]
    fn malformed_diagram_id_is_rejected() {
        assert!(SessionHub::parse_diagram_id("not-a-uuid").is_err());
    }

    #[tokio::test]
    async fn get_or_create_is_idempotent() {
        let hub = SessionHub::new(services());
        let diagram_id = DiagramId::new();

        let first = hub.get_or_create(diagram_id).await.unwrap();
        let second = hub.get_or_create(diagram_id).await.unwrap();
        assert_eq!(first.session_id, second.session_id);
    }

    #[tokio::test]
    async fn reap_inactive_closes_sessions_with_no_participants() {
        let hub = SessionHub::new(services());
        let diagram_id = DiagramId::new();
        hub.get_or_create(diagram_id).await.unwrap();

        let reaped = hub.reap_inactive(0).await;
        assert_eq!(reaped, 1);
        assert!(hub.get(diagram_id).await.is_none());
    }

    #[tokio::test]
    async fn close_is_a_no_op_for_unknown_diagram() {
        let hub = SessionHub::new(services());
        hub.close(DiagramId::new()).await;
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
}
