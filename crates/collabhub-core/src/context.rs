//! Request context for correlation across handlers and workers.
//!
//! Every handler and background worker takes a `&RequestContext` explicitly
//! instead of reaching into task-local or dynamically-typed state.

use crate::ids::{SessionId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Carries `(component, operation, correlation_id)` plus enough identity to
/// tie a log line back to a session and user without a lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestContext {
    /// Unique id for this specific request/handler invocation.
    pub request_id: Uuid,
    /// Shared across a chain of related requests (e.g. one websocket
    /// message and every downstream call it triggers).
    pub correlation_id: Uuid,
    /// The component that created this context (e.g. `"session"`,
    /// `"rate_limiter"`, `"webhook_worker"`).
    pub component: &'static str,
    /// The operation being performed (e.g. `"diagram_operation"`,
    /// `"host_transfer"`).
    pub operation: &'static str,
    /// The session this request belongs to, if any.
    pub session_id: Option<SessionId>,
    /// The user this request is on behalf of, if any.
    pub user_id: Option<UserId>,
    /// When this context was created.
    pub started_at: DateTime<Utc>,
}

impl RequestContext {
    /// Start a new, uncorrelated context.
    #[must_use]
    pub fn new(component: &'static str, operation: &'static str) -> Self {
        let id = Uuid::new_v4();
        Self {
            request_id: id,
            correlation_id: id,
            component,
            operation,
            session_id: None,
            user_id: None,
            started_at: Utc::now(),
        }
    }

    /// Derive a child context for a sub-operation, inheriting correlation id,
    /// session id, and user id.
    #[must_use]
    pub fn child(&self, component: &'static str, operation: &'static str) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            correlation_id: self.correlation_id,
            component,
            operation,
            session_id: self.session_id,
            user_id: self.user_id,
            started_at: Utc::now(),
        }
    }

    /// Attach a session id.
    #[must_use]
    pub fn with_session(mut self, session_id: SessionId) -> Self {
        self.session_id = Some(session_id);
        self
    }

    /// Attach a user id.
    #[must_use]
    pub fn with_user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Milliseconds elapsed since this context was created.
    #[must_use]
    pub fn elapsed_ms(&self) -> i64 {
        (Utc::now() - self.started_at).num_milliseconds()
    }

    /// A tracing span carrying this context's fields.
    #[must_use]
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!(
            "request",
            request_id = %self.request_id,
            correlation_id = %self.correlation_id,
            component = self.component,
            operation = self.operation,
            session_id = self.session_id.map(|s| s.to_string()),
            user_id = self.user_id.map(|u| u.to_string()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_inherits_correlation_and_identity() {
        let parent = RequestContext::new("session", "join").with_session(SessionId::new());
        let child = parent.child("rate_limiter", "check_quota");
        assert_eq!(child.correlation_id, parent.correlation_id);
        assert_eq!(child.session_id, parent.session_id);
        assert_ne!(child.request_id, parent.request_id);
    }

    #[test]
    fn new_context_is_its_own_correlation_root() {
        let ctx = RequestContext::new("session", "join");
        assert_eq!(ctx.request_id, ctx.correlation_id);
    }
}
