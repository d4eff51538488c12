//! Engine events: the side-effect stream emitted alongside accepted
//! mutations, presence changes, and session lifecycle transitions.

use chrono::{DateTime, Utc};
use collabhub_core::{DiagramId, Role, SessionId, UserId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Metadata common to every event: an id for dedup/logging and when it was
/// produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMetadata {
    /// Unique id for this event instance.
    pub event_id: Uuid,
    /// When the event was produced.
    pub occurred_at: DateTime<Utc>,
    /// The component that produced the event (e.g. `"session"`).
    pub source: String,
}

impl EventMetadata {
    /// Create metadata stamped with the current time.
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            source: source.into(),
        }
    }
}

/// A domain event produced by the collaboration engine. This is the payload
/// an `EventEmitter` implementation forwards to webhook subscribers and
/// add-ons.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EngineEvent {
    /// A session accepted and applied a mutation batch.
    DiagramMutated {
        /// Shared metadata.
        metadata: EventMetadata,
        /// The diagram that changed.
        diagram_id: DiagramId,
        /// The session that applied the change.
        session_id: SessionId,
        /// Revision after the change.
        revision: u64,
        /// Total cell count after the change.
        cell_count: usize,
    },
    /// A participant joined a session.
    ParticipantJoined {
        /// Shared metadata.
        metadata: EventMetadata,
        /// The diagram.
        diagram_id: DiagramId,
        /// The session.
        session_id: SessionId,
        /// The joining user.
        user_id: UserId,
        /// Their role.
        role: Role,
    },
    /// A participant left a session.
    ParticipantLeft {
        /// Shared metadata.
        metadata: EventMetadata,
        /// The diagram.
        diagram_id: DiagramId,
        /// The session.
        session_id: SessionId,
        /// The leaving user.
        user_id: UserId,
    },
    /// Host changed within a session.
    HostChanged {
        /// Shared metadata.
        metadata: EventMetadata,
        /// The diagram.
        diagram_id: DiagramId,
        /// The session.
        session_id: SessionId,
        /// The new host.
        new_host: UserId,
    },
    /// A session was created (first participant joined).
    SessionStarted {
        /// Shared metadata.
        metadata: EventMetadata,
        /// The diagram.
        diagram_id: DiagramId,
        /// The session.
        session_id: SessionId,
    },
    /// A session was destroyed (idle timeout or explicit termination).
    SessionEnded {
        /// Shared metadata.
        metadata: EventMetadata,
        /// The diagram.
        diagram_id: DiagramId,
        /// The session.
        session_id: SessionId,
    },
}

impl EngineEvent {
    /// A short machine-readable tag for this event's variant, used in log
    /// lines and webhook payload framing.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::DiagramMutated { .. } => "diagram_mutated",
            Self::ParticipantJoined { .. } => "participant_joined",
            Self::ParticipantLeft { .. } => "participant_left",
            Self::HostChanged { .. } => "host_changed",
            Self::SessionStarted { .. } => "session_started",
            Self::SessionEnded { .. } => "session_ended",
        }
    }

    /// The diagram id every variant carries.
    #[must_use]
    pub fn diagram_id(&self) -> DiagramId {
        match self {
            Self::DiagramMutated { diagram_id, .. }
            | Self::ParticipantJoined { diagram_id, .. }
            | Self::ParticipantLeft { diagram_id, .. }
            | Self::HostChanged { diagram_id, .. }
            | Self::SessionStarted { diagram_id, .. }
            | Self::SessionEnded { diagram_id, .. } => *diagram_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_type_matches_variant() {
        let event = EngineEvent::SessionStarted {
            metadata: EventMetadata::new("session"),
            diagram_id: DiagramId::new(),
            session_id: SessionId::new(),
        };
        assert_eq!(event.event_type(), "session_started");
    }
}
