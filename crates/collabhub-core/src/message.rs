//! The wire message envelope and the typed message sum-types parsed from it.
//!
//! The wire envelope is one untyped JSON object carrying a `message_type`
//! discriminator. Rather than dispatch on that string with runtime
//! reflection, each message type has a named parser function that returns a
//! typed variant of [`ClientMessage`] or [`ServerMessage`] — dispatch becomes
//! a `match`.

use crate::diagram::Cell;
use crate::ids::UserId;
use crate::operation::MutationBatch;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The raw envelope as it appears on the wire, before its `data` payload has
/// been validated against its `message_type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEnvelope {
    /// The message type discriminator.
    pub message_type: String,
    /// The sending user's internal id.
    pub user_id: UserId,
    /// When the message was sent.
    pub timestamp: DateTime<Utc>,
    /// The type-specific payload.
    #[serde(default)]
    pub data: Value,
}

/// Error returned when an envelope's `data` does not match the shape its
/// `message_type` requires, or the `message_type` itself is unrecognized.
#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    /// `message_type` is not one of the canonical types.
    #[error("unknown message type: {0}")]
    UnknownType(String),
    /// `data` failed to parse for the given type.
    #[error("malformed payload for {message_type}: {source}")]
    MalformedPayload {
        /// The message type whose payload failed to parse.
        message_type: String,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

/// A parsed, validated inbound client message.
#[derive(Debug, Clone)]
pub enum ClientMessage {
    /// A new participant has joined.
    Join,
    /// The sending participant is leaving.
    Leave,
    /// A batch of cell operations to apply.
    DiagramOperation(MutationBatch),
    /// Request for current version/revision info.
    SyncStatusRequest,
    /// Request for a full state snapshot.
    SyncRequest,
    /// Request for a full state snapshot (divergence recovery).
    ResyncRequest,
    /// Pop and apply the top of the undo stack.
    UndoRequest,
    /// Pop and apply the top of the redo stack.
    RedoRequest,
    /// Ephemeral cursor position, not persisted.
    PresenterCursor(Value),
    /// Ephemeral selection, not persisted.
    PresenterSelection(Value),
    /// Liveness ping.
    Heartbeat,
}

impl ClientMessage {
    /// Parse a [`RawEnvelope`] into a typed [`ClientMessage`].
    ///
    /// Unknown types are reported as an error; the caller (the session
    /// event loop) is responsible for logging and dropping them rather than
    /// closing the connection.
    pub fn parse(raw: &RawEnvelope) -> Result<Self, EnvelopeError> {
        match raw.message_type.as_str() {
            "join" => Ok(Self::Join),
            "leave" => Ok(Self::Leave),
            "diagram_operation" => parse_payload(raw, Self::DiagramOperation),
            "sync_status_request" => Ok(Self::SyncStatusRequest),
            "sync_request" => Ok(Self::SyncRequest),
            "resync_request" => Ok(Self::ResyncRequest),
            "undo_request" => Ok(Self::UndoRequest),
            "redo_request" => Ok(Self::RedoRequest),
            "presenter_cursor" => Ok(Self::PresenterCursor(raw.data.clone())),
            "presenter_selection" => Ok(Self::PresenterSelection(raw.data.clone())),
            "heartbeat" => Ok(Self::Heartbeat),
            other => Err(EnvelopeError::UnknownType(other.to_string())),
        }
    }
}

fn parse_payload<T, F>(raw: &RawEnvelope, wrap: F) -> Result<ClientMessage, EnvelopeError>
where
    T: for<'de> Deserialize<'de>,
    F: FnOnce(T) -> ClientMessage,
{
    serde_json::from_value(raw.data.clone())
        .map(wrap)
        .map_err(|source| EnvelopeError::MalformedPayload {
            message_type: raw.message_type.clone(),
            source,
        })
}

/// Machine-readable reasons a state correction was necessary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrectionReason {
    /// An `add`/`update` referenced an edge endpoint that does not resolve
    /// to an existing node.
    DanglingEdge,
    /// An operation referenced a cell id that does not exist.
    UnknownCell,
    /// The resulting state would contain duplicate cell ids.
    DuplicateId,
    /// The payload itself did not parse as a well-formed cell.
    MalformedCell,
}

/// Outbound messages the session broadcasts or sends point-to-point.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "message_type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Presence changed: a participant joined or left.
    Presence {
        /// Current participant roster (display info only).
        participants: Vec<crate::participant::Participant>,
    },
    /// The host changed.
    HostChanged {
        /// The new host's user id.
        new_host: UserId,
    },
    /// A batch was accepted and applied.
    DiagramOperationAccepted {
        /// The batch as applied (after dedup/idempotent-add normalization).
        batch: MutationBatch,
        /// The diagram revision after applying the batch.
        revision: u64,
    },
    /// A batch was rejected; sent only to the originating participant.
    StateCorrection {
        /// Why the batch was rejected.
        reason: CorrectionReason,
        /// Authoritative snapshot of the cells the client attempted to touch.
        cells: Vec<Cell>,
    },
    /// Response to `sync_status_request`.
    SyncStatusResponse {
        /// Current revision.
        revision: u64,
        /// Cell count.
        cell_count: usize,
    },
    /// Response to `sync_request`/`resync_request`.
    SyncResponse {
        /// Full cell snapshot.
        cells: Vec<Cell>,
        /// Current revision.
        revision: u64,
    },
    /// An error not tied to a specific cell operation.
    Error {
        /// Machine-readable error code.
        error: String,
        /// Human-readable message.
        message: String,
        /// Structured details (e.g. rate-limit info).
        #[serde(default)]
        details: Value,
    },
    /// Liveness pong.
    Heartbeat,
    /// Ephemeral cursor broadcast (relayed as-is).
    PresenterCursor {
        /// Originating user.
        from: UserId,
        /// Opaque payload.
        data: Value,
    },
    /// Ephemeral selection broadcast (relayed as-is).
    PresenterSelection {
        /// Originating user.
        from: UserId,
        /// Opaque payload.
        data: Value,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::{CellOperation, OpKind};

    fn envelope(message_type: &str, data: Value) -> RawEnvelope {
        RawEnvelope {
            message_type: message_type.to_string(),
            user_id: UserId::new(),
            timestamp: Utc::now(),
            data,
        }
    }

    #[test]
    fn unknown_type_is_reported_not_panicked() {
        let raw = envelope("not_a_real_type", Value::Null);
        assert!(matches!(
            ClientMessage::parse(&raw),
            Err(EnvelopeError::UnknownType(_))
        ));
    }

    #[test]
    fn diagram_operation_parses_batch() {
        let batch = MutationBatch {
            client_seq: 1,
            operations: vec![CellOperation {
                cell_id: "N1".into(),
                operation: OpKind::Add,
                data: None,
            }],
        };
        let raw = envelope("diagram_operation", serde_json::to_value(&batch).unwrap());
        let parsed = ClientMessage::parse(&raw).unwrap();
        assert!(matches!(parsed, ClientMessage::DiagramOperation(_)));
    }

    #[test]
    fn malformed_payload_is_reported() {
        let raw = envelope("diagram_operation", Value::String("nope".into()));
        assert!(matches!(
            ClientMessage::parse(&raw),
            Err(EnvelopeError::MalformedPayload { .. })
        ));
    }

    #[test]
    fn server_message_round_trips() {
        let msg = ServerMessage::Heartbeat;
        let json = serde_json::to_string(&msg).unwrap();
        let back: ServerMessage = serde_json::from_str(&json).unwrap();
        assert!(matches!(back, ServerMessage::Heartbeat));
    }
}
