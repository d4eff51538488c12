//! Collabhub Core - the data model and wire protocol shared by every crate
//! in the diagram collaboration engine.
//!
//! This crate provides:
//! - Typed identifiers (`DiagramId`, `SessionId`, `UserId`, `CellId`)
//! - The diagram data model (`Diagram`, `Cell`, `Node`, `Edge`)
//! - Participants and roles
//! - Cell operations, mutation batches, and undo/redo history entries
//! - The websocket wire envelope and typed client/server messages
//! - `RequestContext`, threaded explicitly through every handler
//! - `EngineError`, the engine-wide error type

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod context;
pub mod diagram;
pub mod error;
pub mod ids;
pub mod interfaces;
pub mod message;
pub mod operation;
pub mod participant;

pub use context::RequestContext;
pub use diagram::{Cell, Diagram, Edge, Node, Point, Size};
pub use error::EngineError;
pub use ids::{CellId, DiagramId, SessionId, UserId};
pub use interfaces::{
    AccessChecker, DiagramStore, EventEmitter, OrderedSetStore, Quota, QuotaStore, ScoredMember,
    SubscriptionStatus, UserDirectory, WebhookSubscription, WebhookSubscriptionStore,
};
pub use message::{ClientMessage, CorrectionReason, EnvelopeError, RawEnvelope, ServerMessage};
pub use operation::{CellOperation, HistoryEntry, MutationBatch, OpKind};
pub use participant::{Participant, Role};
