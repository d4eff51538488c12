//! Prelude module - commonly used types for convenient import.
//!
//! Use `use collabhub_core::prelude::*;` to import all essential types.

// Identifiers
pub use crate::{CellId, DiagramId, SessionId, UserId};

// Diagram data model
pub use crate::{Cell, Diagram, Edge, Node, Point, Size};

// Participants and roles
pub use crate::{Participant, Role};

// Operations and history
pub use crate::{CellOperation, HistoryEntry, MutationBatch, OpKind};

// Wire protocol
pub use crate::{ClientMessage, CorrectionReason, EnvelopeError, RawEnvelope, ServerMessage};

// Context and errors
pub use crate::{EngineError, RequestContext};

// External collaborator interfaces
pub use crate::{
    AccessChecker, DiagramStore, EventEmitter, OrderedSetStore, Quota, QuotaStore, ScoredMember,
    SubscriptionStatus, UserDirectory, WebhookSubscription, WebhookSubscriptionStore,
};
