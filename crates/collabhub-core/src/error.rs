//! The engine-wide error type.
//!
//! Errors are modeled as *kinds*, not bare types. `EngineError` gives each
//! kind a variant carrying whatever data its surfaced form (an `error`
//! message, an HTTP status for the REST layer, a `state_correction` payload)
//! needs.

use crate::ids::CellId;
use crate::message::CorrectionReason;
use thiserror::Error;

/// An engine-wide error, with enough structure to render either a websocket
/// `error`/`state_correction` message or an HTTP status code.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed or semantically invalid request payload.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Caller could not be authenticated.
    #[error("unauthorized")]
    Unauthorized,

    /// Caller is authenticated but lacks permission for this action.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The referenced resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request conflicts with current state (e.g. a duplicate action).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The caller exceeded a rate or quota limit.
    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimitExceeded {
        /// Seconds the caller must wait before retrying.
        retry_after_secs: u64,
    },

    /// A mutation batch was rejected; the origin must replace its local
    /// state with the attached authoritative snapshot.
    #[error("state correction: {reason:?}")]
    StateCorrection {
        /// Why the batch was rejected.
        reason: CorrectionReason,
        /// The cell ids the rejected batch attempted to touch.
        cell_ids: Vec<CellId>,
    },

    /// An unexpected internal failure. The session survives; this error is
    /// logged with its source and reported to the client as `server_error`.
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl EngineError {
    /// The error kind this variant surfaces as.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::Unauthorized => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::RateLimitExceeded { .. } => "rate_limit_exceeded",
            Self::StateCorrection { .. } => "state_correction",
            Self::Internal(_) => "server_error",
        }
    }

    /// The HTTP status code an out-of-band REST surface would use. Not used
    /// by the websocket transport, which reports `kind()` directly.
    #[must_use]
    pub fn http_status(&self) -> u16 {
        match self {
            Self::InvalidRequest(_) => 400,
            Self::Unauthorized => 401,
            Self::Forbidden(_) => 403,
            Self::NotFound(_) => 404,
            Self::Conflict(_) => 409,
            Self::RateLimitExceeded { .. } => 429,
            Self::StateCorrection { .. } => 200,
            Self::Internal(_) => 500,
        }
    }
}
