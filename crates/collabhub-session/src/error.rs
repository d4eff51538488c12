//! Session-layer errors.

use thiserror::Error;

/// Errors surfaced by [`crate::hub::SessionHub`], [`crate::session::DiagramSession`],
/// and [`crate::connection::ClientConnection`].
#[derive(Debug, Error)]
pub enum SessionError {
    /// A diagram id did not parse as a valid identifier.
    #[error("invalid diagram id: {0}")]
    InvalidDiagramId(String),

    /// Registration into a session's event loop did not complete within the
    /// bounded wait (default 5s).
    #[error("session registration timed out")]
    RegistrationTimeout,

    /// The session is shutting down and can no longer accept new work.
    #[error("session is shutting down")]
    SessionTerminating,

    /// The caller's role does not permit the requested action.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Any other failure, wrapped for propagation.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Convenience alias for session-layer results.
pub type SessionResult<T> = Result<T, SessionError>;
