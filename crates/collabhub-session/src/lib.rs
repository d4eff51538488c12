//! Collabhub Session - the realtime diagram collaboration engine.
//!
//! This crate provides:
//! - [`hub::SessionHub`] - the registry of live `DiagramSession`s, keyed by
//!   diagram id, with idle reaping
//! - [`session`] - the per-diagram actor: a single-writer event loop over
//!   join/leave/mutation/undo/redo/sync traffic
//! - [`operation_processor::OperationProcessor`] - the pure six-step batch
//!   validation/application pipeline
//! - [`connection::ClientConnection`] - the per-websocket reader/writer task
//!   pair bridging one transport connection to a session
//! - [`workers::BackgroundWorkers`] - the idle-session reaper and webhook
//!   subscription cleanup sweep
//! - [`services::Services`] - the collaborator aggregate assembled once at
//!   startup and shared across every session and worker
//!
//! # Architecture
//!
//! ```text
//! collabhub-session
//! ├── SessionHub            (registry + idle reap)
//! │   └── DiagramSession     (per-diagram actor, one per live diagram)
//! │       └── OperationProcessor  (pure batch validation/apply)
//! ├── ClientConnection       (per-websocket reader/writer)
//! ├── BackgroundWorkers      (reaper + webhook cleanup loops)
//! └── Services               (collaborator aggregate: access/storage/events/rate-limit)
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod connection;
pub mod error;
pub mod hub;
pub mod operation_processor;
pub mod services;
pub mod session;
pub mod workers;

pub use connection::ClientConnection;
pub use error::{SessionError, SessionResult};
pub use hub::SessionHub;
pub use operation_processor::{OperationProcessor, ProcessOutcome};
pub use services::Services;
pub use session::{SessionHandle, SessionSummary};
pub use workers::BackgroundWorkers;
