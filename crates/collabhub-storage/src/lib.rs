//! Collabhub Storage — `SurrealDB`-backed durable persistence for the
//! collaboration engine's two out-of-session stores:
//!
//! - [`DiagramStore`](collabhub_core::DiagramStore) — the diagram snapshot a
//!   `DiagramSession` loads on first open and writes back after every
//!   accepted mutation.
//! - [`WebhookSubscriptionStore`](collabhub_core::WebhookSubscriptionStore)
//!   — subscription rows `WebhookCleanupWorker` ages out.
//!
//! Each has a `Surreal*` implementation here and an `InMemory*` counterpart
//! for tests and single-node dev runs without a configured endpoint,
//! mirroring the teacher workspace's `Database` wrapper
//! (`astrid-storage::db::Database`) generalized from an identity/capability
//! store to this engine's two durable rows.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod db;
pub mod diagram_store;
pub mod error;
pub mod webhook_store;

pub use db::Database;
pub use diagram_store::{InMemoryDiagramStore, SurrealDiagramStore};
pub use error::{StorageError, StorageResult};
pub use webhook_store::{InMemoryWebhookSubscriptionStore, SurrealWebhookSubscriptionStore};
