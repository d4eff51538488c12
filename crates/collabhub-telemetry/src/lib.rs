//! Collabhub Telemetry — logging and tracing setup for the collaboration
//! engine.
//!
//! `RequestContext` (a typed, explicitly-threaded context, not a dynamic
//! context bag) lives in `collabhub-core` since every crate needs it, not
//! just this one. This
//! crate is only responsible for turning a [`LogConfig`] into an installed
//! `tracing` subscriber.
//!
//! # Example
//!
//! ```rust,no_run
//! use collabhub_telemetry::{LogConfig, LogFormat, setup_logging};
//!
//! # fn main() -> Result<(), collabhub_telemetry::TelemetryError> {
//! let config = LogConfig::new("info")
//!     .with_format(LogFormat::Json)
//!     .with_directive("collabhub_session=debug");
//!
//! setup_logging(&config)?;
//! tracing::info!("collaboration engine starting");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

mod error;
mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{LogConfig, LogFormat, LogTarget, setup_default_logging, setup_logging};
