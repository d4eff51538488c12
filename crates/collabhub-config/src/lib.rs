//! Unified configuration for the collaboration engine.
//!
//! This crate provides a single [`Config`] type consolidating the session,
//! connection, rate-limit, and worker knobs the collaboration engine needs.
//!
//! # Usage
//!
//! ```rust,no_run
//! use collabhub_config::Config;
//!
//! let config = Config::load(None).unwrap();
//! println!("session idle timeout: {}s", config.session.idle_timeout_secs);
//! ```
//!
//! # Configuration Precedence
//!
//! From highest to lowest priority: an explicit override file, the user
//! config (`~/.config/collabhub/config.toml`), the system config
//! (`/etc/collabhub/config.toml`), `COLLABHUB_*` environment variables, and
//! finally [`Config::default`]. See [`loader`] for the full algorithm.
//!
//! # Design
//!
//! This crate has **no dependency on any other internal crate** — it only
//! depends on `serde`, `toml`, `thiserror`, `tracing`, and `directories`.
//! Conversion from config types to the domain types `collabhub-session`
//! actually runs on (`Duration`s, trait object wiring) happens at the
//! integration boundary, not here.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

/// Configuration error types.
pub mod error;
/// Configuration file discovery and layered loading.
pub mod loader;
/// Configuration struct definitions.
pub mod types;
/// Configuration validation rules.
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use types::{
    Config, ConnectionConfig, RateLimitConfig, ServerConfig, SessionConfig, TelemetryConfig, WorkersConfig,
};

impl Config {
    /// Load configuration with the full precedence chain.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if any config file is malformed or the
    /// final configuration fails validation.
    pub fn load(override_path: Option<&std::path::Path>) -> ConfigResult<Self> {
        loader::load(override_path)
    }

    /// Load configuration from a single file (no layering).
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read, parsed, or
    /// fails validation.
    pub fn load_file(path: &std::path::Path) -> ConfigResult<Self> {
        loader::load_file(path)
    }
}
