//! Configuration types for the collaboration engine.
//!
//! All types in this module are self-contained with no dependency on any
//! other internal crate — `collabhub-session` converts these into the
//! concrete `Duration`/limit values its components need at the integration
//! boundary, mirroring the teacher workspace's "config crate has no
//! internal dependencies, conversion happens at the boundary" discipline.
//! Every struct implements [`Default`] with sensible values so a bare
//! `[section]` header in TOML (or no file at all) produces a working
//! configuration.

use serde::{Deserialize, Serialize};

/// Root configuration for the collaboration engine.
///
/// Loaded from layered TOML files (system, user, explicit override) with
/// environment variable fallbacks. See [`crate::loader::load`] for the
/// precedence chain.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// `DiagramSession` lifecycle and history bounds.
    pub session: SessionConfig,
    /// `ClientConnection` framing, liveness, and backpressure.
    pub connection: ConnectionConfig,
    /// Sliding-window rate limiting defaults.
    pub rate_limit: RateLimitConfig,
    /// `BackgroundWorkers` schedule and thresholds.
    pub workers: WorkersConfig,
    /// Logging.
    pub telemetry: TelemetryConfig,
    /// Transport accept loop binding.
    pub server: ServerConfig,
}

/// Session lifecycle knobs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// A session with no participants, or whose last activity is older than
    /// this, is reaped by the hub (default 15 minutes).
    pub idle_timeout_secs: u64,
    /// Maximum entries kept in the undo stack (default 100).
    pub undo_stack_limit: usize,
    /// Maximum entries kept in the redo stack (default 100).
    pub redo_stack_limit: usize,
    /// Bounded wait for a new participant's registration to be accepted
    /// into the session loop before the connection is refused (default 5
    /// seconds).
    pub registration_timeout_secs: u64,
    /// Grace period the session loop gets to drain outbound queues after a
    /// stop signal before it is forcibly dropped (default 1 second).
    pub shutdown_grace_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: 15 * 60,
            undo_stack_limit: 100,
            redo_stack_limit: 100,
            registration_timeout_secs: 5,
            shutdown_grace_secs: 1,
        }
    }
}

/// `ClientConnection` knobs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Per-message size limit enforced by the reader (default 50 KB).
    pub max_message_bytes: usize,
    /// Read deadline, refreshed on pong (default 60s).
    pub read_timeout_secs: u64,
    /// Ping interval (default 30s).
    pub ping_interval_secs: u64,
    /// Write deadline (default 10s).
    pub write_timeout_secs: u64,
    /// Bounded outbound queue depth per participant (default 256).
    /// Exceeding this triggers backpressure kick.
    pub outbound_queue_capacity: usize,
    /// Allowed `Origin` hosts for the transport upgrade, in addition to the
    /// request host itself. Empty in dev mode accepts all origins.
    pub allowed_origins: Vec<String>,
    /// Accept every `Origin` header unconditionally (dev mode).
    pub dev_mode: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            max_message_bytes: 50 * 1024,
            read_timeout_secs: 60,
            ping_interval_secs: 30,
            write_timeout_secs: 10,
            outbound_queue_capacity: 256,
            allowed_origins: Vec::new(),
            dev_mode: false,
        }
    }
}

/// Rate limiting defaults, consumed by `collabhub-ratelimit`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Default per-minute request limit when no quota row exists.
    pub default_per_minute: u32,
    /// Default per-hour request limit when no quota row exists.
    pub default_per_hour: u32,
    /// Default concurrent-invocation limit when no quota row exists.
    pub default_concurrent: u32,
    /// Extra seconds added to a sliding-window key's TTL beyond the window
    /// itself (`TTL = window + 60s`).
    pub key_ttl_padding_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            default_per_minute: 60,
            default_per_hour: 1_000,
            default_concurrent: 5,
            key_ttl_padding_secs: 60,
        }
    }
}

/// Background worker schedule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkersConfig {
    /// How often the session reaper sweeps. Independent of the idle
    /// threshold itself (`session.idle_timeout_secs`).
    pub reaper_interval_secs: u64,
    /// How often `WebhookCleanupWorker` runs (default hourly).
    pub webhook_cleanup_interval_secs: u64,
    /// Delete delivery records older than this many days (default 30).
    pub delivery_retention_days: i64,
    /// Mark subscriptions idle longer than this many days (default 90).
    pub idle_threshold_days: i64,
    /// Failure count threshold for the failure-based mark (default 10).
    pub failure_count_threshold: u32,
    /// Window, in days, within which at least one success must have
    /// occurred to avoid the failure-based mark (default 7).
    pub failure_window_days: i64,
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self {
            reaper_interval_secs: 60,
            webhook_cleanup_interval_secs: 60 * 60,
            delivery_retention_days: 30,
            idle_threshold_days: 90,
            failure_count_threshold: 10,
            failure_window_days: 7,
        }
    }
}

/// Logging configuration, converted to a `collabhub_telemetry::LogConfig`
/// at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Base level directive, e.g. `"info"`.
    pub level: String,
    /// `"pretty"`, `"compact"`, or `"json"`.
    pub format: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// Transport accept loop binding, consumed by the `collabhub-server` binary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the websocket accept loop binds to, e.g. `"127.0.0.1:8080"`.
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
        }
    }
}
