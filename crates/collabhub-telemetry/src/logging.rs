//! `tracing`-subscriber setup.

use crate::error::{TelemetryError, TelemetryResult};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Output encoding for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable, colorized when stdout is a tty.
    Pretty,
    /// Compact single-line-per-event format.
    Compact,
    /// Newline-delimited JSON, for ingestion by a log pipeline.
    Json,
}

/// Where log output goes.
#[derive(Debug, Clone)]
pub enum LogTarget {
    /// Standard error (the default — keeps stdout free for protocol
    /// traffic if this process ever speaks a line protocol on stdout).
    Stderr,
    /// A rolling file under the given directory.
    File {
        /// Directory log files are written into.
        directory: PathBuf,
        /// File name prefix (a date suffix is appended by the appender).
        prefix: String,
    },
}

/// Logging configuration, built up with a small builder API and handed to
/// [`setup_logging`].
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Base level directive (e.g. `"info"`, `"debug"`).
    pub level: String,
    /// Additional per-target directives appended to the base level, e.g.
    /// `"collabhub_session=trace"`.
    pub directives: Vec<String>,
    /// Output encoding.
    pub format: LogFormat,
    /// Output destination.
    pub target: LogTarget,
    /// Include span enter/exit/close events in the output. Noisy; off by
    /// default.
    pub span_events: bool,
}

impl LogConfig {
    /// A config with the given base level, `Pretty` format, writing to
    /// stderr.
    #[must_use]
    pub fn new(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            directives: Vec::new(),
            format: LogFormat::Pretty,
            target: LogTarget::Stderr,
            span_events: false,
        }
    }

    /// Set the output format.
    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the output target.
    #[must_use]
    pub fn with_target(mut self, target: LogTarget) -> Self {
        self.target = target;
        self
    }

    /// Append a per-target directive, e.g. `"collabhub_ratelimit=debug"`.
    #[must_use]
    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }

    /// Enable span enter/exit event logging.
    #[must_use]
    pub fn with_span_events(mut self, enabled: bool) -> Self {
        self.span_events = enabled;
        self
    }

    fn env_filter(&self) -> TelemetryResult<EnvFilter> {
        let mut spec = self.level.clone();
        for directive in &self.directives {
            spec.push(',');
            spec.push_str(directive);
        }
        EnvFilter::try_new(spec).map_err(|e| TelemetryError::ConfigError(e.to_string()))
    }
}

/// Install a global `tracing` subscriber built from `config`.
///
/// Idempotent-in-intent but not idempotent-in-fact: `tracing`'s global
/// subscriber can only be set once per process. Callers (the daemon's
/// startup path) must call this exactly once; a second call returns
/// [`TelemetryError::InitError`].
pub fn setup_logging(config: &LogConfig) -> TelemetryResult<()> {
    let filter = config.env_filter()?;
    let span_events = if config.span_events {
        FmtSpan::ENTER | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let result = match (&config.format, &config.target) {
        (LogFormat::Json, LogTarget::Stderr) => tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_span_events(span_events)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        (LogFormat::Compact, LogTarget::Stderr) => tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_span_events(span_events)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        (LogFormat::Pretty, LogTarget::Stderr) => tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_span_events(span_events)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        (format, LogTarget::File { directory, prefix }) => {
            std::fs::create_dir_all(directory).map_err(TelemetryError::IoError)?;
            let appender = tracing_appender::rolling::daily(directory, prefix);
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            // Leak the guard: the writer must outlive the subscriber, and the
            // subscriber is global for the life of the process.
            std::mem::forget(guard);
            match format {
                LogFormat::Json => tracing_subscriber::registry()
                    .with(filter)
                    .with(
                        tracing_subscriber::fmt::layer()
                            .json()
                            .with_span_events(span_events)
                            .with_writer(non_blocking),
                    )
                    .try_init(),
                LogFormat::Compact => tracing_subscriber::registry()
                    .with(filter)
                    .with(
                        tracing_subscriber::fmt::layer()
                            .compact()
                            .with_span_events(span_events)
                            .with_writer(non_blocking),
                    )
                    .try_init(),
                LogFormat::Pretty => tracing_subscriber::registry()
                    .with(filter)
                    .with(
                        tracing_subscriber::fmt::layer()
                            .with_span_events(span_events)
                            .with_writer(non_blocking),
                    )
                    .try_init(),
            }
        },
    };

    result.map_err(|e| TelemetryError::InitError(e.to_string()))
}

/// Install a reasonable default: `info` level, pretty format, stderr.
/// Convenience for tests and small tools that don't need the full builder.
pub fn setup_default_logging() -> TelemetryResult<()> {
    setup_logging(&LogConfig::new("info"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_accumulates_directives() {
        let config = LogConfig::new("warn")
            .with_directive("collabhub_session=debug")
            .with_directive("collabhub_ratelimit=trace");
        let filter = config.env_filter().unwrap();
        // `EnvFilter` doesn't expose its directives for inspection; this
        // just asserts the spec string was accepted.
        assert!(format!("{filter}").contains("warn"));
    }
}
