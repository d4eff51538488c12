//! Post-merge configuration validation.
//!
//! Validates that a deserialized [`Config`] holds values within acceptable
//! ranges. Unlike the teacher's workspace-tightening enforcement, this
//! engine has no layer that is only allowed to *tighten* another — every
//! layer in `loader::load` is trusted equally, so validation here is purely
//! range/sanity checking.

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

/// Validate a fully-merged configuration, returning the first violation
/// found.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] describing the first out-of-range
/// field encountered.
pub fn validate(config: &Config) -> ConfigResult<()> {
    if config.session.idle_timeout_secs == 0 {
        return Err(ConfigError::Invalid(
            "session.idle_timeout_secs must be greater than 0".to_string(),
        ));
    }
    if config.session.registration_timeout_secs == 0 {
        return Err(ConfigError::Invalid(
            "session.registration_timeout_secs must be greater than 0".to_string(),
        ));
    }
    if config.connection.max_message_bytes == 0 {
        return Err(ConfigError::Invalid(
            "connection.max_message_bytes must be greater than 0".to_string(),
        ));
    }
    if config.connection.outbound_queue_capacity == 0 {
        return Err(ConfigError::Invalid(
            "connection.outbound_queue_capacity must be greater than 0".to_string(),
        ));
    }
    if config.connection.read_timeout_secs <= config.connection.ping_interval_secs {
        return Err(ConfigError::Invalid(
            "connection.read_timeout_secs must be greater than ping_interval_secs, or pongs \
             will never arrive in time to refresh the read deadline"
                .to_string(),
        ));
    }
    if config.rate_limit.default_per_minute == 0 {
        return Err(ConfigError::Invalid(
            "rate_limit.default_per_minute must be greater than 0".to_string(),
        ));
    }
    if config.rate_limit.default_per_hour < config.rate_limit.default_per_minute {
        return Err(ConfigError::Invalid(
            "rate_limit.default_per_hour must be at least default_per_minute".to_string(),
        ));
    }
    if config.workers.webhook_cleanup_interval_secs == 0 {
        return Err(ConfigError::Invalid(
            "workers.webhook_cleanup_interval_secs must be greater than 0".to_string(),
        ));
    }
    match config.telemetry.format.as_str() {
        "pretty" | "compact" | "json" => {},
        other => {
            return Err(ConfigError::Invalid(format!(
                "telemetry.format must be one of pretty|compact|json, got {other:?}"
            )));
        },
    }
    if config.server.bind_addr.trim().is_empty() {
        return Err(ConfigError::Invalid(
            "server.bind_addr must not be empty".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn zero_idle_timeout_is_rejected() {
        let mut config = Config::default();
        config.session.idle_timeout_secs = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn read_timeout_must_exceed_ping_interval() {
        let mut config = Config::default();
        config.connection.read_timeout_secs = config.connection.ping_interval_secs;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn unknown_telemetry_format_is_rejected() {
        let mut config = Config::default();
        config.telemetry.format = "xml".to_string();
        assert!(validate(&config).is_err());
    }
}
