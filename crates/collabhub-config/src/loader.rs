//! Config file discovery and layered loading.
//!
//! Precedence, highest to lowest:
//!
//! 1. An explicit override file, if the caller passed one.
//! 2. The user config (`~/.config/collabhub/config.toml`, via
//!    `directories`).
//! 3. The system config (`/etc/collabhub/config.toml`).
//! 4. Environment variable fallbacks (`COLLABHUB_*`) — only for fields not
//!    set by any file layer.
//! 5. [`Config::default`].
//!
//! Each layer is parsed as a `toml::Value` and deep-merged into the
//! accumulator (later layers win), then the merged tree is deserialized
//! once into [`Config`] and validated.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;
use crate::validate;

/// Merge `overlay` into `base`, with `overlay`'s scalars and arrays
/// overriding `base`'s, and tables merged key-by-key recursively.
fn deep_merge(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_value) in overlay_table {
                match base_table.get_mut(&key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => {
                        base_table.insert(key, overlay_value);
                    },
                }
            }
        },
        (base_slot, overlay_value) => {
            *base_slot = overlay_value;
        },
    }
}

fn parse_layer(path: &Path) -> ConfigResult<Option<toml::Value>> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let value: toml::Value = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source: Box::new(source),
    })?;
    Ok(Some(value))
}

/// The system-wide config path, `/etc/collabhub/config.toml`.
#[must_use]
pub fn system_config_path() -> PathBuf {
    PathBuf::from("/etc/collabhub/config.toml")
}

/// The current user's config path, `~/.config/collabhub/config.toml`.
#[must_use]
pub fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "collabhub")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Load configuration with the full precedence chain described in the
/// module docs.
///
/// # Errors
///
/// Returns a [`ConfigError`] if any layer exists but fails to parse, or if
/// the fully-merged configuration fails validation.
pub fn load(override_path: Option<&Path>) -> ConfigResult<Config> {
    let mut merged = toml::Value::Table(toml::map::Map::new());

    if let Some(system) = parse_layer(&system_config_path())? {
        debug!("applying system config layer");
        deep_merge(&mut merged, system);
    }
    if let Some(user_path) = user_config_path() {
        if let Some(user) = parse_layer(&user_path)? {
            debug!(path = %user_path.display(), "applying user config layer");
            deep_merge(&mut merged, user);
        }
    }
    if let Some(path) = override_path {
        let overlay = parse_layer(path)?.ok_or_else(|| ConfigError::Read {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "config file not found"),
        })?;
        debug!(path = %path.display(), "applying explicit override config layer");
        deep_merge(&mut merged, overlay);
    }

    let mut config: Config = merged
        .try_into()
        .map_err(|source| ConfigError::Parse {
            path: PathBuf::from("<merged>"),
            source: Box::new(source),
        })?;

    apply_env_fallbacks(&mut config)?;
    validate::validate(&config)?;
    Ok(config)
}

/// Load configuration from a single file with no layering, still validated.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read, parsed, or fails
/// validation.
pub fn load_file(path: &Path) -> ConfigResult<Config> {
    let value = parse_layer(path)?.ok_or_else(|| ConfigError::Read {
        path: path.to_path_buf(),
        source: std::io::Error::new(std::io::ErrorKind::NotFound, "config file not found"),
    })?;
    let mut config: Config = value.try_into().map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source: Box::new(source),
    })?;
    apply_env_fallbacks(&mut config)?;
    validate::validate(&config)?;
    Ok(config)
}

/// Apply `COLLABHUB_*` environment variable fallbacks for the handful of
/// fields operators most commonly want to override without a config file.
/// Lower precedence than any file layer: only applied when the field still
/// holds its [`Default`] value.
fn apply_env_fallbacks(config: &mut Config) -> ConfigResult<()> {
    let defaults = Config::default();

    if config.session.idle_timeout_secs == defaults.session.idle_timeout_secs {
        if let Some(v) = env_u64("COLLABHUB_SESSION_IDLE_TIMEOUT_SECS")? {
            config.session.idle_timeout_secs = v;
        }
    }
    if config.connection.max_message_bytes == defaults.connection.max_message_bytes {
        if let Some(v) = env_usize("COLLABHUB_CONNECTION_MAX_MESSAGE_BYTES")? {
            config.connection.max_message_bytes = v;
        }
    }
    if config.connection.dev_mode == defaults.connection.dev_mode {
        if let Ok(v) = std::env::var("COLLABHUB_DEV_MODE") {
            config.connection.dev_mode = v == "1" || v.eq_ignore_ascii_case("true");
        }
    }
    if config.rate_limit.default_per_minute == defaults.rate_limit.default_per_minute {
        if let Some(v) = env_u32("COLLABHUB_RATE_LIMIT_DEFAULT_PER_MINUTE")? {
            config.rate_limit.default_per_minute = v;
        }
    }
    if config.telemetry.level == defaults.telemetry.level {
        if let Ok(v) = std::env::var("COLLABHUB_LOG_LEVEL") {
            config.telemetry.level = v;
        }
    }
    if config.server.bind_addr == defaults.server.bind_addr {
        if let Ok(v) = std::env::var("COLLABHUB_SERVER_BIND_ADDR") {
            config.server.bind_addr = v;
        }
    }

    Ok(())
}

fn env_u64(var: &str) -> ConfigResult<Option<u64>> {
    match std::env::var(var) {
        Ok(value) => value
            .parse::<u64>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnvValue {
                var: var.to_string(),
                value,
            }),
        Err(_) => Ok(None),
    }
}

fn env_u32(var: &str) -> ConfigResult<Option<u32>> {
    match std::env::var(var) {
        Ok(value) => value
            .parse::<u32>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnvValue {
                var: var.to_string(),
                value,
            }),
        Err(_) => Ok(None),
    }
}

fn env_usize(var: &str) -> ConfigResult<Option<usize>> {
    match std::env::var(var) {
        Ok(value) => value
            .parse::<usize>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnvValue {
                var: var.to_string(),
                value,
            }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_layers_yield_defaults() {
        let config = load(None).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn explicit_override_layer_wins() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[session]\nidle_timeout_secs = 42").unwrap();
        let config = load(Some(file.path())).unwrap();
        assert_eq!(config.session.idle_timeout_secs, 42);
        // Untouched fields keep their defaults.
        assert_eq!(
            config.session.undo_stack_limit,
            Config::default().session.undo_stack_limit
        );
    }

    #[test]
    fn malformed_file_is_reported() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "not valid = = toml").unwrap();
        assert!(matches!(
            load(Some(file.path())),
            Err(ConfigError::Parse { .. })
        ));
    }
}
