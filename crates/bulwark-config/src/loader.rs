//! Policy file loading.
//!
//! A policy file is parsed as a TOML tree and merged over the embedded
//! `defaults.toml`: tables merge key by key, every other value (arrays
//! included) replaces the default. The merged tree is then deserialized into
//! a [`PolicyConfig`] and validated.

use std::path::Path;

use tracing::{debug, info};

use crate::error::{ConfigError, ConfigResult};
use crate::types::PolicyConfig;
use crate::validate;

/// Embedded default policy.
const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Maximum accepted policy file size (1 MiB).
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// Load a policy file merged over the embedded defaults.
///
/// With `path = None` only the defaults are used, which fails validation
/// because the defaults carry no roots; callers normally add roots with
/// [`PolicyConfig::with_root`] before validating in that case.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read or parsed, or if the
/// merged result fails validation.
pub fn load(path: Option<&Path>) -> ConfigResult<PolicyConfig> {
    let mut merged = defaults()?;

    if let Some(path) = path {
        let overlay = read_file(path)?;
        deep_merge(&mut merged, overlay);
        info!(path = %path.display(), "loaded policy file");
    }

    let config = deserialize(merged, "<merged policy>")?;
    validate::validate(&config)?;
    Ok(config)
}

/// Parse policy text merged over the embedded defaults.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the text is not valid TOML, contains unknown
/// keys, or fails validation.
pub fn from_toml_str(text: &str) -> ConfigResult<PolicyConfig> {
    let mut merged = defaults()?;
    let overlay = parse(text, "<inline policy>")?;
    deep_merge(&mut merged, overlay);
    let config = deserialize(merged, "<inline policy>")?;
    validate::validate(&config)?;
    Ok(config)
}

/// The embedded defaults, without validation.
///
/// # Errors
///
/// Only fails if the embedded file is malformed.
pub fn default_config() -> ConfigResult<PolicyConfig> {
    deserialize(defaults()?, "<embedded defaults>")
}

fn defaults() -> ConfigResult<toml::Value> {
    parse(DEFAULTS_TOML, "<embedded defaults>")
}

fn parse(text: &str, origin: &str) -> ConfigResult<toml::Value> {
    toml::from_str(text).map_err(|e| ConfigError::ParseError {
        path: origin.to_owned(),
        source: e,
    })
}

fn deserialize(value: toml::Value, origin: &str) -> ConfigResult<PolicyConfig> {
    value
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::ParseError {
            path: origin.to_owned(),
            source: e,
        })
}

/// Read and parse a file in one pass, checking its size after the read.
fn read_file(path: &Path) -> ConfigResult<toml::Value> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    if content.len() as u64 > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!(
                "policy file is {} bytes, exceeding the {MAX_CONFIG_FILE_SIZE} byte limit",
                content.len()
            ),
        });
    }

    debug!(path = %path.display(), bytes = content.len(), "read policy file");
    parse(&content, &path.display().to_string())
}

fn deep_merge(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        base.insert(key, value);
                    },
                }
            }
        },
        (base, overlay) => *base = overlay,
    }
}
