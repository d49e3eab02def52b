//! Post-merge policy validation.

use crate::error::{ConfigError, ConfigResult};
use crate::types::PolicyConfig;

/// Upper bound accepted for `max_path_length`.
const PATH_LENGTH_UPPER_BOUND: usize = 65_536;

/// Validate a merged policy file.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &PolicyConfig) -> ConfigResult<()> {
    validate_roots(config)?;
    validate_limits(config)?;
    validate_banned(config)?;
    Ok(())
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.to_owned(),
        message: message.into(),
    }
}

fn validate_roots(config: &PolicyConfig) -> ConfigResult<()> {
    if config.roots.is_empty() {
        return Err(invalid("roots", "at least one allowed root is required"));
    }
    for root in &config.roots {
        if !root.is_absolute() {
            return Err(invalid(
                "roots",
                format!("root '{}' must be an absolute path", root.display()),
            ));
        }
    }
    Ok(())
}

fn validate_limits(config: &PolicyConfig) -> ConfigResult<()> {
    if config.max_file_size == 0 {
        return Err(invalid("max_file_size", "must be greater than zero"));
    }
    if config.max_path_length == 0 || config.max_path_length > PATH_LENGTH_UPPER_BOUND {
        return Err(invalid(
            "max_path_length",
            format!("must be between 1 and {PATH_LENGTH_UPPER_BOUND}"),
        ));
    }
    Ok(())
}

fn validate_banned(config: &PolicyConfig) -> ConfigResult<()> {
    if let Some(pos) = config
        .banned_commands
        .iter()
        .position(|p| p.trim().is_empty())
    {
        return Err(invalid(
            "banned_commands",
            format!("entry {pos} is empty"),
        ));
    }
    Ok(())
}
