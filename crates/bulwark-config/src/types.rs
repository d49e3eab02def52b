//! Policy file model.

use bulwark_core::SecurityPolicy;
use bulwark_core::policy::{DEFAULT_MAX_FILE_SIZE, DEFAULT_MAX_PATH_LENGTH};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::ConfigResult;
use crate::validate;

/// How long an approval decision lasts, as written in a policy file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryChoice {
    /// Keep the decision for the rest of the session.
    Session,
    /// The decision covers a single action.
    OneShot,
}

/// `[approval]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApprovalSection {
    /// Expiry of grants recorded for file reads and writes.
    pub file_expiry: ExpiryChoice,
    /// Expiry of grants recorded for command execution.
    pub command_expiry: ExpiryChoice,
}

impl Default for ApprovalSection {
    fn default() -> Self {
        Self {
            file_expiry: ExpiryChoice::Session,
            command_expiry: ExpiryChoice::OneShot,
        }
    }
}

/// A policy file.
///
/// Deserialized from TOML merged over the embedded defaults; unknown keys are
/// rejected so that a typo never silently loosens the policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PolicyConfig {
    /// Allowed root directories (absolute).
    pub roots: Vec<PathBuf>,
    /// Banned command patterns.
    pub banned_commands: Vec<String>,
    /// Extension allow-list; empty allows all.
    pub allowed_extensions: Vec<String>,
    /// Maximum file size in bytes.
    pub max_file_size: u64,
    /// Maximum raw path length in bytes.
    pub max_path_length: usize,
    /// Approval expiry defaults.
    pub approval: ApprovalSection,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            banned_commands: bulwark_core::policy::DEFAULT_BANNED_COMMANDS
                .iter()
                .map(ToString::to_string)
                .collect(),
            allowed_extensions: Vec::new(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            max_path_length: DEFAULT_MAX_PATH_LENGTH,
            approval: ApprovalSection::default(),
        }
    }
}

impl PolicyConfig {
    /// Add an allowed root.
    #[must_use]
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.roots.push(root.into());
        self
    }

    /// Validate and build the immutable runtime policy.
    ///
    /// # Errors
    ///
    /// Returns a validation error for bad values, or a policy error if a
    /// root does not exist or is not a directory.
    pub fn into_policy(self) -> ConfigResult<SecurityPolicy> {
        validate::validate(&self)?;
        let policy = SecurityPolicy::new(&self.roots)?
            .with_banned_commands(self.banned_commands)
            .with_allowed_extensions(&self.allowed_extensions)
            .with_max_file_size(self.max_file_size)
            .with_max_path_length(self.max_path_length);
        tracing::debug!(
            roots = policy.allowed_roots().len(),
            banned = policy.banned_commands().len(),
            "built security policy"
        );
        Ok(policy)
    }
}
