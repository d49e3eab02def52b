//! Path guard: mechanical validation of filesystem paths.
//!
//! Every check that decides whether a path is inside the allowed roots runs
//! on the canonical form produced by [`crate::resolve`], never on the raw
//! string. The raw string is only inspected for things that canonicalization
//! would hide: its length, NUL bytes, and percent-encoded separators.

use bulwark_core::{RejectionReason, SecurityPolicy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::resolve::{ResolveError, resolve};

/// Result of validating a path: the canonical path, or why it was refused.
pub type PathValidationResult = Result<PathBuf, RejectionReason>;

/// Characters with meaning to a POSIX shell.
pub const SHELL_METACHARACTERS: &[char] = &[
    ';', '|', '&', '$', '`', '<', '>', '(', ')', '{', '}', '*', '?', '!', '\n', '\r', '\'', '"',
    '\\',
];

/// Percent-encoded dot, slash and backslash.
const ENCODED_TRAVERSAL: &[&str] = &["%2e", "%2f", "%5c"];

/// What the caller intends to do with a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum AccessMode {
    /// Read a file's contents or list a directory.
    Read,
    /// Create or overwrite a file.
    Write {
        /// Length of the content about to be written, if known.
        len: Option<u64>,
    },
    /// Use the path as a working directory.
    Directory,
    /// The path is mentioned (e.g. as a command argument); boundary checks only.
    Reference,
}

impl AccessMode {
    /// A write of unknown length.
    #[must_use]
    pub fn write() -> Self {
        Self::Write { len: None }
    }

    /// Whether the extension allow-list and size limit apply.
    #[must_use]
    pub fn checks_content(&self) -> bool {
        matches!(self, Self::Read | Self::Write { .. })
    }
}

/// Validates paths against a [`SecurityPolicy`].
///
/// Stateless apart from the shared policy; safe to clone and to call
/// concurrently.
#[derive(Debug, Clone)]
pub struct PathGuard {
    policy: Arc<SecurityPolicy>,
}

impl PathGuard {
    /// Create a guard over `policy`.
    #[must_use]
    pub fn new(policy: Arc<SecurityPolicy>) -> Self {
        Self { policy }
    }

    /// The policy this guard enforces.
    #[must_use]
    pub fn policy(&self) -> &SecurityPolicy {
        &self.policy
    }

    /// Validate `raw`, resolved relative to `cwd`, against the policy roots.
    ///
    /// On success the returned path is absolute, symlink-free, and under an
    /// allowed root; validating it again yields the same path.
    ///
    /// # Errors
    ///
    /// Returns the [`RejectionReason`] for the first failed check.
    pub fn validate(&self, raw: &str, cwd: &Path, mode: AccessMode) -> PathValidationResult {
        self.validate_within(raw, cwd, self.policy.allowed_roots(), mode)
    }

    /// Like [`validate`](Self::validate), but the canonical path must also lie
    /// under one of `intended_roots` (which are themselves resolved first).
    ///
    /// # Errors
    ///
    /// Returns the [`RejectionReason`] for the first failed check.
    pub fn validate_within(
        &self,
        raw: &str,
        cwd: &Path,
        intended_roots: &[PathBuf],
        mode: AccessMode,
    ) -> PathValidationResult {
        self.check_raw(raw)?;

        let canonical = resolve(Path::new(raw), cwd).map_err(|e| {
            warn!(error = %e, "path resolution failed");
            match e {
                ResolveError::SymlinkLoop { .. } => RejectionReason::PathTraversal {
                    detail: "symlink loop".to_string(),
                },
                ResolveError::Io { .. } => RejectionReason::PathTraversal {
                    detail: "path could not be resolved".to_string(),
                },
            }
        })?;

        if !self.policy.is_within_roots(&canonical) || !within_any(&canonical, intended_roots, cwd)
        {
            debug!(path = %canonical.display(), "path outside allowed roots");
            return Err(RejectionReason::OutsideAllowedRoot {
                path: canonical.display().to_string(),
            });
        }

        self.check_mode(&canonical, mode)?;
        Ok(canonical)
    }

    /// Validate a path that will be interpolated into text interpreted by a
    /// shell or another parser. Adds a metacharacter screen on top of
    /// [`validate`](Self::validate).
    ///
    /// # Errors
    ///
    /// Returns the [`RejectionReason`] for the first failed check, including
    /// [`RejectionReason::ShellMetacharacter`].
    pub fn validate_for_interpolation(
        &self,
        raw: &str,
        cwd: &Path,
        mode: AccessMode,
    ) -> PathValidationResult {
        let canonical = self.validate(raw, cwd, mode)?;
        if let Some(character) = canonical
            .to_string_lossy()
            .chars()
            .find(|c| SHELL_METACHARACTERS.contains(c))
        {
            debug!(?character, "path contains shell metacharacter");
            return Err(RejectionReason::ShellMetacharacter { character });
        }
        Ok(canonical)
    }

    fn check_raw(&self, raw: &str) -> Result<(), RejectionReason> {
        let limit = self.policy.max_path_length();
        if raw.len() > limit {
            return Err(RejectionReason::PathTooLong {
                length: raw.len(),
                limit,
            });
        }
        if raw.is_empty() {
            return Err(RejectionReason::PathTraversal {
                detail: "empty path".to_string(),
            });
        }
        if raw.contains('\0') {
            warn!("path contains NUL byte");
            return Err(RejectionReason::PathTraversal {
                detail: "NUL byte".to_string(),
            });
        }
        let lower = raw.to_ascii_lowercase();
        if let Some(encoded) = ENCODED_TRAVERSAL.iter().find(|e| lower.contains(**e)) {
            warn!(encoded, "path contains percent-encoded separator");
            return Err(RejectionReason::PathTraversal {
                detail: format!("percent-encoded sequence {encoded}"),
            });
        }
        Ok(())
    }

    fn check_mode(&self, canonical: &Path, mode: AccessMode) -> Result<(), RejectionReason> {
        let metadata = std::fs::metadata(canonical).ok();
        let is_dir = metadata.as_ref().is_some_and(std::fs::Metadata::is_dir);

        match mode {
            AccessMode::Reference => return Ok(()),
            AccessMode::Directory => {
                if metadata.is_some() && !is_dir {
                    return Err(RejectionReason::PathTraversal {
                        detail: "not a directory".to_string(),
                    });
                }
                return Ok(());
            },
            AccessMode::Read | AccessMode::Write { .. } => {},
        }

        // Listing a directory is a read; the content checks do not apply.
        if is_dir && mode == AccessMode::Read {
            return Ok(());
        }

        let extension = canonical.extension().map(|e| e.to_string_lossy());
        if !self.policy.extension_allowed(extension.as_deref()) {
            return Err(RejectionReason::DisallowedExtension {
                extension: extension.unwrap_or_default().to_lowercase(),
            });
        }

        let limit = self.policy.max_file_size();
        if let Some(size) = metadata.as_ref().filter(|m| m.is_file()).map(std::fs::Metadata::len)
            && size > limit
        {
            return Err(RejectionReason::SizeLimitExceeded { size, limit });
        }
        if let AccessMode::Write { len: Some(len) } = mode
            && len > limit
        {
            return Err(RejectionReason::SizeLimitExceeded { size: len, limit });
        }

        Ok(())
    }
}

fn within_any(canonical: &Path, roots: &[PathBuf], cwd: &Path) -> bool {
    roots.iter().any(|root| {
        resolve(root, cwd).is_ok_and(|root| canonical.starts_with(root))
    })
}

#[cfg(test)]
#[path = "boundaries_tests.rs"]
mod tests;
