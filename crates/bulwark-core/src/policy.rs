//! Security policy: the immutable, session-scoped rule set.
//!
//! A [`SecurityPolicy`] is built once per session and shared by reference
//! (`Arc<SecurityPolicy>`) with every guard. Its allowed roots are always
//! absolute and canonical: construction canonicalizes them, so no code path
//! can hold a policy whose boundary was expressed through a symlink.
//!
//! Nested roots are allowed; the effective boundary is the union.

use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::error::{PolicyError, PolicyResult};

/// Default maximum file size (10 MiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10_485_760;

/// Default maximum raw path length in bytes.
pub const DEFAULT_MAX_PATH_LENGTH: usize = 4096;

/// Banned command patterns applied when none are configured.
///
/// The first token is a glob over the executable name; remaining tokens must
/// all appear among the arguments.
pub const DEFAULT_BANNED_COMMANDS: &[&str] = &[
    "rm -rf /",
    "rm -rf ~",
    "sudo",
    "su",
    "doas",
    "mkfs",
    "mkfs.*",
    "dd",
    "shutdown",
    "reboot",
    "halt",
    "poweroff",
    "init",
    "chmod -R 777 /",
    "chown -R",
    ":(){",
];

/// Security policy for one session.
///
/// # Example
///
/// ```
/// use bulwark_core::SecurityPolicy;
///
/// let dir = tempfile::tempdir().unwrap();
/// let policy = SecurityPolicy::new([dir.path()])
///     .unwrap()
///     .with_allowed_extensions(["rs", ".TOML"])
///     .with_max_file_size(1024);
///
/// assert!(policy.extension_allowed(Some("toml")));
/// assert!(!policy.extension_allowed(Some("exe")));
/// assert!(policy.is_within_roots(&dir.path().canonicalize().unwrap().join("src")));
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct SecurityPolicy {
    allowed_roots: Vec<PathBuf>,
    banned_commands: Vec<String>,
    allowed_extensions: BTreeSet<String>,
    max_file_size: u64,
    max_path_length: usize,
}

impl SecurityPolicy {
    /// Create a policy over the given roots with default limits and the
    /// default banned-command list.
    ///
    /// # Errors
    ///
    /// Returns a [`PolicyError`] if no roots are given, a root is relative,
    /// cannot be canonicalized, or is not a directory.
    pub fn new<I, P>(roots: I) -> PolicyResult<Self>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut allowed_roots: Vec<PathBuf> = Vec::new();
        for root in roots {
            let root = root.as_ref();
            if !root.is_absolute() {
                return Err(PolicyError::RelativeRoot(root.to_path_buf()));
            }
            let canonical = root
                .canonicalize()
                .map_err(|source| PolicyError::RootUnavailable {
                    path: root.to_path_buf(),
                    source,
                })?;
            if !canonical.is_dir() {
                return Err(PolicyError::RootNotDirectory(root.to_path_buf()));
            }
            if !allowed_roots.contains(&canonical) {
                allowed_roots.push(canonical);
            }
        }
        if allowed_roots.is_empty() {
            return Err(PolicyError::NoRoots);
        }

        Ok(Self {
            allowed_roots,
            banned_commands: DEFAULT_BANNED_COMMANDS
                .iter()
                .map(ToString::to_string)
                .collect(),
            allowed_extensions: BTreeSet::new(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            max_path_length: DEFAULT_MAX_PATH_LENGTH,
        })
    }

    /// Replace the banned-command patterns.
    #[must_use]
    pub fn with_banned_commands<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.banned_commands = patterns
            .into_iter()
            .map(Into::into)
            .filter(|p: &String| !p.trim().is_empty())
            .collect();
        self
    }

    /// Replace the extension allow-list. Leading dots are stripped and
    /// entries are lower-cased. An empty list allows every extension.
    #[must_use]
    pub fn with_allowed_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.allowed_extensions = extensions
            .into_iter()
            .map(|e| e.as_ref().trim().trim_start_matches('.').to_lowercase())
            .collect();
        self
    }

    /// Set the maximum file size in bytes.
    #[must_use]
    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    /// Set the maximum raw path length in bytes.
    #[must_use]
    pub fn with_max_path_length(mut self, bytes: usize) -> Self {
        self.max_path_length = bytes;
        self
    }

    /// Canonical allowed roots.
    #[must_use]
    pub fn allowed_roots(&self) -> &[PathBuf] {
        &self.allowed_roots
    }

    /// Banned command patterns.
    #[must_use]
    pub fn banned_commands(&self) -> &[String] {
        &self.banned_commands
    }

    /// Extension allow-list (empty = everything allowed).
    #[must_use]
    pub fn allowed_extensions(&self) -> &BTreeSet<String> {
        &self.allowed_extensions
    }

    /// Maximum file size in bytes.
    #[must_use]
    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    /// Maximum raw path length in bytes.
    #[must_use]
    pub fn max_path_length(&self) -> usize {
        self.max_path_length
    }

    /// The most specific allowed root containing `path`, if any.
    ///
    /// `path` must already be canonical; this is a component-wise prefix test.
    #[must_use]
    pub fn root_containing(&self, path: &Path) -> Option<&Path> {
        self.allowed_roots
            .iter()
            .filter(|root| path.starts_with(root))
            .max_by_key(|root| root.components().count())
            .map(PathBuf::as_path)
    }

    /// Whether a canonical path lies under (or equals) an allowed root.
    #[must_use]
    pub fn is_within_roots(&self, path: &Path) -> bool {
        self.root_containing(path).is_some()
    }

    /// Whether a file extension passes the allow-list.
    ///
    /// `None` means the file has no extension; it passes only when the list
    /// is empty or contains the empty string.
    #[must_use]
    pub fn extension_allowed(&self, extension: Option<&str>) -> bool {
        if self.allowed_extensions.is_empty() {
            return true;
        }
        let ext = extension.unwrap_or_default().to_lowercase();
        self.allowed_extensions.contains(&ext)
    }
}
