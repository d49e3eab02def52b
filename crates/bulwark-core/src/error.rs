//! Rejection taxonomy and policy construction errors.
//!
//! A [`RejectionReason`] is a *value*: it describes why a path or command was
//! refused by a guard. It is never retried and never forwarded to approval.
//! The variant payloads carry detail meant for logs; anything shown to the
//! model goes through [`RejectionReason::summary`], which omits paths and
//! policy contents.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Why a guard mechanically rejected an action.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum RejectionReason {
    /// The raw path tried to traverse out through encoding, NUL bytes,
    /// or a symlink loop.
    #[error("path traversal: {detail}")]
    PathTraversal {
        /// What was detected.
        detail: String,
    },

    /// The canonical path is not under any allowed root.
    #[error("path outside allowed roots: {path}")]
    OutsideAllowedRoot {
        /// The canonical path that escaped.
        path: String,
    },

    /// The file extension is not on the allow-list.
    #[error("extension not allowed: {extension:?}")]
    DisallowedExtension {
        /// The offending extension, lower-cased, without the dot.
        extension: String,
    },

    /// The file (or the content about to be written) is too large.
    #[error("size {size} exceeds limit {limit}")]
    SizeLimitExceeded {
        /// Observed size in bytes.
        size: u64,
        /// Configured maximum in bytes.
        limit: u64,
    },

    /// The raw path is longer than allowed.
    #[error("path length {length} exceeds limit {limit}")]
    PathTooLong {
        /// Observed length in bytes.
        length: usize,
        /// Configured maximum in bytes.
        limit: usize,
    },

    /// The path contains a character with shell meaning and is destined
    /// for interpolation.
    #[error("path contains shell metacharacter {character:?}")]
    ShellMetacharacter {
        /// The first offending character.
        character: char,
    },

    /// The command matches a banned pattern.
    #[error("command matches banned pattern '{pattern}'")]
    BannedCommand {
        /// The banned pattern that matched.
        pattern: String,
    },

    /// A directory change would leave the allowed roots.
    #[error("directory change rejected: {target}")]
    DirectoryEscape {
        /// The requested target, as given.
        target: String,
    },

    /// One of the command's arguments is a path that failed validation.
    #[error("argument {index} rejected: {inner}")]
    ArgumentPathRejected {
        /// Position of the argument in argv (0 is the executable).
        index: usize,
        /// Why the path guard refused it.
        inner: Box<RejectionReason>,
    },

    /// The invocation uses shell syntax the guard will not model.
    #[error("unsupported shell syntax: {detail}")]
    UnsupportedSyntax {
        /// What was found.
        detail: String,
    },
}

impl RejectionReason {
    /// Stable machine-readable code for this reason.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::PathTraversal { .. } => "path_traversal",
            Self::OutsideAllowedRoot { .. } => "outside_allowed_root",
            Self::DisallowedExtension { .. } => "disallowed_extension",
            Self::SizeLimitExceeded { .. } => "size_limit_exceeded",
            Self::PathTooLong { .. } => "path_too_long",
            Self::ShellMetacharacter { .. } => "shell_metacharacter",
            Self::BannedCommand { .. } => "banned_command",
            Self::DirectoryEscape { .. } => "directory_escape",
            Self::ArgumentPathRejected { .. } => "argument_path_rejected",
            Self::UnsupportedSyntax { .. } => "unsupported_syntax",
        }
    }

    /// Human-readable summary safe to show in a model transcript.
    ///
    /// Never includes paths, patterns, or limits.
    #[must_use]
    pub fn summary(&self) -> String {
        match self {
            Self::PathTraversal { .. } => "the path attempts to traverse outside the workspace",
            Self::OutsideAllowedRoot { .. } => "the path is outside the allowed workspace",
            Self::DisallowedExtension { .. } => "files of this type may not be accessed",
            Self::SizeLimitExceeded { .. } => "the file exceeds the maximum allowed size",
            Self::PathTooLong { .. } => "the path is too long",
            Self::ShellMetacharacter { .. } => "the path contains characters with shell meaning",
            Self::BannedCommand { .. } => "this command is not permitted",
            Self::DirectoryEscape { .. } => {
                "changing to that directory would leave the allowed workspace"
            },
            Self::ArgumentPathRejected { .. } => {
                "one of the command's arguments refers to a disallowed path"
            },
            Self::UnsupportedSyntax { .. } => {
                "the command uses shell syntax that cannot be run safely; pass a single command"
            },
        }
        .to_string()
    }

    /// Wrap this reason as a rejected command argument.
    #[must_use]
    pub fn for_argument(self, index: usize) -> Self {
        Self::ArgumentPathRejected {
            index,
            inner: Box::new(self),
        }
    }
}

/// Errors raised while constructing a [`crate::SecurityPolicy`].
#[derive(Debug, Error)]
pub enum PolicyError {
    /// No allowed roots were supplied.
    #[error("policy has no allowed roots")]
    NoRoots,

    /// A root was not absolute.
    #[error("allowed root must be absolute: {0}")]
    RelativeRoot(PathBuf),

    /// A root could not be canonicalized.
    #[error("allowed root unavailable: {path}: {source}")]
    RootUnavailable {
        /// The configured root.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A root exists but is not a directory.
    #[error("allowed root is not a directory: {0}")]
    RootNotDirectory(PathBuf),
}

/// Result type for policy construction.
pub type PolicyResult<T> = Result<T, PolicyError>;
