//! Bulwark Shell - the command guard.
//!
//! Validates agent-proposed command invocations and produces an argv that is
//! run directly, never re-parsed by a shell:
//!
//! - POSIX-style tokenizing that refuses anything beyond a single command
//! - Banned-pattern matching through wrapper utilities and `sh -c` scripts
//! - Directory changes and path-like arguments checked by the path guard
//! - Strict per-argument quoting for the rare case a shell line is needed
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use bulwark_core::{RejectionReason, SecurityPolicy};
//! use bulwark_shell::CommandGuard;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let root = dir.path().canonicalize().unwrap();
//! let guard = CommandGuard::new(Arc::new(SecurityPolicy::new([&root]).unwrap()));
//!
//! let cmd = guard.validate("git commit -m 'first; commit'", &root).unwrap();
//! assert_eq!(cmd.argv(), ["git", "commit", "-m", "first; commit"]);
//!
//! let err = guard.validate("nice rm -rf /", &root).unwrap_err();
//! assert!(matches!(err, RejectionReason::BannedCommand { .. }));
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod banned;
pub mod guard;
pub mod invocation;
pub mod quote;
pub mod tokenize;
mod unwrap;

pub use banned::{BannedList, BannedPattern};
pub use guard::{CommandGuard, CommandValidationResult, MAX_NESTING};
pub use invocation::{CommandKind, ValidatedCommand};
pub use quote::{quote_arg, render_shell_line};
pub use tokenize::tokenize;
