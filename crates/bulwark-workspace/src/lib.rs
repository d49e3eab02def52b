//! Bulwark Workspace - the path guard.
//!
//! This crate decides whether a raw path supplied by the agent may be touched
//! at all. It resolves the path to a canonical, symlink-free form and then
//! checks that form against the session's [`SecurityPolicy`](bulwark_core::SecurityPolicy):
//! allowed roots, extension allow-list, and size and length limits.
//!
//! Validation is pure apart from reading filesystem metadata; it never
//! creates, opens, or modifies anything.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use bulwark_core::{RejectionReason, SecurityPolicy};
//! use bulwark_workspace::{AccessMode, PathGuard};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let root = dir.path().canonicalize().unwrap();
//! let guard = PathGuard::new(Arc::new(SecurityPolicy::new([&root]).unwrap()));
//!
//! let ok = guard.validate("notes.md", &root, AccessMode::write()).unwrap();
//! assert_eq!(ok, root.join("notes.md"));
//!
//! let err = guard.validate("/etc/passwd", &root, AccessMode::Read).unwrap_err();
//! assert!(matches!(err, RejectionReason::OutsideAllowedRoot { .. }));
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod boundaries;
pub mod resolve;

pub use boundaries::{AccessMode, PathGuard, PathValidationResult, SHELL_METACHARACTERS};
pub use resolve::{MAX_SYMLINK_HOPS, ResolveError, resolve};
