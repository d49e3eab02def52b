//! Bulwark Core - Foundation types for the Bulwark mediation kernel.
//!
//! This crate provides:
//! - The immutable, session-scoped [`SecurityPolicy`]
//! - The mechanical rejection taxonomy ([`RejectionReason`])
//! - The outcome type returned to callers ([`Outcome`], [`AbortReason`], [`Refusal`])
//! - Identifier and timestamp types shared by the guards and the approval layer
//!
//! Nothing in this crate performs I/O other than canonicalizing policy roots
//! when a [`SecurityPolicy`] is constructed.
//!
//! # Example
//!
//! ```
//! use bulwark_core::{AbortReason, Outcome, RejectionReason};
//!
//! let outcome: Outcome<()> = Outcome::Abort(AbortReason::rejected(
//!     RejectionReason::PathTooLong { length: 5000, limit: 4096 },
//! ));
//! let refusal = outcome.refusal().unwrap();
//! assert_eq!(refusal.code, "path_too_long");
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod error;
pub mod outcome;
pub mod policy;
pub mod types;

pub use error::{PolicyError, PolicyResult, RejectionReason};
pub use outcome::{AbortReason, Outcome, Refusal};
pub use policy::SecurityPolicy;
pub use types::{ActionClass, ActorId, SessionId, Timestamp};
