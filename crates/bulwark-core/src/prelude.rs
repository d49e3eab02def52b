//! Prelude module - commonly used types for convenient import.
//!
//! Use `use bulwark_core::prelude::*;` to import all essential types.

// Policy
pub use crate::SecurityPolicy;

// Errors and rejections
pub use crate::{PolicyError, PolicyResult, RejectionReason};

// Outcomes
pub use crate::{AbortReason, Outcome, Refusal};

// Identifiers
pub use crate::{ActionClass, ActorId, SessionId, Timestamp};
