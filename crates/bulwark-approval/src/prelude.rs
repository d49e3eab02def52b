//! Prelude module - commonly used types for convenient import.
//!
//! Use `use bulwark_approval::prelude::*;` to import all essential types.

// Session entry point
pub use crate::{ApprovalError, ApprovalResult, SecurityInterceptor};

// Presentation boundary
pub use crate::{ApprovalPresenter, ApprovalRequest, PresenterResponse, ProposedAction};

// Ledger
pub use crate::{ApprovalDefaults, Decision, Expiry, Grant, PermissionLedger, Scope};
