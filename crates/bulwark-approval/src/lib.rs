//! Bulwark Approval - the human-in-the-loop half of mediation.
//!
//! Every action an agent proposes passes the mechanical guards first; what
//! survives is put in front of a human, unless an earlier decision already
//! covers it.
//!
//! - [`PermissionLedger`]: session-scoped grants keyed by actor, class and [`Scope`]
//! - [`ApprovalCoordinator`]: ledger lookup, single-flight prompting, edits
//! - [`ApprovalPresenter`]: the front end that shows an [`ApprovalRequest`]
//! - [`SecurityInterceptor`]: guards plus approval, one per session
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use bulwark_approval::{
//!     ApprovalPresenter, ApprovalRequest, PresenterResponse, SecurityInterceptor,
//! };
//! use bulwark_core::SecurityPolicy;
//! use bulwark_workspace::AccessMode;
//!
//! struct AlwaysApprove;
//!
//! #[async_trait::async_trait]
//! impl ApprovalPresenter for AlwaysApprove {
//!     async fn present(&self, _request: ApprovalRequest) -> PresenterResponse {
//!         PresenterResponse::Approve
//!     }
//! }
//!
//! let dir = tempfile::tempdir().unwrap();
//! let root = dir.path().canonicalize().unwrap();
//! let policy = Arc::new(SecurityPolicy::new([&root]).unwrap());
//! let interceptor = SecurityInterceptor::new(policy, Arc::new(AlwaysApprove), &root).unwrap();
//!
//! let runtime = tokio::runtime::Runtime::new().unwrap();
//! runtime.block_on(async {
//!     let outcome = interceptor
//!         .guard_and_approve_file("notes/today.md", AccessMode::write())
//!         .await;
//!     assert!(outcome.is_proceed());
//!
//!     let outcome = interceptor.guard_and_approve_command("rm -rf /").await;
//!     assert!(outcome.is_abort());
//! });
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod action;
pub mod coordinator;
/// Error types and results for the approval module.
pub mod error;
pub mod interceptor;
pub mod ledger;
pub mod presenter;
pub mod request;

pub use action::ProposedAction;
pub use coordinator::{ApprovalCoordinator, ApprovalDefaults};
pub use error::{ApprovalError, ApprovalResult};
pub use interceptor::SecurityInterceptor;
pub use ledger::{Decision, Expiry, Grant, PermissionLedger, Scope, Subject};
pub use presenter::{ApprovalPresenter, PromptQueue};
pub use request::{ApprovalRequest, PresenterResponse, RequestId};
