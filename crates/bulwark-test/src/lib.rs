//! Bulwark Test - Shared test utilities for Bulwark.
//!
//! This crate provides a scripted presenter and a throwaway project
//! directory that can be used across Bulwark crates as a dev-dependency.
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! bulwark-test.workspace = true
//! ```
//!
//! Then use in your tests:
//!
//! ```rust,ignore
//! use bulwark_approval::PresenterResponse;
//! use bulwark_test::{MockPresenter, TestProject};
//! use bulwark_workspace::AccessMode;
//!
//! #[tokio::test]
//! async fn test_write_is_approved() {
//!     let project = TestProject::new();
//!     let presenter = MockPresenter::new().with_response(PresenterResponse::Approve);
//!     let interceptor = project.interceptor(presenter.clone());
//!
//!     let outcome = interceptor
//!         .guard_and_approve_file("src/lib.rs", AccessMode::write())
//!         .await;
//!     assert!(outcome.is_proceed());
//!     assert_eq!(presenter.prompt_count(), 1);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod fixtures;
pub mod mocks;

pub use fixtures::*;
pub use mocks::*;
