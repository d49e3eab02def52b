//! Bulwark Telemetry - Logging and mediation tracing.
//!
//! This crate provides:
//! - Configurable logging setup with pretty, compact, and JSON formats
//! - A per-action [`MediationContext`] whose span correlates guard,
//!   ledger, and prompt log lines
//!
//! # Example
//!
//! ```rust,no_run
//! use bulwark_core::{ActionClass, ActorId};
//! use bulwark_telemetry::{LogConfig, LogFormat, MediationContext, setup_logging};
//!
//! # fn main() -> Result<(), bulwark_telemetry::TelemetryError> {
//! let config = LogConfig::new("info")
//!     .with_format(LogFormat::Json)
//!     .with_directive("bulwark_approval=debug");
//! setup_logging(&config)?;
//!
//! let ctx = MediationContext::new(ActorId::agent(), ActionClass::CommandExec);
//! let _guard = ctx.span().entered();
//! tracing::info!("validating command");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod context;
mod error;
mod logging;

pub use context::{MediationContext, MediationGuard};
pub use error::{TelemetryError, TelemetryResult};
pub use logging::{LogConfig, LogFormat, LogTarget, setup_default_logging, setup_logging};
