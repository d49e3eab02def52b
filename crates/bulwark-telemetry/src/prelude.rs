//! Prelude module - commonly used types for convenient import.
//!
//! Use `use bulwark_telemetry::prelude::*;` to import all essential types.

pub use crate::{TelemetryError, TelemetryResult};

pub use crate::{LogConfig, LogFormat, LogTarget, setup_default_logging, setup_logging};

pub use crate::{MediationContext, MediationGuard};
