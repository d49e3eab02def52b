//! Prelude module - commonly used types for convenient import.
//!
//! Use `use bulwark_shell::prelude::*;` to import all essential types.

// Command guard
pub use crate::{CommandGuard, CommandKind, CommandValidationResult, ValidatedCommand};

// Quoting
pub use crate::{quote_arg, render_shell_line};
