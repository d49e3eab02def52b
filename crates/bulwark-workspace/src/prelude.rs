//! Prelude module - commonly used types for convenient import.
//!
//! Use `use bulwark_workspace::prelude::*;` to import all essential types.

// Path guard
pub use crate::{AccessMode, PathGuard, PathValidationResult};

// Resolution
pub use crate::{ResolveError, resolve};
