//! Policy configuration for Bulwark.
//!
//! Loads a TOML policy file over embedded defaults, validates it, and turns
//! it into the immutable [`bulwark_core::SecurityPolicy`] the guards consume.
//! The kernel itself never reads files or environment variables; this crate
//! is the collaborator that does.
//!
//! # Example
//!
//! ```rust,no_run
//! let config = bulwark_config::from_toml_str(r#"
//!     roots = ["/home/user/project"]
//!     allowed_extensions = ["rs", "toml", "md"]
//!
//!     [approval]
//!     command_expiry = "one_shot"
//! "#).unwrap();
//! let policy = config.into_policy().unwrap();
//! assert_eq!(policy.allowed_roots().len(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

/// Configuration error types.
pub mod error;
/// Policy file discovery and loading.
pub mod loader;
/// Policy file struct definitions.
pub mod types;
/// Policy validation rules.
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::{default_config, from_toml_str, load};
pub use types::{ApprovalSection, ExpiryChoice, PolicyConfig};
