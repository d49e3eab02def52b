//! Prelude module - commonly used test utilities.
//!
//! Use `use bulwark_test::prelude::*;` to import all essential types.

pub use crate::{MockPresenter, TestProject, init_test_logging, test_actor, test_session_id};
