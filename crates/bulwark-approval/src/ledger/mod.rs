//! Permission ledger: the session's record of human decisions.
//!
//! A [`Grant`] binds a decision to an actor, an action class and a
//! [`Scope`]. The [`PermissionLedger`] owns every grant of a session and is
//! the only thing that mutates them. Nothing is persisted; the ledger lives
//! exactly as long as the session.

mod scope;
mod store;

pub use scope::{Scope, Subject};
pub use store::PermissionLedger;

use bulwark_core::{ActionClass, ActorId, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What the human decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Matching actions proceed without a prompt.
    Allowed,
    /// Matching actions abort without a prompt.
    Denied,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allowed => write!(f, "allowed"),
            Self::Denied => write!(f, "denied"),
        }
    }
}

/// How long a grant lasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expiry {
    /// Until the session ends or the ledger is cleared.
    SessionLifetime,
    /// Consumed by the first lookup it matches.
    OneShot,
}

/// A recorded human decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    /// Whose actions the grant covers.
    pub actor: ActorId,
    /// Which class of action it covers.
    pub class: ActionClass,
    /// The boundary it covers.
    pub scope: Scope,
    /// Allow or deny.
    pub decision: Decision,
    /// Lifetime.
    pub expiry: Expiry,
    /// When it was recorded.
    pub created_at: Timestamp,
    /// Ledger-wide insertion sequence; breaks specificity ties.
    pub seq: u64,
}

impl Grant {
    /// Whether this grant allows matching actions.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        self.decision == Decision::Allowed
    }
}

impl fmt::Display for Grant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} on {}",
            self.actor, self.decision, self.class, self.scope
        )
    }
}
