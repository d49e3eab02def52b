//! Outcomes returned across the caller boundary.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::RejectionReason;

/// Why an action was aborted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum AbortReason {
    /// A guard refused the action; approval was never consulted.
    Rejected {
        /// The mechanical rejection.
        reason: RejectionReason,
    },
    /// A standing session denial covers this action.
    PreviouslyDenied,
    /// The human denied this action.
    UserDenied,
    /// The surrounding operation was cancelled while the request was pending.
    Cancelled,
}

impl AbortReason {
    /// Construct a mechanical rejection.
    #[must_use]
    pub fn rejected(reason: RejectionReason) -> Self {
        Self::Rejected { reason }
    }

    /// Stable machine-readable code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Rejected { reason } => reason.code(),
            Self::PreviouslyDenied => "previously_denied",
            Self::UserDenied => "user_denied",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether this abort came from a guard rather than from approval.
    #[must_use]
    pub fn is_mechanical(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }

    /// Structured refusal for the agent loop.
    #[must_use]
    pub fn refusal(&self) -> Refusal {
        let summary = match self {
            Self::Rejected { reason } => reason.summary(),
            Self::PreviouslyDenied => {
                "the user already denied this kind of action in this session".to_string()
            },
            Self::UserDenied => "the user denied this action".to_string(),
            Self::Cancelled => "the request was cancelled before a decision was made".to_string(),
        };
        Refusal {
            code: self.code().to_string(),
            summary,
        }
    }
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected { reason } => write!(f, "rejected: {reason}"),
            Self::PreviouslyDenied => write!(f, "previously denied"),
            Self::UserDenied => write!(f, "denied by user"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl From<RejectionReason> for AbortReason {
    fn from(reason: RejectionReason) -> Self {
        Self::rejected(reason)
    }
}

/// A refusal as reported back to the agent loop.
///
/// Carries only a code and a sanitized summary, never internal detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Refusal {
    /// Machine-readable reason code.
    pub code: String,
    /// Human-readable summary.
    pub summary: String,
}

impl fmt::Display for Refusal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "refused ({}): {}", self.code, self.summary)
    }
}

/// The result of mediating an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    /// Carry out this (possibly edited, always validated) action.
    Proceed(T),
    /// Do not carry out anything.
    Abort(AbortReason),
}

impl<T> Outcome<T> {
    /// Whether the action may proceed.
    #[must_use]
    pub fn is_proceed(&self) -> bool {
        matches!(self, Self::Proceed(_))
    }

    /// Whether the action was aborted.
    #[must_use]
    pub fn is_abort(&self) -> bool {
        matches!(self, Self::Abort(_))
    }

    /// The abort reason, if aborted.
    #[must_use]
    pub fn abort_reason(&self) -> Option<&AbortReason> {
        match self {
            Self::Proceed(_) => None,
            Self::Abort(reason) => Some(reason),
        }
    }

    /// The refusal to report, if aborted.
    #[must_use]
    pub fn refusal(&self) -> Option<Refusal> {
        self.abort_reason().map(AbortReason::refusal)
    }

    /// Map the proceed value.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Self::Proceed(value) => Outcome::Proceed(f(value)),
            Self::Abort(reason) => Outcome::Abort(reason),
        }
    }

    /// Convert into a `Result`, with the refusal as the error.
    ///
    /// # Errors
    ///
    /// Returns the [`Refusal`] when the outcome is an abort.
    pub fn into_result(self) -> Result<T, Refusal> {
        match self {
            Self::Proceed(value) => Ok(value),
            Self::Abort(reason) => Err(reason.refusal()),
        }
    }
}
