//! Approval request and presenter response types.

use bulwark_core::{ActionClass, ActorId, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::action::ProposedAction;
use crate::ledger::Scope;

/// Unique identifier for an approval request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub Uuid);

impl RequestId {
    /// Create a new random request ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req:{}", self.0)
    }
}

/// A request for a human decision, as handed to the presenter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalRequest {
    /// Unique request identifier.
    pub id: RequestId,
    /// Who is asking.
    pub actor: ActorId,
    /// Class of the action.
    pub class: ActionClass,
    /// Human-readable description of what will happen.
    pub description: String,
    /// Scope the decision will be recorded under.
    pub scope: Scope,
    /// The action itself (canonical path or validated argv).
    pub action: ProposedAction,
    /// When the request was created.
    pub created_at: Timestamp,
}

impl ApprovalRequest {
    /// Create a request for `action`.
    #[must_use]
    pub fn new(actor: ActorId, action: ProposedAction, description: impl Into<String>) -> Self {
        Self {
            id: RequestId::new(),
            actor,
            class: action.class(),
            description: description.into(),
            scope: action.scope(),
            action,
            created_at: Timestamp::now(),
        }
    }
}

impl fmt::Display for ApprovalRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.description)?;
        writeln!(f, "  {}", self.action.display_target())?;
        write!(f, "  scope: {}", self.scope)
    }
}

/// The presenter's answer to a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "response", content = "action")]
pub enum PresenterResponse {
    /// Carry out the action as proposed.
    Approve,
    /// Do not carry it out.
    Deny,
    /// Carry out this action instead, after it passes the guards again.
    Edit(ProposedAction),
}

#[cfg(test)]
mod tests {
    use super::*;
    use bulwark_workspace::AccessMode;

    #[test]
    fn test_request_id_unique() {
        let a = RequestId::new();
        assert_ne!(a, RequestId::new());
        assert!(a.to_string().starts_with("req:"));
    }

    #[test]
    fn test_request_derives_class_and_scope() {
        let request = ApprovalRequest::new(
            ActorId::agent(),
            ProposedAction::file("/srv/project/src/a.ts", AccessMode::write()),
            "write a.ts",
        );
        assert_eq!(request.class, ActionClass::FileWrite);
        assert_eq!(request.scope.to_string(), "/srv/project/src/");
        let text = request.to_string();
        assert!(text.contains("write a.ts"));
        assert!(text.contains("/srv/project/src/a.ts"));
    }

    #[test]
    fn test_response_serialization() {
        let json = serde_json::to_string(&PresenterResponse::Approve).unwrap();
        assert_eq!(json, r#"{"response":"approve"}"#);
        let edit: PresenterResponse = serde_json::from_str(
            r#"{"response":"edit","action":{"kind":"command","argv":["git","status"]}}"#,
        )
        .unwrap();
        assert_eq!(
            edit,
            PresenterResponse::Edit(ProposedAction::command(["git", "status"]))
        );
    }
}
