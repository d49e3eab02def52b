//! Mediation context for correlating log lines across one mediated action.
//!
//! Every call through the interceptor opens a [`MediationContext`]; the guard
//! verdict, ledger lookup, and any prompt all log inside its span, so a
//! single `mediation_id` ties them together.

use bulwark_core::{ActionClass, ActorId, SessionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Correlation data for one mediated action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediationContext {
    /// Unique id for this mediation.
    pub mediation_id: Uuid,
    /// Session the action belongs to.
    pub session_id: Option<SessionId>,
    /// Actor that requested the action.
    pub actor: ActorId,
    /// Class of the action.
    pub class: ActionClass,
    /// When mediation started.
    pub started_at: DateTime<Utc>,
}

impl MediationContext {
    /// Open a context for `actor` performing an action of `class`.
    #[must_use]
    pub fn new(actor: ActorId, class: ActionClass) -> Self {
        Self {
            mediation_id: Uuid::new_v4(),
            session_id: None,
            actor,
            class,
            started_at: Utc::now(),
        }
    }

    /// Attach the session id.
    #[must_use]
    pub fn with_session(mut self, session: SessionId) -> Self {
        self.session_id = Some(session);
        self
    }

    /// Milliseconds since mediation started.
    #[must_use]
    pub fn elapsed_ms(&self) -> i64 {
        #[allow(clippy::arithmetic_side_effects)]
        let elapsed = Utc::now() - self.started_at;
        elapsed.num_milliseconds()
    }

    /// A tracing span carrying this context's fields.
    #[must_use]
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!(
            "mediate",
            mediation_id = %self.mediation_id,
            session_id = self.session_id.as_ref().map(tracing::field::display),
            actor = %self.actor.as_str(),
            class = %self.class,
        )
    }

    /// First eight characters of the mediation id.
    #[must_use]
    pub fn short_id(&self) -> String {
        let mut id = self.mediation_id.simple().to_string();
        id.truncate(8);
        id
    }
}

/// Keeps the mediation span entered and logs completion on drop.
///
/// Only for synchronous sections; async code should use
/// `tracing::Instrument` with [`MediationContext::span`].
pub struct MediationGuard {
    context: MediationContext,
    _span: tracing::span::EnteredSpan,
}

impl MediationGuard {
    /// Enter the context's span.
    #[must_use]
    pub fn new(context: MediationContext) -> Self {
        let span = context.span().entered();
        tracing::debug!("mediation started");
        Self {
            context,
            _span: span,
        }
    }

    /// The guarded context.
    #[must_use]
    pub fn context(&self) -> &MediationContext {
        &self.context
    }
}

impl Drop for MediationGuard {
    fn drop(&mut self) {
        tracing::debug!(elapsed_ms = self.context.elapsed_ms(), "mediation completed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_creation() {
        let ctx = MediationContext::new(ActorId::agent(), ActionClass::FileRead);
        assert_eq!(ctx.actor, ActorId::agent());
        assert_eq!(ctx.class, ActionClass::FileRead);
        assert!(ctx.session_id.is_none());

        let session = SessionId::new();
        let ctx = ctx.with_session(session.clone());
        assert_eq!(ctx.session_id, Some(session));
    }

    #[test]
    fn test_distinct_ids() {
        let a = MediationContext::new(ActorId::agent(), ActionClass::CommandExec);
        let b = MediationContext::new(ActorId::agent(), ActionClass::CommandExec);
        assert_ne!(a.mediation_id, b.mediation_id);
        assert_eq!(a.short_id().len(), 8);
    }

    #[test]
    fn test_elapsed() {
        let ctx = MediationContext::new(ActorId::agent(), ActionClass::FileWrite);
        std::thread::sleep(std::time::Duration::from_millis(10));
        assert!(ctx.elapsed_ms() >= 10);
    }

    #[test]
    fn test_guard_exposes_context() {
        let ctx = MediationContext::new(ActorId::new("sub"), ActionClass::FileWrite);
        let id = ctx.mediation_id;
        let guard = MediationGuard::new(ctx);
        assert_eq!(guard.context().mediation_id, id);
    }

    #[test]
    fn test_serialization() {
        let ctx = MediationContext::new(ActorId::new("sub"), ActionClass::CommandExec);
        let json = serde_json::to_string(&ctx).unwrap();
        assert!(json.contains("\"class\":\"command_exec\""));
        let parsed: MediationContext = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.actor.as_str(), "sub");
    }
}
