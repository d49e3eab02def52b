//! In-memory grant store.

use bulwark_core::{ActionClass, ActorId, Timestamp};
use std::collections::HashMap;
use std::fmt;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, warn};

use super::{Decision, Expiry, Grant, Scope, Subject};

type GrantKey = (ActorId, ActionClass, Scope);

#[derive(Default)]
struct LedgerState {
    grants: HashMap<GrantKey, Grant>,
    next_seq: u64,
}

impl LedgerState {
    /// Most specific grant covering `subject`; the most recent one on a tie.
    fn best_match(
        &self,
        actor: &ActorId,
        class: ActionClass,
        subject: Subject<'_>,
    ) -> Option<&Grant> {
        self.grants
            .values()
            .filter(|g| g.actor == *actor && g.class == class && g.scope.covers(subject))
            .max_by_key(|g| (g.scope.specificity(), g.seq))
    }
}

/// The session's permission ledger.
///
/// Thread-safe via an internal [`RwLock`]: lookups of session grants share
/// the read lock, recording and consuming one-shot grants take the write
/// lock. A poisoned lock is recovered rather than propagated.
///
/// # Example
///
/// ```
/// use std::path::{Path, PathBuf};
/// use bulwark_approval::ledger::{Decision, Expiry, PermissionLedger, Scope, Subject};
/// use bulwark_core::{ActionClass, ActorId};
///
/// let ledger = PermissionLedger::new();
/// let actor = ActorId::agent();
/// ledger.record(
///     &actor,
///     ActionClass::FileWrite,
///     Scope::Directory(PathBuf::from("/srv/project/src")),
///     Decision::Allowed,
///     Expiry::SessionLifetime,
/// );
///
/// let subject = Subject::Path(Path::new("/srv/project/src/lib.rs"));
/// assert!(ledger.lookup(&actor, ActionClass::FileWrite, subject).is_some());
/// assert!(ledger.lookup(&actor, ActionClass::FileRead, subject).is_none());
/// ```
pub struct PermissionLedger {
    state: RwLock<LedgerState>,
}

impl PermissionLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: RwLock::new(LedgerState::default()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, LedgerState> {
        self.state.read().unwrap_or_else(|e| {
            warn!("PermissionLedger read lock poisoned, recovering");
            e.into_inner()
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, LedgerState> {
        self.state.write().unwrap_or_else(|e| {
            warn!("PermissionLedger write lock poisoned, recovering");
            e.into_inner()
        })
    }

    /// The most specific grant covering `subject` for this actor and class.
    ///
    /// Ties on specificity go to the most recently recorded grant. A matching
    /// [`Expiry::OneShot`] grant is removed by this call.
    #[must_use]
    pub fn lookup(
        &self,
        actor: &ActorId,
        class: ActionClass,
        subject: Subject<'_>,
    ) -> Option<Grant> {
        let found = self.read().best_match(actor, class, subject)?.clone();
        if found.expiry == Expiry::SessionLifetime {
            return Some(found);
        }

        // Consuming needs the write lock; match again under it so two
        // callers cannot both take the same one-shot grant.
        let mut state = self.write();
        let grant = state.best_match(actor, class, subject)?.clone();
        if grant.expiry == Expiry::OneShot {
            state
                .grants
                .remove(&(grant.actor.clone(), grant.class, grant.scope.clone()));
            debug!(grant = %grant, "one-shot grant consumed");
        }
        Some(grant)
    }

    /// Record a decision, replacing any grant with the same actor, class
    /// and scope. Returns the stored grant.
    pub fn record(
        &self,
        actor: &ActorId,
        class: ActionClass,
        scope: Scope,
        decision: Decision,
        expiry: Expiry,
    ) -> Grant {
        let mut state = self.write();
        let seq = state.next_seq;
        state.next_seq = seq.saturating_add(1);
        let grant = Grant {
            actor: actor.clone(),
            class,
            scope: scope.clone(),
            decision,
            expiry,
            created_at: Timestamp::now(),
            seq,
        };
        debug!(grant = %grant, ?expiry, "grant recorded");
        state.grants.insert((actor.clone(), class, scope), grant.clone());
        grant
    }

    /// Remove the grant with exactly this actor, class and scope.
    ///
    /// Returns the removed grant, if there was one.
    pub fn revoke(&self, actor: &ActorId, class: ActionClass, scope: &Scope) -> Option<Grant> {
        let removed = self
            .write()
            .grants
            .remove(&(actor.clone(), class, scope.clone()));
        if let Some(grant) = &removed {
            debug!(grant = %grant, "grant revoked");
        }
        removed
    }

    /// Snapshot of every grant, oldest first.
    #[must_use]
    pub fn grants(&self) -> Vec<Grant> {
        let mut grants: Vec<Grant> = self.read().grants.values().cloned().collect();
        grants.sort_by_key(|g| g.seq);
        grants
    }

    /// Number of grants held.
    #[must_use]
    pub fn count(&self) -> usize {
        self.read().grants.len()
    }

    /// Remove every grant of one actor. Returns how many were removed.
    pub fn clear_actor(&self, actor: &ActorId) -> usize {
        let mut state = self.write();
        let before = state.grants.len();
        state.grants.retain(|(owner, _, _), _| owner != actor);
        before.saturating_sub(state.grants.len())
    }

    /// Remove every grant.
    pub fn clear(&self) {
        let mut state = self.write();
        let dropped = state.grants.len();
        state.grants.clear();
        debug!(dropped, "ledger cleared");
    }
}

impl Default for PermissionLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PermissionLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.count();
        f.debug_struct("PermissionLedger")
            .field("count", &count)
            .finish()
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
