//! Approval coordinator: the human-in-the-loop protocol.
//!
//! # Approval Flow
//!
//! 1. If the ledger holds a grant covering the action, allow or abort at once
//! 2. If another request for the same actor, class and scope is already
//!    being presented, wait for its decision instead of prompting again
//! 3. Otherwise present the request through the [`PromptQueue`]
//! 4. `Approve` records a grant and proceeds with the proposed action
//! 5. `Deny` records a denial and aborts
//! 6. `Edit` records nothing; the edited action is revalidated by the
//!    caller's guard and proceeds only if it passes
//!
//! Cancelling (by token or by dropping the future) at any point records
//! nothing.

use bulwark_config::{ApprovalSection, ExpiryChoice};
use bulwark_core::{AbortReason, ActionClass, ActorId, Outcome, RejectionReason};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::action::ProposedAction;
use crate::ledger::{Decision, Expiry, PermissionLedger, Scope};
use crate::presenter::{ApprovalPresenter, PromptQueue};
use crate::request::{ApprovalRequest, PresenterResponse};

/// Grant lifetimes recorded for each kind of action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApprovalDefaults {
    /// Expiry of file read/write decisions.
    pub file_expiry: Expiry,
    /// Expiry of command decisions.
    pub command_expiry: Expiry,
}

impl ApprovalDefaults {
    /// Expiry for decisions on `class`.
    #[must_use]
    pub fn expiry_for(&self, class: ActionClass) -> Expiry {
        if class.is_file() {
            self.file_expiry
        } else {
            self.command_expiry
        }
    }
}

impl Default for ApprovalDefaults {
    fn default() -> Self {
        Self {
            file_expiry: Expiry::SessionLifetime,
            command_expiry: Expiry::OneShot,
        }
    }
}

impl From<ExpiryChoice> for Expiry {
    fn from(choice: ExpiryChoice) -> Self {
        match choice {
            ExpiryChoice::Session => Self::SessionLifetime,
            ExpiryChoice::OneShot => Self::OneShot,
        }
    }
}

impl From<&ApprovalSection> for ApprovalDefaults {
    fn from(section: &ApprovalSection) -> Self {
        Self {
            file_expiry: section.file_expiry.into(),
            command_expiry: section.command_expiry.into(),
        }
    }
}

type FlightKey = (ActorId, ActionClass, Scope);

/// What a presented request ended with, as seen by requests that joined it.
#[derive(Debug, Clone)]
enum FlightResult {
    Approved,
    Denied,
    Edited {
        original: ProposedAction,
        outcome: Outcome<ProposedAction>,
    },
}

enum Role {
    Leader,
    Follower(watch::Receiver<Option<FlightResult>>),
}

/// Removes a flight from the table when its leader finishes or is dropped.
struct FlightGuard<'a> {
    coordinator: &'a ApprovalCoordinator,
    key: FlightKey,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.coordinator.flights().remove(&self.key);
    }
}

/// Coordinates approval requests against the ledger and the presenter.
pub struct ApprovalCoordinator {
    ledger: Arc<PermissionLedger>,
    prompts: PromptQueue,
    defaults: ApprovalDefaults,
    in_flight: Mutex<HashMap<FlightKey, watch::Sender<Option<FlightResult>>>>,
}

impl ApprovalCoordinator {
    /// Create a coordinator over `ledger` that prompts through `presenter`.
    #[must_use]
    pub fn new(ledger: Arc<PermissionLedger>, presenter: Arc<dyn ApprovalPresenter>) -> Self {
        Self {
            ledger,
            prompts: PromptQueue::new(presenter),
            defaults: ApprovalDefaults::default(),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Use these grant lifetimes.
    #[must_use]
    pub fn with_defaults(mut self, defaults: ApprovalDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Grant lifetimes in use.
    #[must_use]
    pub fn defaults(&self) -> ApprovalDefaults {
        self.defaults
    }

    /// The ledger decisions are recorded in.
    #[must_use]
    pub fn ledger(&self) -> &Arc<PermissionLedger> {
        &self.ledger
    }

    fn flights(&self) -> MutexGuard<'_, HashMap<FlightKey, watch::Sender<Option<FlightResult>>>> {
        self.in_flight.lock().unwrap_or_else(|e| {
            warn!("ApprovalCoordinator flight table poisoned, recovering");
            e.into_inner()
        })
    }

    /// Decide whether `action` may proceed, prompting if no grant covers it.
    ///
    /// `revalidate` runs an edited action through the same guard the
    /// original passed; it is only called for `Edit` responses and must
    /// return the action in its canonical, validated form.
    pub async fn request_approval<F>(
        &self,
        actor: &ActorId,
        action: ProposedAction,
        description: &str,
        cancel: &CancellationToken,
        revalidate: F,
    ) -> Outcome<ProposedAction>
    where
        F: Fn(ProposedAction) -> Result<ProposedAction, RejectionReason>,
    {
        let class = action.class();
        let key: FlightKey = (actor.clone(), class, action.scope());

        loop {
            if cancel.is_cancelled() {
                return Outcome::Abort(AbortReason::Cancelled);
            }

            // Lookup and flight registration happen under one lock so two
            // first-time requests for a scope cannot both prompt.
            let role = {
                let mut flights = self.flights();
                if let Some(sender) = flights.get(&key) {
                    Role::Follower(sender.subscribe())
                } else if let Some(grant) = self.ledger.lookup(actor, class, action.subject()) {
                    debug!(grant = %grant, "existing grant covers action");
                    return if grant.is_allowed() {
                        Outcome::Proceed(action)
                    } else {
                        Outcome::Abort(AbortReason::PreviouslyDenied)
                    };
                } else {
                    let (sender, _) = watch::channel(None);
                    flights.insert(key.clone(), sender);
                    Role::Leader
                }
            };

            match role {
                Role::Leader => {
                    let _flight = FlightGuard {
                        coordinator: self,
                        key: key.clone(),
                    };
                    return self
                        .lead(actor, action, description, cancel, &key, &revalidate)
                        .await;
                },
                Role::Follower(receiver) => {
                    if let Some(outcome) = self.follow(receiver, &action, cancel).await {
                        return outcome;
                    }
                    debug!(scope = %key.2, "joined request ended undecided, retrying");
                    // Let the finished leader clear its flight first.
                    tokio::task::yield_now().await;
                },
            }
        }
    }

    async fn lead<F>(
        &self,
        actor: &ActorId,
        action: ProposedAction,
        description: &str,
        cancel: &CancellationToken,
        key: &FlightKey,
        revalidate: &F,
    ) -> Outcome<ProposedAction>
    where
        F: Fn(ProposedAction) -> Result<ProposedAction, RejectionReason>,
    {
        let request = ApprovalRequest::new(actor.clone(), action.clone(), description);
        let request_id = request.id.clone();
        let class = request.class;

        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                info!(request_id = %request_id, "approval request cancelled");
                return Outcome::Abort(AbortReason::Cancelled);
            },
            response = self.prompts.present(request) => response,
        };

        let expiry = self.defaults.expiry_for(class);
        match response {
            PresenterResponse::Approve => {
                info!(request_id = %request_id, scope = %key.2, ?expiry, "action approved");
                // A one-shot approval is used up by this very action.
                if expiry == Expiry::SessionLifetime {
                    self.ledger
                        .record(actor, class, key.2.clone(), Decision::Allowed, expiry);
                }
                self.publish(key, FlightResult::Approved);
                Outcome::Proceed(action)
            },
            PresenterResponse::Deny => {
                info!(request_id = %request_id, scope = %key.2, ?expiry, "action denied");
                // A one-shot denial leaves the next attempt free to ask again.
                if expiry == Expiry::SessionLifetime {
                    self.ledger
                        .record(actor, class, key.2.clone(), Decision::Denied, expiry);
                }
                self.publish(key, FlightResult::Denied);
                Outcome::Abort(AbortReason::UserDenied)
            },
            PresenterResponse::Edit(edited) => {
                info!(request_id = %request_id, edited = %edited, "action edited, revalidating");
                let outcome = if edited.class() == class {
                    match revalidate(edited) {
                        Ok(validated) => Outcome::Proceed(validated),
                        Err(reason) => {
                            warn!(request_id = %request_id, reason = %reason, "edited action rejected");
                            Outcome::Abort(AbortReason::rejected(reason))
                        },
                    }
                } else {
                    warn!(request_id = %request_id, "edit changed the action class");
                    Outcome::Abort(AbortReason::rejected(RejectionReason::UnsupportedSyntax {
                        detail: "an edit may not change the kind of action".to_string(),
                    }))
                };
                self.publish(
                    key,
                    FlightResult::Edited {
                        original: action,
                        outcome: outcome.clone(),
                    },
                );
                outcome
            },
        }
    }

    /// Wait for the leader of a flight. `None` means the flight ended
    /// without a decision that applies to `action`.
    async fn follow(
        &self,
        mut receiver: watch::Receiver<Option<FlightResult>>,
        action: &ProposedAction,
        cancel: &CancellationToken,
    ) -> Option<Outcome<ProposedAction>> {
        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => return Some(Outcome::Abort(AbortReason::Cancelled)),
            result = receiver.wait_for(Option::is_some) => result.ok().and_then(|r| r.clone()),
        }?;

        match result {
            FlightResult::Approved => Some(Outcome::Proceed(action.clone())),
            FlightResult::Denied => Some(Outcome::Abort(AbortReason::UserDenied)),
            FlightResult::Edited { original, outcome } => (original == *action).then_some(outcome),
        }
    }

    fn publish(&self, key: &FlightKey, result: FlightResult) {
        if let Some(sender) = self.flights().get(key) {
            sender.send_replace(Some(result));
        }
    }
}

impl fmt::Debug for ApprovalCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let in_flight = self.flights().len();
        f.debug_struct("ApprovalCoordinator")
            .field("ledger", &self.ledger)
            .field("defaults", &self.defaults)
            .field("in_flight", &in_flight)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
