//! Security interceptor: the single entry point callers go through.
//!
//! # Mediation Flow
//!
//! 1. Run the mechanical guard for the action (path or command)
//! 2. On rejection, abort with the reason; nothing is presented
//! 3. Ask the [`ApprovalCoordinator`], which consults the ledger first
//! 4. Revalidate any edited action through the same guard
//! 5. Return the canonical path or the [`ValidatedCommand`] to run
//!
//! An approved directory change is applied to the session working
//! directory; everything else is left for the caller to perform.

use bulwark_config::PolicyConfig;
use bulwark_core::{
    AbortReason, ActionClass, ActorId, Outcome, RejectionReason, SecurityPolicy, SessionId,
};
use bulwark_shell::{CommandGuard, ValidatedCommand};
use bulwark_telemetry::MediationContext;
use bulwark_workspace::{AccessMode, PathGuard};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info, warn};

use crate::action::ProposedAction;
use crate::coordinator::{ApprovalCoordinator, ApprovalDefaults};
use crate::error::{ApprovalError, ApprovalResult};
use crate::ledger::PermissionLedger;
use crate::presenter::ApprovalPresenter;

/// Mediates every file access and command for one session.
pub struct SecurityInterceptor {
    policy: Arc<SecurityPolicy>,
    paths: PathGuard,
    commands: CommandGuard,
    ledger: Arc<PermissionLedger>,
    coordinator: ApprovalCoordinator,
    cwd: Arc<RwLock<PathBuf>>,
    actor: ActorId,
    session_id: SessionId,
}

impl SecurityInterceptor {
    /// Create an interceptor for a session starting in `cwd`.
    ///
    /// # Errors
    ///
    /// Returns [`ApprovalError::WorkingDirectory`] if `cwd` is not an
    /// absolute, existing directory inside the allowed roots.
    pub fn new(
        policy: Arc<SecurityPolicy>,
        presenter: Arc<dyn ApprovalPresenter>,
        cwd: &Path,
    ) -> ApprovalResult<Self> {
        let paths = PathGuard::new(Arc::clone(&policy));
        let cwd = initial_cwd(&paths, cwd)?;
        let commands = CommandGuard::new(Arc::clone(&policy));
        let ledger = Arc::new(PermissionLedger::new());
        let coordinator = ApprovalCoordinator::new(Arc::clone(&ledger), presenter);

        let session_id = SessionId::new();
        info!(
            session_id = %session_id,
            cwd = %cwd.display(),
            roots = policy.allowed_roots().len(),
            "security interceptor started"
        );

        Ok(Self {
            policy,
            paths,
            commands,
            ledger,
            coordinator,
            cwd: Arc::new(RwLock::new(cwd)),
            actor: ActorId::agent(),
            session_id,
        })
    }

    /// Create an interceptor from a loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ApprovalError::Config`] if the configuration does not make
    /// a valid policy, or [`ApprovalError::WorkingDirectory`] as for
    /// [`SecurityInterceptor::new`].
    pub fn from_config(
        config: &PolicyConfig,
        presenter: Arc<dyn ApprovalPresenter>,
        cwd: &Path,
    ) -> ApprovalResult<Self> {
        let defaults = ApprovalDefaults::from(&config.approval);
        let policy = config.clone().into_policy()?;
        Ok(Self::new(Arc::new(policy), presenter, cwd)?.with_defaults(defaults))
    }

    /// Mediate on behalf of `actor`.
    #[must_use]
    pub fn with_actor(mut self, actor: ActorId) -> Self {
        self.actor = actor;
        self
    }

    /// Use an externally assigned session id.
    #[must_use]
    pub fn with_session(mut self, session_id: SessionId) -> Self {
        self.session_id = session_id;
        self
    }

    /// Use these grant lifetimes.
    #[must_use]
    pub fn with_defaults(mut self, defaults: ApprovalDefaults) -> Self {
        self.coordinator = self.coordinator.with_defaults(defaults);
        self
    }

    /// The policy being enforced.
    #[must_use]
    pub fn policy(&self) -> &Arc<SecurityPolicy> {
        &self.policy
    }

    /// The session's permission ledger.
    #[must_use]
    pub fn ledger(&self) -> &Arc<PermissionLedger> {
        &self.ledger
    }

    /// The actor actions are mediated for.
    #[must_use]
    pub fn actor(&self) -> &ActorId {
        &self.actor
    }

    /// The session id.
    #[must_use]
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Grant lifetimes in use.
    #[must_use]
    pub fn defaults(&self) -> ApprovalDefaults {
        self.coordinator.defaults()
    }

    /// The current session working directory.
    #[must_use]
    pub fn cwd(&self) -> PathBuf {
        self.cwd
            .read()
            .unwrap_or_else(|e| {
                warn!("SecurityInterceptor cwd lock poisoned, recovering");
                e.into_inner()
            })
            .clone()
    }

    /// Shared handle to the session working directory.
    #[must_use]
    pub fn cwd_handle(&self) -> Arc<RwLock<PathBuf>> {
        Arc::clone(&self.cwd)
    }

    fn set_cwd(&self, cwd: PathBuf) {
        let mut guard = self.cwd.write().unwrap_or_else(|e| {
            warn!("SecurityInterceptor cwd lock poisoned, recovering");
            e.into_inner()
        });
        *guard = cwd;
    }

    fn context(&self, class: ActionClass) -> MediationContext {
        MediationContext::new(self.actor.clone(), class).with_session(self.session_id.clone())
    }

    /// Guard and approve access to `raw_path` in `mode`.
    ///
    /// On success the canonical path is returned; callers must use that
    /// path, not `raw_path`.
    pub async fn guard_and_approve_file(
        &self,
        raw_path: &str,
        mode: AccessMode,
    ) -> Outcome<PathBuf> {
        self.guard_and_approve_file_with_cancel(raw_path, mode, &CancellationToken::new())
            .await
    }

    /// [`guard_and_approve_file`](Self::guard_and_approve_file) that gives
    /// up with [`AbortReason::Cancelled`] when `cancel` fires.
    pub async fn guard_and_approve_file_with_cancel(
        &self,
        raw_path: &str,
        mode: AccessMode,
        cancel: &CancellationToken,
    ) -> Outcome<PathBuf> {
        let class = ProposedAction::file_class(mode);
        let context = self.context(class);
        let span = context.span();

        async {
            let cwd = self.cwd();
            let path = match self.paths.validate(raw_path, &cwd, mode) {
                Ok(path) => path,
                Err(reason) => {
                    info!(reason = %reason, "file access rejected by guard");
                    return Outcome::Abort(AbortReason::rejected(reason));
                },
            };

            let description = format!("{class} {}", path.display());
            // Edits may change the path only; the access mode stays the caller's.
            let revalidate = |edited: ProposedAction| -> Result<ProposedAction, RejectionReason> {
                let ProposedAction::File { path, .. } = edited else {
                    return Err(kind_changed());
                };
                let raw = path.to_str().ok_or_else(|| RejectionReason::PathTraversal {
                    detail: "edited path is not valid UTF-8".to_string(),
                })?;
                let canonical = self.paths.validate(raw, &cwd, mode)?;
                Ok(ProposedAction::file(canonical, mode))
            };

            let outcome = self
                .coordinator
                .request_approval(
                    &self.actor,
                    ProposedAction::file(path, mode),
                    &description,
                    cancel,
                    revalidate,
                )
                .await;

            let outcome = match outcome {
                Outcome::Proceed(ProposedAction::File { path, .. }) => Outcome::Proceed(path),
                Outcome::Proceed(ProposedAction::Command { .. }) => {
                    Outcome::Abort(AbortReason::rejected(kind_changed()))
                },
                Outcome::Abort(reason) => Outcome::Abort(reason),
            };
            log_outcome(&context, &outcome);
            outcome
        }
        .instrument(span)
        .await
    }

    /// Guard and approve the raw command line `raw`.
    ///
    /// The returned [`ValidatedCommand`] is the only thing that may be run.
    /// An approved directory change has already been applied to the
    /// session working directory when this returns.
    pub async fn guard_and_approve_command(&self, raw: &str) -> Outcome<ValidatedCommand> {
        self.guard_and_approve_command_with_cancel(raw, &CancellationToken::new())
            .await
    }

    /// [`guard_and_approve_command`](Self::guard_and_approve_command) that
    /// gives up with [`AbortReason::Cancelled`] when `cancel` fires.
    pub async fn guard_and_approve_command_with_cancel(
        &self,
        raw: &str,
        cancel: &CancellationToken,
    ) -> Outcome<ValidatedCommand> {
        let context = self.context(ActionClass::CommandExec);
        let span = context.span();

        async {
            let cwd = self.cwd();
            let validated = match self.commands.validate(raw, &cwd) {
                Ok(validated) => validated,
                Err(reason) => {
                    info!(reason = %reason, "command rejected by guard");
                    return Outcome::Abort(AbortReason::rejected(reason));
                },
            };

            let description = match validated.change_directory() {
                Some(dir) => format!("change directory to {}", dir.display()),
                None => format!("run {}", validated.shell_line()),
            };
            let revalidate = |edited: ProposedAction| -> Result<ProposedAction, RejectionReason> {
                let ProposedAction::Command { argv } = edited else {
                    return Err(kind_changed());
                };
                let cmd = self.commands.validate_argv(argv, &cwd)?;
                Ok(ProposedAction::command(cmd.into_argv()))
            };

            let outcome = self
                .coordinator
                .request_approval(
                    &self.actor,
                    ProposedAction::command(validated.argv().to_vec()),
                    &description,
                    cancel,
                    revalidate,
                )
                .await;

            let outcome = match outcome {
                Outcome::Proceed(ProposedAction::Command { argv }) if argv == validated.argv() => {
                    Outcome::Proceed(validated)
                },
                // An edit: already revalidated, rebuild the command from it.
                Outcome::Proceed(ProposedAction::Command { argv }) => {
                    match self.commands.validate_argv(argv, &cwd) {
                        Ok(edited) => Outcome::Proceed(edited),
                        Err(reason) => Outcome::Abort(AbortReason::rejected(reason)),
                    }
                },
                Outcome::Proceed(ProposedAction::File { .. }) => {
                    Outcome::Abort(AbortReason::rejected(kind_changed()))
                },
                Outcome::Abort(reason) => Outcome::Abort(reason),
            };

            if let Outcome::Proceed(command) = &outcome
                && let Some(dir) = command.change_directory()
            {
                info!(cwd = %dir.display(), "session working directory changed");
                self.set_cwd(dir.to_path_buf());
            }
            log_outcome(&context, &outcome);
            outcome
        }
        .instrument(span)
        .await
    }

    /// End the session: every grant is forgotten.
    pub fn end_session(&self) {
        let grants = self.ledger.count();
        self.ledger.clear();
        info!(session_id = %self.session_id, grants, "session ended, grants cleared");
    }
}

impl std::fmt::Debug for SecurityInterceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityInterceptor")
            .field("actor", &self.actor)
            .field("session_id", &self.session_id)
            .field("cwd", &self.cwd())
            .field("coordinator", &self.coordinator)
            .finish_non_exhaustive()
    }
}

fn initial_cwd(paths: &PathGuard, cwd: &Path) -> ApprovalResult<PathBuf> {
    let invalid = |detail: &str| {
        ApprovalError::WorkingDirectory(RejectionReason::PathTraversal {
            detail: detail.to_string(),
        })
    };
    if !cwd.is_absolute() {
        return Err(invalid("working directory must be absolute"));
    }
    let raw = cwd
        .to_str()
        .ok_or_else(|| invalid("working directory is not valid UTF-8"))?;
    let canonical = paths
        .validate(raw, cwd, AccessMode::Directory)
        .map_err(ApprovalError::WorkingDirectory)?;
    if !canonical.is_dir() {
        return Err(invalid("working directory does not exist"));
    }
    Ok(canonical)
}

fn kind_changed() -> RejectionReason {
    RejectionReason::UnsupportedSyntax {
        detail: "an edit may not change the kind of action".to_string(),
    }
}

fn log_outcome<T>(context: &MediationContext, outcome: &Outcome<T>) {
    let elapsed_ms = context.elapsed_ms();
    match outcome.abort_reason() {
        None => info!(elapsed_ms, "action may proceed"),
        Some(reason) => info!(elapsed_ms, outcome = reason.code(), "action aborted"),
    }
}

#[cfg(test)]
#[path = "interceptor_tests.rs"]
mod tests;
