use super::*;
use crate::request::{ApprovalRequest, PresenterResponse};
use async_trait::async_trait;
use bulwark_config::{ApprovalSection, ExpiryChoice};
use std::collections::VecDeque;
use std::sync::Mutex;
use tempfile::TempDir;

/// Presenter that answers from a queue and remembers what it was shown.
struct Recording {
    responses: Mutex<VecDeque<PresenterResponse>>,
    seen: Mutex<Vec<ApprovalRequest>>,
}

impl Recording {
    fn new(responses: impl IntoIterator<Item = PresenterResponse>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into_iter().collect()),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn prompts(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    fn descriptions(&self) -> Vec<String> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.description.clone())
            .collect()
    }
}

#[async_trait]
impl ApprovalPresenter for Recording {
    async fn present(&self, request: ApprovalRequest) -> PresenterResponse {
        self.seen.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(PresenterResponse::Deny)
    }
}

struct Fixture {
    _dir: TempDir,
    root: PathBuf,
    interceptor: SecurityInterceptor,
    presenter: Arc<Recording>,
}

fn fixture(responses: impl IntoIterator<Item = PresenterResponse>) -> Fixture {
    let dir = TempDir::new().unwrap();
    let root = dir.path().canonicalize().unwrap().join("project");
    std::fs::create_dir_all(root.join("src")).unwrap();
    std::fs::write(root.join("src/main.rs"), "fn main() {}").unwrap();

    let policy = Arc::new(SecurityPolicy::new([&root]).unwrap());
    let presenter = Recording::new(responses);
    let interceptor = SecurityInterceptor::new(policy, presenter.clone(), &root).unwrap();
    Fixture {
        _dir: dir,
        root,
        interceptor,
        presenter,
    }
}

fn abort_code<T: std::fmt::Debug>(outcome: &Outcome<T>) -> &'static str {
    outcome
        .abort_reason()
        .unwrap_or_else(|| panic!("expected abort, got {outcome:?}"))
        .code()
}

#[test]
fn test_new_rejects_bad_working_directories() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().canonicalize().unwrap();
    let policy = Arc::new(SecurityPolicy::new([&root]).unwrap());

    for cwd in [
        PathBuf::from("relative/dir"),
        root.join("missing"),
        PathBuf::from("/"),
    ] {
        let result = SecurityInterceptor::new(Arc::clone(&policy), Recording::new([]), &cwd);
        assert!(
            matches!(result, Err(ApprovalError::WorkingDirectory(_))),
            "{}",
            cwd.display()
        );
    }
}

#[tokio::test]
async fn test_guard_rejection_never_prompts() {
    let f = fixture([PresenterResponse::Approve]);
    let outcome = f
        .interceptor
        .guard_and_approve_file("../../etc/passwd", AccessMode::Read)
        .await;
    assert_eq!(abort_code(&outcome), "outside_allowed_root");
    assert!(outcome.abort_reason().unwrap().is_mechanical());

    let outcome = f.interceptor.guard_and_approve_command("rm -rf /").await;
    assert_eq!(abort_code(&outcome), "banned_command");
    assert_eq!(f.presenter.prompts(), 0);
}

#[tokio::test]
async fn test_file_approval_returns_canonical_path() {
    let f = fixture([PresenterResponse::Approve]);
    let outcome = f
        .interceptor
        .guard_and_approve_file("./src/../src/main.rs", AccessMode::Read)
        .await;
    assert_eq!(outcome, Outcome::Proceed(f.root.join("src/main.rs")));

    let description = &f.presenter.descriptions()[0];
    assert!(description.starts_with("file read "), "{description}");
    assert!(description.ends_with("main.rs"), "{description}");
}

#[tokio::test]
async fn test_write_grant_covers_sibling_files() {
    let f = fixture([PresenterResponse::Approve]);
    let first = f
        .interceptor
        .guard_and_approve_file("src/a.ts", AccessMode::write())
        .await;
    assert!(first.is_proceed());

    let second = f
        .interceptor
        .guard_and_approve_file("src/b.ts", AccessMode::write())
        .await;
    assert_eq!(second, Outcome::Proceed(f.root.join("src/b.ts")));
    assert_eq!(f.presenter.prompts(), 1);

    // A read is a different class and asks again.
    let read = f
        .interceptor
        .guard_and_approve_file("src/main.rs", AccessMode::Read)
        .await;
    assert_eq!(abort_code(&read), "user_denied");
    assert_eq!(f.presenter.prompts(), 2);
}

#[tokio::test]
async fn test_file_edit_is_revalidated() {
    let f = fixture([PresenterResponse::Edit(ProposedAction::file(
        "/etc/hosts",
        AccessMode::write(),
    ))]);
    let outcome = f
        .interceptor
        .guard_and_approve_file("src/a.ts", AccessMode::write())
        .await;
    assert_eq!(abort_code(&outcome), "outside_allowed_root");
    assert_eq!(f.interceptor.ledger().count(), 0);
}

#[tokio::test]
async fn test_file_edit_keeps_access_mode() {
    let f = fixture([PresenterResponse::Edit(ProposedAction::file(
        "src/other.ts",
        AccessMode::write(),
    ))]);
    let outcome = f
        .interceptor
        .guard_and_approve_file("src/a.ts", AccessMode::write())
        .await;
    assert_eq!(outcome, Outcome::Proceed(f.root.join("src/other.ts")));
}

#[tokio::test]
async fn test_command_approval_returns_validated_command() {
    let f = fixture([PresenterResponse::Approve]);
    let outcome = f.interceptor.guard_and_approve_command("ls -la src").await;
    let Outcome::Proceed(command) = outcome else {
        panic!("expected proceed, got {outcome:?}");
    };
    assert_eq!(command.argv(), ["ls", "-la", "src"]);
    assert_eq!(command.cwd(), f.root.as_path());
    assert_eq!(f.presenter.descriptions(), ["run ls -la src"]);

    // Command approvals are used up by the command they approved.
    let again = f.interceptor.guard_and_approve_command("ls -la src").await;
    assert_eq!(abort_code(&again), "user_denied");
    assert_eq!(f.presenter.prompts(), 2);
}

#[tokio::test]
async fn test_command_edit_is_revalidated() {
    let edited = ProposedAction::command(["git", "commit", "-m", "better message"]);
    let f = fixture([PresenterResponse::Edit(edited)]);
    let outcome = f
        .interceptor
        .guard_and_approve_command(r#"git commit -m "wip""#)
        .await;
    let Outcome::Proceed(command) = outcome else {
        panic!("expected proceed, got {outcome:?}");
    };
    assert_eq!(command.argv(), ["git", "commit", "-m", "better message"]);

    let f = fixture([PresenterResponse::Edit(ProposedAction::command([
        "sudo", "git", "commit",
    ]))]);
    let outcome = f.interceptor.guard_and_approve_command("git commit").await;
    assert_eq!(abort_code(&outcome), "banned_command");
}

#[tokio::test]
async fn test_command_edit_may_not_become_file_access() {
    let f = fixture([PresenterResponse::Edit(ProposedAction::file(
        "src/main.rs",
        AccessMode::Read,
    ))]);
    let outcome = f.interceptor.guard_and_approve_command("ls").await;
    assert_eq!(abort_code(&outcome), "unsupported_syntax");
}

#[tokio::test]
async fn test_approved_directory_change_updates_cwd() {
    let f = fixture([PresenterResponse::Approve, PresenterResponse::Deny]);
    let outcome = f.interceptor.guard_and_approve_command("cd src").await;
    let Outcome::Proceed(command) = outcome else {
        panic!("expected proceed, got {outcome:?}");
    };
    assert!(command.change_directory().is_some());
    assert_eq!(f.interceptor.cwd(), f.root.join("src"));
    assert_eq!(*f.interceptor.cwd_handle().read().unwrap(), f.root.join("src"));

    // Relative paths now resolve from the new directory.
    let outcome = f
        .interceptor
        .guard_and_approve_file("main.rs", AccessMode::Reference)
        .await;
    assert_eq!(abort_code(&outcome), "user_denied");
    let description = &f.presenter.descriptions()[1];
    assert!(description.ends_with("src/main.rs"), "{description}");
}

#[tokio::test]
async fn test_denied_directory_change_keeps_cwd() {
    let f = fixture([PresenterResponse::Deny]);
    let outcome = f.interceptor.guard_and_approve_command("cd src").await;
    assert_eq!(abort_code(&outcome), "user_denied");
    assert_eq!(f.interceptor.cwd(), f.root);

    let outcome = f.interceptor.guard_and_approve_command("cd ..").await;
    assert_eq!(abort_code(&outcome), "directory_escape");
    assert_eq!(f.interceptor.cwd(), f.root);
}

#[tokio::test]
async fn test_cancelled_request() {
    let f = fixture([PresenterResponse::Approve]);
    let cancel = CancellationToken::new();
    cancel.cancel();
    let outcome = f
        .interceptor
        .guard_and_approve_file_with_cancel("src/a.ts", AccessMode::write(), &cancel)
        .await;
    assert_eq!(outcome, Outcome::Abort(AbortReason::Cancelled));

    let outcome = f
        .interceptor
        .guard_and_approve_command_with_cancel("ls", &cancel)
        .await;
    assert_eq!(outcome, Outcome::Abort(AbortReason::Cancelled));
    assert_eq!(f.presenter.prompts(), 0);
}

#[tokio::test]
async fn test_end_session_clears_grants() {
    let f = fixture([PresenterResponse::Approve, PresenterResponse::Deny]);
    assert!(
        f.interceptor
            .guard_and_approve_file("src/a.ts", AccessMode::write())
            .await
            .is_proceed()
    );
    assert_eq!(f.interceptor.ledger().count(), 1);

    f.interceptor.end_session();
    assert_eq!(f.interceptor.ledger().count(), 0);

    let outcome = f
        .interceptor
        .guard_and_approve_file("src/a.ts", AccessMode::write())
        .await;
    assert_eq!(abort_code(&outcome), "user_denied");
    assert_eq!(f.presenter.prompts(), 2);
}

#[tokio::test]
async fn test_sub_agent_has_own_grants() {
    let f = fixture([PresenterResponse::Approve]);
    let sub = SecurityInterceptor::new(
        Arc::clone(f.interceptor.policy()),
        f.presenter.clone(),
        &f.root,
    )
    .unwrap()
    .with_actor(ActorId::new("sub-agent"));
    assert_eq!(sub.actor().as_str(), "sub-agent");

    assert!(
        f.interceptor
            .guard_and_approve_file("src/a.ts", AccessMode::write())
            .await
            .is_proceed()
    );
    let outcome = sub
        .guard_and_approve_file("src/a.ts", AccessMode::write())
        .await;
    assert_eq!(abort_code(&outcome), "user_denied");
}

#[tokio::test]
async fn test_from_config_applies_approval_section() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().canonicalize().unwrap();
    let mut config = PolicyConfig::default().with_root(&root);
    config.approval = ApprovalSection {
        file_expiry: ExpiryChoice::OneShot,
        command_expiry: ExpiryChoice::OneShot,
    };

    let presenter = Recording::new([PresenterResponse::Approve]);
    let interceptor =
        SecurityInterceptor::from_config(&config, presenter.clone(), &root).unwrap();
    assert_eq!(interceptor.defaults().file_expiry, crate::ledger::Expiry::OneShot);

    assert!(
        interceptor
            .guard_and_approve_file("a.txt", AccessMode::write())
            .await
            .is_proceed()
    );
    let outcome = interceptor
        .guard_and_approve_file("a.txt", AccessMode::write())
        .await;
    assert_eq!(abort_code(&outcome), "user_denied");
    assert_eq!(presenter.prompts(), 2);
}

#[test]
fn test_from_config_rejects_invalid_policy() {
    let dir = TempDir::new().unwrap();
    let config = PolicyConfig::default();
    let result = SecurityInterceptor::from_config(&config, Recording::new([]), dir.path());
    assert!(matches!(result, Err(ApprovalError::Config(_))));
}
