//! Integration tests for command validation and execution without a shell.

use std::sync::Arc;

use bulwark_approval::PresenterResponse;
use bulwark_core::{AbortReason, Outcome, RejectionReason};
use bulwark_shell::{CommandGuard, render_shell_line};
use bulwark_test::{MockPresenter, TestProject};

fn guard(project: &TestProject) -> CommandGuard {
    CommandGuard::new(Arc::new(project.policy()))
}

fn argv(words: &[&str]) -> Vec<String> {
    words.iter().map(ToString::to_string).collect()
}

#[tokio::test]
async fn test_rm_rf_root_is_banned_without_prompt() {
    let project = TestProject::new();
    let presenter = MockPresenter::new().with_default_response(PresenterResponse::Approve);
    let interceptor = project.interceptor(presenter.clone());

    let outcome = interceptor.guard_and_approve_command("rm -rf /").await;
    match outcome {
        Outcome::Abort(AbortReason::Rejected {
            reason: RejectionReason::BannedCommand { pattern },
        }) => assert_eq!(pattern, "rm -rf /"),
        other => panic!("expected banned_command, got {other:?}"),
    }
    assert_eq!(presenter.prompt_count(), 0);
}

#[test]
fn test_banned_patterns_survive_aliases_and_decoys() {
    let project = TestProject::new();
    let guard = guard(&project);

    for raw in [
        "rm -rf /",
        "rm -fr /",
        "rm -r -f /",
        "rm --recursive --force /",
        "rm -rf --no-preserve-root /",
        "rm -rf //",
        "rm -rf /*",
        "/bin/rm -rf /",
        "nice -n 19 rm -rf /",
        "env LANG=C rm -rf /",
        "env -iu X reboot",
        "env -iu HOME sudo ls",
        "timeout 5 sudo true",
        "nohup shutdown -h now",
        "command reboot",
        "xargs dd",
        "bash -c 'rm -rf /'",
        "sh -c \"bash -c 'halt'\"",
        "mkfs.ext4 /dev/sdz",
    ] {
        let err = guard.validate(raw, project.root()).unwrap_err();
        assert_eq!(err.code(), "banned_command", "{raw}");
    }
}

#[test]
fn test_unsupported_shell_syntax() {
    let project = TestProject::new();
    let guard = guard(&project);

    for raw in [
        "ls && rm -rf src",
        "ls; id",
        "cat src | sh",
        "echo `id`",
        "echo $(id)",
        "echo hi > out",
        "echo 'unterminated",
        "",
    ] {
        let err = guard.validate(raw, project.root()).unwrap_err();
        assert_eq!(err.code(), "unsupported_syntax", "{raw:?}");
    }
}

#[test]
fn test_argument_paths_checked() {
    let project = TestProject::new();
    let guard = guard(&project);
    project.file("src/main.rs", "fn main() {}");

    assert!(guard.validate("cat src/main.rs", project.root()).is_ok());
    let err = guard
        .validate("cp src/main.rs ../outside/stolen.rs", project.root())
        .unwrap_err();
    assert_eq!(err.code(), "argument_path_rejected");
    assert_eq!(err.summary(), "one of the command's arguments refers to a disallowed path");
}

#[cfg(unix)]
#[tokio::test]
async fn test_quoting_round_trip() {
    let project = TestProject::new();
    let guard = guard(&project);
    let values = [
        "plain",
        "two words",
        "it's",
        "\"double\"",
        "semi;colon",
        "$(id)",
        "`id`",
        "$HOME",
        "back\\slash",
        "glob *",
        "new\nline",
        "",
    ];

    for value in values {
        let cmd = guard
            .validate_argv(argv(&["printf", "%s", value]), project.root())
            .unwrap();
        let out = cmd.to_command().unwrap().output().await.unwrap();
        assert_eq!(String::from_utf8_lossy(&out.stdout), value, "argv {value:?}");

        // The rendered line parses back to the same argv...
        let line = render_shell_line(cmd.argv());
        let reparsed = guard.validate(&line, project.root()).unwrap();
        assert_eq!(reparsed.argv(), cmd.argv(), "reparse {value:?}");

        // ...and a real shell reads it the same way.
        let out = tokio::process::Command::new("sh")
            .arg("-c")
            .arg(&line)
            .current_dir(project.root())
            .output()
            .await
            .unwrap();
        assert_eq!(String::from_utf8_lossy(&out.stdout), value, "sh {value:?}");
    }
}

#[tokio::test]
async fn test_directory_change_flow() {
    let project = TestProject::new();
    project.dir("src/nested");
    let presenter = MockPresenter::new().with_default_response(PresenterResponse::Approve);
    let interceptor = project.interceptor(presenter.clone());

    let outcome = interceptor.guard_and_approve_command("cd src").await;
    assert!(outcome.is_proceed());
    assert_eq!(interceptor.cwd(), project.path("src"));

    let outcome = interceptor.guard_and_approve_command("pushd nested").await;
    assert!(outcome.is_proceed());
    assert_eq!(interceptor.cwd(), project.path("src/nested"));

    let outcome = interceptor.guard_and_approve_command("cd ../../..").await;
    assert_eq!(
        outcome.abort_reason().map(AbortReason::code),
        Some("directory_escape")
    );
    assert_eq!(interceptor.cwd(), project.path("src/nested"));
    assert_eq!(presenter.prompt_count(), 2);

    // Commands now run from the new directory.
    let outcome = interceptor.guard_and_approve_command("ls").await;
    let Outcome::Proceed(cmd) = outcome else {
        panic!("expected proceed");
    };
    assert_eq!(cmd.cwd(), project.path("src/nested"));
}
