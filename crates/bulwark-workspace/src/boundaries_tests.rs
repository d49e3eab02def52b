use super::*;
use tempfile::TempDir;

struct Fixture {
    _dir: TempDir,
    root: PathBuf,
    guard: PathGuard,
}

fn fixture_with(build: impl FnOnce(SecurityPolicy) -> SecurityPolicy) -> Fixture {
    let dir = TempDir::new().unwrap();
    let root = dir.path().canonicalize().unwrap().join("project");
    std::fs::create_dir_all(root.join("src")).unwrap();
    std::fs::write(root.join("src/main.rs"), "fn main() {}").unwrap();
    std::fs::write(root.join("Cargo.toml"), "[package]").unwrap();
    let policy = build(SecurityPolicy::new([&root]).unwrap());
    Fixture {
        _dir: dir,
        root,
        guard: PathGuard::new(Arc::new(policy)),
    }
}

fn fixture() -> Fixture {
    fixture_with(|p| p)
}

#[test]
fn test_accepts_relative_path_inside_root() {
    let f = fixture();
    let path = f
        .guard
        .validate("src/main.rs", &f.root, AccessMode::Read)
        .unwrap();
    assert_eq!(path, f.root.join("src/main.rs"));
    assert!(path.is_absolute());
}

#[test]
fn test_validation_is_idempotent() {
    let f = fixture();
    let first = f
        .guard
        .validate("./src/../src/main.rs", &f.root, AccessMode::Read)
        .unwrap();
    let again = f
        .guard
        .validate(&first.display().to_string(), Path::new("/"), AccessMode::Read)
        .unwrap();
    assert_eq!(first, again);
}

#[test]
fn test_dotdot_staying_inside_root_is_allowed() {
    let f = fixture();
    let path = f
        .guard
        .validate("src/../Cargo.toml", &f.root, AccessMode::Read)
        .unwrap();
    assert_eq!(path, f.root.join("Cargo.toml"));
}

#[test]
fn test_traversal_outside_root_rejected() {
    let f = fixture();
    let err = f
        .guard
        .validate("../../etc/passwd", &f.root, AccessMode::Read)
        .unwrap_err();
    assert!(matches!(err, RejectionReason::OutsideAllowedRoot { .. }));
}

#[test]
fn test_absolute_outside_root_rejected() {
    let f = fixture();
    let err = f
        .guard
        .validate("/etc/passwd", &f.root, AccessMode::Read)
        .unwrap_err();
    assert_eq!(err.code(), "outside_allowed_root");
}

#[test]
fn test_sibling_with_shared_prefix_rejected() {
    let f = fixture();
    let sibling = format!("{}-evil/file.txt", f.root.display());
    let err = f
        .guard
        .validate(&sibling, &f.root, AccessMode::write())
        .unwrap_err();
    assert!(matches!(err, RejectionReason::OutsideAllowedRoot { .. }));
}

#[test]
fn test_encoded_traversal_rejected() {
    let f = fixture();
    for raw in ["..%2f..%2fetc/passwd", "%2E%2E/secret", "src%5c..%5c..", "a/%2e%2e/b"] {
        let err = f.guard.validate(raw, &f.root, AccessMode::Read).unwrap_err();
        assert!(
            matches!(err, RejectionReason::PathTraversal { .. }),
            "{raw} gave {err:?}"
        );
    }
}

#[test]
fn test_nul_byte_rejected() {
    let f = fixture();
    let err = f
        .guard
        .validate("src/main.rs\0.txt", &f.root, AccessMode::Read)
        .unwrap_err();
    assert!(matches!(err, RejectionReason::PathTraversal { .. }));
}

#[test]
fn test_empty_path_rejected() {
    let f = fixture();
    assert!(f.guard.validate("", &f.root, AccessMode::Read).is_err());
}

#[test]
fn test_path_too_long() {
    let f = fixture_with(|p| p.with_max_path_length(16));
    let err = f
        .guard
        .validate("src/a/very/long/path.rs", &f.root, AccessMode::Read)
        .unwrap_err();
    assert_eq!(
        err,
        RejectionReason::PathTooLong {
            length: 23,
            limit: 16
        }
    );
}

#[cfg(unix)]
#[test]
fn test_symlink_escape_rejected() {
    let f = fixture();
    std::os::unix::fs::symlink("/etc", f.root.join("etc-link")).unwrap();
    let err = f
        .guard
        .validate("etc-link/passwd", &f.root, AccessMode::Read)
        .unwrap_err();
    assert!(matches!(err, RejectionReason::OutsideAllowedRoot { .. }));
}

#[cfg(unix)]
#[test]
fn test_symlink_inside_root_resolves() {
    let f = fixture();
    std::os::unix::fs::symlink(f.root.join("src"), f.root.join("code")).unwrap();
    let path = f
        .guard
        .validate("code/main.rs", &f.root, AccessMode::Read)
        .unwrap();
    assert_eq!(path, f.root.join("src/main.rs"));
}

#[cfg(unix)]
#[test]
fn test_symlink_loop_rejected() {
    let f = fixture();
    std::os::unix::fs::symlink(f.root.join("loop-b"), f.root.join("loop-a")).unwrap();
    std::os::unix::fs::symlink(f.root.join("loop-a"), f.root.join("loop-b")).unwrap();
    let err = f
        .guard
        .validate("loop-a", &f.root, AccessMode::Read)
        .unwrap_err();
    assert!(matches!(err, RejectionReason::PathTraversal { .. }));
}

#[test]
fn test_extension_allow_list() {
    let f = fixture_with(|p| p.with_allowed_extensions(["rs", "toml"]));
    assert!(
        f.guard
            .validate("src/main.rs", &f.root, AccessMode::Read)
            .is_ok()
    );
    assert!(
        f.guard
            .validate("src/NEW.RS", &f.root, AccessMode::write())
            .is_ok()
    );
    let err = f
        .guard
        .validate("deploy.sh", &f.root, AccessMode::write())
        .unwrap_err();
    assert_eq!(
        err,
        RejectionReason::DisallowedExtension {
            extension: "sh".to_string()
        }
    );
    // References and directories are not content access.
    assert!(
        f.guard
            .validate("deploy.sh", &f.root, AccessMode::Reference)
            .is_ok()
    );
    assert!(f.guard.validate("src", &f.root, AccessMode::Read).is_ok());
}

#[test]
fn test_size_limit_on_existing_file() {
    let f = fixture_with(|p| p.with_max_file_size(8));
    std::fs::write(f.root.join("big.txt"), "0123456789").unwrap();
    let err = f
        .guard
        .validate("big.txt", &f.root, AccessMode::Read)
        .unwrap_err();
    assert_eq!(
        err,
        RejectionReason::SizeLimitExceeded { size: 10, limit: 8 }
    );
}

#[test]
fn test_size_limit_on_incoming_write() {
    let f = fixture_with(|p| p.with_max_file_size(8));
    let err = f
        .guard
        .validate("new.txt", &f.root, AccessMode::Write { len: Some(9) })
        .unwrap_err();
    assert!(matches!(err, RejectionReason::SizeLimitExceeded { .. }));
    assert!(
        f.guard
            .validate("new.txt", &f.root, AccessMode::Write { len: Some(8) })
            .is_ok()
    );
}

#[test]
fn test_directory_mode() {
    let f = fixture();
    assert_eq!(
        f.guard
            .validate("src", &f.root, AccessMode::Directory)
            .unwrap(),
        f.root.join("src")
    );
    assert!(
        f.guard
            .validate("Cargo.toml", &f.root, AccessMode::Directory)
            .is_err()
    );
    // A directory that does not exist yet may still be created.
    assert!(
        f.guard
            .validate("target/debug", &f.root, AccessMode::Directory)
            .is_ok()
    );
}

#[test]
fn test_validate_within_narrower_roots() {
    let f = fixture();
    let src_only = [f.root.join("src")];
    assert!(
        f.guard
            .validate_within("src/main.rs", &f.root, &src_only, AccessMode::Read)
            .is_ok()
    );
    let err = f
        .guard
        .validate_within("Cargo.toml", &f.root, &src_only, AccessMode::Read)
        .unwrap_err();
    assert!(matches!(err, RejectionReason::OutsideAllowedRoot { .. }));
}

#[test]
fn test_validate_within_cannot_widen_policy() {
    let f = fixture();
    let wide = [PathBuf::from("/")];
    assert!(
        f.guard
            .validate_within("/etc/hosts", &f.root, &wide, AccessMode::Read)
            .is_err()
    );
}

#[test]
fn test_interpolation_screen() {
    let f = fixture();
    std::fs::write(f.root.join("a;b.txt"), "").unwrap();
    assert!(
        f.guard
            .validate("a;b.txt", &f.root, AccessMode::Read)
            .is_ok()
    );
    let err = f
        .guard
        .validate_for_interpolation("a;b.txt", &f.root, AccessMode::Read)
        .unwrap_err();
    assert_eq!(err, RejectionReason::ShellMetacharacter { character: ';' });
    assert!(
        f.guard
            .validate_for_interpolation("src/main.rs", &f.root, AccessMode::Read)
            .is_ok()
    );
}

#[test]
fn test_access_mode_serialization() {
    let json = serde_json::to_string(&AccessMode::Write { len: Some(3) }).unwrap();
    assert_eq!(json, r#"{"mode":"write","len":3}"#);
    assert!(AccessMode::write().checks_content());
    assert!(!AccessMode::Reference.checks_content());
}
