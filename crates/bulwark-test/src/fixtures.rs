//! Test fixtures: ids, logging, and a throwaway project tree.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use bulwark_approval::{ApprovalPresenter, SecurityInterceptor};
use bulwark_config::PolicyConfig;
use bulwark_core::{ActorId, SecurityPolicy, SessionId};

/// Create a test actor id.
#[must_use]
pub fn test_actor() -> ActorId {
    ActorId::new("test-agent")
}

/// Create a test session id.
#[must_use]
pub fn test_session_id() -> SessionId {
    SessionId::new()
}

/// Route tracing output to the test harness. Safe to call repeatedly.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// A temporary project directory plus a sibling directory outside it.
///
/// Layout:
///
/// ```text
/// <tmp>/project/          allowed root
/// <tmp>/project/src/
/// <tmp>/outside/          never allowed
/// ```
///
/// Every path handed out is canonical, so comparisons against guard
/// output hold even where the temp dir lives behind a symlink.
#[derive(Debug)]
pub struct TestProject {
    _dir: TempDir,
    root: PathBuf,
    outside: PathBuf,
}

impl TestProject {
    /// Create the project tree.
    ///
    /// # Panics
    ///
    /// Panics if the temporary directory cannot be created.
    #[must_use]
    pub fn new() -> Self {
        let dir = TempDir::new().expect("create temp dir");
        let base = dir.path().canonicalize().expect("canonicalize temp dir");
        let root = base.join("project");
        let outside = base.join("outside");
        std::fs::create_dir_all(root.join("src")).expect("create project/src");
        std::fs::create_dir_all(&outside).expect("create outside dir");
        Self {
            _dir: dir,
            root,
            outside,
        }
    }

    /// The allowed root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// A directory outside the allowed root.
    #[must_use]
    pub fn outside(&self) -> &Path {
        &self.outside
    }

    /// `rel` joined onto the root; nothing is created.
    #[must_use]
    pub fn path(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    /// Write a file under the root, creating parent directories.
    ///
    /// # Panics
    ///
    /// Panics on I/O failure.
    pub fn file(&self, rel: &str, contents: &str) -> PathBuf {
        write_file(&self.root.join(rel), contents)
    }

    /// Create a directory under the root.
    ///
    /// # Panics
    ///
    /// Panics on I/O failure.
    pub fn dir(&self, rel: &str) -> PathBuf {
        let path = self.root.join(rel);
        std::fs::create_dir_all(&path).expect("create dir");
        path
    }

    /// Write a file in the outside directory.
    ///
    /// # Panics
    ///
    /// Panics on I/O failure.
    pub fn outside_file(&self, rel: &str, contents: &str) -> PathBuf {
        write_file(&self.outside.join(rel), contents)
    }

    /// Create a symlink under the root pointing at `target`.
    ///
    /// # Panics
    ///
    /// Panics on I/O failure.
    #[cfg(unix)]
    pub fn symlink(&self, rel: &str, target: &Path) -> PathBuf {
        let link = self.root.join(rel);
        std::os::unix::fs::symlink(target, &link).expect("create symlink");
        link
    }

    /// A default policy over the root.
    ///
    /// # Panics
    ///
    /// Panics if the root is unusable.
    #[must_use]
    pub fn policy(&self) -> SecurityPolicy {
        SecurityPolicy::new([&self.root]).expect("policy over project root")
    }

    /// A configuration whose only root is the project root.
    #[must_use]
    pub fn config(&self) -> PolicyConfig {
        PolicyConfig::default().with_root(&self.root)
    }

    /// An interceptor over [`policy`](Self::policy), starting at the root.
    ///
    /// # Panics
    ///
    /// Panics if the interceptor cannot be created.
    #[must_use]
    pub fn interceptor(&self, presenter: Arc<dyn ApprovalPresenter>) -> SecurityInterceptor {
        self.interceptor_with(self.policy(), presenter)
    }

    /// An interceptor over a custom `policy`, starting at the root.
    ///
    /// # Panics
    ///
    /// Panics if the interceptor cannot be created.
    #[must_use]
    pub fn interceptor_with(
        &self,
        policy: SecurityPolicy,
        presenter: Arc<dyn ApprovalPresenter>,
    ) -> SecurityInterceptor {
        SecurityInterceptor::new(Arc::new(policy), presenter, &self.root)
            .expect("interceptor over project root")
            .with_actor(test_actor())
    }
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}

fn write_file(path: &Path, contents: &str) -> PathBuf {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create parent dir");
    }
    std::fs::write(path, contents).expect("write file");
    path.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MockPresenter;
    use bulwark_approval::PresenterResponse;
    use bulwark_workspace::AccessMode;

    #[test]
    fn test_layout() {
        let project = TestProject::new();
        assert!(project.root().join("src").is_dir());
        assert!(project.outside().is_dir());
        assert!(!project.outside().starts_with(project.root()));

        let file = project.file("docs/readme.md", "hello");
        assert_eq!(std::fs::read_to_string(&file).unwrap(), "hello");
        assert!(project.policy().is_within_roots(&file));
        assert!(!project.policy().is_within_roots(&project.outside_file("x", "")));
    }

    #[tokio::test]
    async fn test_interceptor_uses_test_actor() {
        let project = TestProject::new();
        let presenter = MockPresenter::new().with_response(PresenterResponse::Approve);
        let interceptor = project.interceptor(presenter.clone());
        assert_eq!(interceptor.actor(), &test_actor());

        let outcome = interceptor
            .guard_and_approve_file("src/lib.rs", AccessMode::write())
            .await;
        assert!(outcome.is_proceed());
        assert_eq!(presenter.last_request().unwrap().actor, test_actor());
    }
}
