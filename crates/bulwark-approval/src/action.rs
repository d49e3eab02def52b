//! Proposed actions: the closed set of things the coordinator mediates.

use bulwark_core::ActionClass;
use bulwark_shell::render_shell_line;
use bulwark_workspace::AccessMode;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::ledger::{Scope, Subject};

/// An action awaiting a decision.
///
/// Built by the interceptor from guard output (canonical path, validated
/// argv). A presenter's [`Edit`](crate::PresenterResponse::Edit) carries one
/// too, in which case it is untrusted until revalidated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ProposedAction {
    /// Access a file or directory.
    File {
        /// The path.
        path: PathBuf,
        /// How it will be accessed.
        mode: AccessMode,
    },
    /// Run a command.
    Command {
        /// The argv, executable first.
        argv: Vec<String>,
    },
}

impl ProposedAction {
    /// A file action.
    #[must_use]
    pub fn file(path: impl Into<PathBuf>, mode: AccessMode) -> Self {
        Self::File {
            path: path.into(),
            mode,
        }
    }

    /// A command action.
    #[must_use]
    pub fn command<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Command {
            argv: argv.into_iter().map(Into::into).collect(),
        }
    }

    /// The action class of a file access in `mode`.
    #[must_use]
    pub fn file_class(mode: AccessMode) -> ActionClass {
        match mode {
            AccessMode::Write { .. } => ActionClass::FileWrite,
            AccessMode::Read | AccessMode::Directory | AccessMode::Reference => {
                ActionClass::FileRead
            },
        }
    }

    /// The action class used for grants.
    #[must_use]
    pub fn class(&self) -> ActionClass {
        match self {
            Self::File { mode, .. } => Self::file_class(*mode),
            Self::Command { .. } => ActionClass::CommandExec,
        }
    }

    /// The scope a decision on this action is recorded under.
    #[must_use]
    pub fn scope(&self) -> Scope {
        match self {
            Self::File { path, mode } => Scope::for_path(path, *mode == AccessMode::Directory),
            Self::Command { argv } => Scope::for_command(argv),
        }
    }

    /// The concrete subject grants are matched against.
    #[must_use]
    pub fn subject(&self) -> Subject<'_> {
        match self {
            Self::File { path, .. } => Subject::Path(path),
            Self::Command { argv } => Subject::Command(argv),
        }
    }

    /// The exact path or command line, for display.
    #[must_use]
    pub fn display_target(&self) -> String {
        match self {
            Self::File { path, .. } => path.display().to_string(),
            Self::Command { argv } => render_shell_line(argv),
        }
    }
}

impl fmt::Display for ProposedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.class(), self.display_target())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_follows_mode() {
        assert_eq!(
            ProposedAction::file("/srv/a", AccessMode::write()).class(),
            ActionClass::FileWrite
        );
        assert_eq!(
            ProposedAction::file("/srv/a", AccessMode::Read).class(),
            ActionClass::FileRead
        );
        assert_eq!(
            ProposedAction::file("/srv", AccessMode::Directory).class(),
            ActionClass::FileRead
        );
        assert_eq!(
            ProposedAction::command(["ls"]).class(),
            ActionClass::CommandExec
        );
    }

    #[test]
    fn test_scope_per_kind() {
        assert_eq!(
            ProposedAction::file("/srv/project/src/a.ts", AccessMode::write()).scope(),
            Scope::Directory(PathBuf::from("/srv/project/src"))
        );
        assert_eq!(
            ProposedAction::file("/srv/project", AccessMode::Directory).scope(),
            Scope::Directory(PathBuf::from("/srv/project"))
        );
        assert_eq!(
            ProposedAction::command(["git", "commit", "-m", "x"]).scope(),
            Scope::CommandPrefix(vec!["git".to_string(), "commit".to_string()])
        );
    }

    #[test]
    fn test_display_quotes_command() {
        let action = ProposedAction::command(["git", "commit", "-m", "a b"]);
        assert_eq!(action.to_string(), "command: git commit -m 'a b'");
    }

    #[test]
    fn test_serde_tagged() {
        let json = r#"{"kind":"command","argv":["ls","-la"]}"#;
        let action: ProposedAction = serde_json::from_str(json).unwrap();
        assert_eq!(action, ProposedAction::command(["ls", "-la"]));

        let json = r#"{"kind":"file","path":"/srv/a.txt","mode":{"mode":"write","len":3}}"#;
        let action: ProposedAction = serde_json::from_str(json).unwrap();
        assert_eq!(
            action,
            ProposedAction::file("/srv/a.txt", AccessMode::Write { len: Some(3) })
        );
    }
}
