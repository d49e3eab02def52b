//! The output of a successful command validation.

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::quote::render_shell_line;

/// What running a validated command means for the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "target")]
pub enum CommandKind {
    /// Spawn a process.
    Exec,
    /// Change the session working directory to this canonical path.
    ChangeDirectory(PathBuf),
}

/// A command that passed the command guard.
///
/// Only the guard constructs these, so holding one means every layer of the
/// argv was checked against the policy. The argv is run as-is; it is never
/// joined and re-parsed by a shell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidatedCommand {
    argv: Vec<String>,
    cwd: PathBuf,
    kind: CommandKind,
}

impl ValidatedCommand {
    pub(crate) fn new(argv: Vec<String>, cwd: PathBuf, kind: CommandKind) -> Self {
        Self { argv, cwd, kind }
    }

    /// The full argv, executable first.
    #[must_use]
    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    /// The executable as written.
    #[must_use]
    pub fn program(&self) -> &str {
        self.argv.first().map_or("", String::as_str)
    }

    /// Arguments after the executable.
    #[must_use]
    pub fn args(&self) -> &[String] {
        self.argv.get(1..).unwrap_or_default()
    }

    /// Working directory the command was validated against.
    #[must_use]
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// How the command affects the session.
    #[must_use]
    pub fn kind(&self) -> &CommandKind {
        &self.kind
    }

    /// The new working directory, for a directory change.
    #[must_use]
    pub fn change_directory(&self) -> Option<&Path> {
        match &self.kind {
            CommandKind::ChangeDirectory(target) => Some(target),
            CommandKind::Exec => None,
        }
    }

    /// The argv rendered as a copy-pasteable shell line.
    #[must_use]
    pub fn shell_line(&self) -> String {
        render_shell_line(&self.argv)
    }

    /// Build a process for this command: program and arguments passed
    /// directly, working directory set explicitly.
    ///
    /// Returns `None` for a directory change, which the caller applies to
    /// its own session state instead of spawning anything.
    #[must_use]
    pub fn to_command(&self) -> Option<tokio::process::Command> {
        if self.change_directory().is_some() {
            return None;
        }
        let mut cmd = tokio::process::Command::new(self.program());
        cmd.args(self.args());
        cmd.current_dir(&self.cwd);
        Some(cmd)
    }

    /// Consume into the argv.
    #[must_use]
    pub fn into_argv(self) -> Vec<String> {
        self.argv
    }
}

impl fmt::Display for ValidatedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.shell_line())
    }
}
