//! Command guard: mechanical validation of command invocations.
//!
//! The guard turns a raw invocation into an argv and checks it:
//!
//! 1. Tokenize without a shell; refuse anything beyond a single command.
//! 2. Check every invocation layer (wrappers peeled) against the banned list.
//! 3. Tokenize and check shell scripts hidden in arguments, recursively.
//! 4. Send directory changes through the path guard.
//! 5. Send arguments that name paths through the path guard.
//!
//! Nothing is executed here.

use bulwark_core::{RejectionReason, SecurityPolicy};
use bulwark_workspace::{AccessMode, PathGuard};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::banned::{BannedList, basename};
use crate::invocation::{CommandKind, ValidatedCommand};
use crate::tokenize::tokenize;
use crate::unwrap::{Layers, is_assignment, layers};

/// Result of validating a command.
pub type CommandValidationResult = Result<ValidatedCommand, RejectionReason>;

/// Deepest `sh -c` nesting the guard will follow.
pub const MAX_NESTING: usize = 4;

/// Commands that change the working directory.
const CHANGE_DIRECTORY: &[&str] = &["cd", "pushd", "chdir"];

/// Utilities whose operands are all paths.
const FILE_UTILITIES: &[&str] = &[
    "cat", "cp", "mv", "rm", "touch", "mkdir", "rmdir", "ls", "head", "tail", "chmod", "chown",
    "chgrp", "ln", "tee", "less", "more", "wc", "stat", "file", "du", "truncate", "shred",
    "unlink", "readlink", "realpath", "diff", "cmp", "install",
];

/// Validates command invocations against a [`SecurityPolicy`].
#[derive(Debug, Clone)]
pub struct CommandGuard {
    paths: PathGuard,
    banned: BannedList,
}

impl CommandGuard {
    /// Create a guard over `policy`, compiling its banned list.
    #[must_use]
    pub fn new(policy: Arc<SecurityPolicy>) -> Self {
        let banned = BannedList::new(policy.banned_commands());
        debug!(patterns = banned.len(), "compiled banned command list");
        Self {
            paths: PathGuard::new(policy),
            banned,
        }
    }

    /// The policy this guard enforces.
    #[must_use]
    pub fn policy(&self) -> &SecurityPolicy {
        self.paths.policy()
    }

    /// Validate a raw invocation run from `cwd`.
    ///
    /// # Errors
    ///
    /// Returns the [`RejectionReason`] for the first failed check.
    pub fn validate(&self, raw: &str, cwd: &Path) -> CommandValidationResult {
        let limit = self.policy().max_path_length().saturating_mul(8);
        if raw.len() > limit {
            warn!(length = raw.len(), limit, "command invocation too long");
            return Err(RejectionReason::UnsupportedSyntax {
                detail: format!("invocation longer than {limit} bytes"),
            });
        }
        let argv = tokenize(raw)?;
        self.validate_argv(argv, cwd)
    }

    /// Validate an already tokenized argv run from `cwd`.
    ///
    /// # Errors
    ///
    /// Returns the [`RejectionReason`] for the first failed check.
    pub fn validate_argv(&self, argv: Vec<String>, cwd: &Path) -> CommandValidationResult {
        let Some(program) = argv.first() else {
            return Err(RejectionReason::UnsupportedSyntax {
                detail: "empty command".to_string(),
            });
        };

        if CHANGE_DIRECTORY.contains(&basename(program)) {
            self.check_banned(&argv, &layers(&argv))?;
            return self.change_directory(&argv, cwd);
        }

        self.check(&argv, cwd, 0)?;
        debug!(program = %program, "command passed guard");
        Ok(ValidatedCommand::new(argv, cwd.to_path_buf(), CommandKind::Exec))
    }

    fn check(&self, argv: &[String], cwd: &Path, depth: usize) -> Result<(), RejectionReason> {
        let layers = layers(argv);
        self.check_banned(argv, &layers)?;

        for script in &layers.scripts {
            if depth >= MAX_NESTING {
                return Err(RejectionReason::UnsupportedSyntax {
                    detail: "shell scripts nested too deeply".to_string(),
                });
            }
            let Some(text) = script.text(argv) else {
                continue;
            };
            let inner = tokenize(text)?;
            check_expansions(&inner)?;
            self.check(&inner, cwd, depth.saturating_add(1))
                .map_err(|reason| reindex(reason, script.index))?;
        }

        self.check_argument_paths(argv, &layers, cwd)
    }

    fn check_banned(&self, argv: &[String], layers: &Layers) -> Result<(), RejectionReason> {
        for range in &layers.invocations {
            if let Some(pattern) = self.banned.find_match(&argv[range.clone()]) {
                warn!(pattern = %pattern.source(), "command matches banned pattern");
                return Err(RejectionReason::BannedCommand {
                    pattern: pattern.source().to_string(),
                });
            }
        }
        Ok(())
    }

    fn check_argument_paths(
        &self,
        argv: &[String],
        layers: &Layers,
        cwd: &Path,
    ) -> Result<(), RejectionReason> {
        // Owners (by executable index) that have seen `--`.
        let mut options_ended: Vec<usize> = Vec::new();

        for (index, arg) in argv.iter().enumerate() {
            if layers.is_executable(index) || layers.is_script(index) {
                continue;
            }
            let Some(owner) = layers.owner(index) else {
                // Leading `NAME=value` assignments.
                if let Some((_, value)) = arg.split_once('=')
                    && is_assignment(arg)
                    && looks_like_path(value)
                {
                    self.check_path(value, index, cwd)?;
                }
                continue;
            };
            let file_utility = FILE_UTILITIES.contains(&basename(&argv[owner.start]));
            let after_dashdash = options_ended.contains(&owner.start);

            let candidate = if !after_dashdash && arg == "--" {
                options_ended.push(owner.start);
                None
            } else if !after_dashdash && arg.starts_with('-') && arg != "-" {
                for value in option_values(arg) {
                    if looks_like_path(value) {
                        self.check_path(value, index, cwd)?;
                    }
                }
                None
            } else if file_utility && arg != "-" {
                Some(arg.as_str())
            } else {
                Some(arg.as_str()).filter(|a| looks_like_path(a))
            };

            if let Some(path) = candidate {
                self.check_path(path, index, cwd)?;
            }
        }
        Ok(())
    }

    fn check_path(&self, path: &str, index: usize, cwd: &Path) -> Result<(), RejectionReason> {
        self.paths
            .validate(path, cwd, AccessMode::Reference)
            .map(|_| ())
            .map_err(|reason| {
                debug!(index, reason = %reason, "argument path rejected");
                reason.for_argument(index)
            })
    }

    fn change_directory(&self, argv: &[String], cwd: &Path) -> CommandValidationResult {
        let target = argv
            .iter()
            .skip(1)
            .map(String::as_str)
            .find(|a| *a == "-" || !a.starts_with('-'));

        let escape = |target: &str| RejectionReason::DirectoryEscape {
            target: target.to_string(),
        };
        let target = match target {
            None => return Err(escape("")),
            Some("-") => return Err(escape("-")),
            Some(target) => target,
        };

        let canonical = self
            .paths
            .validate(target, cwd, AccessMode::Directory)
            .map_err(|reason| {
                warn!(dir = target, reason = %reason, "directory change rejected");
                escape(target)
            })?;
        if !canonical.is_dir() {
            warn!(dir = target, "directory change target is not a directory");
            return Err(escape(target));
        }

        debug!(dir = %canonical.display(), "directory change passed guard");
        Ok(ValidatedCommand::new(
            vec![argv[0].clone(), canonical.to_string_lossy().into_owned()],
            cwd.to_path_buf(),
            CommandKind::ChangeDirectory(canonical),
        ))
    }
}

/// A word that names a filesystem location.
fn looks_like_path(arg: &str) -> bool {
    if arg.is_empty() || arg.chars().any(char::is_whitespace) || arg.contains("://") {
        return false;
    }
    arg == "." || arg == ".." || arg.starts_with('/') || arg.starts_with("~/") || arg.contains('/')
}

/// Values an option word may carry: the part after `=` for `--opt=value`,
/// and for a short cluster such as `-vt/dir` every tail that follows an
/// option letter, since any letter might be the one taking a value.
fn option_values(arg: &str) -> Vec<&str> {
    if let Some(long) = arg.strip_prefix("--") {
        return long.split_once('=').map(|(_, value)| value).into_iter().collect();
    }
    arg.char_indices()
        .skip(1)
        .filter_map(|(pos, letter)| arg.get(pos.saturating_add(letter.len_utf8())..))
        .filter(|tail| !tail.is_empty())
        .collect()
}

/// A shell running a script expands `~` and `$`; the guard cannot see
/// through either, so scripts may not use them.
fn check_expansions(argv: &[String]) -> Result<(), RejectionReason> {
    if argv.iter().any(|w| w.starts_with('~') || w.contains('$')) {
        return Err(RejectionReason::UnsupportedSyntax {
            detail: "shell expansion in script".to_string(),
        });
    }
    Ok(())
}

/// Point argument rejections from inside a script at the script argument.
fn reindex(reason: RejectionReason, index: usize) -> RejectionReason {
    match reason {
        RejectionReason::ArgumentPathRejected { inner, .. } => {
            RejectionReason::ArgumentPathRejected { index, inner }
        },
        other => other,
    }
}

#[cfg(test)]
#[path = "guard_tests.rs"]
mod tests;
