//! Grant scopes and the concrete subjects they cover.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use bulwark_shell::banned::basename;

/// The concrete thing a request is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subject<'a> {
    /// A canonical path.
    Path(&'a Path),
    /// A validated argv.
    Command(&'a [String]),
}

/// The boundary a grant applies to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum Scope {
    /// Every path under this canonical directory (component-wise).
    Directory(PathBuf),
    /// Every argv starting with these tokens. The first token is an
    /// executable basename.
    CommandPrefix(Vec<String>),
}

impl Scope {
    /// Scope for a command: executable basename, plus the first argument when
    /// it is not a flag (`git commit`, but just `ls` for `ls -la`).
    #[must_use]
    pub fn for_command(argv: &[String]) -> Self {
        let mut prefix = Vec::with_capacity(2);
        if let Some((program, args)) = argv.split_first() {
            prefix.push(basename(program).to_string());
            if let Some(first) = args.first().filter(|a| !a.starts_with('-')) {
                prefix.push(first.clone());
            }
        }
        Self::CommandPrefix(prefix)
    }

    /// Scope for a file: its parent directory, or the path itself when it
    /// is used as a directory.
    #[must_use]
    pub fn for_path(path: &Path, as_directory: bool) -> Self {
        let dir = if as_directory {
            path
        } else {
            path.parent().unwrap_or(path)
        };
        Self::Directory(dir.to_path_buf())
    }

    /// Whether this scope covers `subject`.
    #[must_use]
    pub fn covers(&self, subject: Subject<'_>) -> bool {
        match (self, subject) {
            (Self::Directory(dir), Subject::Path(path)) => path.starts_with(dir),
            (Self::CommandPrefix(prefix), Subject::Command(argv)) => {
                let Some((program, args)) = argv.split_first() else {
                    return false;
                };
                let Some((scope_program, scope_args)) = prefix.split_first() else {
                    return false;
                };
                basename(program) == scope_program
                    && args.len() >= scope_args.len()
                    && args.iter().zip(scope_args).all(|(a, s)| a == s)
            },
            _ => false,
        }
    }

    /// Number of path components or tokens; higher is more specific.
    #[must_use]
    pub fn specificity(&self) -> usize {
        match self {
            Self::Directory(dir) => dir.components().count(),
            Self::CommandPrefix(prefix) => prefix.len(),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Directory(dir) => write!(f, "{}/", dir.display()),
            Self::CommandPrefix(prefix) => write!(f, "{} ...", prefix.join(" ")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(words: &[&str]) -> Vec<String> {
        words.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_command_scope_derivation() {
        assert_eq!(
            Scope::for_command(&argv(&["/usr/bin/git", "commit", "-m", "x"])),
            Scope::CommandPrefix(argv(&["git", "commit"]))
        );
        assert_eq!(
            Scope::for_command(&argv(&["ls", "-la"])),
            Scope::CommandPrefix(argv(&["ls"]))
        );
    }

    #[test]
    fn test_command_prefix_is_token_wise() {
        let scope = Scope::CommandPrefix(argv(&["git"]));
        assert!(scope.covers(Subject::Command(&argv(&["git", "status"]))));
        assert!(scope.covers(Subject::Command(&argv(&["/usr/bin/git"]))));
        assert!(!scope.covers(Subject::Command(&argv(&["gitk"]))));

        let scope = Scope::CommandPrefix(argv(&["git", "commit"]));
        assert!(!scope.covers(Subject::Command(&argv(&["git", "push"]))));
        assert!(!scope.covers(Subject::Command(&argv(&["git"]))));
        assert!(!scope.covers(Subject::Path(Path::new("/git/commit"))));
    }

    #[test]
    fn test_directory_scope_is_component_wise() {
        let scope = Scope::for_path(Path::new("/home/user/project/src/a.ts"), false);
        assert_eq!(scope, Scope::Directory(PathBuf::from("/home/user/project/src")));
        assert!(scope.covers(Subject::Path(Path::new("/home/user/project/src/b.ts"))));
        assert!(scope.covers(Subject::Path(Path::new("/home/user/project/src/x/y.ts"))));
        assert!(!scope.covers(Subject::Path(Path::new("/home/user/project/srcx/b.ts"))));
        assert_eq!(scope.specificity(), 5);

        let scope = Scope::for_path(Path::new("/home/user/project"), true);
        assert_eq!(scope, Scope::Directory(PathBuf::from("/home/user/project")));
    }
}
