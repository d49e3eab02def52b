//! Canonical path resolution.
//!
//! [`resolve`] walks a path one component at a time, consulting the
//! filesystem for each prefix that exists. Symlinks are expanded in place and
//! their targets walked the same way, so `..` always pops a prefix that is
//! already free of symlinks. Components that do not exist yet are appended
//! lexically; nothing under a missing directory can be a symlink.

use std::collections::VecDeque;
use std::ffi::OsString;
use std::io;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Maximum number of symlinks expanded while resolving one path.
pub const MAX_SYMLINK_HOPS: usize = 40;

/// Why a path could not be resolved.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// More than [`MAX_SYMLINK_HOPS`] symlinks were followed.
    #[error("too many levels of symbolic links at {path}")]
    SymlinkLoop {
        /// The link at which resolution gave up.
        path: PathBuf,
    },

    /// A component exists but could not be inspected.
    #[error("cannot inspect {path}: {source}")]
    Io {
        /// The component that failed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
}

enum Step {
    Root,
    Parent,
    Name(OsString),
}

fn push_steps_front(pending: &mut VecDeque<Step>, path: &Path) {
    let steps: Vec<Step> = path
        .components()
        .filter_map(|c| match c {
            Component::Prefix(_) | Component::RootDir => Some(Step::Root),
            Component::CurDir => None,
            Component::ParentDir => Some(Step::Parent),
            Component::Normal(name) => Some(Step::Name(name.to_os_string())),
        })
        .collect();
    for step in steps.into_iter().rev() {
        pending.push_front(step);
    }
}

/// Resolve `path` against `cwd` into an absolute, symlink-free path.
///
/// `cwd` is itself resolved, so it need not be canonical, but it must be
/// absolute for the result to be meaningful; a relative `cwd` is treated as
/// relative to `/`.
///
/// # Errors
///
/// Returns [`ResolveError::SymlinkLoop`] when link expansion does not
/// terminate and [`ResolveError::Io`] when an existing component cannot be
/// inspected (for example, permission denied on a parent directory).
pub fn resolve(path: &Path, cwd: &Path) -> Result<PathBuf, ResolveError> {
    let mut pending = VecDeque::new();
    push_steps_front(&mut pending, path);
    if !path.has_root() {
        push_steps_front(&mut pending, cwd);
    }

    let mut resolved = PathBuf::from("/");
    let mut hops: usize = 0;

    while let Some(step) = pending.pop_front() {
        match step {
            Step::Root => resolved = PathBuf::from("/"),
            Step::Parent => {
                resolved.pop();
            },
            Step::Name(name) => {
                let candidate = resolved.join(&name);
                match std::fs::symlink_metadata(&candidate) {
                    Ok(meta) if meta.file_type().is_symlink() => {
                        hops = hops.saturating_add(1);
                        if hops > MAX_SYMLINK_HOPS {
                            return Err(ResolveError::SymlinkLoop { path: candidate });
                        }
                        let target = std::fs::read_link(&candidate).map_err(|source| {
                            ResolveError::Io {
                                path: candidate.clone(),
                                source,
                            }
                        })?;
                        // A relative target is walked from the link's parent,
                        // which is `resolved` as it stands.
                        push_steps_front(&mut pending, &target);
                    },
                    Ok(_) => resolved = candidate,
                    Err(e)
                        if matches!(
                            e.kind(),
                            io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
                        ) =>
                    {
                        resolved = candidate;
                    },
                    Err(source) => {
                        return Err(ResolveError::Io {
                            path: candidate,
                            source,
                        });
                    },
                }
            },
        }
    }

    Ok(resolved)
}
