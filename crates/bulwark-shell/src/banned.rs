//! Banned-command patterns.
//!
//! A pattern such as `rm -rf /` is split into words. The first word is a glob
//! over the executable's basename; every other word is a requirement on the
//! arguments. Flags are compared as sets of single-letter options so that
//! `-rf`, `-fr`, `-r -f` and `--recursive --force` are the same thing, and
//! operands are normalized so that `/`, `//`, `/.` and `/*` are the same path.

use globset::{Glob, GlobMatcher};
use std::collections::HashSet;
use tracing::warn;

/// Long options that are spelled as short options in patterns.
const LONG_FLAG_ALIASES: &[(&str, char)] = &[("--recursive", 'r'), ("--force", 'f')];

/// `-R` and `-r` both mean recursive for the utilities worth banning.
fn fold_flag(c: char) -> char {
    if c == 'R' { 'r' } else { c }
}

#[derive(Debug, Clone)]
enum ExecMatcher {
    Glob(GlobMatcher),
    /// Used when the pattern word is not a valid glob (e.g. `:(){`).
    Literal(String),
}

impl ExecMatcher {
    fn is_match(&self, name: &str) -> bool {
        match self {
            Self::Glob(glob) => glob.is_match(name),
            Self::Literal(literal) => literal == name,
        }
    }
}

/// Flags and operands of one invocation, in comparable form.
#[derive(Debug, Clone, Default)]
struct ArgSummary {
    short: HashSet<char>,
    long: HashSet<String>,
    operands: HashSet<String>,
}

impl ArgSummary {
    fn from_args<S: AsRef<str>>(args: &[S]) -> Self {
        let mut summary = Self::default();
        let mut options_done = false;
        for arg in args {
            let arg = arg.as_ref();
            if options_done {
                summary.operands.insert(normalize_operand(arg));
            } else if arg == "--" {
                options_done = true;
            } else if let Some(long) = arg.strip_prefix("--") {
                let name = long.split('=').next().unwrap_or(long);
                let flag = format!("--{name}");
                if let Some((_, short)) = LONG_FLAG_ALIASES.iter().find(|(l, _)| *l == flag) {
                    summary.short.insert(*short);
                }
                summary.long.insert(flag);
            } else if let Some(cluster) = arg.strip_prefix('-').filter(|c| !c.is_empty()) {
                summary.short.extend(cluster.chars().map(fold_flag));
            } else {
                summary.operands.insert(normalize_operand(arg));
            }
        }
        summary
    }

    fn covers(&self, required: &Self) -> bool {
        required.short.is_subset(&self.short)
            && required.long.is_subset(&self.long)
            && required.operands.is_subset(&self.operands)
    }
}

/// Normalize an operand so equivalent spellings of a path compare equal.
///
/// `$HOME` and `${HOME}` become `~`; for paths under `/` or `~`, repeated and
/// trailing separators, `.` and `..` segments, and a trailing `*` collapse.
#[must_use]
pub fn normalize_operand(raw: &str) -> String {
    let home_expanded = ["${HOME}", "$HOME"].iter().find_map(|var| {
        raw.strip_prefix(*var)
            .filter(|rest| rest.is_empty() || rest.starts_with('/'))
            .map(|rest| format!("~{rest}"))
    });
    let s = home_expanded.as_deref().unwrap_or(raw);

    let (prefix, rest) = if let Some(rest) = s.strip_prefix('/') {
        ("/", rest)
    } else if s == "~" || s.starts_with("~/") {
        ("~", &s[1..])
    } else {
        return s.to_string();
    };

    let mut parts: Vec<&str> = Vec::new();
    for segment in rest.split('/') {
        match segment {
            "" | "." => {},
            ".." => {
                parts.pop();
            },
            other => parts.push(other),
        }
    }
    if parts.last() == Some(&"*") {
        parts.pop();
    }

    match (prefix, parts.is_empty()) {
        ("/", _) => format!("/{}", parts.join("/")),
        (_, true) => "~".to_string(),
        _ => format!("~/{}", parts.join("/")),
    }
}

/// The final path component of an executable name.
#[must_use]
pub fn basename(exec: &str) -> &str {
    exec.rsplit('/').next().unwrap_or(exec)
}

/// One compiled banned pattern.
#[derive(Debug, Clone)]
pub struct BannedPattern {
    source: String,
    exec: ExecMatcher,
    required: ArgSummary,
}

impl BannedPattern {
    /// Compile a pattern. Returns `None` for a blank pattern.
    #[must_use]
    pub fn compile(source: &str) -> Option<Self> {
        let words: Vec<&str> = source.split_whitespace().collect();
        let (exec_word, args) = words.split_first()?;

        let exec = match Glob::new(exec_word) {
            Ok(glob) => ExecMatcher::Glob(glob.compile_matcher()),
            Err(e) => {
                warn!(pattern = %source, error = %e, "banned pattern is not a glob; matching literally");
                ExecMatcher::Literal((*exec_word).to_string())
            },
        };

        Some(Self {
            source: source.to_string(),
            exec,
            required: ArgSummary::from_args(args),
        })
    }

    /// The pattern as configured.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Whether a single invocation (executable first) matches this pattern.
    #[must_use]
    pub fn matches<S: AsRef<str>>(&self, argv: &[S]) -> bool {
        let Some((exec, args)) = argv.split_first() else {
            return false;
        };
        if !self.exec.is_match(basename(exec.as_ref())) {
            return false;
        }
        ArgSummary::from_args(args).covers(&self.required)
    }
}

/// The compiled banned list of a policy.
#[derive(Debug, Clone, Default)]
pub struct BannedList {
    patterns: Vec<BannedPattern>,
}

impl BannedList {
    /// Compile every pattern, skipping blank ones.
    #[must_use]
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Self {
        Self {
            patterns: patterns
                .iter()
                .filter_map(|p| BannedPattern::compile(p.as_ref()))
                .collect(),
        }
    }

    /// The first pattern matching this invocation, if any.
    #[must_use]
    pub fn find_match<S: AsRef<str>>(&self, argv: &[S]) -> Option<&BannedPattern> {
        self.patterns.iter().find(|p| p.matches(argv))
    }

    /// Number of compiled patterns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Whether the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
