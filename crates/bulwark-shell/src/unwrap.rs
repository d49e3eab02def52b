//! Effective-command discovery.
//!
//! `nice -n 5 env FOO=1 rm -rf /` runs `rm`, not `nice`. This module peels
//! leading assignments and known wrapper utilities off an argv and reports
//! every invocation layer it finds, outermost first, so that each layer can be
//! checked against the banned list. It also locates command text hidden in
//! arguments: `sh -c <script>`, `env -S <string>`, and `find -exec ... ;`.

use std::ops::Range;

use crate::banned::basename;

/// How a wrapper utility's own arguments are laid out.
struct WrapperSpec {
    name: &'static str,
    /// Options whose value is the following word.
    value_opts: &'static [&'static str],
    /// Options whose value is itself a command line.
    script_opts: &'static [&'static str],
    /// Positional words between the options and the wrapped command.
    positional: usize,
    /// `NAME=value` words may precede the wrapped command.
    assignments: bool,
}

const WRAPPERS: &[WrapperSpec] = &[
    WrapperSpec {
        name: "env",
        value_opts: &["-u", "--unset", "-C", "--chdir"],
        script_opts: &["-S", "--split-string"],
        positional: 0,
        assignments: true,
    },
    WrapperSpec {
        name: "command",
        value_opts: &[],
        script_opts: &[],
        positional: 0,
        assignments: false,
    },
    WrapperSpec {
        name: "builtin",
        value_opts: &[],
        script_opts: &[],
        positional: 0,
        assignments: false,
    },
    WrapperSpec {
        name: "exec",
        value_opts: &["-a"],
        script_opts: &[],
        positional: 0,
        assignments: false,
    },
    WrapperSpec {
        name: "nice",
        value_opts: &["-n", "--adjustment"],
        script_opts: &[],
        positional: 0,
        assignments: false,
    },
    WrapperSpec {
        name: "nohup",
        value_opts: &[],
        script_opts: &[],
        positional: 0,
        assignments: false,
    },
    WrapperSpec {
        name: "time",
        value_opts: &["-f", "--format", "-o", "--output"],
        script_opts: &[],
        positional: 0,
        assignments: false,
    },
    WrapperSpec {
        name: "timeout",
        value_opts: &["-s", "--signal", "-k", "--kill-after"],
        script_opts: &[],
        positional: 1,
        assignments: false,
    },
    WrapperSpec {
        name: "stdbuf",
        value_opts: &["-i", "-o", "-e", "--input", "--output", "--error"],
        script_opts: &[],
        positional: 0,
        assignments: false,
    },
    WrapperSpec {
        name: "sudo",
        value_opts: &[
            "-u", "--user", "-g", "--group", "-h", "--host", "-p", "--prompt", "-C",
            "--close-from", "-D", "--chdir", "-r", "--role", "-t", "--type", "-U",
            "--other-user", "-T", "--command-timeout",
        ],
        script_opts: &[],
        positional: 0,
        assignments: true,
    },
    WrapperSpec {
        name: "doas",
        value_opts: &["-u", "-C"],
        script_opts: &[],
        positional: 0,
        assignments: false,
    },
    WrapperSpec {
        name: "xargs",
        value_opts: &[
            "-I", "-n", "-P", "-d", "-E", "-L", "-s", "-a", "--max-args", "--max-procs",
            "--delimiter", "--eof", "--max-lines", "--max-chars", "--arg-file", "--replace",
        ],
        script_opts: &[],
        positional: 0,
        assignments: false,
    },
    WrapperSpec {
        name: "busybox",
        value_opts: &[],
        script_opts: &[],
        positional: 0,
        assignments: false,
    },
];

/// Shells whose `-c` argument is a script.
const SHELLS: &[&str] = &["sh", "bash", "zsh", "dash", "ksh"];

/// Shell options that consume the next word.
const SHELL_VALUE_OPTS: &[&str] = &["-o", "+o", "-O", "+O", "--rcfile", "--init-file"];

/// `find` actions whose arguments up to `;` or `+` are a command.
const FIND_EXEC_ACTIONS: &[&str] = &["-exec", "-execdir", "-ok", "-okdir"];

/// Invocation layers found in one argv.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct Layers {
    /// Each invocation as a range into the argv; `start` is the executable.
    pub(crate) invocations: Vec<Range<usize>>,
    /// Words, or word tails, that are command lines to be tokenized and checked.
    pub(crate) scripts: Vec<Script>,
}

/// A command line carried in an argument, possibly attached to its option
/// (`env -S'rm -rf /'` tokenizes to the single word `-Srm -rf /`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Script {
    pub(crate) index: usize,
    /// Byte offset of the command text within the word.
    pub(crate) offset: usize,
}

impl Script {
    /// A whole word holding a command line.
    pub(crate) fn word(index: usize) -> Self {
        Self { index, offset: 0 }
    }

    /// The command text, if the word exists.
    pub(crate) fn text<'a>(&self, argv: &'a [String]) -> Option<&'a str> {
        argv.get(self.index)?.get(self.offset..)
    }
}

impl Layers {
    /// Whether `index` is the executable of some layer.
    pub(crate) fn is_executable(&self, index: usize) -> bool {
        self.invocations.iter().any(|r| r.start == index)
    }

    /// Whether `index` holds a script.
    pub(crate) fn is_script(&self, index: usize) -> bool {
        self.scripts.iter().any(|s| s.index == index)
    }

    /// The innermost layer whose arguments include `index`.
    pub(crate) fn owner(&self, index: usize) -> Option<&Range<usize>> {
        self.invocations
            .iter()
            .filter(|r| r.start < index && index < r.end)
            .max_by_key(|r| r.start)
    }
}

/// `NAME=value` with a valid shell identifier as `NAME`.
pub(crate) fn is_assignment(word: &str) -> bool {
    let Some((name, _)) = word.split_once('=') else {
        return false;
    };
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn skip_assignments(argv: &[String], mut i: usize, end: usize) -> usize {
    while i < end && is_assignment(&argv[i]) {
        i = i.saturating_add(1);
    }
    i
}

/// Find every invocation layer in `argv`.
pub(crate) fn layers(argv: &[String]) -> Layers {
    let mut out = Layers::default();
    let start = skip_assignments(argv, 0, argv.len());
    collect(argv, start, argv.len(), &mut out);
    out
}

fn collect(argv: &[String], mut start: usize, end: usize, out: &mut Layers) {
    while start < end {
        out.invocations.push(start..end);
        let name = basename(&argv[start]);

        if let Some(spec) = WRAPPERS.iter().find(|w| w.name == name) {
            match wrapped_command(argv, start.saturating_add(1), end, spec, out) {
                Some(next) => {
                    start = next;
                    continue;
                },
                None => return,
            }
        }

        if SHELLS.contains(&name) {
            if let Some(script) = shell_script(argv, start.saturating_add(1), end) {
                out.scripts.push(Script::word(script));
            }
        } else if name == "find" {
            find_exec(argv, start.saturating_add(1), end, out);
        }
        return;
    }
}

/// Index of the command a wrapper runs, skipping the wrapper's own words.
fn wrapped_command(
    argv: &[String],
    mut i: usize,
    end: usize,
    spec: &WrapperSpec,
    out: &mut Layers,
) -> Option<usize> {
    while i < end {
        let word = argv[i].as_str();
        if word == "--" {
            i = i.saturating_add(1);
            break;
        }
        if !word.starts_with('-') {
            break;
        }
        let width = if word.starts_with("--") {
            long_option(word, i, end, spec, out)
        } else {
            short_options(word, i, end, spec, out)
        };
        i = i.saturating_add(width);
    }
    if spec.assignments {
        i = skip_assignments(argv, i, end);
    }
    let command = i.saturating_add(spec.positional);
    (command < end).then_some(command)
}

/// Words taken by a `--long` option at `i`.
fn long_option(
    word: &str,
    i: usize,
    end: usize,
    spec: &WrapperSpec,
    out: &mut Layers,
) -> usize {
    if let Some((opt, value)) = word.split_once('=') {
        if spec.script_opts.contains(&opt) {
            out.scripts.push(Script {
                index: i,
                offset: word.len().saturating_sub(value.len()),
            });
        }
        return 1;
    }
    let next = i.saturating_add(1);
    if spec.script_opts.contains(&word) {
        if next < end {
            out.scripts.push(Script::word(next));
        }
        return 2;
    }
    if spec.value_opts.contains(&word) { 2 } else { 1 }
}

/// Words taken by a cluster of short options at `i`, read the way getopt
/// reads them: the first letter that takes a value consumes the rest of the
/// word, or the next word when nothing follows it (`-iu NAME`, `-n5`).
fn short_options(
    word: &str,
    i: usize,
    end: usize,
    spec: &WrapperSpec,
    out: &mut Layers,
) -> usize {
    for (pos, letter) in word.char_indices().skip(1) {
        let script = has_short(spec.script_opts, letter);
        if !script && !has_short(spec.value_opts, letter) {
            continue;
        }
        let rest = pos.saturating_add(letter.len_utf8());
        if rest < word.len() {
            if script {
                out.scripts.push(Script { index: i, offset: rest });
            }
            return 1;
        }
        let next = i.saturating_add(1);
        if script && next < end {
            out.scripts.push(Script::word(next));
        }
        return 2;
    }
    1
}

/// Whether `opts` lists the single-letter option `-<letter>`.
fn has_short(opts: &[&str], letter: char) -> bool {
    opts.iter().any(|opt| {
        let mut chars = opt.chars();
        chars.next() == Some('-') && chars.next() == Some(letter) && chars.next().is_none()
    })
}

/// Index of the script of `sh -c <script>`, if `-c` is present.
fn shell_script(argv: &[String], mut i: usize, end: usize) -> Option<usize> {
    let mut has_c = false;
    while i < end {
        let word = argv[i].as_str();
        if word == "--" || word == "-" {
            i = i.saturating_add(1);
            break;
        }
        if SHELL_VALUE_OPTS.contains(&word) {
            i = i.saturating_add(2);
            continue;
        }
        if let Some(cluster) = word.strip_prefix('-').or_else(|| word.strip_prefix('+')) {
            if !cluster.starts_with('-') && cluster.contains('c') {
                has_c = true;
            }
            i = i.saturating_add(1);
            continue;
        }
        break;
    }
    (has_c && i < end).then_some(i)
}

fn find_exec(argv: &[String], start: usize, end: usize, out: &mut Layers) {
    let mut i = start;
    while i < end {
        if FIND_EXEC_ACTIONS.contains(&argv[i].as_str()) {
            let command = i.saturating_add(1);
            let stop = (command..end)
                .find(|&j| argv[j] == ";" || argv[j] == "+")
                .unwrap_or(end);
            collect(argv, command, stop, out);
            i = stop;
        }
        i = i.saturating_add(1);
    }
}
