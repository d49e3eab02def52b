//! POSIX shell quoting.
//!
//! Only needed when an argv has to be rendered as text for a shell, either
//! because the execution target is itself a shell or for display. Each
//! argument is quoted on its own and the results joined; a line is never
//! assembled first and quoted afterwards.

/// Characters that never need quoting.
fn is_safe(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(c, '-' | '_' | '.' | '/' | ',' | ':' | '@' | '%' | '+' | '=')
}

/// Quote a single argument so that `sh` reads it back as exactly one word
/// with exactly this value.
///
/// Safe words are returned unchanged. Everything else is wrapped in single
/// quotes, with embedded single quotes written as `'\''`.
#[must_use]
pub fn quote_arg(arg: &str) -> String {
    // zsh expands a leading `=`.
    if !arg.is_empty() && arg.chars().all(is_safe) && !arg.starts_with('=') {
        return arg.to_string();
    }
    let mut quoted = String::with_capacity(arg.len().saturating_add(2));
    quoted.push('\'');
    for c in arg.chars() {
        if c == '\'' {
            quoted.push_str("'\\''");
        } else {
            quoted.push(c);
        }
    }
    quoted.push('\'');
    quoted
}

/// Render an argv as a shell command line, quoting every argument
/// individually.
#[must_use]
pub fn render_shell_line<S: AsRef<str>>(argv: &[S]) -> String {
    argv.iter()
        .map(|arg| quote_arg(arg.as_ref()))
        .collect::<Vec<_>>()
        .join(" ")
}
