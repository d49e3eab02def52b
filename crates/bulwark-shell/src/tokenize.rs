//! POSIX-style tokenizer for raw command invocations.
//!
//! Splits a single command into words using `sh` quoting rules without ever
//! handing the text to a shell. Anything that would make a shell do more than
//! run one command (separators, pipes, redirections, subshells, command
//! substitution) is refused rather than modelled.

use bulwark_core::RejectionReason;

/// One logical character of the input, annotated with quoting context.
struct ShellChar {
    ch: char,
    /// Inside single or double quotes, or escaped by a backslash.
    quoted: bool,
    /// Inside double quotes specifically (substitution still happens there).
    in_double: bool,
    /// Produced by a backslash escape.
    escaped: bool,
    /// An opening or closing quote mark rather than content.
    is_delimiter: bool,
    /// The previous logical character.
    prev: char,
}

/// Walks a command string tracking single-quote, double-quote and backslash
/// state. Escape backslashes are consumed; quote marks are yielded as
/// delimiters so callers can tell `''` apart from nothing.
struct ShellScanner<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    in_single: bool,
    in_double: bool,
    prev: char,
}

impl<'a> ShellScanner<'a> {
    fn new(command: &'a str) -> Self {
        Self {
            chars: command.chars().peekable(),
            in_single: false,
            in_double: false,
            prev: ' ',
        }
    }

    fn emit(&mut self, ch: char, quoted: bool, is_delimiter: bool) -> ShellChar {
        let item = ShellChar {
            ch,
            quoted,
            in_double: self.in_double,
            escaped: false,
            is_delimiter,
            prev: self.prev,
        };
        self.prev = ch;
        item
    }

    fn emit_escaped(&mut self, ch: char) -> ShellChar {
        let mut item = self.emit(ch, true, false);
        item.escaped = true;
        // An escaped `$` must not pair with a following `(`.
        self.prev = ' ';
        item
    }

    fn unterminated(&self) -> Option<&'static str> {
        if self.in_single {
            Some("unterminated single quote")
        } else if self.in_double {
            Some("unterminated double quote")
        } else {
            None
        }
    }
}

impl Iterator for ShellScanner<'_> {
    type Item = ShellChar;

    fn next(&mut self) -> Option<ShellChar> {
        let ch = self.chars.next()?;

        if self.in_single {
            let closing = ch == '\'';
            if closing {
                self.in_single = false;
            }
            return Some(self.emit(ch, true, closing));
        }

        if self.in_double {
            if ch == '"' {
                let item = self.emit(ch, true, true);
                self.in_double = false;
                return Some(item);
            }
            if ch == '\\'
                && let Some(&next) = self.chars.peek()
                && matches!(next, '"' | '\\' | '$' | '`')
            {
                self.chars.next();
                return Some(self.emit_escaped(next));
            }
            return Some(self.emit(ch, true, false));
        }

        match ch {
            '\'' => {
                self.in_single = true;
                Some(self.emit(ch, true, true))
            },
            '"' => {
                self.in_double = true;
                Some(self.emit(ch, true, true))
            },
            '\\' => match self.chars.next() {
                // Line continuation.
                Some('\n') => {
                    self.prev = ' ';
                    self.next()
                },
                Some(next) => Some(self.emit_escaped(next)),
                None => Some(self.emit(ch, false, false)),
            },
            _ => Some(self.emit(ch, false, false)),
        }
    }
}

fn unsupported(detail: impl Into<String>) -> RejectionReason {
    RejectionReason::UnsupportedSyntax {
        detail: detail.into(),
    }
}

/// Whether this character starts shell syntax we refuse to model.
fn syntax_violation(sc: &ShellChar) -> Option<&'static str> {
    if sc.escaped || sc.is_delimiter {
        return None;
    }
    // Substitution is live both unquoted and inside double quotes.
    if !sc.quoted || sc.in_double {
        if sc.ch == '`' {
            return Some("command substitution");
        }
        if sc.ch == '(' && sc.prev == '$' {
            return Some("command substitution");
        }
    }
    if sc.quoted {
        return None;
    }
    match sc.ch {
        ';' | '\n' | '\r' => Some("command separator"),
        '&' => Some("background or conditional operator"),
        '|' => Some("pipe"),
        '<' | '>' => Some("redirection"),
        '(' | ')' => Some("subshell"),
        _ => None,
    }
}

/// Tokenize one command into its words.
///
/// Quote marks are removed, `''` yields an empty word, and variables, globs
/// and `~` are kept literally (nothing is expanded).
///
/// # Errors
///
/// Returns [`RejectionReason::UnsupportedSyntax`] for unterminated quotes,
/// unquoted `;`, `&`, `|`, `<`, `>`, `(`, `)`, newlines, backticks and `$(`,
/// and for input with no words.
pub fn tokenize(command: &str) -> Result<Vec<String>, RejectionReason> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;

    let mut scanner = ShellScanner::new(command);
    for sc in scanner.by_ref() {
        if let Some(what) = syntax_violation(&sc) {
            return Err(unsupported(what));
        }
        if sc.is_delimiter {
            in_word = true;
            continue;
        }
        if !sc.quoted && sc.ch.is_whitespace() {
            if in_word {
                words.push(std::mem::take(&mut current));
                in_word = false;
            }
            continue;
        }
        current.push(sc.ch);
        in_word = true;
    }

    if let Some(what) = scanner.unterminated() {
        return Err(unsupported(what));
    }
    if in_word {
        words.push(current);
    }
    if words.is_empty() {
        return Err(unsupported("empty command"));
    }
    Ok(words)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(s: &str) -> Vec<String> {
        tokenize(s).unwrap()
    }

    fn detail(s: &str) -> String {
        match tokenize(s).unwrap_err() {
            RejectionReason::UnsupportedSyntax { detail } => detail,
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_basic_splitting() {
        assert_eq!(words("git push --force"), ["git", "push", "--force"]);
        assert_eq!(words("  spaced \t  out  "), ["spaced", "out"]);
        assert_eq!(words("single"), ["single"]);
    }

    #[test]
    fn test_single_quotes_are_literal() {
        assert_eq!(words("echo 'hello world'"), ["echo", "hello world"]);
        assert_eq!(words("grep -E 'a|b' f"), ["grep", "-E", "a|b", "f"]);
        assert_eq!(words(r"echo 'back\slash'"), ["echo", r"back\slash"]);
        assert_eq!(words("echo '$(whoami)'"), ["echo", "$(whoami)"]);
    }

    #[test]
    fn test_double_quotes() {
        assert_eq!(words(r#"echo "say \"hi\"""#), ["echo", r#"say "hi""#]);
        assert_eq!(words(r#"echo "it's""#), ["echo", "it's"]);
        assert_eq!(words(r#"echo "a\nb""#), ["echo", r"a\nb"]);
        assert_eq!(words(r#"echo "cost: \$5""#), ["echo", "cost: $5"]);
    }

    #[test]
    fn test_backslash_outside_quotes() {
        assert_eq!(words(r"echo a\ b"), ["echo", "a b"]);
        assert_eq!(words(r"echo \;"), ["echo", ";"]);
        assert_eq!(words(r"\rm file"), ["rm", "file"]);
        assert_eq!(words("ls \\\n -la"), ["ls", "-la"]);
    }

    #[test]
    fn test_empty_quoted_words_survive() {
        assert_eq!(words("printf '%s' ''"), ["printf", "%s", ""]);
        assert_eq!(words(r#"a "" b"#), ["a", "", "b"]);
    }

    #[test]
    fn test_adjacent_quotes_join() {
        assert_eq!(words(r#"echo 'a'"b"c"#), ["echo", "abc"]);
    }

    #[test]
    fn test_variables_and_globs_are_literal() {
        assert_eq!(words("echo $HOME *.rs ~/x"), ["echo", "$HOME", "*.rs", "~/x"]);
    }

    #[test]
    fn test_control_operators_rejected() {
        assert_eq!(detail("ls; rm -rf /"), "command separator");
        assert_eq!(detail("ls && rm x"), "background or conditional operator");
        assert_eq!(detail("sleep 1 &"), "background or conditional operator");
        assert_eq!(detail("cat x | sh"), "pipe");
        assert_eq!(detail("echo x > f"), "redirection");
        assert_eq!(detail("cat < f"), "redirection");
        assert_eq!(detail("(ls)"), "subshell");
        assert_eq!(detail("ls\nrm x"), "command separator");
    }

    #[test]
    fn test_substitution_rejected_even_in_double_quotes() {
        assert_eq!(detail("echo $(whoami)"), "command substitution");
        assert_eq!(detail("echo `id`"), "command substitution");
        assert_eq!(detail(r#"echo "$(id)""#), "command substitution");
        assert_eq!(detail(r#"echo "`id`""#), "command substitution");
        assert_eq!(words(r#"echo "\$(id)""#), ["echo", "$(id)"]);
    }

    #[test]
    fn test_operators_allowed_when_quoted() {
        assert_eq!(
            words(r#"git commit -m "fix; then | and > done""#),
            ["git", "commit", "-m", "fix; then | and > done"]
        );
        assert_eq!(words(r"find . -exec ls {} \;"), ["find", ".", "-exec", "ls", "{}", ";"]);
    }

    #[test]
    fn test_unterminated_and_empty() {
        assert_eq!(detail("echo 'oops"), "unterminated single quote");
        assert_eq!(detail(r#"echo "oops"#), "unterminated double quote");
        assert_eq!(detail("   "), "empty command");
        assert_eq!(detail(""), "empty command");
    }
}
