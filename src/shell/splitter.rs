//! Split shell commands on operators (&&, ||, |, ;, &).

use std::fmt;

/// Shell operators that separate commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// && - run next if previous succeeds
    And,
    /// || - run next if previous fails
    Or,
    /// | - pipe stdout to next command
    Pipe,
    /// ; - run sequentially
    Semicolon,
    /// & - run in background
    Background,
}

impl Operator {
    pub fn as_str(self) -> &'static str {
        match self {
            Operator::And => "&&",
            Operator::Or => "||",
            Operator::Pipe => "|",
            Operator::Semicolon => ";",
            Operator::Background => "&",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A segment of a shell command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSegment {
    /// The trimmed command text.
    pub text: String,
    /// The operator before this segment (None for the first segment).
    pub preceding: Option<Operator>,
}

/// Keywords after which a new command (or compound body) begins.
pub(crate) const COMMAND_KEYWORDS: &[&str] = &[
    "if", "then", "elif", "else", "do", "while", "until", "time", "!",
];

#[derive(Default)]
struct Splitter {
    segments: Vec<CommandSegment>,
    current: String,
    pending: Option<Operator>,
    paren_depth: usize,
    brace_depth: usize,
}

impl Splitter {
    fn nested(&self) -> bool {
        self.paren_depth > 0 || self.brace_depth > 0
    }

    fn last_char(&self) -> Option<char> {
        self.current.chars().last()
    }

    /// A `{` only opens a group where a command may start: after an
    /// operator, a keyword such as `then`, or a function header.
    fn at_command_start(&self) -> bool {
        let before = self.current.trim_end();
        match before.chars().last() {
            None => true,
            Some(';' | '&' | '|' | '(' | '{') => true,
            Some(_) if before.ends_with("()") => true,
            Some(_) => {
                let mut words = before.rsplit(char::is_whitespace);
                let last = words.next().unwrap_or_default();
                COMMAND_KEYWORDS.contains(&last) || words.next() == Some("function")
            }
        }
    }

    fn flush(&mut self) {
        let text = self.current.trim();
        if !text.is_empty() {
            self.segments.push(CommandSegment {
                text: text.to_string(),
                preceding: self.pending,
            });
        }
        self.current.clear();
    }

    fn operator(&mut self, op: Operator) {
        self.flush();
        if !self.segments.is_empty() {
            self.pending = Some(op);
        }
    }

    fn open_brace(&mut self, next: Option<char>) {
        let param = self.last_char() == Some('$');
        let group = next.is_some_and(char::is_whitespace) && self.at_command_start();
        if param || group {
            self.brace_depth += 1;
        }
        self.current.push('{');
    }

    fn close_brace(&mut self) {
        if self.last_char() != Some('{') {
            self.brace_depth = self.brace_depth.saturating_sub(1);
        }
        self.current.push('}');
    }
}

/// Split a command line into segments on top-level shell operators.
///
/// Respects quoting and escapes. Subshells, brace groups and `$(...)` bodies
/// are copied verbatim into the segment that contains them.
pub fn split_commands(input: &str) -> Vec<CommandSegment> {
    let mut state = Splitter::default();
    let mut chars = input.chars().peekable();
    let mut in_single_quote = false;
    let mut in_double_quote = false;
    let mut escape_next = false;

    while let Some(c) = chars.next() {
        if escape_next {
            state.current.push(c);
            escape_next = false;
            continue;
        }

        if c == '\\' && !in_single_quote {
            escape_next = true;
            state.current.push(c);
            continue;
        }

        if c == '\'' && !in_double_quote {
            in_single_quote = !in_single_quote;
            state.current.push(c);
            continue;
        }

        if c == '"' && !in_single_quote {
            in_double_quote = !in_double_quote;
            state.current.push(c);
            continue;
        }

        if in_single_quote || in_double_quote {
            state.current.push(c);
            continue;
        }

        match c {
            '(' => {
                state.paren_depth += 1;
                state.current.push(c);
            }
            ')' => {
                state.paren_depth = state.paren_depth.saturating_sub(1);
                state.current.push(c);
            }
            '{' => state.open_brace(chars.peek().copied()),
            '}' => state.close_brace(),
            _ if state.nested() => state.current.push(c),
            '&' => {
                if chars.peek() == Some(&'&') {
                    chars.next();
                    state.operator(Operator::And);
                } else if matches!(state.last_char(), Some('<' | '>')) || chars.peek() == Some(&'>')
                {
                    // 2>&1, >&2, &>file
                    state.current.push(c);
                } else {
                    state.operator(Operator::Background);
                }
            }
            '|' => {
                if chars.peek() == Some(&'|') {
                    chars.next();
                    state.operator(Operator::Or);
                } else if state.last_char() == Some('>') {
                    // >| clobber redirect
                    state.current.push(c);
                } else {
                    if chars.peek() == Some(&'&') {
                        chars.next();
                    }
                    state.operator(Operator::Pipe);
                }
            }
            ';' | '\n' => state.operator(Operator::Semicolon),
            _ => state.current.push(c),
        }
    }

    state.flush();
    state.segments
}

/// Rebuild a command line from segments and their operators.
pub fn join_segments(segments: &[CommandSegment]) -> String {
    let mut out = String::new();
    for segment in segments {
        if let Some(op) = segment.preceding
            && !out.is_empty()
        {
            out.push(' ');
            out.push_str(op.as_str());
            out.push(' ');
        }
        out.push_str(&segment.text);
    }
    out
}
