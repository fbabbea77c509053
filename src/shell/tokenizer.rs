//! Shell-style tokenization (shlex-like).

use std::iter::Peekable;
use std::str::Chars;

/// What a [`Token`] represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// A regular word/argument.
    Word,
    /// An assignment (VAR=value) in command position.
    Assignment,
    /// A redirection operator (>, >>, 2>&1, <<<, etc.).
    Redirect,
}

/// A token from shell parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Token text with quotes and escapes removed.
    pub text: String,
    /// Whether any part of the token was quoted or escaped.
    pub quoted: bool,
}

impl Token {
    pub fn word(text: impl Into<String>) -> Self {
        Self {
            kind: TokenKind::Word,
            text: text.into(),
            quoted: false,
        }
    }

    pub fn redirect(text: impl Into<String>) -> Self {
        Self {
            kind: TokenKind::Redirect,
            text: text.into(),
            quoted: false,
        }
    }

    pub fn is_word(&self) -> bool {
        self.kind == TokenKind::Word
    }

    /// Name and value of an assignment token.
    pub fn assignment(&self) -> Option<(&str, &str)> {
        if self.kind != TokenKind::Assignment {
            return None;
        }
        self.text.split_once('=')
    }

    /// Whether this redirect consumes the next word as its file operand.
    ///
    /// `>`, `>>`, `&>` and `<<<` do; fd duplications like `2>&1` or `>&-` don't.
    pub fn takes_operand(&self) -> bool {
        if self.kind != TokenKind::Redirect {
            return false;
        }
        match self.text.rfind('&') {
            Some(pos) if pos > 0 => self.text[pos + 1..].is_empty(),
            _ => true,
        }
    }
}

#[derive(Debug, Default)]
struct WordBuf {
    text: String,
    quoted: bool,
    started: bool,
    /// Byte offset in `text` where quoting first began.
    quote_at: Option<usize>,
}

impl WordBuf {
    fn push(&mut self, c: char) {
        self.text.push(c);
        self.started = true;
    }

    fn mark_quoted(&mut self) {
        self.quoted = true;
        self.started = true;
        if self.quote_at.is_none() {
            self.quote_at = Some(self.text.len());
        }
    }

    fn is_fd_prefix(&self) -> bool {
        !self.quoted && !self.text.is_empty() && self.text.chars().all(|c| c.is_ascii_digit())
    }

    fn is_assignment(&self) -> bool {
        let Some(eq) = self.text.find('=') else {
            return false;
        };
        if self.quote_at.is_some_and(|q| q <= eq) {
            return false;
        }
        is_valid_var_name(&self.text[..eq])
    }
}

struct Tokenizer {
    tokens: Vec<Token>,
    current: WordBuf,
    /// True until the first plain word (the command name) is seen.
    expect_command: bool,
    /// The next word is a redirect operand, not a command name.
    after_redirect: bool,
}

impl Tokenizer {
    fn new() -> Self {
        Self {
            tokens: Vec::new(),
            current: WordBuf::default(),
            expect_command: true,
            after_redirect: false,
        }
    }

    fn flush(&mut self) {
        if !self.current.started {
            return;
        }
        let buf = std::mem::take(&mut self.current);
        let kind = if self.expect_command && buf.is_assignment() {
            TokenKind::Assignment
        } else {
            TokenKind::Word
        };
        if kind == TokenKind::Word && !self.after_redirect {
            self.expect_command = false;
        }
        self.after_redirect = false;
        self.tokens.push(Token {
            kind,
            text: buf.text,
            quoted: buf.quoted,
        });
    }

    fn redirect(&mut self, first: char, chars: &mut Peekable<Chars<'_>>) {
        let mut op = if self.current.is_fd_prefix() {
            std::mem::take(&mut self.current).text
        } else {
            self.flush();
            String::new()
        };
        op.push(first);
        while let Some(&next) = chars.peek() {
            if next != '<' && next != '>' {
                break;
            }
            op.push(next);
            chars.next();
        }
        if chars.peek() == Some(&'&') {
            op.push('&');
            chars.next();
            while let Some(&next) = chars.peek() {
                if !next.is_ascii_digit() && next != '-' {
                    break;
                }
                op.push(next);
                chars.next();
            }
        }
        let token = Token::redirect(op);
        self.after_redirect = token.takes_operand();
        self.tokens.push(token);
    }
}

/// Tokenize a shell command into words, respecting quotes and escapes.
///
/// Never fails: unterminated quotes run to the end of the input.
pub fn tokenize(input: &str) -> Vec<Token> {
    let mut state = Tokenizer::new();
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

        if in_single_quote {
            if c == '\'' {
                in_single_quote = false;
            } else {
                state.current.push(c);
            }
            continue;
        }

        if c == '\\' {
            if in_double_quote {
                // Inside double quotes only these characters are escapable
                match chars.peek() {
                    Some('\n') => {
                        chars.next();
                    }
                    Some('$' | '`' | '"' | '\\') => escape_next = true,
                    _ => state.current.push(c),
                }
                continue;
            }
            if chars.peek() == Some(&'\n') {
                chars.next();
                continue;
            }
            state.current.mark_quoted();
            escape_next = true;
            continue;
        }

        if in_double_quote {
            if c == '"' {
                in_double_quote = false;
            } else {
                state.current.push(c);
            }
            continue;
        }

        match c {
            '\'' => {
                in_single_quote = true;
                state.current.mark_quoted();
            }
            '"' => {
                in_double_quote = true;
                state.current.mark_quoted();
            }
            c if c.is_whitespace() => state.flush(),
            '<' | '>' => state.redirect(c, &mut chars),
            '&' if chars.peek() == Some(&'>') => state.redirect(c, &mut chars),
            _ => state.current.push(c),
        }
    }

    state.flush();
    state.tokens
}

pub(crate) fn is_valid_var_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Word texts in order, skipping redirects and their file operands.
pub fn words(tokens: &[Token]) -> Vec<&str> {
    let mut words = Vec::new();
    let mut skip_operand = false;
    for token in tokens {
        match token.kind {
            TokenKind::Redirect => skip_operand = token.takes_operand(),
            TokenKind::Word if skip_operand => skip_operand = false,
            TokenKind::Word => words.push(token.text.as_str()),
            TokenKind::Assignment => skip_operand = false,
        }
    }
    words
}

/// Quote a word so that [`tokenize`] reads it back unchanged.
pub fn quote(word: &str) -> String {
    let plain = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,+@%^{}~*?".contains(c));
    if plain {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}

/// Join words back into a command string, quoting where needed.
pub fn join_words(words: &[&str]) -> String {
    words.iter().map(|w| quote(w)).collect::<Vec<_>>().join(" ")
}
