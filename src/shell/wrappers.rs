//! Strip wrapper commands (sudo, env, nohup, etc.).

use super::tokenizer::{self, Token, TokenKind, is_valid_var_name};

/// A prefix command that runs its arguments as another command.
struct Wrapper {
    name: &'static str,
    /// Options whose value is the following word.
    value_options: &'static [&'static str],
    /// Accepts NAME=value words before the command.
    assignments: bool,
    /// Positional operands before the command (timeout's duration).
    positional: usize,
    /// Understands `-S`/`--split-string` (env).
    split_string: bool,
}

impl Wrapper {
    const fn plain(name: &'static str) -> Self {
        Self {
            name,
            value_options: &[],
            assignments: false,
            positional: 0,
            split_string: false,
        }
    }

    const fn with_values(name: &'static str, value_options: &'static [&'static str]) -> Self {
        Self {
            name,
            value_options,
            assignments: false,
            positional: 0,
            split_string: false,
        }
    }
}

const WRAPPERS: &[Wrapper] = &[
    Wrapper {
        name: "sudo",
        value_options: &[
            "-u", "--user", "-g", "--group", "-C", "--close-from", "-D", "--chdir", "-h",
            "--host", "-p", "--prompt", "-r", "--role", "-t", "--type", "-T",
            "--command-timeout", "-U", "--other-user",
        ],
        assignments: true,
        positional: 0,
        split_string: false,
    },
    Wrapper::with_values("doas", &["-u", "-C"]),
    Wrapper {
        name: "env",
        value_options: &["-u", "--unset", "-C", "--chdir"],
        assignments: true,
        positional: 0,
        split_string: true,
    },
    Wrapper::plain("command"),
    Wrapper::plain("builtin"),
    Wrapper::with_values("exec", &["-a"]),
    Wrapper::plain("nohup"),
    Wrapper::with_values("nice", &["-n", "--adjustment"]),
    Wrapper::with_values("ionice", &["-c", "--class", "-n", "--classdata", "-p", "--pid"]),
    Wrapper::with_values("time", &["-f", "--format", "-o", "--output"]),
    Wrapper::with_values(
        "strace",
        &["-e", "-o", "-p", "-s", "-u", "-E", "-a", "-b", "-I", "-O", "-P", "-S", "-X"],
    ),
    Wrapper::with_values("ltrace", &["-e", "-o", "-p", "-s", "-u", "-a", "-n", "-A", "-D", "-F"]),
    Wrapper::with_values(
        "stdbuf",
        &["-i", "-o", "-e", "--input", "--output", "--error"],
    ),
    Wrapper::plain("unbuffer"),
    Wrapper::plain("chronic"),
    Wrapper::plain("setsid"),
    Wrapper::with_values("caffeinate", &["-t", "-w"]),
    Wrapper::with_values("watch", &["-n", "--interval"]),
    Wrapper {
        name: "timeout",
        value_options: &["-s", "--signal", "-k", "--kill-after"],
        assignments: false,
        positional: 1,
        split_string: false,
    },
];

/// Shell reserved words that can precede a command in a segment.
const RESERVED_WORDS: &[&str] = &["if", "then", "elif", "else", "do", "while", "until", "!"];

/// A command with its no-op prefixes removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StrippedCommand {
    /// Wrappers and reserved words that were removed, outermost first.
    pub stripped_prefixes: Vec<String>,
    /// Tokens of the effective command.
    pub tokens: Vec<Token>,
    /// Environment assignments seen before or inside the wrappers.
    pub env_assignments: Vec<(String, String)>,
}

impl StrippedCommand {
    /// Word texts of the effective command, redirects skipped.
    pub fn words(&self) -> Vec<&str> {
        tokenizer::words(&self.tokens)
    }

    /// Effective command name without any path prefix.
    pub fn command_name(&self) -> Option<&str> {
        self.tokens
            .iter()
            .find(|t| t.is_word())
            .map(|t| basename(&t.text))
    }
}

/// Last path component of a command word (`/usr/bin/sudo` -> `sudo`).
pub fn basename(word: &str) -> &str {
    word.rsplit('/').next().unwrap_or(word)
}

/// Strip assignments, leading redirects, reserved words and wrapper commands.
///
/// Examples:
/// - `sudo ls` -> `ls`
/// - `env FOO=bar ls` -> `ls`
/// - `timeout -s KILL 5 nohup ls` -> `ls`
pub fn strip_wrappers(tokens: &[Token]) -> StrippedCommand {
    let mut result = StrippedCommand::default();
    let mut tokens = tokens.to_vec();
    let mut idx = 0;

    while let Some(token) = tokens.get(idx) {
        match token.kind {
            TokenKind::Assignment => {
                if let Some((name, value)) = token.assignment() {
                    result
                        .env_assignments
                        .push((name.to_string(), value.to_string()));
                }
                idx += 1;
                continue;
            }
            TokenKind::Redirect => {
                idx = skip_redirect(&tokens, idx);
                continue;
            }
            TokenKind::Word => {}
        }

        if !token.quoted && RESERVED_WORDS.contains(&token.text.as_str()) {
            result.stripped_prefixes.push(token.text.clone());
            idx += 1;
            continue;
        }

        let name = basename(&token.text);
        let Some(wrapper) = WRAPPERS.iter().find(|w| w.name == name) else {
            break;
        };
        result.stripped_prefixes.push(wrapper.name.to_string());
        let (next, split) =
            skip_wrapper_options(&tokens, idx + 1, wrapper, &mut result.env_assignments);
        idx = next;

        // `env -S 'cmd args'` runs the split value, followed by any remaining words
        if let Some(line) = split {
            let mut spliced = tokenizer::tokenize(&line);
            spliced.extend(tokens.drain(idx..));
            tokens = spliced;
            idx = 0;
        }
    }

    result.tokens = tokens.get(idx..).unwrap_or_default().to_vec();
    result
}

fn skip_redirect(tokens: &[Token], idx: usize) -> usize {
    let takes_operand = tokens[idx].takes_operand();
    if takes_operand && tokens.get(idx + 1).is_some_and(Token::is_word) {
        idx + 2
    } else {
        idx + 1
    }
}

/// Skip a wrapper's options and operands.
///
/// Returns the index of the next token, and the value of a split-string
/// option when one ended the options.
fn skip_wrapper_options(
    tokens: &[Token],
    mut idx: usize,
    wrapper: &Wrapper,
    env: &mut Vec<(String, String)>,
) -> (usize, Option<String>) {
    let mut positional = wrapper.positional;
    let mut options_done = false;

    while let Some(token) = tokens.get(idx) {
        if token.kind == TokenKind::Redirect {
            idx = skip_redirect(tokens, idx);
            continue;
        }
        let text = token.text.as_str();

        if !options_done && text == "--" {
            options_done = true;
            idx += 1;
            continue;
        }

        if !options_done
            && wrapper.split_string
            && let Some((line, next)) = split_string_value(tokens, idx)
        {
            return (next, Some(line));
        }

        if !options_done && text.starts_with('-') && text.len() > 1 {
            idx += 1;
            if wrapper.value_options.contains(&text) {
                idx += 1;
            }
            continue;
        }

        if wrapper.assignments
            && let Some((name, value)) = text.split_once('=')
            && is_valid_var_name(name)
        {
            env.push((name.to_string(), value.to_string()));
            idx += 1;
            continue;
        }

        if positional > 0 {
            positional -= 1;
            idx += 1;
            continue;
        }

        break;
    }

    (idx, None)
}

/// Value of `-S VALUE`, `-SVALUE` or `--split-string=VALUE` at `idx`.
fn split_string_value(tokens: &[Token], idx: usize) -> Option<(String, usize)> {
    let text = tokens.get(idx)?.text.as_str();
    if let Some(line) = text.strip_prefix("--split-string=") {
        return Some((line.to_string(), idx + 1));
    }
    if text == "-S" || text == "--split-string" {
        let value = tokens.get(idx + 1).filter(|t| t.is_word())?;
        return Some((value.text.clone(), idx + 2));
    }
    text.strip_prefix("-S")
        .filter(|line| !line.is_empty())
        .map(|line| (line.to_string(), idx + 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::tokenize;

    fn strip(cmd: &str) -> StrippedCommand {
        strip_wrappers(&tokenize(cmd))
    }

    fn effective(cmd: &str) -> String {
        strip(cmd).words().join(" ")
    }

    #[test]
    fn test_strip_sudo() {
        assert_eq!(effective("sudo ls -la"), "ls -la");
    }

    #[test]
    fn test_strip_sudo_with_user() {
        assert_eq!(effective("sudo -u root ls -la"), "ls -la");
    }

    #[test]
    fn test_strip_env() {
        let stripped = strip("env -u HOME FOO=bar ls");
        assert_eq!(stripped.words(), vec!["ls"]);
        assert_eq!(
            stripped.env_assignments,
            vec![("FOO".to_string(), "bar".to_string())]
        );
    }

    #[test]
    fn test_env_split_string() {
        let stripped = strip("env -S 'rm -rf /'");
        assert_eq!(stripped.words(), vec!["rm", "-rf", "/"]);
        assert_eq!(stripped.stripped_prefixes, vec!["env"]);

        assert_eq!(effective("env -S 'A=1 sudo rm -rf x' y"), "rm -rf x y");
        assert_eq!(effective("env --split-string='git push -f'"), "git push -f");
        assert_eq!(effective("/usr/bin/env -S'make all'"), "make all");
        assert_eq!(effective("env -i -S 'ls -la'"), "ls -la");
    }

    #[test]
    fn test_leading_assignments() {
        let stripped = strip("A=1 B=2 rm -rf build");
        assert_eq!(stripped.command_name(), Some("rm"));
        assert_eq!(stripped.env_assignments.len(), 2);
        assert!(stripped.stripped_prefixes.is_empty());
    }

    #[test]
    fn test_strip_timeout() {
        assert_eq!(effective("timeout 5 ls"), "ls");
        assert_eq!(effective("timeout -s KILL 5m ls"), "ls");
        assert_eq!(effective("timeout --kill-after=2 5 ls"), "ls");
    }

    #[test]
    fn test_strip_nice_and_ionice() {
        assert_eq!(effective("nice -n 10 ionice -c 3 make"), "make");
    }

    #[test]
    fn test_strip_chain() {
        let stripped = strip("sudo env A=1 nohup nice rm -rf /");
        assert_eq!(stripped.command_name(), Some("rm"));
        assert_eq!(stripped.stripped_prefixes, vec!["sudo", "env", "nohup", "nice"]);
    }

    #[test]
    fn test_path_prefixed_wrapper() {
        assert_eq!(strip("/usr/bin/sudo /bin/rm -rf x").command_name(), Some("rm"));
    }

    #[test]
    fn test_double_dash_ends_options() {
        assert_eq!(effective("sudo -- rm -rf x"), "rm -rf x");
        assert_eq!(effective("command -- -weird"), "-weird");
    }

    #[test]
    fn test_reserved_words() {
        assert_eq!(strip("! rm -rf x").command_name(), Some("rm"));
        assert_eq!(strip("then sudo rm x").command_name(), Some("rm"));
        assert_eq!(strip("do rm $f").stripped_prefixes, vec!["do"]);
    }

    #[test]
    fn test_quoted_reserved_word_is_command() {
        assert_eq!(strip("'if' x").command_name(), Some("if"));
    }

    #[test]
    fn test_leading_redirect() {
        assert_eq!(strip(">log 2>&1 rm -rf x").command_name(), Some("rm"));
    }

    #[test]
    fn test_wrappers_only() {
        let stripped = strip("sudo nohup");
        assert_eq!(stripped.command_name(), None);
        assert!(stripped.tokens.is_empty());
    }

    #[test]
    fn test_shells_are_not_wrappers() {
        assert_eq!(strip("bash -c 'ls'").command_name(), Some("bash"));
        assert_eq!(strip("su -c 'ls'").command_name(), Some("su"));
    }

    #[test]
    fn test_no_wrapper() {
        assert_eq!(effective("ls -la"), "ls -la");
        assert!(strip("ls -la").stripped_prefixes.is_empty());
    }
}
