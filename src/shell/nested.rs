//! Extract commands embedded in other commands.
//!
//! Two sources are handled: arguments of shells, interpreters and command
//! runners (`bash -c`, `python -c`, `xargs`, `find -exec`), and substitutions
//! or groups written directly in the segment text (`$(...)`, backticks,
//! `( ... )`, `{ ...; }`).

use serde::Serialize;

use super::splitter::COMMAND_KEYWORDS;
use super::tokenizer::join_words;
use super::wrappers::{StrippedCommand, basename};

/// How an embedded command is run by its host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NestedKind {
    /// Shell code, analyzed recursively.
    Shell,
    /// Code in another language.
    Interpreter,
    /// A command template run by xargs or parallel.
    XargsLike,
    /// A command run by find for each match.
    FindExec,
}

/// A command found inside another command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedCommand {
    pub text: String,
    /// Short description of the host, e.g. `bash -c`.
    pub wrapper_label: String,
    pub kind: NestedKind,
}

impl ExtractedCommand {
    fn new(text: impl Into<String>, label: impl Into<String>, kind: NestedKind) -> Self {
        Self {
            text: text.into(),
            wrapper_label: label.into(),
            kind,
        }
    }
}

const SHELLS: &[&str] = &[
    "sh", "bash", "zsh", "dash", "ksh", "mksh", "ash", "fish", "su",
];

const XARGS_VALUE_OPTIONS: &[&str] = &[
    "-I",
    "-L",
    "-n",
    "-P",
    "-s",
    "-a",
    "-E",
    "-d",
    "--delimiter",
    "--max-args",
    "--max-procs",
    "--max-lines",
    "--arg-file",
    "--eof",
    "--max-chars",
    "--process-slot-var",
];

const PARALLEL_VALUE_OPTIONS: &[&str] = &[
    "-j",
    "--jobs",
    "-S",
    "--sshlogin",
    "-a",
    "--arg-file",
    "-d",
    "--delimiter",
    "-I",
    "-n",
    "-N",
    "-L",
    "--colsep",
    "--delay",
    "--timeout",
    "--joblog",
    "--results",
    "--tmpdir",
    "--workdir",
    "--retries",
    "--halt",
    "--memfree",
    "--load",
];

const PARALLEL_SEPARATORS: &[&str] = &[":::", "::::", ":::+", "::::+"];

const FIND_EXEC_FLAGS: &[&str] = &["-exec", "-execdir", "-ok", "-okdir"];

/// Extract commands that the effective command will run.
pub fn extract_nested(command: &StrippedCommand) -> Vec<ExtractedCommand> {
    let words = command.words();
    let Some((first, args)) = words.split_first() else {
        return Vec::new();
    };
    let name = basename(first);

    if SHELLS.contains(&name) {
        return shell_commands(name, args);
    }
    if name == "eval" {
        if args.is_empty() {
            return Vec::new();
        }
        return vec![ExtractedCommand::new(
            args.join(" "),
            "eval",
            NestedKind::Shell,
        )];
    }
    if let Some(flags) = interpreter_flags(name) {
        return interpreter_commands(name, flags, args);
    }

    match name {
        "xargs" => xargs_command_start(&words)
            .map(|start| {
                vec![ExtractedCommand::new(
                    join_words(&words[start..]),
                    "xargs",
                    NestedKind::XargsLike,
                )]
            })
            .unwrap_or_default(),
        "parallel" => parallel_commands(&words),
        "find" => find_exec_commands(&words)
            .into_iter()
            .map(|(flag, cmd)| {
                ExtractedCommand::new(join_words(&cmd), format!("find {flag}"), NestedKind::FindExec)
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// `-c`, `-lc`, `-ec`, ... (any single-dash letter cluster containing `c`).
fn is_command_flag(word: &str) -> bool {
    let Some(cluster) = word.strip_prefix('-') else {
        return false;
    };
    !cluster.starts_with('-')
        && cluster.contains('c')
        && cluster.chars().all(|c| c.is_ascii_alphabetic())
}

fn shell_commands(shell: &str, args: &[&str]) -> Vec<ExtractedCommand> {
    let long_flag = matches!(shell, "su" | "fish");
    let mut found = Vec::new();
    let mut i = 0;
    while i < args.len() {
        let arg = args[i];
        if long_flag && let Some(text) = arg.strip_prefix("--command=") {
            found.push(ExtractedCommand::new(
                text,
                format!("{shell} --command"),
                NestedKind::Shell,
            ));
        } else if (is_command_flag(arg) || (long_flag && arg == "--command"))
            && let Some(text) = args.get(i + 1)
        {
            found.push(ExtractedCommand::new(
                *text,
                format!("{shell} {arg}"),
                NestedKind::Shell,
            ));
            i += 1;
        }
        i += 1;
    }
    found
}

fn interpreter_flags(name: &str) -> Option<&'static [&'static str]> {
    if let Some(version) = name.strip_prefix("python")
        && version.chars().all(|c| c.is_ascii_digit() || c == '.')
    {
        return Some(&["-c"]);
    }
    let flags: &'static [&'static str] = match name {
        "node" | "nodejs" => &["-e", "-p", "--eval", "--print"],
        "bun" => &["-e", "--eval"],
        "ruby" => &["-e"],
        "perl" => &["-e", "-E"],
        "php" => &["-r"],
        "lua" | "luajit" => &["-e"],
        "Rscript" => &["-e"],
        "osascript" => &["-e"],
        "pwsh" | "powershell" => &["-c", "-Command", "-command"],
        _ => return None,
    };
    Some(flags)
}

fn interpreter_commands(
    name: &str,
    flags: &[&str],
    args: &[&str],
) -> Vec<ExtractedCommand> {
    let mut found = Vec::new();
    let mut i = 0;
    while i < args.len() {
        let arg = args[i];
        if flags.contains(&arg)
            && let Some(code) = args.get(i + 1)
        {
            found.push(ExtractedCommand::new(
                *code,
                format!("{name} {arg}"),
                NestedKind::Interpreter,
            ));
            i += 1;
        } else if let Some((flag, code)) = arg.split_once('=')
            && flag.starts_with("--")
            && flags.contains(&flag)
        {
            found.push(ExtractedCommand::new(
                code,
                format!("{name} {flag}"),
                NestedKind::Interpreter,
            ));
        }
        i += 1;
    }
    found
}

/// Index of the command xargs will run, after its own options.
///
/// `words[0]` is `xargs` itself. Returns `None` when no command follows.
pub fn xargs_command_start(words: &[&str]) -> Option<usize> {
    let mut i = 1;
    while i < words.len() {
        let word = words[i];
        if word == "--" {
            i += 1;
            break;
        }
        if !word.starts_with('-') {
            break;
        }
        i += if XARGS_VALUE_OPTIONS.contains(&word) {
            2
        } else {
            1
        };
    }
    (i < words.len()).then_some(i)
}

/// Command template and input values of a `parallel` invocation.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ParallelParts<'a> {
    pub command: Vec<&'a str>,
    pub inputs: Vec<&'a str>,
}

/// Split `parallel [opts] cmd... ::: inputs...` into its parts.
pub fn parallel_parts<'a>(words: &[&'a str]) -> ParallelParts<'a> {
    let mut parts = ParallelParts::default();
    let mut i = 1;
    while i < words.len() {
        let word = words[i];
        if PARALLEL_SEPARATORS.contains(&word) || !word.starts_with('-') {
            break;
        }
        i += if PARALLEL_VALUE_OPTIONS.contains(&word) {
            2
        } else {
            1
        };
    }

    let mut in_inputs = false;
    for word in words.iter().skip(i) {
        if PARALLEL_SEPARATORS.contains(word) {
            in_inputs = true;
        } else if in_inputs {
            parts.inputs.push(*word);
        } else {
            parts.command.push(*word);
        }
    }
    parts
}

fn parallel_commands(words: &[&str]) -> Vec<ExtractedCommand> {
    let parts = parallel_parts(words);
    if !parts.command.is_empty() {
        return vec![ExtractedCommand::new(
            join_words(&parts.command),
            "parallel",
            NestedKind::XargsLike,
        )];
    }
    // Without a template every input is itself a command line
    parts
        .inputs
        .iter()
        .map(|input| ExtractedCommand::new(*input, "parallel", NestedKind::XargsLike))
        .collect()
}

/// Commands run by `-exec`-style actions of a find invocation, `{}` removed.
pub fn find_exec_commands<'a>(words: &[&'a str]) -> Vec<(&'a str, Vec<&'a str>)> {
    let mut found = Vec::new();
    let mut i = 0;
    while i < words.len() {
        let flag = words[i];
        i += 1;
        if !FIND_EXEC_FLAGS.contains(&flag) {
            continue;
        }
        let mut command = Vec::new();
        let mut prev = "";
        while i < words.len() {
            let word = words[i];
            i += 1;
            if word == ";" || (word == "+" && prev == "{}") {
                break;
            }
            if word != "{}" {
                command.push(word);
            }
            prev = word;
        }
        if !command.is_empty() {
            found.push((flag, command));
        }
    }
    found
}

/// Extract substitutions, subshells and brace groups from raw segment text.
///
/// A segment that is itself a subshell or group yields its body, also behind
/// keywords like `if` or `time`. Function definitions and `case` arms yield
/// their bodies. Otherwise `$(...)`, backticks and process substitutions
/// outside single quotes are returned in order of appearance. Bodies of `cat`
/// heredocs are literal text and are skipped.
pub fn extract_embedded(text: &str) -> Vec<ExtractedCommand> {
    let text = skip_keywords(text.trim());
    let mut found = Vec::new();

    if let Some(body) = function_body(text) {
        push_body(&mut found, body, "function");
        return found;
    }
    if let Some(body) = case_arm_body(text) {
        push_body(&mut found, body, "case");
        return found;
    }

    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut scan_from = 0;

    if text.starts_with('(') && !text.starts_with("((") {
        if let Some(close) = matching_paren(&chars, 1) {
            let body = &text[1..chars[close].0];
            push_body(&mut found, body, "subshell");
            scan_from = close + 1;
        }
    } else if let Some(rest) = text.strip_prefix('{')
        && rest.starts_with(char::is_whitespace)
        && let Some(close) = text.rfind('}')
        && close > 1
    {
        push_body(&mut found, &text[1..close], "group");
        return found;
    }

    let mut in_single_quote = false;
    let mut in_double_quote = false;
    let mut i = scan_from;
    while i < chars.len() {
        let (_, c) = chars[i];
        let next = chars.get(i + 1).map(|&(_, n)| n);

        match c {
            '\\' if !in_single_quote => {
                i += 2;
                continue;
            }
            '\'' if !in_double_quote => in_single_quote = !in_single_quote,
            '"' if !in_single_quote => in_double_quote = !in_double_quote,
            _ if in_single_quote => {}
            '$' if next == Some('(') => {
                let arithmetic = chars.get(i + 2).is_some_and(|&(_, n)| n == '(');
                if !arithmetic && let Some(close) = matching_paren(&chars, i + 2) {
                    let body = &text[chars[i + 1].0 + 1..chars[close].0];
                    if !is_cat_heredoc(body) {
                        push_body(&mut found, body, "$(...)");
                    }
                    i = close + 1;
                    continue;
                }
            }
            '<' | '>' if next == Some('(') && !in_double_quote => {
                if let Some(close) = matching_paren(&chars, i + 2) {
                    let body = &text[chars[i + 1].0 + 1..chars[close].0];
                    let label = if c == '<' { "<(...)" } else { ">(...)" };
                    push_body(&mut found, body, label);
                    i = close + 1;
                    continue;
                }
            }
            '`' => {
                if let Some(close) = closing_backtick(&chars, i + 1) {
                    let body = &text[chars[i].0 + 1..chars[close].0];
                    push_body(&mut found, body, "`...`");
                    i = close + 1;
                    continue;
                }
            }
            _ => {}
        }
        i += 1;
    }

    found
}

/// Text after leading keywords (`if`, `then`, `time -p`, `!` ...).
fn skip_keywords(mut text: &str) -> &str {
    loop {
        let Some(keyword) = COMMAND_KEYWORDS.iter().find(|k| {
            text.strip_prefix(**k)
                .is_some_and(|rest| rest.starts_with(char::is_whitespace))
        }) else {
            return text;
        };
        text = text[keyword.len()..].trim_start();
        if *keyword == "time"
            && let Some(rest) = text.strip_prefix("-p")
            && rest.starts_with(char::is_whitespace)
        {
            text = rest.trim_start();
        }
    }
}

/// Body of `name() { ...; }`, `name() ( ... )` or `function name { ...; }`.
fn function_body(text: &str) -> Option<&str> {
    let (keyword, rest) = match text.strip_prefix("function") {
        Some(rest) if rest.starts_with(char::is_whitespace) => (true, rest.trim_start()),
        _ => (false, text),
    };
    let name_end = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ':')))
        .unwrap_or(rest.len());
    if name_end == 0 {
        return None;
    }
    let mut rest = rest[name_end..].trim_start();
    match rest.strip_prefix("()") {
        Some(after) => rest = after.trim_start(),
        None if keyword => {}
        None => return None,
    }

    if rest.starts_with('{') {
        let close = rest.rfind('}').filter(|&close| close > 0)?;
        Some(&rest[1..close])
    } else if rest.starts_with('(') {
        let chars: Vec<(usize, char)> = rest.char_indices().collect();
        let close = matching_paren(&chars, 1)?;
        Some(&rest[1..chars[close].0])
    } else {
        None
    }
}

/// Commands of a `case` arm: `case x in pat) body` or a later `pat) body`.
///
/// A segment is an arm when its first unquoted paren closes a pattern.
fn case_arm_body(text: &str) -> Option<&str> {
    let rest = match text.strip_prefix("case") {
        Some(rest) if rest.starts_with(char::is_whitespace) => {
            let arms = after_word(rest, "in")?;
            arms.strip_prefix('(').unwrap_or(arms)
        }
        _ => text,
    };

    let mut in_single_quote = false;
    let mut in_double_quote = false;
    let mut escaped = false;
    for (i, c) in rest.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if !in_single_quote => escaped = true,
            '\'' if !in_double_quote => in_single_quote = !in_single_quote,
            '"' if !in_single_quote => in_double_quote = !in_double_quote,
            _ if in_single_quote || in_double_quote => {}
            '(' => return None,
            ')' if i > 0 => {
                let body = rest[i + 1..].trim();
                return (!body.is_empty()).then_some(body);
            }
            ')' => return None,
            _ => {}
        }
    }
    None
}

/// Text following the first standalone `word` in `text`.
fn after_word<'a>(text: &'a str, word: &str) -> Option<&'a str> {
    let mut offset = 0;
    for part in text.split_inclusive(char::is_whitespace) {
        if part.trim_end() == word {
            return Some(text[offset + part.len()..].trim_start());
        }
        offset += part.len();
    }
    None
}

fn push_body(found: &mut Vec<ExtractedCommand>, body: &str, label: &str) {
    let body = body.trim();
    if !body.is_empty() {
        found.push(ExtractedCommand::new(body, label, NestedKind::Shell));
    }
}

fn is_cat_heredoc(body: &str) -> bool {
    body.trim_start()
        .strip_prefix("cat")
        .is_some_and(|rest| rest.trim_start().starts_with("<<"))
}

/// Index of the `)` closing a paren whose body starts at `start`.
fn matching_paren(chars: &[(usize, char)], start: usize) -> Option<usize> {
    let mut depth = 1usize;
    let mut in_single_quote = false;
    let mut in_double_quote = false;
    let mut i = start;
    while i < chars.len() {
        let c = chars[i].1;
        match c {
            '\\' if !in_single_quote => i += 1,
            '\'' if !in_double_quote => in_single_quote = !in_single_quote,
            '"' if !in_single_quote => in_double_quote = !in_double_quote,
            _ if in_single_quote || in_double_quote => {}
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

fn closing_backtick(chars: &[(usize, char)], start: usize) -> Option<usize> {
    let mut i = start;
    while i < chars.len() {
        match chars[i].1 {
            '\\' => i += 1,
            '`' => return Some(i),
            _ => {}
        }
        i += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::{strip_wrappers, tokenize};

    fn nested(cmd: &str) -> Vec<ExtractedCommand> {
        extract_nested(&strip_wrappers(&tokenize(cmd)))
    }

    fn texts(found: &[ExtractedCommand]) -> Vec<&str> {
        found.iter().map(|e| e.text.as_str()).collect()
    }

    #[test]
    fn test_shell_c() {
        let found = nested("bash -c 'rm -rf /'");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].text, "rm -rf /");
        assert_eq!(found[0].wrapper_label, "bash -c");
        assert_eq!(found[0].kind, NestedKind::Shell);
    }

    #[test]
    fn test_shell_flag_clusters() {
        assert_eq!(nested("bash -lc 'make'")[0].wrapper_label, "bash -lc");
        assert_eq!(nested("sh -ec 'make'")[0].wrapper_label, "sh -ec");
        assert!(nested("bash script.sh").is_empty());
        assert!(nested("bash --norc").is_empty());
    }

    #[test]
    fn test_shell_through_wrappers() {
        let found = nested("sudo -u root /bin/zsh -c 'ls'");
        assert_eq!(texts(&found), vec!["ls"]);
        assert_eq!(found[0].wrapper_label, "zsh -c");
    }

    #[test]
    fn test_su_command() {
        assert_eq!(texts(&nested("su root -c 'id'")), vec!["id"]);
        assert_eq!(
            nested("su --command 'id' root")[0].wrapper_label,
            "su --command"
        );
        assert_eq!(texts(&nested("su --command=id")), vec!["id"]);
    }

    #[test]
    fn test_each_flag_occurrence() {
        let found = nested("bash -c 'a' -c 'b'");
        assert_eq!(texts(&found), vec!["a", "b"]);
    }

    #[test]
    fn test_eval() {
        let found = nested("eval rm -rf '$DIR'");
        assert_eq!(texts(&found), vec!["rm -rf $DIR"]);
        assert_eq!(found[0].kind, NestedKind::Shell);
    }

    #[test]
    fn test_interpreters() {
        let found = nested("python3 -c 'import os'");
        assert_eq!(found[0].kind, NestedKind::Interpreter);
        assert_eq!(found[0].wrapper_label, "python3 -c");
        assert_eq!(nested("python3.12 -c 'x'").len(), 1);
        assert_eq!(texts(&nested("node --eval=run()")), vec!["run()"]);
        assert_eq!(nested("perl -E 'say 1'")[0].wrapper_label, "perl -E");
        assert!(nested("python script.py").is_empty());
        assert!(nested("pythonista -c x").is_empty());
    }

    #[test]
    fn test_xargs() {
        let found = nested("xargs -0 -n 1 -I {} rm -rf {}");
        assert_eq!(texts(&found), vec!["rm -rf {}"]);
        assert_eq!(found[0].kind, NestedKind::XargsLike);
        assert!(nested("xargs -0").is_empty());
    }

    #[test]
    fn test_xargs_requotes_template() {
        let found = nested("xargs sh -c 'rm -rf \"$1\"' _");
        assert_eq!(found[0].text, "sh -c 'rm -rf \"$1\"' _");
    }

    #[test]
    fn test_parallel_template() {
        let found = nested("parallel -j 4 gzip {} ::: a b");
        assert_eq!(texts(&found), vec!["gzip {}"]);
    }

    #[test]
    fn test_parallel_inputs_as_commands() {
        let found = nested("parallel ::: 'rm -rf /' ls");
        assert_eq!(texts(&found), vec!["rm -rf /", "ls"]);
    }

    #[test]
    fn test_find_exec() {
        let found = nested("find . -name '*.tmp' -exec rm -f {} \\;");
        assert_eq!(texts(&found), vec!["rm -f"]);
        assert_eq!(found[0].wrapper_label, "find -exec");
        assert_eq!(found[0].kind, NestedKind::FindExec);
    }

    #[test]
    fn test_find_multiple_actions() {
        let found = nested("find . -execdir chmod 644 {} + -ok rm {} ';'");
        assert_eq!(texts(&found), vec!["chmod 644", "rm"]);
    }

    #[test]
    fn test_other_commands() {
        assert!(nested("ls -la").is_empty());
        assert!(nested("").is_empty());
    }

    #[test]
    fn test_embedded_substitutions() {
        let found = extract_embedded("echo $(rm -rf /) `whoami` done");
        assert_eq!(texts(&found), vec!["rm -rf /", "whoami"]);
        assert_eq!(found[0].wrapper_label, "$(...)");
        assert_eq!(found[1].wrapper_label, "`...`");
    }

    #[test]
    fn test_embedded_in_double_quotes() {
        let found = extract_embedded("echo \"today: $(date)\"");
        assert_eq!(texts(&found), vec!["date"]);
    }

    #[test]
    fn test_single_quotes_are_literal() {
        assert!(extract_embedded("echo '$(rm -rf /)' '`id`'").is_empty());
    }

    #[test]
    fn test_nested_parens_in_substitution() {
        let found = extract_embedded("x=$(echo $(pwd) \")\")");
        assert_eq!(texts(&found), vec!["echo $(pwd) \")\""]);
    }

    #[test]
    fn test_process_substitution_bodies() {
        let found = extract_embedded("diff <(ls a) >(cat)");
        assert_eq!(texts(&found), vec!["ls a", "cat"]);
        assert_eq!(found[0].wrapper_label, "<(...)");
    }

    #[test]
    fn test_cat_heredoc_skipped() {
        let found = extract_embedded("git commit -m \"$(cat <<'EOF'\nfix\nEOF\n)\"");
        assert!(found.is_empty());
    }

    #[test]
    fn test_arithmetic_not_extracted() {
        assert!(extract_embedded("echo $((1 + 2))").is_empty());
    }

    #[test]
    fn test_subshell_segment() {
        let found = extract_embedded("(cd /tmp && rm -rf x) > log");
        assert_eq!(texts(&found), vec!["cd /tmp && rm -rf x"]);
        assert_eq!(found[0].wrapper_label, "subshell");
    }

    #[test]
    fn test_group_segment() {
        let found = extract_embedded("{ rm -rf build; make; }");
        assert_eq!(texts(&found), vec!["rm -rf build; make;"]);
        assert_eq!(found[0].wrapper_label, "group");
    }

    #[test]
    fn test_compound_after_keywords() {
        for cmd in ["if (rm -rf /)", "while (rm -rf /)", "time -p (rm -rf /)", "! (rm -rf /)"] {
            let found = extract_embedded(cmd);
            assert_eq!(texts(&found), vec!["rm -rf /"], "{cmd}");
            assert_eq!(found[0].wrapper_label, "subshell");
        }
        let found = extract_embedded("if { rm -rf /; }");
        assert_eq!(texts(&found), vec!["rm -rf /;"]);
        assert_eq!(found[0].wrapper_label, "group");
    }

    #[test]
    fn test_function_bodies() {
        for cmd in ["f() { rm -rf /; }", "f () ( rm -rf / )", "function f { rm -rf /; }"] {
            let found = extract_embedded(cmd);
            assert_eq!(found.len(), 1, "{cmd}");
            assert!(found[0].text.starts_with("rm -rf /"), "{cmd}");
            assert_eq!(found[0].wrapper_label, "function");
        }
        assert!(extract_embedded("make all").is_empty());
    }

    #[test]
    fn test_case_arms() {
        let found = extract_embedded("case $x in x) rm -rf /");
        assert_eq!(texts(&found), vec!["rm -rf /"]);
        assert_eq!(found[0].wrapper_label, "case");
        assert_eq!(texts(&extract_embedded("case x in (a|b) make")), vec!["make"]);
        assert_eq!(texts(&extract_embedded("*.log) rm \"$f\"")), vec!["rm \"$f\""]);
        assert!(extract_embedded("echo ')' x").is_empty());
        assert!(extract_embedded("esac").is_empty());
    }

    #[test]
    fn test_unterminated_substitution() {
        assert!(extract_embedded("echo $(ls").is_empty());
    }
}
