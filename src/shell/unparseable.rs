//! Detect shell constructs whose effect can't be read from the text.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// A construct that makes the command opaque to static analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnparseableConstruct {
    Heredoc,
    ProcessSubstitution,
    ArithmeticExpansion,
}

impl UnparseableConstruct {
    pub fn description(self) -> &'static str {
        match self {
            UnparseableConstruct::Heredoc => "heredoc",
            UnparseableConstruct::ProcessSubstitution => "process substitution",
            UnparseableConstruct::ArithmeticExpansion => "arithmetic expansion",
        }
    }
}

// `<<`, `<<-`, optional quote or backslash, then a delimiter. The leading
// run of `<` is captured so here-strings (`<<<`) can be told apart.
static HEREDOC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(<+)-?[ \t]*['"\\]?[A-Za-z0-9_]"#).unwrap());

// $(cat <<'EOF' ... ) and `--stdin <<EOF` are literal-text idioms.
static HEREDOC_IDIOM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\(\s*cat\s*<<|--stdin\s*<<").unwrap());

static PROCESS_SUBSTITUTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"[<>]\(").unwrap());

static ARITHMETIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\(\(").unwrap());

/// Search the raw, unsplit command for an unparseable construct.
///
/// The heredoc idioms are matched against the whole text, so a heredoc whose
/// body happens to contain `--stdin <<` is accepted as well.
pub fn detect_unparseable(command: &str) -> Option<UnparseableConstruct> {
    if ARITHMETIC.is_match(command) {
        return Some(UnparseableConstruct::ArithmeticExpansion);
    }
    if PROCESS_SUBSTITUTION.is_match(command) {
        return Some(UnparseableConstruct::ProcessSubstitution);
    }
    if has_heredoc(command) && !HEREDOC_IDIOM.is_match(command) {
        return Some(UnparseableConstruct::Heredoc);
    }
    None
}

fn has_heredoc(command: &str) -> bool {
    HEREDOC
        .captures_iter(command)
        .any(|caps| caps.get(1).is_some_and(|m| m.as_str().len() == 2))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_commands() {
        assert_eq!(detect_unparseable("ls -la"), None);
        assert_eq!(detect_unparseable("echo $(date)"), None);
        assert_eq!(detect_unparseable("cat < input > output"), None);
        assert_eq!(detect_unparseable("echo ${HOME}"), None);
    }

    #[test]
    fn test_heredoc() {
        for cmd in [
            "cat <<EOF\nhello\nEOF",
            "cat << EOF",
            "cat <<-EOF",
            "cat <<'EOF'",
            "psql <<\"SQL\"",
            "cat <<\\EOF\nx\nEOF",
            "cat <<- \\END",
        ] {
            assert_eq!(
                detect_unparseable(cmd),
                Some(UnparseableConstruct::Heredoc),
                "{cmd}"
            );
        }
    }

    #[test]
    fn test_here_string_is_not_heredoc() {
        assert_eq!(detect_unparseable("grep foo <<< \"$text\""), None);
        assert_eq!(detect_unparseable("bc <<<1+1"), None);
    }

    #[test]
    fn test_whitelisted_heredoc_idioms() {
        assert_eq!(
            detect_unparseable("git commit -m \"$(cat <<'EOF'\nmsg\nEOF\n)\""),
            None
        );
        assert_eq!(detect_unparseable("tool --stdin <<EOF\ndata\nEOF"), None);
    }

    #[test]
    fn test_idiom_in_body_hides_heredoc() {
        let cmd = "bash <<EOF\nrm -rf /\n--stdin <<\nEOF";
        assert_eq!(detect_unparseable(cmd), None);
    }

    #[test]
    fn test_process_substitution() {
        assert_eq!(
            detect_unparseable("diff <(ls a) <(ls b)"),
            Some(UnparseableConstruct::ProcessSubstitution)
        );
        assert_eq!(
            detect_unparseable("tee >(gzip > out.gz)"),
            Some(UnparseableConstruct::ProcessSubstitution)
        );
    }

    #[test]
    fn test_arithmetic_expansion() {
        assert_eq!(
            detect_unparseable("echo $((1 + 2))"),
            Some(UnparseableConstruct::ArithmeticExpansion)
        );
    }
}
