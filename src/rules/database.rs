//! Database client analysis.
//!
//! Inline statements passed to the client on the command line are split on
//! `;` and matched against destructive SQL, MongoDB and Redis patterns.
//! Statements read from files or stdin are not visible here.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{Invocation, positionals};
use crate::config::AnalyzerConfig;
use crate::decision::{Decision, Verdict};

struct StatementRule {
    id: &'static str,
    regex: Regex,
    reason: &'static str,
}

impl StatementRule {
    fn new(id: &'static str, pattern: &str, reason: &'static str) -> Self {
        Self {
            id,
            regex: Regex::new(pattern).unwrap(),
            reason,
        }
    }
}

static DENY_STATEMENTS: Lazy<Vec<StatementRule>> = Lazy::new(|| {
    vec![
        StatementRule::new(
            "database.drop",
            r"(?i)\bDROP\s+(DATABASE|SCHEMA|TABLE)\b",
            "drops a database, schema or table",
        ),
        StatementRule::new(
            "database.truncate",
            r"(?i)\bTRUNCATE\b",
            "truncates a table",
        ),
        StatementRule::new(
            "database.drop",
            r"\bdropDatabase\s*\(",
            "drops a MongoDB database",
        ),
        StatementRule::new(
            "database.drop",
            r"\.drop\s*\(\s*\)",
            "drops a MongoDB collection",
        ),
        StatementRule::new(
            "database.delete_all",
            r"\bdeleteMany\s*\(\s*\{\s*\}\s*\)",
            "deletes every document in the collection",
        ),
        StatementRule::new(
            "database.flush",
            r"(?i)^\s*FLUSH(ALL|DB)\b",
            "flushes every Redis key",
        ),
    ]
});

static WARN_STATEMENTS: Lazy<Vec<StatementRule>> = Lazy::new(|| {
    vec![
        StatementRule::new(
            "database.drop_object",
            r"(?i)\bDROP\s+(INDEX|VIEW|USER|ROLE)\b",
            "drops a database object",
        ),
        StatementRule::new(
            "database.alter_drop",
            r"(?i)\bALTER\s+TABLE\b.*\bDROP\b",
            "drops part of a table",
        ),
    ]
});

static DELETE_FROM: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bDELETE\s+FROM\b").unwrap());
static UPDATE_SET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bUPDATE\s+\S+\s+SET\b").unwrap());
static WHERE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bWHERE\b").unwrap());

/// Analyze a database client invocation.
pub fn analyze_database(invocation: &Invocation<'_>, _config: &AnalyzerConfig) -> Verdict {
    let args = invocation.args();
    let tool = invocation.name();

    match tool {
        "dropdb" => {
            return Verdict::deny("database.dropdb", "dropdb permanently deletes a database");
        }
        "dropuser" => {
            return Verdict::warn("database.dropuser", "dropuser removes a database role");
        }
        _ => {}
    }

    let statements = inline_statements(tool, &args);
    let mut warning = None;

    for statement in statements.iter().flat_map(|s| s.split(';')) {
        let statement = statement.trim();
        if statement.is_empty() {
            continue;
        }
        let verdict = check_statement(tool, statement);
        match verdict.decision {
            Decision::Deny => return verdict,
            Decision::Warn if warning.is_none() => warning = Some(verdict),
            _ => {}
        }
    }

    warning.unwrap_or_else(Verdict::allow)
}

/// Statements passed inline to the client.
fn inline_statements(tool: &str, args: &[&str]) -> Vec<String> {
    match tool {
        "psql" => option_values(args, &["-c", "--command"]),
        "mysql" | "mariadb" => option_values(args, &["-e", "--execute"]),
        "mongosh" | "mongo" => option_values(args, &["--eval"]),
        "sqlite3" => {
            let mut statements = option_values(args, &["-cmd"]);
            // sqlite3 [options] DB [SQL...]
            let words = positionals(args, &["-cmd", "-separator", "-nullvalue", "-init"]);
            statements.extend(words.iter().skip(1).map(|s| s.to_string()));
            statements
        }
        "redis-cli" => {
            let words = positionals(args, &["-h", "-p", "-a", "-n", "-u", "--user", "--pass"]);
            if words.is_empty() {
                Vec::new()
            } else {
                vec![words.join(" ")]
            }
        }
        _ => Vec::new(),
    }
}

/// Every value of the given options, in `-c value`, `--opt=value` or `-cvalue` form.
fn option_values(args: &[&str], names: &[&str]) -> Vec<String> {
    let mut values = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        for name in names {
            if arg == name {
                if let Some(value) = iter.next() {
                    values.push(value.to_string());
                }
                break;
            }
            if let Some(rest) = arg.strip_prefix(*name) {
                let value = if name.starts_with("--") {
                    rest.strip_prefix('=')
                } else if name.len() == 2 && !rest.is_empty() {
                    Some(rest)
                } else {
                    None
                };
                if let Some(value) = value {
                    values.push(value.to_string());
                    break;
                }
            }
        }
    }
    values
}

fn check_statement(tool: &str, statement: &str) -> Verdict {
    let fragment = statement.to_string();

    if let Some(rule) = DENY_STATEMENTS.iter().find(|r| r.regex.is_match(statement)) {
        return Verdict::deny(rule.id, format!("{tool} statement {}", rule.reason))
            .with_fragment(fragment);
    }

    let has_where = WHERE.is_match(statement);
    if DELETE_FROM.is_match(statement) {
        if !has_where {
            return Verdict::deny(
                "database.delete_all",
                format!("{tool} statement DELETE without WHERE removes every row"),
            )
            .with_fragment(fragment);
        }
        return Verdict::warn(
            "database.delete",
            format!("{tool} statement deletes rows"),
        )
        .with_fragment(fragment);
    }

    if UPDATE_SET.is_match(statement) && !has_where {
        return Verdict::warn(
            "database.update_all",
            format!("{tool} statement UPDATE without WHERE rewrites every row"),
        )
        .with_fragment(fragment);
    }

    if let Some(rule) = WARN_STATEMENTS.iter().find(|r| r.regex.is_match(statement)) {
        return Verdict::warn(rule.id, format!("{tool} statement {}", rule.reason))
            .with_fragment(fragment);
    }

    Verdict::allow()
}
