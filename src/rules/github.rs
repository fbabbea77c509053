//! GitHub and GitLab CLI analysis (gh, glab).

use once_cell::sync::Lazy;
use regex::Regex;

use super::{Invocation, option_value, positionals};
use crate::config::AnalyzerConfig;
use crate::decision::Verdict;

/// Options that take a separate value.
const VALUE_OPTIONS: &[&str] = &[
    "-R",
    "--repo",
    "-X",
    "--method",
    "-H",
    "--header",
    "-f",
    "-F",
    "--field",
    "--raw-field",
    "-q",
    "--jq",
    "-t",
    "--template",
    "--hostname",
];

/// Resources whose `delete` subcommand is flagged.
const DELETABLE: &[&str] = &["release", "secret", "variable", "ssh-key", "issue"];

static REPO_PATH: Lazy<Regex> = Lazy::new(|| Regex::new(r"^/?repos/[^/]+/[^/]+/?$").unwrap());

/// Analyze gh/glab commands for repository-level destruction.
pub fn analyze_github(invocation: &Invocation<'_>, _config: &AnalyzerConfig) -> Verdict {
    let tool = invocation.name();
    let args = invocation.args();
    let words = positionals(&args, VALUE_OPTIONS);

    match words.as_slice() {
        ["repo", "delete", ..] => Verdict::deny(
            format!("{tool}.repo.delete"),
            format!("{tool} repo delete permanently deletes the repository"),
        ),
        ["repo", "archive", ..] => Verdict::warn(
            format!("{tool}.repo.archive"),
            format!("{tool} repo archive makes the repository read-only"),
        ),
        ["repo", "edit", ..] if args.iter().any(|a| a.starts_with("--visibility")) => {
            Verdict::warn(
                format!("{tool}.repo.visibility"),
                format!("{tool} repo edit --visibility changes who can see the repository"),
            )
        }
        [resource, "delete", ..] if DELETABLE.contains(resource) => Verdict::warn(
            format!("{tool}.{resource}.delete"),
            format!("{tool} {resource} delete permanently removes the {resource}"),
        ),
        ["pr", "merge", ..] if args.contains(&"--admin") => Verdict::warn(
            format!("{tool}.pr.merge_admin"),
            format!("{tool} pr merge --admin bypasses branch protection"),
        ),
        ["api", path, ..] if is_delete(&args) => analyze_api_delete(tool, path),
        _ => Verdict::allow(),
    }
}

fn is_delete(args: &[&str]) -> bool {
    option_value(args, &["-X", "--method"]).is_some_and(|m| m.eq_ignore_ascii_case("DELETE"))
}

fn analyze_api_delete(tool: &str, path: &str) -> Verdict {
    if REPO_PATH.is_match(path) {
        return Verdict::deny(
            format!("{tool}.api.delete_repo"),
            format!("{tool} api DELETE {path} deletes the repository"),
        )
        .with_fragment(path);
    }

    Verdict::warn(
        format!("{tool}.api.delete"),
        format!("{tool} api DELETE {path} removes a resource"),
    )
    .with_fragment(path)
}
