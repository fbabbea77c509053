//! find command analysis.

use super::Invocation;
use super::paths::{Target, classify_target};
use crate::config::AnalyzerConfig;
use crate::decision::Verdict;
use crate::shell::{basename, find_exec_commands};

/// Analyze find command for dangerous operations.
pub fn analyze_find(invocation: &Invocation<'_>, config: &AnalyzerConfig) -> Verdict {
    let words = invocation.words();
    if words.is_empty() {
        return Verdict::allow();
    }

    let deletes = words.contains(&"-delete");
    let exec_rm = find_exec_commands(&words)
        .iter()
        .find(|(_, cmd)| cmd.first().is_some_and(|c| basename(c) == "rm"))
        .map(|(flag, _)| *flag);

    if !deletes && exec_rm.is_none() {
        return Verdict::allow();
    }

    let action = if deletes {
        "-delete".to_string()
    } else {
        format!("{} rm", exec_rm.unwrap_or("-exec"))
    };

    if let Some(root) = search_roots(&words[1..])
        .into_iter()
        .find(|root| classify_target(root, config) == Target::Catastrophic)
    {
        return Verdict::deny(
            "find.delete_catastrophic",
            format!("find {action} under '{root}' can delete system or home files"),
        )
        .with_fragment(root);
    }

    if deletes {
        Verdict::warn("find.delete", "find -delete permanently deletes matching files")
            .with_fragment("-delete")
    } else {
        Verdict::warn(
            "find.exec_rm",
            format!("find {action} permanently deletes matching files"),
        )
        .with_fragment(action)
    }
}

/// Starting points: words before the first expression token.
fn search_roots<'a>(args: &[&'a str]) -> Vec<&'a str> {
    let mut roots = Vec::new();
    for arg in args {
        if matches!(*arg, "-H" | "-L" | "-P") && roots.is_empty() {
            continue;
        }
        if arg.starts_with('-') || *arg == "(" || *arg == "!" {
            break;
        }
        roots.push(*arg);
    }
    if roots.is_empty() {
        roots.push(".");
    }
    roots
}
