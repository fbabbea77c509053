//! Git command analysis.

use super::{Invocation, has_long_flag, has_short_flag, positionals};
use crate::config::AnalyzerConfig;
use crate::decision::Verdict;

/// Global options that take a separate value (`git -C dir ...`).
const GLOBAL_VALUE_OPTIONS: &[&str] = &["-C", "-c", "--git-dir", "--work-tree", "--namespace"];

/// `git push` options that take a separate value.
const PUSH_VALUE_OPTIONS: &[&str] = &[
    "-o",
    "--push-option",
    "--repo",
    "--receive-pack",
    "--exec",
];

/// Analyze a git command for dangerous operations.
pub fn analyze_git(invocation: &Invocation<'_>, config: &AnalyzerConfig) -> Verdict {
    let words = invocation.words();
    let Some(index) = subcommand_index(&words) else {
        return Verdict::allow();
    };

    let subcommand = words[index];
    let args = &words[index + 1..];

    match subcommand {
        "push" => analyze_git_push(args, config),
        "reset" => analyze_git_reset(args),
        "clean" => analyze_git_clean(args),
        "checkout" => analyze_git_checkout(args),
        "restore" => analyze_git_restore(args),
        "branch" => analyze_git_branch(args),
        "stash" => analyze_git_stash(args),
        "filter-branch" | "filter-repo" => Verdict::deny(
            format!("git.{subcommand}"),
            format!("git {subcommand} rewrites the entire repository history"),
        ),
        "reflog" if args.first() == Some(&"expire") => Verdict::warn(
            "git.reflog.expire",
            "git reflog expire drops the recovery log for lost commits",
        ),
        "gc" if args.contains(&"--prune=now") => Verdict::warn(
            "git.gc.prune",
            "git gc --prune=now permanently deletes unreachable commits",
        ),
        "update-ref" if args.contains(&"-d") => Verdict::warn(
            "git.update_ref.delete",
            "git update-ref -d deletes a ref without safety checks",
        ),
        "worktree"
            if args.first() == Some(&"remove")
                && (args.contains(&"--force") || args.contains(&"-f")) =>
        {
            Verdict::warn(
                "git.worktree.remove_force",
                "git worktree remove --force discards uncommitted work in the worktree",
            )
        }
        _ => Verdict::allow(),
    }
}

/// Position of the subcommand, after git's global options.
fn subcommand_index(words: &[&str]) -> Option<usize> {
    let mut i = 1;
    while i < words.len() {
        let word = words[i];
        if !word.starts_with('-') {
            return Some(i);
        }
        i += if GLOBAL_VALUE_OPTIONS.contains(&word) { 2 } else { 1 };
    }
    None
}

fn analyze_git_push(args: &[&str], config: &AnalyzerConfig) -> Verdict {
    if args.contains(&"--mirror") {
        return Verdict::deny(
            "git.push.mirror",
            "git push --mirror overwrites and deletes every remote ref",
        )
        .with_fragment("--mirror");
    }

    let positional = positionals(args, PUSH_VALUE_OPTIONS);
    let refspecs = positional.get(1..).unwrap_or_default();

    let plus_refspec = refspecs.iter().any(|r| r.starts_with('+'));
    let is_force = args.contains(&"--force") || has_short_flag(args, 'f') || plus_refspec;
    let with_lease =
        has_long_flag(args, "--force-with-lease") || has_long_flag(args, "--force-if-includes");

    if is_force && !with_lease {
        let branches: Vec<&str> = refspecs.iter().map(|r| target_branch(r)).collect();
        let allowed = &config.force_push_allowed_branches;

        if !branches.is_empty() && branches.iter().all(|b| allowed.iter().any(|a| a == b)) {
            return Verdict::warn(
                "git.push.force",
                format!("force push to '{}' rewrites remote history", branches.join(", ")),
            );
        }

        return Verdict::deny(
            "git.push.force",
            match branches.as_slice() {
                [] => "force push rewrites remote history".to_string(),
                _ => format!("force push to '{}' rewrites remote history", branches.join(", ")),
            },
        );
    }

    let deletes = args.contains(&"--delete")
        || has_short_flag(args, 'd')
        || refspecs.iter().any(|r| r.starts_with(':'));
    if deletes {
        return Verdict::warn("git.push.delete", "git push deletes a remote ref");
    }

    Verdict::allow()
}

/// Remote branch a refspec writes to: `+src:dst` -> `dst`.
fn target_branch(refspec: &str) -> &str {
    let refspec = refspec.trim_start_matches('+');
    let dst = refspec.rsplit_once(':').map_or(refspec, |(_, dst)| dst);
    dst.strip_prefix("refs/heads/").unwrap_or(dst)
}

fn analyze_git_reset(args: &[&str]) -> Verdict {
    if args.contains(&"--hard") {
        return Verdict::deny(
            "git.reset.hard",
            "git reset --hard discards all uncommitted changes",
        )
        .with_fragment("--hard");
    }

    Verdict::allow()
}

fn analyze_git_clean(args: &[&str]) -> Verdict {
    let force = args.contains(&"--force") || has_short_flag(args, 'f');
    let dry_run = args.contains(&"--dry-run") || has_short_flag(args, 'n');

    if force && !dry_run {
        return Verdict::deny(
            "git.clean.force",
            "git clean -f permanently deletes untracked files",
        );
    }

    Verdict::allow()
}

fn analyze_git_checkout(args: &[&str]) -> Verdict {
    // git checkout -- <paths> (discards changes)
    if args.contains(&"--") {
        return Verdict::warn(
            "git.checkout.discard",
            "git checkout -- discards uncommitted changes",
        );
    }

    if args.contains(&"-f") || args.contains(&"--force") {
        return Verdict::warn(
            "git.checkout.force",
            "git checkout --force discards uncommitted changes",
        );
    }

    if args.contains(&".") {
        return Verdict::warn(
            "git.checkout.discard",
            "git checkout . discards all uncommitted changes",
        );
    }

    Verdict::allow()
}

fn analyze_git_restore(args: &[&str]) -> Verdict {
    let staged = args.contains(&"--staged") || has_short_flag(args, 'S');
    let worktree = args.contains(&"--worktree") || has_short_flag(args, 'W');

    // Unstaging alone keeps the working tree intact
    if staged && !worktree {
        return Verdict::allow();
    }

    Verdict::warn(
        "git.restore.worktree",
        "git restore discards uncommitted changes in the working tree",
    )
}

fn analyze_git_branch(args: &[&str]) -> Verdict {
    let delete = args.contains(&"--delete") || args.contains(&"-d");
    let force = args.contains(&"--force") || args.contains(&"-f");

    if has_short_flag(args, 'D') || (delete && force) {
        let branch = args.iter().find(|a| !a.starts_with('-'));
        return Verdict::warn(
            "git.branch.force_delete",
            format!(
                "git branch -D force-deletes branch{}",
                branch.map(|b| format!(" '{}'", b)).unwrap_or_default()
            ),
        );
    }

    Verdict::allow()
}

fn analyze_git_stash(args: &[&str]) -> Verdict {
    match args.first() {
        Some(&"drop") => Verdict::warn(
            "git.stash.drop",
            "git stash drop permanently deletes stashed changes",
        ),
        Some(&"clear") => Verdict::deny(
            "git.stash.clear",
            "git stash clear deletes ALL stashed changes",
        ),
        _ => Verdict::allow(),
    }
}
