//! Google Cloud CLI analysis (gcloud, gsutil).

use super::{Invocation, has_short_flag, positionals};
use crate::config::AnalyzerConfig;
use crate::decision::Verdict;

/// gcloud flags that take a separate value.
const GCLOUD_VALUE_OPTIONS: &[&str] = &[
    "--project",
    "--account",
    "--configuration",
    "--format",
    "--verbosity",
    "--zone",
    "--region",
    "--impersonate-service-account",
];

/// gsutil top-level options that take a separate value.
const GSUTIL_VALUE_OPTIONS: &[&str] = &["-o", "-h", "-u"];

/// Resource groups whose deletion is unrecoverable.
const DENY_DELETES: &[&[&str]] = &[
    &["projects"],
    &["sql", "instances"],
    &["container", "clusters"],
    &["compute", "instances"],
    &["storage", "buckets"],
];

/// Analyze gcloud/gsutil commands for destructive operations.
pub fn analyze_gcloud(invocation: &Invocation<'_>, _config: &AnalyzerConfig) -> Verdict {
    let args = invocation.args();
    if invocation.name() == "gsutil" {
        return analyze_gsutil(&args);
    }

    let mut words = positionals(&args, GCLOUD_VALUE_OPTIONS);
    // Release tracks don't change what a command does
    if matches!(words.first(), Some(&"alpha" | &"beta")) {
        words.remove(0);
    }

    let command = format!("gcloud {}", words.join(" "));

    if let ["storage", "rm", ..] = words.as_slice()
        && (args.contains(&"--recursive") || has_short_flag(&args, 'r'))
    {
        return Verdict::deny(
            "gcloud.storage.rm_recursive",
            "gcloud storage rm --recursive deletes every object under the path",
        )
        .with_fragment(command);
    }

    let Some(delete_at) = words.iter().position(|w| *w == "delete") else {
        return Verdict::allow();
    };
    let group = &words[..delete_at];

    if DENY_DELETES.iter().any(|g| *g == group) {
        return Verdict::deny(
            format!("gcloud.{}.delete", group.join(".")),
            format!("{} delete destroys the resource and its data", command_prefix(group)),
        )
        .with_fragment(command);
    }

    Verdict::warn(
        "gcloud.delete",
        format!("{} delete removes Google Cloud resources", command_prefix(group)),
    )
    .with_fragment(command)
}

fn command_prefix(group: &[&str]) -> String {
    match group {
        [] => "gcloud".to_string(),
        _ => format!("gcloud {}", group.join(" ")),
    }
}

fn analyze_gsutil(args: &[&str]) -> Verdict {
    let words = positionals(args, GSUTIL_VALUE_OPTIONS);
    let Some(subcommand) = words.first().copied() else {
        return Verdict::allow();
    };

    match subcommand {
        "rm" if has_short_flag(args, 'r') || has_short_flag(args, 'R') => Verdict::deny(
            "gsutil.rm_recursive",
            "gsutil rm -r deletes every object under the path",
        ),
        "rm" => Verdict::warn("gsutil.rm", "gsutil rm permanently deletes objects"),
        "rb" => Verdict::deny("gsutil.rb", "gsutil rb deletes a storage bucket"),
        _ => Verdict::allow(),
    }
}
