//! GNU parallel command analysis.

use super::Invocation;
use super::rm::RmArgs;
use crate::config::AnalyzerConfig;
use crate::decision::Verdict;
use crate::shell::{basename, parallel_parts};

/// Analyze parallel command for deletes run over its inputs.
pub fn analyze_parallel(invocation: &Invocation<'_>, _config: &AnalyzerConfig) -> Verdict {
    let words = invocation.words();
    let parts = parallel_parts(&words);

    let Some((first, rest)) = parts.command.split_first() else {
        return Verdict::allow();
    };
    if basename(first) != "rm" {
        return Verdict::allow();
    }

    if RmArgs::parse(rest).recursive {
        return Verdict::deny(
            "parallel.rm_rf",
            "parallel rm -rf deletes directories in parallel from input",
        )
        .with_fragment(parts.command.join(" "));
    }

    Verdict::warn(
        "parallel.rm",
        "parallel rm deletes files in parallel from input",
    )
    .with_fragment(parts.command.join(" "))
}
