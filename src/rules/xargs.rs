//! xargs command analysis.

use super::Invocation;
use super::rm::RmArgs;
use crate::config::AnalyzerConfig;
use crate::decision::Verdict;
use crate::shell::{basename, xargs_command_start};

/// Analyze xargs command for deletes driven by piped input.
pub fn analyze_xargs(invocation: &Invocation<'_>, _config: &AnalyzerConfig) -> Verdict {
    let words = invocation.words();
    let Some(start) = xargs_command_start(&words) else {
        return Verdict::allow();
    };

    if basename(words[start]) != "rm" {
        return Verdict::allow();
    }

    let rm = RmArgs::parse(&words[start + 1..]);
    if rm.recursive {
        return Verdict::deny(
            "xargs.rm_rf",
            "xargs rm -rf deletes directories named by piped input",
        )
        .with_fragment(words[start..].join(" "));
    }

    Verdict::warn("xargs.rm", "xargs rm deletes files named by piped input")
        .with_fragment(words[start..].join(" "))
}
