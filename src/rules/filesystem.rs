//! Filesystem provider: routes to the rm, find, xargs and parallel checks.

use super::Invocation;
use super::find::analyze_find;
use super::parallel::analyze_parallel;
use super::rm::analyze_rm;
use super::xargs::analyze_xargs;
use crate::config::AnalyzerConfig;
use crate::decision::Verdict;

pub fn analyze_filesystem(invocation: &Invocation<'_>, config: &AnalyzerConfig) -> Verdict {
    match invocation.name() {
        "rm" => analyze_rm(invocation, config),
        "find" => analyze_find(invocation, config),
        "xargs" => analyze_xargs(invocation, config),
        "parallel" => analyze_parallel(invocation, config),
        _ => Verdict::allow(),
    }
}
