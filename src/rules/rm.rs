//! rm command analysis.

use super::Invocation;
use super::paths::{Target, classify_target};
use crate::config::AnalyzerConfig;
use crate::decision::{Confidence, Verdict};

/// Flags and operands of an rm invocation.
#[derive(Debug, Default)]
pub(super) struct RmArgs<'a> {
    pub recursive: bool,
    pub force: bool,
    pub no_preserve_root: bool,
    pub targets: Vec<&'a str>,
}

impl<'a> RmArgs<'a> {
    /// Parse the words after `rm`.
    pub fn parse(args: &[&'a str]) -> Self {
        let mut parsed = Self::default();
        let mut options_done = false;

        for arg in args {
            if options_done || !arg.starts_with('-') || *arg == "-" {
                parsed.targets.push(*arg);
                continue;
            }
            match *arg {
                "--" => options_done = true,
                "--recursive" => parsed.recursive = true,
                "--force" => parsed.force = true,
                "--no-preserve-root" => parsed.no_preserve_root = true,
                long if long.starts_with("--") => {}
                short => {
                    // Short options
                    if short.contains('r') || short.contains('R') {
                        parsed.recursive = true;
                    }
                    if short.contains('f') {
                        parsed.force = true;
                    }
                }
            }
        }

        parsed
    }
}

/// Analyze rm command for dangerous operations.
pub fn analyze_rm(invocation: &Invocation<'_>, config: &AnalyzerConfig) -> Verdict {
    let args = invocation.args();
    let rm = RmArgs::parse(&args);

    if rm.no_preserve_root {
        return Verdict::deny(
            "rm.no_preserve_root",
            "rm --no-preserve-root disables the safeguard against deleting /",
        )
        .with_fragment("--no-preserve-root");
    }

    // Only recursive deletes are checked
    if !rm.recursive {
        return Verdict::allow();
    }

    let Some((target, path)) = rm
        .targets
        .iter()
        .map(|t| (classify_target(t, config), *t))
        .max_by_key(|(target, _)| *target)
    else {
        return Verdict::allow();
    };

    match target {
        Target::Catastrophic => Verdict::deny(
            "rm.catastrophic",
            format!("rm -r on '{path}' would delete the system or a home directory"),
        )
        .with_fragment(path),
        Target::OutsideCwd if rm.force => Verdict::deny(
            "rm.outside_cwd",
            format!("rm -rf outside working directory: '{path}'"),
        )
        .with_fragment(path),
        Target::OutsideCwd => Verdict::warn(
            "rm.outside_cwd",
            format!("rm -r outside working directory: '{path}'"),
        )
        .with_fragment(path),
        Target::Unresolved => Verdict::warn(
            "rm.unresolved_target",
            format!("rm -r target '{path}' can't be resolved before running"),
        )
        .with_fragment(path)
        .with_confidence(Confidence::Medium),
        Target::InsideCwd if rm.force => Verdict::warn(
            "rm.recursive_force",
            format!("rm -rf permanently deletes '{path}'"),
        )
        .with_fragment(path),
        Target::InsideCwd | Target::SafeRoot => Verdict::allow(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::Decision;
    use crate::rules::check;

    fn test_config() -> AnalyzerConfig {
        AnalyzerConfig::default().with_cwd("/home/user/project")
    }

    fn decide(cmd: &str) -> Decision {
        check(analyze_rm, cmd, &test_config()).decision
    }

    #[test]
    fn test_rm_rf_root() {
        let verdict = check(analyze_rm, "rm -rf /", &test_config());
        assert_eq!(verdict.decision, Decision::Deny);
        assert_eq!(verdict.matched_fragments, vec!["/"]);
    }

    #[test]
    fn test_rm_rf_home() {
        assert_eq!(decide("rm -rf /home"), Decision::Deny);
        assert_eq!(decide("rm -rf ~"), Decision::Deny);
        assert_eq!(decide("rm -rf $HOME/"), Decision::Deny);
    }

    #[test]
    fn test_rm_rf_outside_cwd() {
        assert_eq!(decide("rm -rf /opt/log"), Decision::Deny);
        assert_eq!(decide("rm -r /opt/log"), Decision::Warn);
    }

    #[test]
    fn test_rm_rf_in_cwd() {
        assert_eq!(decide("rm -rf build/"), Decision::Warn);
        assert_eq!(decide("rm -r build/"), Decision::Allow);
    }

    #[test]
    fn test_rm_rf_tmp() {
        assert_eq!(decide("rm -rf /tmp/cache"), Decision::Allow);
    }

    #[test]
    fn test_rm_rf_parent_escape() {
        assert_eq!(decide("rm -rf ../../.."), Decision::Deny);
        assert_eq!(decide("rm -rf ../sibling"), Decision::Deny);
    }

    #[test]
    fn test_rm_variable_target() {
        let verdict = check(analyze_rm, "rm -rf \"$OUT\"", &test_config());
        assert_eq!(verdict.decision, Decision::Warn);
        assert_eq!(verdict.confidence, Confidence::Medium);
    }

    #[test]
    fn test_worst_target_wins() {
        assert_eq!(decide("rm -rf build /etc"), Decision::Deny);
    }

    #[test]
    fn test_long_and_split_flags() {
        assert_eq!(decide("rm --recursive --force /usr"), Decision::Deny);
        assert_eq!(decide("rm -R -f /"), Decision::Deny);
        assert_eq!(decide("rm -fr /"), Decision::Deny);
    }

    #[test]
    fn test_double_dash_targets() {
        assert_eq!(decide("rm -rf -- -weird"), Decision::Warn);
    }

    #[test]
    fn test_no_preserve_root() {
        assert_eq!(decide("rm --no-preserve-root -rf /"), Decision::Deny);
        assert_eq!(decide("rm --no-preserve-root file"), Decision::Deny);
    }

    #[test]
    fn test_rm_no_recursive() {
        assert_eq!(decide("rm /etc/passwd"), Decision::Allow);
        assert_eq!(decide("rm -f a.txt"), Decision::Allow);
    }

    #[test]
    fn test_rm_without_targets() {
        assert_eq!(decide("rm -rf"), Decision::Allow);
    }

    #[test]
    fn test_unknown_cwd() {
        let config = AnalyzerConfig::default();
        assert_eq!(check(analyze_rm, "rm -rf ./build", &config).decision, Decision::Warn);
        assert_eq!(check(analyze_rm, "rm -rf /opt/x", &config).decision, Decision::Warn);
    }
}
