//! Built-in and custom rules for command analysis.
//!
//! Each provider is a plain function registered in [`PROVIDERS`] under the
//! command names it understands. Providers never fail: shapes they don't
//! recognize are allowed.

mod aws;
mod azure;
mod custom;
mod database;
mod filesystem;
mod find;
mod gcloud;
mod git;
mod github;
mod heroku;
mod http;
mod kubernetes;
mod parallel;
pub mod paths;
mod rm;
mod stripe;
mod system;
mod terraform;
mod xargs;

use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, error};

use crate::config::AnalyzerConfig;
use crate::decision::{Category, Decision, Verdict};
use crate::shell::StrippedCommand;

/// A command as seen by a rule provider.
#[derive(Debug, Clone, Copy)]
pub struct Invocation<'a> {
    /// Raw segment text.
    pub text: &'a str,
    /// Wrapper-stripped tokens of the segment.
    pub command: &'a StrippedCommand,
}

impl<'a> Invocation<'a> {
    pub fn new(text: &'a str, command: &'a StrippedCommand) -> Self {
        Self { text, command }
    }

    /// Effective command name, without path.
    pub fn name(&self) -> &'a str {
        self.command.command_name().unwrap_or_default()
    }

    /// All words, command name included.
    pub fn words(&self) -> Vec<&'a str> {
        self.command.words()
    }

    /// Words after the command name.
    pub fn args(&self) -> Vec<&'a str> {
        let mut words = self.words();
        if !words.is_empty() {
            words.remove(0);
        }
        words
    }
}

/// Signature shared by every rule provider.
pub type RuleProvider = fn(&Invocation<'_>, &AnalyzerConfig) -> Verdict;

/// Which command names a provider handles.
#[derive(Debug, Clone, Copy)]
enum Trigger {
    Exact(&'static [&'static str]),
    Prefix(&'static str),
}

impl Trigger {
    fn matches(&self, name: &str) -> bool {
        match self {
            Trigger::Exact(names) => names.contains(&name),
            Trigger::Prefix(prefix) => name.starts_with(prefix),
        }
    }
}

struct ProviderEntry {
    trigger: Trigger,
    category: Category,
    provider: RuleProvider,
}

static PROVIDERS: &[ProviderEntry] = &[
    ProviderEntry {
        trigger: Trigger::Exact(&["rm", "find", "xargs", "parallel"]),
        category: Category::Filesystem,
        provider: filesystem::analyze_filesystem,
    },
    ProviderEntry {
        trigger: Trigger::Exact(&["git"]),
        category: Category::Git,
        provider: git::analyze_git,
    },
    ProviderEntry {
        trigger: Trigger::Exact(&["aws"]),
        category: Category::Aws,
        provider: aws::analyze_aws,
    },
    ProviderEntry {
        trigger: Trigger::Exact(&["kubectl", "oc", "helm"]),
        category: Category::Kubernetes,
        provider: kubernetes::analyze_kubernetes,
    },
    ProviderEntry {
        trigger: Trigger::Exact(&["terraform", "tofu", "terragrunt", "pulumi", "cdk"]),
        category: Category::Terraform,
        provider: terraform::analyze_terraform,
    },
    ProviderEntry {
        trigger: Trigger::Exact(&["gcloud", "gsutil"]),
        category: Category::Cloud,
        provider: gcloud::analyze_gcloud,
    },
    ProviderEntry {
        trigger: Trigger::Exact(&["az"]),
        category: Category::Cloud,
        provider: azure::analyze_azure,
    },
    ProviderEntry {
        trigger: Trigger::Exact(&["heroku"]),
        category: Category::Cloud,
        provider: heroku::analyze_heroku,
    },
    ProviderEntry {
        trigger: Trigger::Exact(&[
            "psql", "mysql", "mariadb", "sqlite3", "mongosh", "mongo", "redis-cli", "dropdb",
            "dropuser",
        ]),
        category: Category::Database,
        provider: database::analyze_database,
    },
    ProviderEntry {
        trigger: Trigger::Exact(&["stripe"]),
        category: Category::Payment,
        provider: stripe::analyze_stripe,
    },
    ProviderEntry {
        trigger: Trigger::Exact(&["gh", "glab"]),
        category: Category::SourceHosting,
        provider: github::analyze_github,
    },
    ProviderEntry {
        trigger: Trigger::Exact(system::COMMANDS),
        category: Category::System,
        provider: system::analyze_system,
    },
    ProviderEntry {
        trigger: Trigger::Prefix("mkfs."),
        category: Category::System,
        provider: system::analyze_system,
    },
    ProviderEntry {
        trigger: Trigger::Exact(&["curl", "wget", "http", "https", "xh"]),
        category: Category::Http,
        provider: http::analyze_http,
    },
];

/// Run custom rules and then every matching provider on one command.
///
/// Returns the first non-allow verdict, stamped with its category.
pub fn dispatch(text: &str, command: &StrippedCommand, config: &AnalyzerConfig) -> Verdict {
    if !config.is_disabled(Category::Custom) {
        let verdict = custom::check_custom_rules(text, config);
        if !verdict.is_allow() {
            return finish(verdict, Category::Custom, config);
        }
    }

    let Some(name) = command.command_name() else {
        return Verdict::allow();
    };
    let invocation = Invocation::new(text, command);
    let mut result = Verdict::allow();

    for entry in PROVIDERS.iter().filter(|e| e.trigger.matches(name)) {
        if config.is_disabled(entry.category) {
            debug!(command = name, category = %entry.category, "category disabled, skipping");
            continue;
        }
        let verdict = run_provider(entry, &invocation, config);
        debug!(
            command = name,
            category = %entry.category,
            decision = %verdict.decision,
            rule = ?verdict.rule_id,
            "dispatched"
        );
        if !verdict.is_allow() {
            return finish(verdict, entry.category, config);
        }
        if verdict.confidence < result.confidence {
            result = verdict;
        }
    }

    result
}

fn run_provider(
    entry: &ProviderEntry,
    invocation: &Invocation<'_>,
    config: &AnalyzerConfig,
) -> Verdict {
    let provider = entry.provider;
    match panic::catch_unwind(AssertUnwindSafe(|| provider(invocation, config))) {
        Ok(verdict) => verdict,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_default();
            error!(
                command = invocation.name(),
                category = %entry.category,
                %message,
                "rule provider panicked, allowing with low confidence"
            );
            Verdict::allow_uncertain()
        }
    }
}

fn finish(mut verdict: Verdict, category: Category, config: &AnalyzerConfig) -> Verdict {
    verdict.category = Some(category);
    if verdict.decision == Decision::Warn && config.is_paranoid(category) {
        verdict.decision = Decision::Deny;
        verdict.reason = Some(format!("{} (paranoid mode)", verdict.describe()));
    }
    verdict
}

/// Whether a short-option cluster (`-rf`) among `args` contains `flag`.
pub(crate) fn has_short_flag(args: &[&str], flag: char) -> bool {
    args.iter().any(|a| {
        a.strip_prefix('-').is_some_and(|cluster| {
            !cluster.starts_with('-')
                && cluster.chars().all(|c| c.is_ascii_alphanumeric())
                && cluster.contains(flag)
        })
    })
}

/// Whether `args` contains a long option, bare or as `--opt=value`.
pub(crate) fn has_long_flag(args: &[&str], flag: &str) -> bool {
    args.iter().any(|a| {
        *a == flag
            || a.strip_prefix(flag)
                .is_some_and(|rest| rest.starts_with('='))
    })
}

/// Value of an option given as `--opt value`, `--opt=value` or `-Xvalue`.
pub(crate) fn option_value<'a>(args: &[&'a str], names: &[&str]) -> Option<&'a str> {
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        for name in names {
            if arg == name {
                return iter.next().copied();
            }
            if let Some(rest) = arg.strip_prefix(*name) {
                if name.starts_with("--") {
                    if let Some(value) = rest.strip_prefix('=') {
                        return Some(value);
                    }
                } else if !rest.is_empty() {
                    return Some(rest);
                }
            }
        }
    }
    None
}

/// Non-option words, skipping the values of options listed in `value_options`.
pub(crate) fn positionals<'a>(args: &[&'a str], value_options: &[&str]) -> Vec<&'a str> {
    let mut out = Vec::new();
    let mut iter = args.iter();
    let mut options_done = false;
    while let Some(arg) = iter.next() {
        if options_done {
            out.push(*arg);
        } else if *arg == "--" {
            options_done = true;
        } else if arg.starts_with('-') && arg.len() > 1 {
            if value_options.contains(arg) {
                iter.next();
            }
        } else {
            out.push(*arg);
        }
    }
    out
}

#[cfg(test)]
pub(crate) fn check(provider: RuleProvider, cmd: &str, config: &AnalyzerConfig) -> Verdict {
    use crate::shell::{strip_wrappers, tokenize};

    let stripped = strip_wrappers(&tokenize(cmd));
    provider(&Invocation::new(cmd, &stripped), config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, ConfigOverrides};
    use crate::shell::{strip_wrappers, tokenize};

    fn run(cmd: &str, config: &AnalyzerConfig) -> Verdict {
        dispatch(cmd, &strip_wrappers(&tokenize(cmd)), config)
    }

    #[test]
    fn test_routes_by_name() {
        let config = AnalyzerConfig::default();
        let verdict = run("git reset --hard", &config);
        assert_eq!(verdict.decision, Decision::Deny);
        assert_eq!(verdict.category, Some(Category::Git));
        assert!(run("ls -la", &config).is_allow());
    }

    #[test]
    fn test_routes_path_prefixed_and_wrapped() {
        let config = AnalyzerConfig::default();
        let verdict = run("sudo /usr/bin/git reset --hard", &config);
        assert_eq!(verdict.decision, Decision::Deny);
    }

    #[test]
    fn test_prefix_trigger() {
        let config = AnalyzerConfig::default();
        let verdict = run("mkfs.ext4 /dev/sdb1", &config);
        assert_eq!(verdict.decision, Decision::Deny);
        assert_eq!(verdict.category, Some(Category::System));
    }

    #[test]
    fn test_disabled_category_skipped() {
        let mut config = AnalyzerConfig::default();
        config.disabled.insert(Category::Git);
        assert!(run("git reset --hard", &config).is_allow());
    }

    #[test]
    fn test_paranoid_escalates_warn() {
        let mut config = AnalyzerConfig::default();
        assert_eq!(run("git branch -D old", &config).decision, Decision::Warn);

        config.paranoid_categories.insert(Category::Git);
        let verdict = run("git branch -D old", &config);
        assert_eq!(verdict.decision, Decision::Deny);
        assert!(verdict.describe().contains("paranoid"));
    }

    #[test]
    fn test_custom_rules_run_first() {
        let file = Config::parse(
            "[[rules]]\nname = \"no-ls-root\"\npattern = \"^ls /$\"\naction = \"warn\"\n",
        )
        .unwrap();
        let config =
            AnalyzerConfig::resolve(&file, |_| None, &ConfigOverrides::default()).unwrap();
        let verdict = run("ls /", &config);
        assert_eq!(verdict.decision, Decision::Warn);
        assert_eq!(verdict.category, Some(Category::Custom));
        assert_eq!(verdict.rule_id.as_deref(), Some("custom.no-ls-root"));
    }

    fn exploding(_: &Invocation<'_>, _: &AnalyzerConfig) -> Verdict {
        panic!("provider bug");
    }

    #[test]
    fn test_panicking_provider_is_contained() {
        let entry = ProviderEntry {
            trigger: Trigger::Exact(&["boom"]),
            category: Category::System,
            provider: exploding,
        };
        let stripped = strip_wrappers(&tokenize("boom"));
        let verdict = run_provider(&entry, &Invocation::new("boom", &stripped), &AnalyzerConfig::default());
        assert!(verdict.is_allow());
        assert_eq!(verdict.confidence, crate::decision::Confidence::Low);
    }

    #[test]
    fn test_flag_helpers() {
        let args = ["-rf", "--force-with-lease=main", "--", "-x"];
        assert!(has_short_flag(&args, 'r'));
        assert!(!has_short_flag(&args, 'd'));
        assert!(has_long_flag(&args, "--force-with-lease"));
        assert!(!has_long_flag(&args, "--force"));
    }

    #[test]
    fn test_option_value() {
        assert_eq!(option_value(&["-X", "DELETE"], &["-X"]), Some("DELETE"));
        assert_eq!(option_value(&["-XPUT"], &["-X"]), Some("PUT"));
        assert_eq!(
            option_value(&["--request=PATCH"], &["--request"]),
            Some("PATCH")
        );
        assert_eq!(option_value(&["--requests"], &["--request"]), None);
    }

    #[test]
    fn test_positionals() {
        let args = ["--profile", "prod", "ec2", "--debug", "terminate-instances"];
        assert_eq!(
            positionals(&args, &["--profile"]),
            vec!["ec2", "terminate-instances"]
        );
    }
}
