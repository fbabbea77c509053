//! AWS CLI analysis - flags commands that delete or disrupt cloud resources.

use super::{Invocation, positionals};
use crate::config::AnalyzerConfig;
use crate::decision::Verdict;

/// Global options that take a separate value.
const GLOBAL_VALUE_OPTIONS: &[&str] = &[
    "--profile",
    "--region",
    "--output",
    "--endpoint-url",
    "--query",
    "--color",
    "--ca-bundle",
    "--cli-read-timeout",
    "--cli-connect-timeout",
];

/// Operation prefixes that destroy resources.
const DENY_PREFIXES: &[&str] = &["terminate-", "delete-", "deregister-", "purge-", "destroy-"];

/// Operation prefixes that disrupt resources without destroying them.
const WARN_PREFIXES: &[&str] = &[
    "stop-",
    "reboot-",
    "disable-",
    "detach-",
    "remove-",
    "revoke-",
    "reset-",
    "cancel-",
    "disassociate-",
    "release-",
];

/// Analyze AWS CLI commands for destructive operations.
pub fn analyze_aws(invocation: &Invocation<'_>, _config: &AnalyzerConfig) -> Verdict {
    let args = invocation.args();

    // --dry-run (ec2) and --dryrun (s3) only validate the request
    if args.iter().any(|a| matches!(*a, "--dry-run" | "--dryrun")) {
        return Verdict::allow();
    }

    // AWS CLI structure: aws <service> <operation> [options]
    let words = positionals(&args, GLOBAL_VALUE_OPTIONS);
    let (Some(service), Some(operation)) = (words.first(), words.get(1)) else {
        return Verdict::allow();
    };

    if *service == "s3" {
        return analyze_s3(operation, &args);
    }

    let command = format!("aws {service} {operation}");

    if DENY_PREFIXES.iter().any(|p| operation.starts_with(*p)) {
        return Verdict::deny(
            format!("aws.{service}.{operation}"),
            format!("{command} permanently destroys AWS resources"),
        )
        .with_fragment(command);
    }

    if WARN_PREFIXES.iter().any(|p| operation.starts_with(*p)) {
        return Verdict::warn(
            format!("aws.{service}.{operation}"),
            format!("{command} disrupts running AWS resources"),
        )
        .with_fragment(command);
    }

    Verdict::allow()
}

fn analyze_s3(operation: &str, args: &[&str]) -> Verdict {
    match operation {
        "rm" if args.contains(&"--recursive") => Verdict::deny(
            "aws.s3.rm_recursive",
            "aws s3 rm --recursive deletes every object under the prefix",
        ),
        "rm" => Verdict::warn("aws.s3.rm", "aws s3 rm permanently deletes S3 objects"),
        "rb" if args.contains(&"--force") => Verdict::deny(
            "aws.s3.rb_force",
            "aws s3 rb --force deletes the bucket and all of its objects",
        ),
        "rb" => Verdict::warn("aws.s3.rb", "aws s3 rb deletes an S3 bucket"),
        "sync" if args.contains(&"--delete") => Verdict::warn(
            "aws.s3.sync_delete",
            "aws s3 sync --delete removes destination objects missing from the source",
        ),
        _ => Verdict::allow(),
    }
}
