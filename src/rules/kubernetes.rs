//! kubectl, oc and helm analysis.

use super::{Invocation, has_long_flag, option_value, positionals};
use crate::config::AnalyzerConfig;
use crate::decision::Verdict;

/// kubectl options that take a separate value.
const VALUE_OPTIONS: &[&str] = &[
    "-n",
    "--namespace",
    "--context",
    "--cluster",
    "--kubeconfig",
    "--user",
    "-s",
    "--server",
    "--token",
    "-l",
    "--selector",
    "-o",
    "--output",
    "-f",
    "--filename",
    "-c",
    "--container",
    "--timeout",
];

/// Cluster-scoped kinds whose deletion takes down more than one workload.
const CRITICAL_KINDS: &[&str] = &[
    "namespace",
    "namespaces",
    "ns",
    "node",
    "nodes",
    "no",
    "pv",
    "persistentvolume",
    "persistentvolumes",
    "crd",
    "crds",
    "customresourcedefinition",
    "customresourcedefinitions",
    "clusterrole",
    "clusterroles",
    "clusterrolebinding",
    "clusterrolebindings",
    "storageclass",
    "storageclasses",
    "sc",
    "mutatingwebhookconfiguration",
    "mutatingwebhookconfigurations",
    "validatingwebhookconfiguration",
    "validatingwebhookconfigurations",
];

pub fn analyze_kubernetes(invocation: &Invocation<'_>, _config: &AnalyzerConfig) -> Verdict {
    let args = invocation.args();
    let words = positionals(&args, VALUE_OPTIONS);
    let Some(subcommand) = words.first().copied() else {
        return Verdict::allow();
    };

    if is_dry_run(&args) {
        return Verdict::allow();
    }

    let tool = invocation.name();
    if tool == "helm" {
        return analyze_helm(subcommand, &words);
    }

    match subcommand {
        "delete" => analyze_delete(tool, &args, &words[1..]),
        "drain" => Verdict::warn(
            format!("{tool}.drain"),
            format!("{tool} drain evicts every pod from the node"),
        ),
        "scale" if scales_to_zero(&args) => Verdict::warn(
            format!("{tool}.scale_zero"),
            format!("{tool} scale --replicas=0 stops every replica"),
        ),
        "replace" if args.contains(&"--force") => Verdict::warn(
            format!("{tool}.replace_force"),
            format!("{tool} replace --force deletes and recreates the resource"),
        ),
        "apply" if has_long_flag(&args, "--prune") => Verdict::warn(
            format!("{tool}.apply_prune"),
            format!("{tool} apply --prune deletes resources missing from the manifests"),
        ),
        _ => Verdict::allow(),
    }
}

fn analyze_delete(tool: &str, args: &[&str], targets: &[&str]) -> Verdict {
    if args
        .iter()
        .any(|a| matches!(*a, "--all" | "--all-namespaces" | "-A"))
    {
        return Verdict::deny(
            format!("{tool}.delete_all"),
            format!("{tool} delete --all removes every matching resource"),
        );
    }

    if let Some(kind) = targets.first().and_then(|t| critical_kind(t)) {
        return Verdict::deny(
            format!("{tool}.delete_cluster_resource"),
            format!("{tool} delete {kind} removes a cluster-scoped resource"),
        )
        .with_fragment(kind);
    }

    let grace_zero = option_value(args, &["--grace-period"]) == Some("0");
    if args.contains(&"--force") && grace_zero {
        return Verdict::deny(
            format!("{tool}.delete_force"),
            format!("{tool} delete --force --grace-period=0 skips graceful shutdown"),
        );
    }

    Verdict::warn(
        format!("{tool}.delete"),
        format!("{tool} delete removes cluster resources"),
    )
}

/// First critical kind in `pod/name` or `ns,node` style resource arguments.
fn critical_kind(resource: &str) -> Option<&str> {
    let kinds = resource.split('/').next().unwrap_or(resource);
    kinds.split(',').find(|kind| {
        let bare = kind.split('.').next().unwrap_or(*kind);
        CRITICAL_KINDS.contains(&bare.to_ascii_lowercase().as_str())
    })
}

fn is_dry_run(args: &[&str]) -> bool {
    args.iter().any(|a| {
        *a == "--dry-run"
            || a.strip_prefix("--dry-run=")
                .is_some_and(|mode| mode != "none")
    })
}

fn scales_to_zero(args: &[&str]) -> bool {
    option_value(args, &["--replicas"]) == Some("0")
}

fn analyze_helm(subcommand: &str, words: &[&str]) -> Verdict {
    match subcommand {
        "uninstall" | "delete" | "del" | "un" => {
            let release = words.get(1).copied().unwrap_or("release");
            Verdict::warn(
                "helm.uninstall",
                format!("helm {subcommand} removes '{release}' and its resources"),
            )
        }
        _ => Verdict::allow(),
    }
}
