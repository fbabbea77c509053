//! Infrastructure-as-code tools: terraform, tofu, terragrunt, pulumi and cdk.

use super::{Invocation, has_short_flag, positionals};
use crate::config::AnalyzerConfig;
use crate::decision::Verdict;

/// pulumi options that take a separate value.
const PULUMI_VALUE_OPTIONS: &[&str] = &["-s", "--stack", "-C", "--cwd"];

pub fn analyze_terraform(invocation: &Invocation<'_>, _config: &AnalyzerConfig) -> Verdict {
    let args = invocation.args();
    match invocation.name() {
        "pulumi" => analyze_pulumi(&args),
        "cdk" => analyze_cdk(&args),
        tool => analyze_terraform_cli(tool, &args),
    }
}

fn analyze_terraform_cli(tool: &str, args: &[&str]) -> Verdict {
    let words = positionals(args, &[]);
    let Some(subcommand) = words.first().copied() else {
        return Verdict::allow();
    };

    let auto_approve = args
        .iter()
        .any(|a| matches!(*a, "-auto-approve" | "--auto-approve" | "-auto-approve=true"));

    match subcommand {
        "destroy" => Verdict::deny(
            format!("{tool}.destroy"),
            format!("{tool} destroy tears down all managed infrastructure"),
        ),
        "apply" if args.iter().any(|a| matches!(*a, "-destroy" | "--destroy")) => Verdict::deny(
            format!("{tool}.destroy"),
            format!("{tool} apply -destroy tears down all managed infrastructure"),
        ),
        "run-all" if words.get(1) == Some(&"destroy") => Verdict::deny(
            format!("{tool}.destroy"),
            format!("{tool} run-all destroy tears down every module"),
        ),
        "apply" if auto_approve => Verdict::warn(
            format!("{tool}.apply_auto_approve"),
            format!("{tool} apply -auto-approve changes infrastructure without review"),
        ),
        "state" if words.get(1) == Some(&"rm") => Verdict::warn(
            format!("{tool}.state_rm"),
            format!("{tool} state rm makes {tool} forget live resources"),
        ),
        "force-unlock" => Verdict::warn(
            format!("{tool}.force_unlock"),
            format!("{tool} force-unlock can corrupt state held by another run"),
        ),
        "workspace" if words.get(1) == Some(&"delete") => Verdict::warn(
            format!("{tool}.workspace_delete"),
            format!("{tool} workspace delete drops the workspace state"),
        ),
        "taint" => Verdict::warn(
            format!("{tool}.taint"),
            format!("{tool} taint forces the resource to be destroyed and recreated"),
        ),
        _ => Verdict::allow(),
    }
}

fn analyze_pulumi(args: &[&str]) -> Verdict {
    let words = positionals(args, PULUMI_VALUE_OPTIONS);
    let yes = args.contains(&"--yes") || has_short_flag(args, 'y');

    match words.as_slice() {
        ["destroy" | "down", ..] => Verdict::deny(
            "pulumi.destroy",
            "pulumi destroy tears down every resource in the stack",
        ),
        ["stack", "rm", ..] => Verdict::deny(
            "pulumi.stack_rm",
            "pulumi stack rm deletes the stack and its history",
        ),
        ["up" | "update", ..] if yes => Verdict::warn(
            "pulumi.up_yes",
            "pulumi up --yes changes infrastructure without review",
        ),
        ["state", "delete", ..] => Verdict::warn(
            "pulumi.state_delete",
            "pulumi state delete makes pulumi forget a live resource",
        ),
        _ => Verdict::allow(),
    }
}

fn analyze_cdk(args: &[&str]) -> Verdict {
    if positionals(args, &[]).first() == Some(&"destroy") {
        return Verdict::deny(
            "cdk.destroy",
            "cdk destroy deletes the deployed CloudFormation stacks",
        );
    }
    Verdict::allow()
}
