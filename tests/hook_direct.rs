use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

const ENV_VARS: &[&str] = &[
    "STRICT",
    "PARANOID",
    "WARN_ONLY",
    "BYPASS",
    "SAFE_ROOTS",
    "MAX_DEPTH",
    "MAX_SEGMENTS",
    "AUDIT_LOG",
    "LOG",
];

/// Hook invocation isolated from the user's home, config and environment.
fn hook_cmd(home: &TempDir) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("shell-safety-net");
    cmd.current_dir(home.path());
    cmd.env("HOME", home.path());
    cmd.env(
        "SHELL_SAFETY_NET_CONFIG",
        home.path().join("nonexistent.toml"),
    );
    for var in ENV_VARS {
        cmd.env_remove(format!("SHELL_SAFETY_NET_{var}"));
    }
    cmd
}

fn bash_input(command: &str) -> String {
    serde_json::json!({
        "tool_name": "Bash",
        "tool_input": { "command": command },
        "session_id": "test-session",
    })
    .to_string()
}

fn assert_decision(command: &str, decision: &str) {
    let home = TempDir::new().unwrap();
    hook_cmd(&home)
        .write_stdin(bash_input(command))
        .assert()
        .code(0)
        .stdout(predicate::str::contains(format!(
            "\"permissionDecision\":\"{decision}\""
        )));
}

fn assert_silent(input: &str) {
    let home = TempDir::new().unwrap();
    hook_cmd(&home)
        .write_stdin(input.to_string())
        .assert()
        .code(0)
        .stdout(predicate::str::is_empty());
}

mod should_allow {
    use super::*;

    #[test]
    fn safe_ls() {
        assert_silent(&bash_input("ls -la"));
    }

    #[test]
    fn git_status() {
        assert_silent(&bash_input("git status"));
    }

    #[test]
    fn force_with_lease() {
        assert_silent(&bash_input("git push --force-with-lease origin feature"));
    }

    #[test]
    fn aws_describe() {
        assert_silent(&bash_input("aws ec2 describe-instances --region us-east-1"));
    }

    #[test]
    fn kubectl_dry_run() {
        assert_silent(&bash_input("kubectl delete ns prod --dry-run=client"));
    }

    #[test]
    fn command_substitution() {
        assert_silent(&bash_input("echo $(date)"));
    }

    #[test]
    fn unknown_tool() {
        assert_silent(r#"{"tool_name":"Write","tool_input":{"file_path":"/tmp/test"}}"#);
    }

    #[test]
    fn missing_command() {
        assert_silent(r#"{"tool_name":"Bash","tool_input":{}}"#);
    }

    #[test]
    fn invalid_json() {
        assert_silent("not valid json");
    }

    #[test]
    fn empty_input() {
        assert_silent("");
    }
}

mod should_deny {
    use super::*;

    #[test]
    fn rm_rf_root() {
        assert_decision("rm -rf /", "deny");
    }

    #[test]
    fn rm_rf_home() {
        assert_decision("rm -rf ~", "deny");
    }

    #[test]
    fn sudo_wrapped_rm() {
        assert_decision("sudo -u root rm -rf /", "deny");
    }

    #[test]
    fn git_reset_hard() {
        assert_decision("git reset --hard HEAD~1", "deny");
    }

    #[test]
    fn git_push_force_main() {
        assert_decision("git push --force origin main", "deny");
    }

    #[test]
    fn aws_terminate() {
        assert_decision("aws ec2 terminate-instances --instance-ids i-1", "deny");
    }

    #[test]
    fn terraform_destroy() {
        assert_decision("terraform destroy -auto-approve", "deny");
    }

    #[test]
    fn kubectl_delete_namespace() {
        assert_decision("kubectl delete namespace prod", "deny");
    }

    #[test]
    fn drop_table() {
        assert_decision(r#"psql -c "DROP TABLE users""#, "deny");
    }

    #[test]
    fn nested_shell() {
        let home = TempDir::new().unwrap();
        hook_cmd(&home)
            .write_stdin(bash_input(r#"bash -c "rm -rf /""#))
            .assert()
            .code(0)
            .stdout(predicate::str::contains("[via bash -c]"));
    }

    #[test]
    fn subshell_behind_keyword() {
        assert_decision("if (rm -rf /); then :; fi", "deny");
        assert_decision("time (rm -rf /)", "deny");
    }

    #[test]
    fn case_arm_and_function_body() {
        assert_decision("case x in x) rm -rf /;; esac", "deny");
        assert_decision("f() { rm -rf /; }; f", "deny");
    }

    #[test]
    fn env_split_string() {
        assert_decision("env -S 'rm -rf /'", "deny");
    }

    #[test]
    fn long_xargs_chain_still_answers() {
        let home = TempDir::new().unwrap();
        let cmd = format!("{}rm -rf /", "xargs ".repeat(20_000));
        hook_cmd(&home).write_stdin(bash_input(&cmd)).assert().code(0);
    }

    #[test]
    fn compound_worst_wins() {
        assert_decision("echo hi && git stash clear", "deny");
    }
}

mod should_ask {
    use super::*;

    #[test]
    fn rm_rf_in_project() {
        // Temp dirs live under a safe root, so use a fixed project path
        let home = TempDir::new().unwrap();
        let input = serde_json::json!({
            "tool_name": "Bash",
            "tool_input": { "command": "rm -rf ./build" },
            "cwd": "/home/user/project",
        });
        hook_cmd(&home)
            .write_stdin(input.to_string())
            .assert()
            .code(0)
            .stdout(predicate::str::contains("\"permissionDecision\":\"ask\""));
    }

    #[test]
    fn git_stash_drop() {
        assert_decision("git stash drop", "ask");
    }

    #[test]
    fn heredoc() {
        assert_decision("cat <<EOF", "ask");
        assert_decision("cat <<\\EOF\nx\nEOF", "ask");
    }

    #[test]
    fn curl_delete() {
        assert_decision("curl -X DELETE https://api.example.com/items/1", "ask");
    }

    #[test]
    fn helm_uninstall() {
        assert_decision("helm uninstall my-release", "ask");
    }
}
