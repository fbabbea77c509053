//! Integration tests for the shell-safety-net binary in command-line mode.

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
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

/// Helper to create a test config file.
fn create_config(dir: &Path, name: &str, content: &str) -> PathBuf {
    let config_path = dir.join(name);
    fs::write(&config_path, content).unwrap();
    config_path
}

/// Command isolated from the real home directory and environment.
fn cmd_in(home: &TempDir) -> assert_cmd::Command {
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

/// Run and parse the JSON result printed on stdout.
fn run_json(cmd: &mut assert_cmd::Command) -> serde_json::Value {
    let output = cmd.output().unwrap();
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn test_allow_safe_command() {
    let home = TempDir::new().unwrap();
    cmd_in(&home)
        .arg("ls -la")
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""decision": "allow""#))
        .stdout(predicate::str::contains("No dangerous operations detected"));
}

#[test]
fn test_deny_exits_2() {
    let home = TempDir::new().unwrap();
    cmd_in(&home)
        .arg("rm -rf /")
        .assert()
        .code(2)
        .stdout(predicate::str::contains(r#""decision": "deny""#))
        .stdout(predicate::str::contains("rm.catastrophic"));
}

#[test]
fn test_split_arguments_are_joined() {
    let home = TempDir::new().unwrap();
    cmd_in(&home)
        .args(["git", "push", "--force", "origin", "main"])
        .assert()
        .code(2);
}

#[test]
fn test_warn_exits_0() {
    let home = TempDir::new().unwrap();
    let result = run_json(cmd_in(&home).args(["--cwd", "/home/user/project", "rm -rf ./build"]));
    assert_eq!(result["decision"], "warn");
    assert_eq!(result["segment_verdicts"][0]["rule_id"], "rm.recursive_force");
}

#[test]
fn test_strict_denies_unparseable() {
    let home = TempDir::new().unwrap();
    cmd_in(&home).arg("cat <<EOF").assert().code(0);

    cmd_in(&home)
        .args(["--strict", "cat <<EOF"])
        .assert()
        .code(2)
        .stdout(predicate::str::contains("heredoc"));
}

#[test]
fn test_paranoid_escalates_warn() {
    let home = TempDir::new().unwrap();
    cmd_in(&home)
        .args(["--paranoid", "--cwd", "/home/user/project", "rm -rf ./build"])
        .assert()
        .code(2)
        .stdout(predicate::str::contains("paranoid mode"));
}

#[test]
fn test_warn_only_downgrades_deny() {
    let home = TempDir::new().unwrap();
    let result = run_json(cmd_in(&home).args(["--warn-only", "rm -rf /"]));
    assert_eq!(result["decision"], "warn");
    assert!(
        result["reason"]
            .as_str()
            .unwrap()
            .contains("would have been denied")
    );
}

#[test]
fn test_env_strict() {
    let home = TempDir::new().unwrap();
    cmd_in(&home)
        .env("SHELL_SAFETY_NET_STRICT", "1")
        .arg("diff <(ls a) <(ls b)")
        .assert()
        .code(2);
}

#[test]
fn test_max_depth_flag() {
    let home = TempDir::new().unwrap();
    let cmd = r#"bash -c "bash -c 'rm -rf /'""#;
    cmd_in(&home).args(["--max-depth", "1", cmd]).assert().code(0);
    cmd_in(&home).arg(cmd).assert().code(2);
}

#[test]
fn test_max_segments_flag() {
    let home = TempDir::new().unwrap();
    let result = run_json(cmd_in(&home).args(["--max-segments", "2", "echo 1; echo 2; rm -rf /"]));
    assert_eq!(result["decision"], "warn");
    assert_eq!(result["truncated_command"], "echo 1 ; echo 2");
}

#[test]
fn test_project_config_custom_rule() {
    let home = TempDir::new().unwrap();
    create_config(
        home.path(),
        ".shell-safety-net.toml",
        r#"
[[rules]]
name = "no-prod-db"
pattern = 'prod-db\.internal'
action = "deny"
reason = "production database"
"#,
    );

    cmd_in(&home)
        .arg("--cwd")
        .arg(home.path())
        .arg("psql -h prod-db.internal -c 'select 1'")
        .assert()
        .code(2)
        .stdout(predicate::str::contains("custom.no-prod-db"))
        .stdout(predicate::str::contains("production database"));
}

#[test]
fn test_user_config_disables_category() {
    let home = TempDir::new().unwrap();
    let config = create_config(
        home.path(),
        "user.toml",
        r#"
[categories]
disabled = ["git"]
"#,
    );

    cmd_in(&home)
        .env("SHELL_SAFETY_NET_CONFIG", &config)
        .arg("git reset --hard")
        .assert()
        .success();
}

#[test]
fn test_force_push_allowed_branch() {
    let home = TempDir::new().unwrap();
    let config = create_config(
        home.path(),
        "user.toml",
        r#"
[git]
force_push_allowed_branches = ["feature-login"]
"#,
    );

    cmd_in(&home)
        .env("SHELL_SAFETY_NET_CONFIG", &config)
        .arg("git push --force origin feature-login")
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""decision": "warn""#));
}

#[test]
fn test_invalid_config_falls_back_to_env() {
    let home = TempDir::new().unwrap();
    let config = create_config(
        home.path(),
        "user.toml",
        r#"
[[rules]]
name = "broken"
pattern = '(unclosed'
action = "deny"
"#,
    );

    cmd_in(&home)
        .env("SHELL_SAFETY_NET_CONFIG", &config)
        .arg("rm -rf /")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("invalid configuration"));
}

#[test]
fn test_bypass_allows_and_audits() {
    let home = TempDir::new().unwrap();
    cmd_in(&home)
        .env("SHELL_SAFETY_NET_BYPASS", "true")
        .arg("rm -rf /")
        .assert()
        .success()
        .stdout(predicate::str::contains("bypass: would have been deny"));

    let log = home.path().join(".claude/shell-safety-net-audit.jsonl");
    let content = fs::read_to_string(log).unwrap();
    let entry: serde_json::Value = serde_json::from_str(content.lines().next().unwrap()).unwrap();
    assert_eq!(entry["decision"], "allow");
    assert_eq!(entry["bypass"], true);
    assert_eq!(entry["command"], "rm -rf /");
}

#[test]
fn test_audit_log_env() {
    let home = TempDir::new().unwrap();
    let log = home.path().join("logs/audit.jsonl");
    cmd_in(&home)
        .env("SHELL_SAFETY_NET_AUDIT_LOG", &log)
        .arg("mysql --password=hunter2hunter2 -e 'DROP DATABASE app'")
        .assert()
        .code(2);

    let content = fs::read_to_string(&log).unwrap();
    assert!(content.contains("\"decision\":\"deny\""));
    assert!(!content.contains("hunter2hunter2"));
}

#[test]
fn test_audit_disabled_by_default() {
    let home = TempDir::new().unwrap();
    cmd_in(&home).arg("rm -rf /").assert().code(2);
    assert!(!home.path().join(".claude").exists());
}

#[test]
fn test_hook_audit_records_session() {
    let home = TempDir::new().unwrap();
    let log = home.path().join("audit.jsonl");
    cmd_in(&home)
        .env("SHELL_SAFETY_NET_AUDIT_LOG", &log)
        .write_stdin(
            r#"{"tool_name":"Bash","tool_input":{"command":"git reset --hard"},"session_id":"s-42","cwd":"/home/user/project"}"#,
        )
        .assert()
        .success();

    let content = fs::read_to_string(&log).unwrap();
    let entry: serde_json::Value = serde_json::from_str(content.trim()).unwrap();
    assert_eq!(entry["session_id"], "s-42");
    assert_eq!(entry["cwd"], "/home/user/project");
    assert_eq!(entry["rule_ids"][0], "git.reset.hard");
}
