//! Shell Safety Net - command line and Claude Code hook entry point.

use clap::Parser;
use std::io::{self, IsTerminal, Read};
use std::panic;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, error, warn};
use tracing_subscriber::EnvFilter;

use shell_safety_net::audit::{AuditEntry, AuditSink};
use shell_safety_net::config::{ENV_PREFIX, process_env, resolve_audit_path};
use shell_safety_net::{
    AnalysisResult, AnalyzerConfig, Config, ConfigOverrides, HookInput, analyze_command,
    format_hook_response,
};

#[derive(Parser, Debug)]
#[command(name = "shell-safety-net")]
#[command(about = "Classify shell commands as allow, warn or deny before they run")]
#[command(version)]
struct Cli {
    /// Working directory used to resolve relative paths
    #[arg(long)]
    cwd: Option<PathBuf>,

    /// Deny commands that can't be fully parsed
    #[arg(long)]
    strict: bool,

    /// Escalate every warning to a denial
    #[arg(long)]
    paranoid: bool,

    /// Downgrade denials to warnings
    #[arg(long)]
    warn_only: bool,

    /// Maximum nesting depth for `bash -c` style wrappers
    #[arg(long, value_name = "N")]
    max_depth: Option<usize>,

    /// Maximum number of segments analyzed per command
    #[arg(long, value_name = "N")]
    max_segments: Option<usize>,

    /// Command to analyze. Reads a hook payload from stdin when omitted.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,
}

impl Cli {
    fn overrides(&self, cwd: Option<PathBuf>) -> ConfigOverrides {
        ConfigOverrides {
            cwd,
            strict: self.strict,
            paranoid: self.paranoid,
            warn_only: self.warn_only,
            max_recursion_depth: self.max_depth,
            max_segments: self.max_segments,
        }
    }
}

fn main() -> ExitCode {
    init_tracing();
    install_panic_hook();
    let cli = Cli::parse();

    if cli.command.is_empty() {
        run_hook(&cli)
    } else {
        run_cli(&cli)
    }
}

/// Logs go to stderr; stdout carries results only.
fn init_tracing() {
    let filter = EnvFilter::try_from_env(format!("{ENV_PREFIX}LOG"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_target(false)
        .init();
}

/// Report panics through tracing instead of the default stderr message.
fn install_panic_hook() {
    panic::set_hook(Box::new(|info| {
        error!(panic = %info, "panic");
    }));
}

/// Analyze the positional command and print the full result.
fn run_cli(cli: &Cli) -> ExitCode {
    let command = cli.command.join(" ");
    let (config, audit) = load_settings(&cli.overrides(cli.cwd.clone()));

    let result = analyze_command(&command, &config);
    audit.record(
        AuditEntry::new(&result, config.bypass)
            .with_cwd(config.cwd.as_deref().and_then(|p| p.to_str())),
    );

    match serde_json::to_string_pretty(&result) {
        Ok(json) => println!("{json}"),
        Err(e) => error!(error = %e, "failed to serialize result"),
    }
    drop(audit);

    exit_code(&result)
}

/// Read a PreToolUse payload from stdin and answer in hook format.
///
/// Anything that isn't a Bash command passes through without output.
fn run_hook(cli: &Cli) -> ExitCode {
    let mut raw = String::new();
    if let Err(e) = io::stdin().read_to_string(&mut raw) {
        warn!(error = %e, "failed to read hook input, allowing");
        return ExitCode::SUCCESS;
    }

    let input = match HookInput::parse(&raw) {
        Ok(input) => input,
        Err(e) => {
            warn!(error = %e, "malformed hook input, allowing");
            return ExitCode::SUCCESS;
        }
    };
    let Some(command) = input.bash_command() else {
        debug!(tool = %input.tool_name, "not a Bash command, passing through");
        return ExitCode::SUCCESS;
    };

    let cwd = cli.cwd.clone().or_else(|| input.cwd.as_ref().map(PathBuf::from));
    let (config, audit) = load_settings(&cli.overrides(cwd));

    let result = analyze_command(command, &config);
    audit.record(
        AuditEntry::new(&result, config.bypass)
            .with_session(input.session_id.as_deref())
            .with_cwd(input.cwd.as_deref()),
    );

    if let Some(response) = format_hook_response(&result) {
        println!("{response}");
    }
    drop(audit);

    ExitCode::SUCCESS
}

/// Resolve the analyzer config and the audit sink.
///
/// A broken config file is logged and replaced by the environment alone.
fn load_settings(overrides: &ConfigOverrides) -> (AnalyzerConfig, AuditSink) {
    let resolved = Config::load(overrides.cwd.as_deref()).and_then(|file| {
        let config = AnalyzerConfig::resolve(&file, process_env, overrides)?;
        Ok((config, file))
    });
    let (config, file) = match resolved {
        Ok(pair) => pair,
        Err(e) => {
            error!(error = %e, "invalid configuration, using environment only");
            (AnalyzerConfig::from_env(overrides), Config::default())
        }
    };

    let audit = match resolve_audit_path(&file, process_env, config.bypass) {
        Some(path) => AuditSink::spawn(path),
        None => AuditSink::disabled(),
    };
    (config, audit)
}

fn exit_code(result: &AnalysisResult) -> ExitCode {
    if result.is_deny() {
        ExitCode::from(2)
    } else {
        ExitCode::SUCCESS
    }
}
