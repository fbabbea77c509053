//! Shell Safety Net - pre-execution safety analysis for shell commands.
//!
//! Decides whether a shell command an agent is about to run should be
//! allowed, confirmed by the user (warn) or refused (deny). Commands are
//! split into segments, unwrapped (`sudo`, `env`, `bash -c`, `xargs`, ...)
//! and checked by per-tool rule providers; the worst verdict wins.

pub mod analysis;
pub mod audit;
pub mod config;
pub mod decision;
pub mod input;
pub mod output;
pub mod rules;
pub mod shell;

pub use analysis::analyze_command;
pub use config::{AnalyzerConfig, Config, ConfigError, ConfigOverrides};
pub use decision::{AnalysisResult, Category, Confidence, Decision, Verdict};
pub use input::HookInput;
pub use output::{CommandBlocked, enforce, format_hook_response};
