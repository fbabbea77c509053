//! Response formatting for hook output.

use serde::Serialize;
use thiserror::Error;

use crate::decision::{AnalysisResult, Decision};

/// JSON response for a PreToolUse hook (Claude Code hook format).
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HookResponse {
    pub hook_specific_output: HookSpecificOutput,
}

/// The hook-specific output for PreToolUse hooks.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HookSpecificOutput {
    /// Must be "PreToolUse" for this hook type.
    pub hook_event_name: &'static str,
    /// "deny" refuses the call, "ask" triggers the user approval prompt.
    pub permission_decision: &'static str,
    /// Message shown to the user.
    pub permission_decision_reason: String,
}

/// Returned by [`enforce`] when a command must not run.
#[derive(Debug, Error)]
#[error("command blocked ({decision}): {reason}")]
pub struct CommandBlocked {
    pub decision: Decision,
    pub reason: String,
    pub rule_ids: Vec<String>,
}

/// Format a result as hook JSON for stdout. Allow produces no output.
pub fn format_hook_response(result: &AnalysisResult) -> Option<String> {
    let permission_decision = match result.decision {
        Decision::Allow => return None,
        Decision::Warn => "ask",
        Decision::Deny => "deny",
    };
    let response = HookResponse {
        hook_specific_output: HookSpecificOutput {
            hook_event_name: "PreToolUse",
            permission_decision,
            permission_decision_reason: result.reason.clone(),
        },
    };
    serde_json::to_string(&response).ok()
}

/// Gate for hosts that can't ask the user.
///
/// Deny is always an error. Warn is an error only when the host has no ask
/// state to fall back on.
pub fn enforce(result: &AnalysisResult, ask_supported: bool) -> Result<(), CommandBlocked> {
    match result.decision {
        Decision::Allow => Ok(()),
        Decision::Warn if ask_supported => Ok(()),
        decision => Err(CommandBlocked {
            decision,
            reason: result.reason.clone(),
            rule_ids: result.rule_ids().into_iter().map(String::from).collect(),
        }),
    }
}
