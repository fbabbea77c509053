//! Output formatting for hook responses and audit records.

mod redaction;
mod response;

pub use redaction::redact_secrets;
pub use response::{
    CommandBlocked, HookResponse, HookSpecificOutput, enforce, format_hook_response,
};
