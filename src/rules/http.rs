//! HTTP clients: flags requests that modify or delete remote resources.

use super::{Invocation, option_value, positionals};
use crate::config::AnalyzerConfig;
use crate::decision::{Confidence, Verdict};

/// httpie/xh options that take a separate value.
const HTTPIE_VALUE_OPTIONS: &[&str] = &[
    "-a",
    "--auth",
    "-A",
    "--auth-type",
    "-o",
    "--output",
    "--session",
    "--verify",
    "--cert",
    "--timeout",
];

const HTTPIE_METHODS: &[&str] = &["GET", "HEAD", "OPTIONS", "POST", "PUT", "PATCH", "DELETE"];

pub fn analyze_http(invocation: &Invocation<'_>, _config: &AnalyzerConfig) -> Verdict {
    let tool = invocation.name();
    let args = invocation.args();

    let Some(method) = request_method(tool, &args) else {
        return Verdict::allow();
    };
    let method = method.to_ascii_uppercase();

    match method.as_str() {
        "DELETE" => Verdict::warn(
            "http.delete",
            format!("{tool} sends a DELETE request that removes a remote resource"),
        )
        .with_fragment(method.as_str()),
        "PUT" | "PATCH" => Verdict::warn(
            format!("http.{}", method.to_ascii_lowercase()),
            format!("{tool} sends a {method} request that modifies a remote resource"),
        )
        .with_confidence(Confidence::Medium)
        .with_fragment(method.as_str()),
        _ => Verdict::allow(),
    }
}

/// Explicit request method, if the invocation names one.
fn request_method<'a>(tool: &str, args: &[&'a str]) -> Option<&'a str> {
    match tool {
        "curl" => option_value(args, &["-X", "--request"]),
        "wget" => option_value(args, &["--method"]),
        // http [METHOD] URL [ITEM...]
        _ => positionals(args, HTTPIE_VALUE_OPTIONS)
            .first()
            .copied()
            .filter(|m| HTTPIE_METHODS.iter().any(|known| known.eq_ignore_ascii_case(m))),
    }
}
