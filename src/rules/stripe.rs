//! Stripe CLI analysis.

use super::{Invocation, has_long_flag, positionals};
use crate::config::AnalyzerConfig;
use crate::decision::Verdict;

const VALUE_OPTIONS: &[&str] = &[
    "--api-key",
    "-d",
    "--data",
    "-e",
    "--expand",
    "-p",
    "--project-name",
    "--stripe-account",
    "--stripe-version",
];

pub fn analyze_stripe(invocation: &Invocation<'_>, _config: &AnalyzerConfig) -> Verdict {
    let args = invocation.args();
    let words = positionals(&args, VALUE_OPTIONS);
    let live = has_long_flag(&args, "--live");

    match words.as_slice() {
        ["delete", ..] => Verdict::deny(
            "stripe.delete",
            "stripe delete removes a Stripe object through the API",
        ),
        [resource, "delete", ..] => Verdict::deny(
            "stripe.delete",
            format!("stripe {resource} delete removes Stripe objects"),
        ),
        ["post", ..] if live => Verdict::deny(
            "stripe.live_mutation",
            "stripe post --live changes live-mode data",
        ),
        [resource, op @ ("create" | "update" | "cancel"), ..] if live => Verdict::deny(
            "stripe.live_mutation",
            format!("stripe {resource} {op} --live changes live-mode data"),
        ),
        ["refunds", "create", ..] => Verdict::warn(
            "stripe.refund",
            "stripe refunds create moves money back to a customer",
        ),
        [resource, "cancel", ..] => Verdict::warn(
            "stripe.cancel",
            format!("stripe {resource} cancel cancels a Stripe object"),
        ),
        ["post", ..] => Verdict::warn(
            "stripe.post",
            "stripe post sends a raw mutating API request",
        ),
        _ => Verdict::allow(),
    }
}
