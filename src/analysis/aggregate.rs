//! Combine verdicts into the final decision.

use crate::config::AnalyzerConfig;
use crate::decision::{Decision, Verdict};
use crate::shell::UnparseableConstruct;

pub const SAFE_REASON: &str = "No dangerous operations detected";

/// Final decision and the human-readable reason behind it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregate {
    pub decision: Decision,
    pub reason: String,
}

/// Merge every verdict and the unparseable flag into one decision.
///
/// Deny beats warn beats allow. An unparseable construct counts as a deny in
/// strict mode and as a warn otherwise. Warn-only mode caps the result at
/// warn; bypass forces allow. Both overrides keep the original reasons and
/// note what they changed.
pub fn aggregate(
    verdicts: &[Verdict],
    unparseable: Option<UnparseableConstruct>,
    config: &AnalyzerConfig,
) -> Aggregate {
    let worst = verdicts
        .iter()
        .map(|v| v.decision)
        .max()
        .unwrap_or_default();

    let decision = match (worst, unparseable) {
        (Decision::Deny, _) => Decision::Deny,
        (_, Some(_)) if config.strict => Decision::Deny,
        (Decision::Warn, _) => Decision::Warn,
        (_, Some(_)) => Decision::Warn,
        _ => Decision::Allow,
    };

    let mut lines: Vec<String> = verdicts
        .iter()
        .filter(|v| !v.is_allow())
        .map(|v| format!("{} {}", v.decision.marker(), v.describe()))
        .collect();
    if let Some(construct) = unparseable {
        lines.push(unparseable_note(construct, config.strict));
    }
    if lines.is_empty() {
        lines.push(SAFE_REASON.to_string());
    }

    let mut result = Aggregate {
        decision,
        reason: lines.join("\n"),
    };

    if config.warn_only && result.decision == Decision::Deny {
        result.decision = Decision::Warn;
        result
            .reason
            .push_str("\n(warn-only mode: would have been denied)");
    }
    if config.bypass && result.decision != Decision::Allow {
        result
            .reason
            .push_str(&format!("\n(bypass: would have been {})", decision));
        result.decision = Decision::Allow;
    }

    result
}

fn unparseable_note(construct: UnparseableConstruct, strict: bool) -> String {
    let marker = if strict {
        Decision::Deny.marker()
    } else {
        Decision::Warn.marker()
    };
    format!(
        "{marker} command contains {} and can't be fully analyzed",
        construct.description()
    )
}
