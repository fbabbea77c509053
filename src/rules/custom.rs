//! Custom user-defined rules.

use crate::config::AnalyzerConfig;
use crate::decision::Verdict;

/// Check custom rules against a segment's text. The first match wins.
pub fn check_custom_rules(text: &str, config: &AnalyzerConfig) -> Verdict {
    for rule in &config.custom_rules {
        let Some(found) = rule.regex.find(text) else {
            continue;
        };

        let reason = rule
            .reason
            .clone()
            .unwrap_or_else(|| format!("matched custom rule '{}'", rule.name));
        let verdict = Verdict::warn(format!("custom.{}", rule.name), reason)
            .with_fragment(found.as_str());

        return Verdict {
            decision: rule.action,
            ..verdict
        };
    }

    Verdict::allow()
}
