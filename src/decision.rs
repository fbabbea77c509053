//! Verdicts produced by rules and the final analysis result.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Classification of a command. Ordered by severity.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    /// Let the command run.
    #[default]
    Allow,
    /// Ask for confirmation before running.
    Warn,
    /// Refuse to run the command.
    Deny,
}

impl Decision {
    pub fn as_str(self) -> &'static str {
        match self {
            Decision::Allow => "allow",
            Decision::Warn => "warn",
            Decision::Deny => "deny",
        }
    }

    /// Prefix used for this decision in reason lines.
    pub fn marker(self) -> &'static str {
        match self {
            Decision::Allow => "[ALLOW]",
            Decision::Warn => "[WARN]",
            Decision::Deny => "[DENY]",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How sure a rule is about its verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    #[default]
    High,
}

/// Family of rules a verdict came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Filesystem,
    Git,
    Aws,
    Kubernetes,
    Terraform,
    Cloud,
    Database,
    Payment,
    SourceHosting,
    System,
    Http,
    Custom,
}

#[derive(Debug, Error)]
#[error("unknown rule category '{0}'")]
pub struct UnknownCategory(pub String);

impl Category {
    pub const ALL: &'static [Category] = &[
        Category::Filesystem,
        Category::Git,
        Category::Aws,
        Category::Kubernetes,
        Category::Terraform,
        Category::Cloud,
        Category::Database,
        Category::Payment,
        Category::SourceHosting,
        Category::System,
        Category::Http,
        Category::Custom,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Filesystem => "filesystem",
            Category::Git => "git",
            Category::Aws => "aws",
            Category::Kubernetes => "kubernetes",
            Category::Terraform => "terraform",
            Category::Cloud => "cloud",
            Category::Database => "database",
            Category::Payment => "payment",
            Category::SourceHosting => "source-hosting",
            Category::System => "system",
            Category::Http => "http",
            Category::Custom => "custom",
        }
    }

    /// Suffix used in per-category environment variables (`SOURCE_HOSTING`).
    pub fn env_suffix(self) -> String {
        self.as_str().to_ascii_uppercase().replace('-', "_")
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// The outcome of one rule applied to one command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub decision: Decision,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Parts of the command that triggered the rule.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub matched_fragments: Vec<String>,
    pub confidence: Confidence,
}

impl Verdict {
    /// Create an allow verdict.
    pub fn allow() -> Self {
        Self {
            decision: Decision::Allow,
            rule_id: None,
            category: None,
            reason: None,
            matched_fragments: Vec::new(),
            confidence: Confidence::High,
        }
    }

    /// Allow, but without confidence (e.g. the rule itself failed).
    pub fn allow_uncertain() -> Self {
        Self::allow().with_confidence(Confidence::Low)
    }

    /// Create a warn verdict.
    pub fn warn(rule_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::flagged(Decision::Warn, rule_id, reason)
    }

    /// Create a deny verdict.
    pub fn deny(rule_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::flagged(Decision::Deny, rule_id, reason)
    }

    fn flagged(decision: Decision, rule_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            decision,
            rule_id: Some(rule_id.into()),
            reason: Some(reason.into()),
            ..Self::allow()
        }
    }

    pub fn with_fragment(mut self, fragment: impl Into<String>) -> Self {
        self.matched_fragments.push(fragment.into());
        self
    }

    pub fn with_confidence(mut self, confidence: Confidence) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn is_allow(&self) -> bool {
        self.decision == Decision::Allow
    }

    /// Reason text, falling back to the rule id.
    pub fn describe(&self) -> &str {
        self.reason
            .as_deref()
            .or(self.rule_id.as_deref())
            .unwrap_or("flagged")
    }
}

/// Final result of analyzing one command string.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    pub decision: Decision,
    /// Every non-allow verdict, in discovery order.
    pub segment_verdicts: Vec<Verdict>,
    pub reason: String,
    pub original_command: String,
    /// The analyzed prefix when the segment limit cut analysis short.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub truncated_command: Option<String>,
    pub unparseable: bool,
}

impl AnalysisResult {
    pub fn is_deny(&self) -> bool {
        self.decision == Decision::Deny
    }

    pub fn rule_ids(&self) -> Vec<&str> {
        self.segment_verdicts
            .iter()
            .filter_map(|v| v.rule_id.as_deref())
            .collect()
    }
}
