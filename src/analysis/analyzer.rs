//! Recursive analysis of a command string.

use tracing::debug;

use super::aggregate::aggregate;
use crate::config::AnalyzerConfig;
use crate::decision::{AnalysisResult, Decision, Verdict};
use crate::rules::dispatch;
use crate::shell::{
    CommandSegment, ExtractedCommand, NestedKind, detect_unparseable, extract_embedded,
    extract_nested, join_segments, split_commands, strip_wrappers, tokenize,
};

/// Analyze a full command string and decide whether it may run.
///
/// Never fails: text that can't be understood is allowed or flagged, never
/// rejected with an error.
pub fn analyze_command(command: &str, config: &AnalyzerConfig) -> AnalysisResult {
    let unparseable = detect_unparseable(command);

    let mut analyzer = Analyzer::new(config);
    let truncated_command = analyzer.analyze_text(command, 0, &[]);
    let outcome = aggregate(&analyzer.verdicts, unparseable, config);

    debug!(
        decision = %outcome.decision,
        verdicts = analyzer.verdicts.len(),
        unparseable = ?unparseable,
        "analyzed command"
    );

    AnalysisResult {
        decision: outcome.decision,
        segment_verdicts: analyzer.verdicts,
        reason: outcome.reason,
        original_command: command.to_string(),
        truncated_command,
        unparseable: unparseable.is_some(),
    }
}

struct Analyzer<'a> {
    config: &'a AnalyzerConfig,
    /// Non-allow verdicts, in discovery order.
    verdicts: Vec<Verdict>,
}

impl<'a> Analyzer<'a> {
    fn new(config: &'a AnalyzerConfig) -> Self {
        Self {
            config,
            verdicts: Vec::new(),
        }
    }

    /// Analyze every segment of `text` at `depth`.
    ///
    /// Returns the analyzed prefix when the segment limit cut the text short.
    fn analyze_text(&mut self, text: &str, depth: usize, labels: &[String]) -> Option<String> {
        let (segments, truncated) = self.limited_segments(text, labels);
        for segment in &segments {
            self.analyze_segment(&segment.text, depth, labels);
        }
        truncated
    }

    /// Dispatch a segment, then follow the commands nested inside it.
    fn analyze_segment(&mut self, text: &str, depth: usize, labels: &[String]) {
        let stripped = strip_wrappers(&tokenize(text));
        let verdict = dispatch(text, &stripped, self.config);
        self.record(verdict, labels);

        let mut nested = extract_nested(&stripped);
        nested.extend(extract_embedded(text));
        for command in &nested {
            self.follow(command, depth, labels);
        }
    }

    /// Analyze a command extracted at `depth`.
    fn follow(&mut self, command: &ExtractedCommand, depth: usize, labels: &[String]) {
        let mut labels = labels.to_vec();
        labels.push(command.wrapper_label.clone());

        match command.kind {
            NestedKind::Shell if depth + 1 < self.config.max_recursion_depth => {
                self.analyze_text(&command.text, depth + 1, &labels);
            }
            NestedKind::Shell => {
                // Recursion bound reached: segments are still checked on their own
                let (segments, _) = self.limited_segments(&command.text, &labels);
                for segment in &segments {
                    self.dispatch_only(&segment.text, &labels);
                }
            }
            NestedKind::Interpreter => self.dispatch_only(&command.text, &labels),
            NestedKind::XargsLike | NestedKind::FindExec => {
                self.dispatch_only(&command.text, &labels);
                // `xargs sh -c '...'`: the template may run its own nested commands
                let stripped = strip_wrappers(&tokenize(&command.text));
                for inner in extract_nested(&stripped) {
                    if depth + 1 < self.config.max_recursion_depth {
                        self.follow(&inner, depth + 1, &labels);
                    } else {
                        let mut inner_labels = labels.clone();
                        inner_labels.push(inner.wrapper_label.clone());
                        self.dispatch_only(&inner.text, &inner_labels);
                    }
                }
            }
        }
    }

    fn dispatch_only(&mut self, text: &str, labels: &[String]) {
        let stripped = strip_wrappers(&tokenize(text));
        let verdict = dispatch(text, &stripped, self.config);
        self.record(verdict, labels);
    }

    /// Split `text`, keeping at most `max_segments` segments.
    ///
    /// Going over the limit records a `too-many-segments` warning.
    fn limited_segments(
        &mut self,
        text: &str,
        labels: &[String],
    ) -> (Vec<CommandSegment>, Option<String>) {
        let mut segments = split_commands(text);
        let max = self.config.max_segments;
        if segments.len() <= max {
            return (segments, None);
        }

        let total = segments.len();
        segments.truncate(max);
        debug!(total, max, "segment limit reached, truncating analysis");
        self.record(
            Verdict::warn(
                "too-many-segments",
                format!("command has {total} segments; only the first {max} were analyzed"),
            ),
            labels,
        );
        let analyzed = join_segments(&segments);
        (segments, Some(analyzed))
    }

    fn record(&mut self, mut verdict: Verdict, labels: &[String]) {
        if verdict.decision == Decision::Allow {
            return;
        }
        if !labels.is_empty() {
            let via: Vec<String> = labels.iter().map(|l| format!("[via {l}]")).collect();
            verdict.reason = Some(format!("{} {}", via.join(" "), verdict.describe()));
        }
        self.verdicts.push(verdict);
    }
}
