//! Full vs differential decision policy
//!
//! Pure function of the request state so it can be unit tested and reused
//! offline by the CLI `plan` command.

use crate::config::DecisionConfig;
use redraft_text::change_ratio;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Why a full analysis was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FullReason {
    /// Document was never saved or has never been analyzed
    NewDocument,
    /// Caller asked for full mode
    Requested,
    /// No pending changes but content differs from the last analysis
    NoPendingChanges,
    /// Too many differential runs in a row
    DriftLimit,
    /// Too large a share of paragraphs changed
    LargeChange,
    /// Differential run failed and was retried in full
    DifferentialFailed,
}

/// Analysis scope chosen for a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", content = "reason", rename_all = "snake_case")]
pub enum Decision {
    /// Analyze the whole document
    Full(FullReason),
    /// Analyze a context window around changed paragraphs
    Differential,
    /// Content already analyzed; return the current set
    NoOp,
}

impl Decision {
    /// Whether the engine sees the whole document
    #[inline]
    #[must_use]
    pub fn is_full(&self) -> bool {
        matches!(self, Self::Full(_))
    }
}

/// State the policy decides on
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecisionInput {
    /// Unsaved document or nothing analyzed yet
    pub new_document: bool,
    /// Full mode requested
    pub requested_full: bool,
    /// Unanalyzed ledger records exist
    pub has_pending_changes: bool,
    /// Union of changed paragraph indices across pending records
    pub changed: BTreeSet<usize>,
    /// Paragraphs in the current document
    pub total_paragraphs: usize,
    /// Content and config hash equals the last analyzed one
    pub content_unchanged: bool,
    /// Differential runs since the last full run
    pub consecutive_differential: u32,
}

/// Decision plus the counter value to store if the run succeeds
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Verdict {
    /// Chosen scope
    pub decision: Decision,
    /// Next value of the consecutive-differential counter
    pub consecutive_differential: u32,
    /// Changed/total ratio that was evaluated
    pub change_ratio: f64,
}

/// Decision policy
#[derive(Debug, Clone, Copy, Default)]
pub struct DecisionPolicy {
    config: DecisionConfig,
}

impl DecisionPolicy {
    /// Create policy
    #[must_use]
    pub fn new(config: DecisionConfig) -> Self {
        Self { config }
    }

    /// Decide the scope for one request
    #[must_use]
    pub fn decide(&self, input: &DecisionInput) -> Verdict {
        let ratio = change_ratio(&input.changed, input.total_paragraphs);
        let full = |reason| Verdict {
            decision: Decision::Full(reason),
            consecutive_differential: 0,
            change_ratio: ratio,
        };

        if input.requested_full {
            return full(FullReason::Requested);
        }
        if input.new_document {
            return full(FullReason::NewDocument);
        }
        if !input.has_pending_changes {
            if input.content_unchanged {
                return Verdict {
                    decision: Decision::NoOp,
                    consecutive_differential: input.consecutive_differential,
                    change_ratio: ratio,
                };
            }
            return full(FullReason::NoPendingChanges);
        }

        let next = input.consecutive_differential.saturating_add(1);
        if next > self.config.max_consecutive_differential {
            return full(FullReason::DriftLimit);
        }
        if ratio > self.config.full_analysis_ratio {
            return full(FullReason::LargeChange);
        }

        Verdict {
            decision: Decision::Differential,
            consecutive_differential: next,
            change_ratio: ratio,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(changed: &[usize], total: usize, streak: u32) -> DecisionInput {
        DecisionInput {
            has_pending_changes: true,
            changed: changed.iter().copied().collect(),
            total_paragraphs: total,
            consecutive_differential: streak,
            ..DecisionInput::default()
        }
    }

    #[test]
    fn new_and_requested_are_full() {
        let policy = DecisionPolicy::default();
        let mut input = pending(&[1], 10, 3);
        input.new_document = true;
        assert_eq!(
            policy.decide(&input).decision,
            Decision::Full(FullReason::NewDocument)
        );
        input.requested_full = true;
        let verdict = policy.decide(&input);
        assert_eq!(verdict.decision, Decision::Full(FullReason::Requested));
        assert_eq!(verdict.consecutive_differential, 0);
    }

    #[test]
    fn nothing_pending_is_noop_or_full() {
        let policy = DecisionPolicy::default();
        let mut input = DecisionInput {
            total_paragraphs: 3,
            content_unchanged: true,
            consecutive_differential: 4,
            ..DecisionInput::default()
        };
        let verdict = policy.decide(&input);
        assert_eq!(verdict.decision, Decision::NoOp);
        assert_eq!(verdict.consecutive_differential, 4);

        input.content_unchanged = false;
        assert_eq!(
            policy.decide(&input).decision,
            Decision::Full(FullReason::NoPendingChanges)
        );
    }

    #[test]
    fn small_change_is_differential() {
        let verdict = DecisionPolicy::default().decide(&pending(&[1], 3, 0));
        assert_eq!(verdict.decision, Decision::Differential);
        assert_eq!(verdict.consecutive_differential, 1);
    }

    #[test]
    fn eleventh_request_is_forced_full() {
        let policy = DecisionPolicy::default();
        let mut streak = 0;
        for _ in 0..10 {
            let verdict = policy.decide(&pending(&[0], 10, streak));
            assert_eq!(verdict.decision, Decision::Differential);
            streak = verdict.consecutive_differential;
        }
        assert_eq!(streak, 10);
        let verdict = policy.decide(&pending(&[0], 10, streak));
        assert_eq!(verdict.decision, Decision::Full(FullReason::DriftLimit));
        assert_eq!(verdict.consecutive_differential, 0);
    }

    #[test]
    fn large_change_ratio_is_full() {
        let policy = DecisionPolicy::default();
        let verdict = policy.decide(&pending(&[0, 1, 2, 3, 4, 5, 6], 10, 2));
        assert_eq!(verdict.decision, Decision::Full(FullReason::LargeChange));
        assert!((verdict.change_ratio - 0.7).abs() < 1e-9);
        assert_eq!(verdict.consecutive_differential, 0);

        let at_threshold = policy.decide(&pending(&[0, 1, 2, 3, 4, 5], 10, 2));
        assert_eq!(at_threshold.decision, Decision::Differential);
    }
}
