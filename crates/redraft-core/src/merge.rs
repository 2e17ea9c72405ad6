//! Suggestion merging
//!
//! After a differential analysis the previous suggestion set and the fresh
//! batch are combined:
//!
//! 1. previous suggestions anchored in changed paragraphs are dropped, the
//!    rest are shifted to their paragraph's new position
//! 2. the fresh batch is appended
//! 3. anything whose offsets no longer point at its original text is dropped
//! 4. duplicates by `(original_text, suggested_text, type)` are removed,
//!    keeping the first occurrence
//! 5. the set is sorted by start offset

use crate::types::Suggestion;
use redraft_text::{paragraph_at, Paragraph};
use std::collections::{BTreeSet, HashSet};
use tracing::debug;

/// Paragraph layout before and after an edit
#[derive(Debug, Clone, Copy)]
pub struct Rebase<'a> {
    /// Paragraphs the existing suggestions were computed against, if known
    pub old: Option<&'a [Paragraph]>,
    /// Current paragraphs
    pub new: &'a [Paragraph],
    /// Indices that changed
    pub changed: &'a BTreeSet<usize>,
}

impl Rebase<'_> {
    /// Keep suggestions in unchanged paragraphs, shifted to the new layout
    #[must_use]
    pub fn carry_over(&self, existing: Vec<Suggestion>) -> Vec<Suggestion> {
        existing
            .into_iter()
            .filter_map(|s| self.carry(s))
            .collect()
    }

    fn carry(&self, mut suggestion: Suggestion) -> Option<Suggestion> {
        let Some(old) = self.old else {
            // Without the old layout the offsets can only be checked in place.
            return match paragraph_at(self.new, suggestion.start_offset) {
                Some(index) if self.changed.contains(&index) => None,
                _ => Some(suggestion),
            };
        };

        let Some(index) = paragraph_at(old, suggestion.start_offset) else {
            return Some(suggestion);
        };
        if self.changed.contains(&index) {
            return None;
        }
        let before = old.get(index)?;
        let after = self.new.get(index)?;
        let start = rebase_offset(suggestion.start_offset, before, after)?;
        suggestion.move_to(start);
        Some(suggestion)
    }
}

fn rebase_offset(offset: usize, before: &Paragraph, after: &Paragraph) -> Option<usize> {
    let within = offset.checked_sub(before.start_offset)?;
    after.start_offset.checked_add(within)
}

/// Remove duplicates by `(original_text, suggested_text, type)`, keeping the first
#[must_use]
pub fn dedupe(suggestions: Vec<Suggestion>) -> Vec<Suggestion> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(suggestions.len());
    for s in suggestions {
        let key = (s.original_text.clone(), s.suggested_text.clone(), s.kind);
        if seen.insert(key) {
            out.push(s);
        }
    }
    out
}

/// Drop suggestions whose offsets no longer point at their original text
#[must_use]
pub fn revalidate(suggestions: Vec<Suggestion>, content: &str) -> Vec<Suggestion> {
    let before = suggestions.len();
    let valid: Vec<_> = suggestions
        .into_iter()
        .filter(|s| s.anchors_in(content))
        .collect();
    if valid.len() < before {
        debug!(dropped = before - valid.len(), "dropped stale suggestions");
    }
    valid
}

/// Sort by start offset; ties keep their relative order
pub fn sort_by_position(suggestions: &mut [Suggestion]) {
    suggestions.sort_by_key(|s| (s.start_offset, s.end_offset));
}

/// Combine carried-over and fresh suggestions into the final set
#[must_use]
pub fn merge(carried: Vec<Suggestion>, fresh: Vec<Suggestion>, content: &str) -> Vec<Suggestion> {
    let mut combined = carried;
    combined.extend(fresh);
    let mut merged = dedupe(revalidate(combined, content));
    sort_by_position(&mut merged);
    merged
}

/// Find `original_text` again after an edit moved it
///
/// Picks the occurrence nearest to the old start offset.
#[must_use]
pub fn relocate(suggestion: &Suggestion, content: &str) -> Option<usize> {
    if suggestion.original_text.is_empty() {
        return None;
    }
    content
        .match_indices(suggestion.original_text.as_str())
        .map(|(start, _)| start)
        .min_by_key(|start| start.abs_diff(suggestion.start_offset))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SuggestionType;
    use pretty_assertions::assert_eq;
    use redraft_text::segment;

    fn at(content: &str, needle: &str, kind: SuggestionType) -> Suggestion {
        let start = content.find(needle).unwrap();
        Suggestion::new(kind, needle, format!("{needle}!"), start)
    }

    fn texts(suggestions: &[Suggestion]) -> Vec<&str> {
        suggestions.iter().map(|s| s.original_text.as_str()).collect()
    }

    #[test]
    fn dedupe_keeps_first() {
        let a = Suggestion::new(SuggestionType::Grammar, "is", "are", 0);
        let b = Suggestion::new(SuggestionType::Grammar, "is", "are", 20);
        let c = Suggestion::new(SuggestionType::Spelling, "is", "are", 20);
        let out = dedupe(vec![a.clone(), b, c.clone()]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].id, a.id);
        assert_eq!(out[1].id, c.id);
    }

    #[test]
    fn revalidate_drops_stale() {
        let content = "The cat sat.";
        let good = at(content, "cat", SuggestionType::Spelling);
        let mut stale = good.clone();
        stale.move_to(0);
        assert_eq!(texts(&revalidate(vec![good, stale], content)), vec!["cat"]);
    }

    #[test]
    fn carry_over_shifts_unchanged_paragraphs() {
        let before = "Short.\n\nThe dog barks.";
        let after = "A much longer first paragraph.\n\nThe dog barks.";
        let old = segment(before);
        let new = segment(after);
        let changed = BTreeSet::from([0]);

        let in_changed = at(before, "Short", SuggestionType::Clarity);
        let in_unchanged = at(before, "dog", SuggestionType::Spelling);

        let carried = Rebase {
            old: Some(&old),
            new: &new,
            changed: &changed,
        }
        .carry_over(vec![in_changed, in_unchanged]);

        assert_eq!(texts(&carried), vec!["dog"]);
        assert!(carried[0].anchors_in(after));
    }

    #[test]
    fn carry_over_without_old_layout_checks_in_place() {
        let content = "One.\n\nTwo words.";
        let new = segment(content);
        let changed = BTreeSet::from([1]);
        let carried = Rebase {
            old: None,
            new: &new,
            changed: &changed,
        }
        .carry_over(vec![
            at(content, "One", SuggestionType::Tone),
            at(content, "words", SuggestionType::Tone),
        ]);
        assert_eq!(texts(&carried), vec!["One"]);
    }

    #[test]
    fn merge_prefers_existing_and_sorts() {
        let content = "Alpha beta gamma.";
        let existing = at(content, "gamma", SuggestionType::Vocabulary);
        let duplicate = at(content, "gamma", SuggestionType::Vocabulary);
        let fresh = at(content, "Alpha", SuggestionType::Vocabulary);

        let merged = merge(vec![existing.clone()], vec![duplicate, fresh], content);
        assert_eq!(texts(&merged), vec!["Alpha", "gamma"]);
        assert_eq!(merged[1].id, existing.id);
    }

    #[test]
    fn relocate_picks_nearest_occurrence() {
        let mut s = Suggestion::new(SuggestionType::Spelling, "teh", "the", 0);
        s.move_to(11);
        let content = "teh start, teh middle, teh end";
        assert_eq!(relocate(&s, content), Some(11));
        s.move_to(25);
        assert_eq!(relocate(&s, content), Some(23));
        assert_eq!(relocate(&s, "nothing here"), None);
    }
}
