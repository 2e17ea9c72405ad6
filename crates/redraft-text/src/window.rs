//! Context windows for differential analysis
//!
//! A [`ContextWindow`] is the bounded slice of a document sent for analysis
//! instead of the whole text: every changed paragraph, its neighbors within
//! an adaptive radius, and a head/tail summary when the slice does not cover
//! the document.

use crate::paragraph::Paragraph;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Approximate characters per model token
const CHARS_PER_TOKEN: usize = 4;

/// Window sizing knobs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Neighbor radius for small documents
    pub base_radius: usize,
    /// Above this many paragraphs the radius drops to 1
    pub medium_document_paragraphs: usize,
    /// Above this many paragraphs the radius drops to 0
    pub large_document_paragraphs: usize,
    /// Characters kept from each end of the document for the summary
    pub summary_excerpt_chars: usize,
}

impl WindowConfig {
    /// Radius to use for a document of `total_paragraphs`
    #[inline]
    #[must_use]
    pub fn effective_radius(&self, total_paragraphs: usize) -> usize {
        if total_paragraphs > self.large_document_paragraphs {
            0
        } else if total_paragraphs > self.medium_document_paragraphs {
            1.min(self.base_radius)
        } else {
            self.base_radius
        }
    }

    /// With base radius
    #[inline]
    #[must_use]
    pub fn with_base_radius(mut self, radius: usize) -> Self {
        self.base_radius = radius;
        self
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            base_radius: 3,
            medium_document_paragraphs: 12,
            large_document_paragraphs: 20,
            summary_excerpt_chars: 200,
        }
    }
}

/// Why an entry is in the window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// Paragraph that changed
    Changed,
    /// Unchanged neighbor included for context
    Context,
    /// Head/tail excerpt of the whole document
    Summary,
}

/// One entry of a context window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextWindowEntry {
    /// Paragraph index (0 for the summary)
    pub index: usize,
    /// Entry text
    pub text: String,
    /// Whether the paragraph changed
    pub is_changed: bool,
    /// Entry classification
    pub kind: EntryKind,
    /// Start offset in the current document
    pub start_offset: usize,
    /// End offset in the current document
    pub end_offset: usize,
}

/// Estimated token cost of a window against full-document analysis
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TokenSavings {
    /// Tokens a full analysis would send
    pub full_tokens: usize,
    /// Tokens the window sends
    pub window_tokens: usize,
    /// `full_tokens - window_tokens`, floored at zero
    pub saved_tokens: usize,
    /// `saved_tokens / full_tokens`
    pub savings_ratio: f64,
}

impl TokenSavings {
    /// Compare window cost against full cost
    #[must_use]
    pub fn between(full_tokens: usize, window_tokens: usize) -> Self {
        let saved_tokens = full_tokens.saturating_sub(window_tokens);
        let savings_ratio = if full_tokens == 0 {
            0.0
        } else {
            saved_tokens as f64 / full_tokens as f64
        };
        Self {
            full_tokens,
            window_tokens,
            saved_tokens,
            savings_ratio,
        }
    }
}

/// Materialized context window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextWindow {
    /// Paragraph entries in ascending index order
    pub entries: Vec<ContextWindowEntry>,
    /// Document summary, present when entries don't cover every paragraph
    pub summary: Option<ContextWindowEntry>,
    /// Radius that was applied
    pub radius: usize,
    /// Paragraph count of the document
    pub total_paragraphs: usize,
    /// Cost estimate
    pub savings: TokenSavings,
}

impl ContextWindow {
    /// Window with nothing to analyze
    #[must_use]
    pub fn empty(total_paragraphs: usize) -> Self {
        Self {
            entries: Vec::new(),
            summary: None,
            radius: 0,
            total_paragraphs,
            savings: TokenSavings::default(),
        }
    }

    /// True when no paragraph needs analysis
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Indices flagged as changed
    #[must_use]
    pub fn changed_indices(&self) -> BTreeSet<usize> {
        self.entries
            .iter()
            .filter(|e| e.is_changed)
            .map(|e| e.index)
            .collect()
    }

    /// Whether every paragraph of the document is in the window
    #[inline]
    #[must_use]
    pub fn covers_document(&self) -> bool {
        self.entries.len() == self.total_paragraphs
    }
}

/// Builds [`ContextWindow`]s from changed paragraph indices
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextWindowBuilder {
    config: WindowConfig,
}

impl ContextWindowBuilder {
    /// Create builder with sizing config
    #[inline]
    #[must_use]
    pub fn new(config: WindowConfig) -> Self {
        Self { config }
    }

    /// Get sizing config
    #[inline]
    #[must_use]
    pub fn config(&self) -> &WindowConfig {
        &self.config
    }

    /// Build a window around `changed` indices of `paragraphs`
    ///
    /// Changed indices past the end of the document (deleted tail slots)
    /// contribute only their in-range neighbors.
    #[must_use]
    pub fn build(&self, paragraphs: &[Paragraph], changed: &BTreeSet<usize>) -> ContextWindow {
        let total = paragraphs.len();
        if changed.is_empty() || total == 0 {
            return ContextWindow::empty(total);
        }

        let radius = self.config.effective_radius(total);
        let mut included = BTreeSet::new();
        for &index in changed {
            let low = index.saturating_sub(radius);
            let high = index.saturating_add(radius).min(total - 1);
            included.extend(low..=high);
        }

        let entries: Vec<ContextWindowEntry> = included
            .into_iter()
            .filter_map(|index| paragraphs.get(index))
            .map(|p| {
                let is_changed = changed.contains(&p.index);
                ContextWindowEntry {
                    index: p.index,
                    text: p.text.clone(),
                    is_changed,
                    kind: if is_changed {
                        EntryKind::Changed
                    } else {
                        EntryKind::Context
                    },
                    start_offset: p.start_offset,
                    end_offset: p.end_offset,
                }
            })
            .collect();

        if entries.is_empty() {
            return ContextWindow::empty(total);
        }

        let summary = (entries.len() < total).then(|| self.summarize(paragraphs));

        let full_tokens = paragraphs.iter().map(|p| estimate_tokens(&p.text)).sum();
        let window_tokens = entries
            .iter()
            .chain(summary.as_ref())
            .map(|e| estimate_tokens(&e.text))
            .sum();

        ContextWindow {
            entries,
            summary,
            radius,
            total_paragraphs: total,
            savings: TokenSavings::between(full_tokens, window_tokens),
        }
    }

    /// Head and tail excerpt of the document
    fn summarize(&self, paragraphs: &[Paragraph]) -> ContextWindowEntry {
        let joined = paragraphs
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let cap = self.config.summary_excerpt_chars;
        let char_count = joined.chars().count();

        let text = if char_count <= cap * 2 {
            joined
        } else {
            let head: String = joined.chars().take(cap).collect();
            let tail: String = joined.chars().skip(char_count - cap).collect();
            format!("{} [...] {}", head.trim_end(), tail.trim_start())
        };

        ContextWindowEntry {
            index: 0,
            text,
            is_changed: false,
            kind: EntryKind::Summary,
            start_offset: 0,
            end_offset: paragraphs.last().map_or(0, |p| p.end_offset),
        }
    }
}

/// Rough token estimate for `text`
#[inline]
#[must_use]
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paragraph::segment;
    use pretty_assertions::assert_eq;

    fn document(paragraphs: usize) -> String {
        (0..paragraphs)
            .map(|i| format!("Paragraph number {i} has a sentence."))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    fn set(indices: &[usize]) -> BTreeSet<usize> {
        indices.iter().copied().collect()
    }

    #[test]
    fn adaptive_radius_thresholds() {
        let config = WindowConfig::default();
        assert_eq!(config.effective_radius(3), 3);
        assert_eq!(config.effective_radius(12), 3);
        assert_eq!(config.effective_radius(13), 1);
        assert_eq!(config.effective_radius(20), 1);
        assert_eq!(config.effective_radius(21), 0);
    }

    #[test]
    fn empty_change_set_gives_empty_window() {
        let paragraphs = segment(&document(5));
        let window = ContextWindowBuilder::default().build(&paragraphs, &BTreeSet::new());
        assert!(window.is_empty());
        assert!(window.summary.is_none());
    }

    #[test]
    fn small_document_is_fully_covered() {
        let paragraphs = segment("A.\n\nB.\n\nC.");
        let window = ContextWindowBuilder::default().build(&paragraphs, &set(&[1]));

        let indices: Vec<_> = window.entries.iter().map(|e| e.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        let flags: Vec<_> = window.entries.iter().map(|e| e.is_changed).collect();
        assert_eq!(flags, vec![false, true, false]);
        assert_eq!(window.entries[1].kind, EntryKind::Changed);
        assert!(window.covers_document());
        assert!(window.summary.is_none());
    }

    #[test]
    fn large_document_collapses_to_changed_only() {
        let paragraphs = segment(&document(25));
        let window = ContextWindowBuilder::default().build(&paragraphs, &set(&[4, 17]));

        assert_eq!(window.radius, 0);
        let indices: Vec<_> = window.entries.iter().map(|e| e.index).collect();
        assert_eq!(indices, vec![4, 17]);
        assert!(window.entries.iter().all(|e| e.is_changed));
        assert!(window.summary.is_some());
        assert!(window.savings.saved_tokens > 0);
    }

    #[test]
    fn medium_document_uses_radius_one() {
        let paragraphs = segment(&document(15));
        let window = ContextWindowBuilder::default().build(&paragraphs, &set(&[0, 7]));

        let indices: Vec<_> = window.entries.iter().map(|e| e.index).collect();
        assert_eq!(indices, vec![0, 1, 6, 7, 8]);
        assert_eq!(window.changed_indices(), set(&[0, 7]));
    }

    #[test]
    fn overlapping_neighborhoods_are_unioned() {
        let paragraphs = segment(&document(10));
        let window = ContextWindowBuilder::new(WindowConfig::default().with_base_radius(1))
            .build(&paragraphs, &set(&[3, 4]));

        let indices: Vec<_> = window.entries.iter().map(|e| e.index).collect();
        assert_eq!(indices, vec![2, 3, 4, 5]);
    }

    #[test]
    fn deleted_tail_index_contributes_neighbors() {
        let paragraphs = segment(&document(4));
        let window = ContextWindowBuilder::new(WindowConfig::default().with_base_radius(1))
            .build(&paragraphs, &set(&[4]));

        let indices: Vec<_> = window.entries.iter().map(|e| e.index).collect();
        assert_eq!(indices, vec![3]);
        assert!(window.changed_indices().is_empty());
    }

    #[test]
    fn summary_keeps_head_and_tail() {
        let text = format!("{}\n\n{}", "h".repeat(300), "t".repeat(300));
        let mut paragraphs = segment(&text);
        paragraphs.extend(segment(&document(30)).into_iter().map(|mut p| {
            p.index += 2;
            p
        }));
        let window = ContextWindowBuilder::default().build(&paragraphs, &set(&[5]));

        let summary = window.summary.expect("summary for partial window");
        assert_eq!(summary.kind, EntryKind::Summary);
        assert!(summary.text.starts_with(&"h".repeat(200)));
        assert!(summary.text.contains("[...]"));
        assert!(summary.text.chars().count() < 420);
    }

    #[test]
    fn token_estimate_rounds_up() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abc"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
        let savings = TokenSavings::between(100, 25);
        assert_eq!(savings.saved_tokens, 75);
        assert!((savings.savings_ratio - 0.75).abs() < f64::EPSILON);
    }
}
