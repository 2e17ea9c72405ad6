//! Positional paragraph change detection
//!
//! Compares two paragraph sequences index by index. This is deliberately not
//! an alignment diff: inserting a paragraph near the top reports every later
//! index as modified, and the periodic forced full analysis absorbs that cost.

use crate::hash::Fingerprint;
use crate::paragraph::Paragraph;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// How a paragraph slot changed between two versions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    /// Slot exists only in the new version
    Added,
    /// Slot exists in both versions with different text
    Modified,
    /// Slot exists only in the old version
    Deleted,
}

/// One changed paragraph slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParagraphChange {
    /// Slot index
    pub paragraph_index: usize,
    /// Fingerprint of the old text (`EMPTY` when added)
    pub old_hash: Fingerprint,
    /// Fingerprint of the new text (`EMPTY` when deleted)
    pub new_hash: Fingerprint,
    /// Old trimmed text
    pub old_text: String,
    /// New trimmed text
    pub new_text: String,
    /// Classification
    pub change_type: ChangeType,
    /// Start offset in the authoritative version
    pub start_offset: usize,
    /// End offset in the authoritative version
    pub end_offset: usize,
    /// When the change was detected
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

impl ParagraphChange {
    /// Whether offsets refer to the new document
    ///
    /// Deleted paragraphs only have positions in the old document.
    #[inline]
    #[must_use]
    pub fn offsets_in_new(&self) -> bool {
        !matches!(self.change_type, ChangeType::Deleted)
    }
}

/// Detect per-paragraph changes between two segmentations of one document
///
/// Walks both sequences up to the longer length. Offsets come from the new
/// side for added and modified slots, and from the old side for deleted ones.
#[must_use]
pub fn detect_changes(
    old: &[Paragraph],
    new: &[Paragraph],
    at: DateTime<Utc>,
) -> Vec<ParagraphChange> {
    let len = old.len().max(new.len());
    let mut changes = Vec::new();

    for index in 0..len {
        let before = old.get(index);
        let after = new.get(index);

        let old_text = before.map_or("", |p| p.text.trim());
        let new_text = after.map_or("", |p| p.text.trim());
        if old_text == new_text {
            continue;
        }

        let (change_type, anchor) = match (before, after) {
            (None, Some(p)) => (ChangeType::Added, p),
            (Some(p), None) => (ChangeType::Deleted, p),
            (Some(_), Some(p)) => (ChangeType::Modified, p),
            (None, None) => continue,
        };

        changes.push(ParagraphChange {
            paragraph_index: index,
            old_hash: Fingerprint::of(old_text),
            new_hash: Fingerprint::of(new_text),
            old_text: old_text.to_string(),
            new_text: new_text.to_string(),
            change_type,
            start_offset: anchor.start_offset,
            end_offset: anchor.end_offset,
            timestamp: at,
        });
    }

    changes
}

/// Distinct paragraph indices touched by `changes`
pub fn changed_indices<'a, I>(changes: I) -> BTreeSet<usize>
where
    I: IntoIterator<Item = &'a ParagraphChange>,
{
    changes.into_iter().map(|c| c.paragraph_index).collect()
}

/// Fraction of the document's paragraphs touched by `changed`
///
/// Indices past the end (deleted tail slots) still count: a document that
/// lost most of its paragraphs changed a lot. The result is clamped to 1.0.
#[must_use]
pub fn change_ratio(changed: &BTreeSet<usize>, total_paragraphs: usize) -> f64 {
    if changed.is_empty() {
        return 0.0;
    }
    if total_paragraphs == 0 {
        return 1.0;
    }
    (changed.len() as f64 / total_paragraphs as f64).min(1.0)
}
