//! Paragraph segmentation
//!
//! Splits raw document text into an ordered [`Paragraph`] sequence on
//! blank-line boundaries. Offsets are byte offsets into the text that was
//! segmented and are never persisted.

use crate::hash::Fingerprint;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static BLANK_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n[ \t\r\f\v]*\n").expect("valid blank-line pattern"));

/// A trimmed, non-empty paragraph of the current document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paragraph {
    /// Position in the paragraph sequence
    pub index: usize,
    /// Trimmed paragraph text
    pub text: String,
    /// Byte offset of the first character
    pub start_offset: usize,
    /// Byte offset one past the last character
    pub end_offset: usize,
}

impl Paragraph {
    /// Fingerprint of the normalized text
    #[inline]
    #[must_use]
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of(&self.text)
    }

    /// Whether `offset` falls inside this paragraph
    #[inline]
    #[must_use]
    pub fn contains(&self, offset: usize) -> bool {
        offset >= self.start_offset && offset < self.end_offset
    }

    /// Byte length of the paragraph
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.end_offset - self.start_offset
    }

    /// Always false for segmenter output
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start_offset == self.end_offset
    }
}

/// Split `content` into paragraphs
///
/// Each piece is trimmed and empty pieces are dropped. Offsets are recovered
/// by searching forward from the end of the previous paragraph for the
/// trimmed text, so leading or trailing whitespace never shifts positions.
#[must_use]
pub fn segment(content: &str) -> Vec<Paragraph> {
    let mut paragraphs = Vec::new();
    let mut cursor = 0;

    for raw in BLANK_LINE.split(content) {
        let text = raw.trim();
        if text.is_empty() {
            continue;
        }

        let start = content[cursor..]
            .find(text)
            .map_or(cursor, |pos| cursor + pos);
        let end = start + text.len();

        paragraphs.push(Paragraph {
            index: paragraphs.len(),
            text: text.to_string(),
            start_offset: start,
            end_offset: end,
        });
        cursor = end;
    }

    paragraphs
}

/// Index of the paragraph containing `offset`, if any
#[must_use]
pub fn paragraph_at(paragraphs: &[Paragraph], offset: usize) -> Option<usize> {
    let pos = paragraphs.partition_point(|p| p.end_offset <= offset);
    paragraphs
        .get(pos)
        .filter(|p| p.contains(offset))
        .map(|p| p.index)
}
