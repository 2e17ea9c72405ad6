//! Redraft Text
//!
//! Paragraph-granularity text primitives for differential analysis.
//!
//! # Core Concepts
//!
//! - [`Paragraph`]: trimmed, non-empty block of text with byte offsets
//! - [`ParagraphChange`]: positional change between two document versions
//! - [`ContextWindow`]: changed paragraphs plus neighbors sent for analysis
//! - [`ContentHash`]: 32-byte Blake3 hash for cache keys
//! - [`Fingerprint`]: 32-bit rolling hash for cheap paragraph equality
//!
//! # Example
//!
//! ```rust
//! use redraft_text::{detect_changes, segment, changed_indices, ContextWindowBuilder};
//!
//! let before = segment("A.\n\nB.\n\nC.");
//! let after = segment("A.\n\nB, revised.\n\nC.");
//! let changes = detect_changes(&before, &after, chrono::Utc::now());
//!
//! let window = ContextWindowBuilder::default().build(&after, &changed_indices(&changes));
//! assert_eq!(window.changed_indices().into_iter().collect::<Vec<_>>(), vec![1]);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod change;
mod hash;
mod paragraph;
mod window;

pub use change::{change_ratio, changed_indices, detect_changes, ChangeType, ParagraphChange};
pub use hash::{ContentHash, ContentHasher, Fingerprint, HashError};
pub use paragraph::{paragraph_at, segment, Paragraph};
pub use window::{
    estimate_tokens, ContextWindow, ContextWindowBuilder, ContextWindowEntry, EntryKind,
    TokenSavings, WindowConfig,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
