//! External analysis engine contract
//!
//! The engine is the expensive part: it turns text into suggestions. Redraft
//! never analyzes text itself; it decides *what* to send and what to do
//! with the answer.

use crate::error::EngineError;
use crate::tracker::ModifiedArea;
use crate::types::{AnalysisId, ParagraphTag, Suggestion, WritingConfig};
use async_trait::async_trait;
use redraft_text::{ContentHash, ContentHasher, ContextWindowEntry, HashError};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::sync::Arc;

/// What the engine is asked to read
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum EngineScope {
    /// The whole document
    Full {
        /// Document text
        content: String,
    },
    /// Changed paragraphs plus context
    Window {
        /// Window paragraphs in document order
        entries: Vec<ContextWindowEntry>,
        /// Head/tail excerpt when the window is partial
        summary: Option<String>,
    },
}

impl EngineScope {
    /// Short label for logs and cache metadata
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Full { .. } => "full",
            Self::Window { .. } => "window",
        }
    }

    /// Text the engine will read
    #[must_use]
    pub fn text_len(&self) -> usize {
        match self {
            Self::Full { content } => content.len(),
            Self::Window { entries, summary } => {
                entries.iter().map(|e| e.text.len()).sum::<usize>()
                    + summary.as_ref().map_or(0, String::len)
            }
        }
    }

    /// Cache key over scope and writing preferences
    ///
    /// Identical text analyzed with different preferences must not share
    /// results, so the config is part of the key. Window entries contribute
    /// their document offsets as well, since cached suggestions carry
    /// absolute offsets.
    ///
    /// # Errors
    /// Returns `HashError` if the config cannot be serialized
    pub fn cache_key(&self, config: &WritingConfig) -> Result<ContentHash, HashError> {
        let mut hasher: ContentHasher = ContentHash::builder().text(self.label());
        match self {
            Self::Full { content } => hasher = hasher.text(content),
            Self::Window { entries, summary } => {
                for entry in entries {
                    hasher = hasher
                        .part(&(entry.index as u64).to_le_bytes())
                        .part(&(entry.start_offset as u64).to_le_bytes())
                        .part(&(entry.end_offset as u64).to_le_bytes())
                        .part(&[u8::from(entry.is_changed)])
                        .text(&entry.text);
                }
                hasher = hasher.text(summary.as_deref().unwrap_or_default());
            }
        }
        Ok(hasher.json(config)?.finish())
    }
}

/// One engine call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineRequest {
    /// Document being analyzed
    pub document_id: String,
    /// Requesting user
    pub user_id: String,
    /// Text to analyze
    pub scope: EngineScope,
    /// User preferences
    pub writing_config: WritingConfig,
    /// Regions already rewritten, so the engine can avoid them
    pub previously_modified_areas: Vec<ModifiedArea>,
    /// Paragraph roles
    pub paragraph_tags: Vec<ParagraphTag>,
}

/// Engine answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineResponse {
    /// Suggestions with offsets into the analyzed document
    pub suggestions: Vec<Suggestion>,
    /// Engine-assigned analysis id
    pub analysis_id: AnalysisId,
    /// Wall time spent by the engine
    pub processing_time_ms: u64,
}

/// Text analysis backend
#[async_trait]
pub trait AnalysisEngine: Send + Sync + Debug {
    /// Analyze the requested scope
    ///
    /// # Errors
    /// Returns `EngineError` when the engine fails or refuses
    async fn analyze(&self, request: EngineRequest) -> Result<EngineResponse, EngineError>;
}

#[async_trait]
impl<E: AnalysisEngine + ?Sized> AnalysisEngine for Arc<E> {
    async fn analyze(&self, request: EngineRequest) -> Result<EngineResponse, EngineError> {
        (**self).analyze(request).await
    }
}
