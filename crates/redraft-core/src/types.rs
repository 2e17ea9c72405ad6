//! Core types for Redraft
//!
//! Suggestions, their classification, writing configuration and the
//! request/response shapes of the public API.

use chrono::{DateTime, Utc};
use redraft_store::Record;
use redraft_text::TokenSavings;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use ulid::Ulid;

use crate::policy::Decision;

/// Unique suggestion identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SuggestionId(pub String);

impl SuggestionId {
    /// Generate a fresh, time-ordered id
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new().to_string())
    }

    /// Borrow as str
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SuggestionId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for SuggestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SuggestionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Identifier of one engine analysis
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnalysisId(pub String);

impl AnalysisId {
    /// Generate a fresh id
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new().to_string())
    }

    /// Borrow as str
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the id is usable for marking changes analyzed
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl Default for AnalysisId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for AnalysisId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AnalysisId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// `(document, user)` pair that scopes all per-document state
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentKey {
    /// Document id
    pub document_id: String,
    /// Owning user
    pub user_id: String,
}

impl DocumentKey {
    /// Create key
    #[must_use]
    pub fn new(document_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            user_id: user_id.into(),
        }
    }
}

impl Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.user_id, self.document_id)
    }
}

/// Suggestion category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionType {
    /// Misspelled word
    Spelling,
    /// Grammar error
    Grammar,
    /// Hard-to-follow phrasing
    Clarity,
    /// Flat or unengaging prose
    Engagement,
    /// Tone mismatch with the audience
    Tone,
    /// Paragraph or argument structure
    Structure,
    /// Shallow treatment of a point
    Depth,
    /// Word choice
    Vocabulary,
}

impl SuggestionType {
    /// All types
    pub const ALL: [Self; 8] = [
        Self::Spelling,
        Self::Grammar,
        Self::Clarity,
        Self::Engagement,
        Self::Tone,
        Self::Structure,
        Self::Depth,
        Self::Vocabulary,
    ];

    /// Clarity and engagement rewrites are tracked per region
    #[inline]
    #[must_use]
    pub const fn is_focus(self) -> bool {
        matches!(self, Self::Clarity | Self::Engagement)
    }

    /// Wire name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Spelling => "spelling",
            Self::Grammar => "grammar",
            Self::Clarity => "clarity",
            Self::Engagement => "engagement",
            Self::Tone => "tone",
            Self::Structure => "structure",
            Self::Depth => "depth",
            Self::Vocabulary => "vocabulary",
        }
    }
}

impl Display for SuggestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How urgently a suggestion should be shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Optional improvement
    #[default]
    Suggestion,
    /// Likely problem
    Warning,
    /// Definite error
    Error,
}

/// Suggestion lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionStatus {
    /// Shown, awaiting a decision
    #[default]
    Pending,
    /// Applied by the user
    Accepted,
    /// Dismissed by the user
    Rejected,
}

/// Proposed edit to a span of the document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    /// Unique id
    pub id: SuggestionId,
    /// Owning document
    #[serde(default)]
    pub document_id: String,
    /// Owning user
    #[serde(default)]
    pub user_id: String,
    /// Category
    #[serde(rename = "type")]
    pub kind: SuggestionType,
    /// Free-form sub-category from the engine
    #[serde(default)]
    pub category: String,
    /// Urgency
    #[serde(default)]
    pub severity: Severity,
    /// Text the suggestion replaces
    pub original_text: String,
    /// Replacement text
    pub suggested_text: String,
    /// Why the change helps
    #[serde(default)]
    pub explanation: String,
    /// Byte offset where `original_text` starts
    pub start_offset: usize,
    /// Byte offset where `original_text` ends
    pub end_offset: usize,
    /// Engine confidence in `[0, 1]`
    pub confidence: f64,
    /// Lifecycle state
    #[serde(default)]
    pub status: SuggestionStatus,
    /// Creation time
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    /// Last status change
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
}

impl Suggestion {
    /// Create pending suggestion replacing `original_text` at `start_offset`
    #[must_use]
    pub fn new(
        kind: SuggestionType,
        original_text: impl Into<String>,
        suggested_text: impl Into<String>,
        start_offset: usize,
    ) -> Self {
        let original_text = original_text.into();
        let now = Utc::now();
        Self {
            id: SuggestionId::new(),
            document_id: String::new(),
            user_id: String::new(),
            kind,
            category: String::new(),
            severity: Severity::default(),
            end_offset: start_offset + original_text.len(),
            original_text,
            suggested_text: suggested_text.into(),
            explanation: String::new(),
            start_offset,
            confidence: 0.5,
            status: SuggestionStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    /// With explanation
    #[must_use]
    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = explanation.into();
        self
    }

    /// With category
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// With severity
    #[must_use]
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// With confidence, clamped to `[0, 1]`
    #[must_use]
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    /// Owned by `key`
    #[must_use]
    pub fn for_document(mut self, key: &DocumentKey) -> Self {
        self.document_id.clone_from(&key.document_id);
        self.user_id.clone_from(&key.user_id);
        self
    }

    /// Key of the owning document
    #[must_use]
    pub fn key(&self) -> DocumentKey {
        DocumentKey::new(self.document_id.clone(), self.user_id.clone())
    }

    /// Identity used for deduplication
    #[must_use]
    pub fn semantic_key(&self) -> (&str, &str, SuggestionType) {
        (&self.original_text, &self.suggested_text, self.kind)
    }

    /// Whether the offsets still point at `original_text` in `content`
    #[must_use]
    pub fn anchors_in(&self, content: &str) -> bool {
        content.get(self.start_offset..self.end_offset) == Some(self.original_text.as_str())
    }

    /// Whether the suggestion awaits a decision
    #[inline]
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status == SuggestionStatus::Pending
    }

    /// Move the span to `start`, keeping its length
    pub fn move_to(&mut self, start: usize) {
        self.start_offset = start;
        self.end_offset = start + self.original_text.len();
    }
}

impl Record for Suggestion {
    const COLLECTION: &'static str = "suggestions";

    fn id(&self) -> String {
        self.id.0.clone()
    }

    fn validate(&self) -> Result<(), String> {
        if self.document_id.is_empty() || self.user_id.is_empty() {
            return Err("document_id and user_id are required".into());
        }
        if self.end_offset < self.start_offset {
            return Err(format!(
                "end_offset {} precedes start_offset {}",
                self.end_offset, self.start_offset
            ));
        }
        if self.end_offset - self.start_offset != self.original_text.len() {
            return Err("span length does not match original_text".into());
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(format!("confidence {} outside [0, 1]", self.confidence));
        }
        Ok(())
    }
}

/// User-chosen analysis preferences
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WritingConfig {
    /// Intended readers
    pub audience: Option<String>,
    /// Desired tone
    pub tone: Option<String>,
    /// Writing goals passed to the engine
    pub goals: Vec<String>,
    /// Types to report; empty means all
    pub enabled_types: Vec<SuggestionType>,
    /// Rubric the engine grades against
    pub rubric: Option<String>,
}

impl WritingConfig {
    /// Whether suggestions of `kind` should be reported
    #[must_use]
    pub fn allows(&self, kind: SuggestionType) -> bool {
        self.enabled_types.is_empty() || self.enabled_types.contains(&kind)
    }

    /// Only report `types`
    #[must_use]
    pub fn with_enabled_types(mut self, types: impl IntoIterator<Item = SuggestionType>) -> Self {
        self.enabled_types = types.into_iter().collect();
        self
    }
}

/// Author-assigned role of a paragraph ("thesis", "conclusion", ...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParagraphTag {
    /// Paragraph index
    pub paragraph_index: usize,
    /// Tag label
    pub label: String,
}

/// Requested analysis scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    /// Let the decision policy choose
    #[default]
    Auto,
    /// Always analyze the whole document
    Full,
}

/// Input to [`request_analysis`](crate::orchestrator::AnalysisOrchestrator::request_analysis)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    /// Document id (empty for unsaved documents)
    pub document_id: String,
    /// Requesting user
    pub user_id: String,
    /// Current document text
    pub content: String,
    /// Text before the edit that triggered this request
    pub previous_content: Option<String>,
    /// Scope override
    pub mode: AnalysisMode,
    /// Writing preferences
    pub writing_config: WritingConfig,
    /// Paragraph roles
    pub paragraph_tags: Vec<ParagraphTag>,
    /// Document has never been saved
    pub new_document: bool,
}

impl AnalysisRequest {
    /// Create request in auto mode
    #[must_use]
    pub fn new(
        document_id: impl Into<String>,
        user_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            document_id: document_id.into(),
            user_id: user_id.into(),
            content: content.into(),
            previous_content: None,
            mode: AnalysisMode::Auto,
            writing_config: WritingConfig::default(),
            paragraph_tags: Vec::new(),
            new_document: false,
        }
    }

    /// With the text before the edit
    #[must_use]
    pub fn with_previous(mut self, previous: impl Into<String>) -> Self {
        self.previous_content = Some(previous.into());
        self
    }

    /// Force a full analysis
    #[must_use]
    pub fn force_full(mut self) -> Self {
        self.mode = AnalysisMode::Full;
        self
    }

    /// With writing preferences
    #[must_use]
    pub fn with_writing_config(mut self, config: WritingConfig) -> Self {
        self.writing_config = config;
        self
    }

    /// With paragraph roles
    #[must_use]
    pub fn with_tags(mut self, tags: Vec<ParagraphTag>) -> Self {
        self.paragraph_tags = tags;
        self
    }

    /// Mark as never saved
    #[must_use]
    pub fn as_new_document(mut self) -> Self {
        self.new_document = true;
        self
    }

    /// Session key
    #[must_use]
    pub fn key(&self) -> DocumentKey {
        DocumentKey::new(self.document_id.clone(), self.user_id.clone())
    }

    /// Whether there is no persisted document behind the request
    #[must_use]
    pub fn is_unsaved(&self) -> bool {
        self.new_document || self.document_id.trim().is_empty()
    }
}

/// Result of one analysis request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisOutcome {
    /// Pending suggestions, sorted by start offset
    pub suggestions: Vec<Suggestion>,
    /// Analysis the suggestions came from
    pub analysis_id: AnalysisId,
    /// Whether only a context window was analyzed
    pub used_differential: bool,
    /// Token estimate for differential runs
    pub token_savings: Option<TokenSavings>,
    /// What the policy decided
    pub decision: Decision,
    /// Whether the engine call was served from cache
    pub from_cache: bool,
}
