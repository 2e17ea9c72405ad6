//! Subcommand implementations
//!
//! Each command reads its inputs, runs the same building blocks the
//! orchestrator uses, and returns a serializable report.

use anyhow::{Context, Result};
use redraft_core::{DecisionInput, DecisionPolicy, EngineConfig, Verdict};
use redraft_text::{
    changed_indices, detect_changes, segment, ContentHash, ContextWindow, ContextWindowBuilder,
    ParagraphChange,
};
use serde::Serialize;
use std::path::Path;
use tracing::debug;

/// Output of `redraft diff`
#[derive(Debug, Serialize)]
pub(crate) struct DiffReport {
    pub(crate) paragraphs_before: usize,
    pub(crate) paragraphs_after: usize,
    pub(crate) changes: Vec<ParagraphChange>,
}

/// Output of `redraft plan`
#[derive(Debug, Serialize)]
pub(crate) struct PlanReport {
    pub(crate) content_hash: String,
    pub(crate) verdict: Verdict,
    pub(crate) changed: Vec<usize>,
    pub(crate) window: ContextWindow,
}

pub(crate) fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

/// Load configuration from `path`, or defaults
pub(crate) fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let raw = read_text(path)?;
    EngineConfig::from_toml_str(&raw)
        .with_context(|| format!("invalid configuration in {}", path.display()))
}

/// Paragraph changes between two versions
pub(crate) fn diff(before: &str, after: &str) -> DiffReport {
    let old = segment(before);
    let new = segment(after);
    let changes = detect_changes(&old, &new, chrono::Utc::now());
    debug!(changes = changes.len(), "computed paragraph diff");
    DiffReport {
        paragraphs_before: old.len(),
        paragraphs_after: new.len(),
        changes,
    }
}

/// Decision and context window for analyzing `after` given `before`
pub(crate) fn plan(
    before: &str,
    after: &str,
    config: &EngineConfig,
    consecutive_differential: u32,
) -> PlanReport {
    let paragraphs = segment(after);
    let changes = detect_changes(&segment(before), &paragraphs, chrono::Utc::now());
    let changed = changed_indices(&changes);

    let verdict = DecisionPolicy::new(config.decision).decide(&DecisionInput {
        new_document: false,
        requested_full: false,
        has_pending_changes: !changes.is_empty(),
        changed: changed.clone(),
        total_paragraphs: paragraphs.len(),
        content_unchanged: before == after,
        consecutive_differential,
    });
    let window = ContextWindowBuilder::new(config.window).build(&paragraphs, &changed);

    PlanReport {
        content_hash: ContentHash::compute(after.as_bytes()).to_string(),
        verdict,
        changed: changed.into_iter().collect(),
        window,
    }
}

/// Effective configuration as TOML
pub(crate) fn render_config(config: &EngineConfig) -> Result<String> {
    toml::to_string_pretty(config).context("failed to render configuration")
}
