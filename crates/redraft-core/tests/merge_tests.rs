use proptest::prelude::*;
use redraft_core::merge;
use redraft_core::{Suggestion, SuggestionType};
use std::collections::HashSet;

/// Build suggestions over `content`; `shifted` ones point one byte off
fn suggestions(content: &str, spans: &[(usize, usize, bool, u8)]) -> Vec<Suggestion> {
    spans
        .iter()
        .map(|&(start, len, shifted, kind)| {
            let kind = SuggestionType::ALL[usize::from(kind) % SuggestionType::ALL.len()];
            let original = content.get(start..start + len).unwrap_or("zz");
            let at = if shifted { start + 1 } else { start };
            Suggestion::new(kind, original, "fix", at)
        })
        .collect()
}

fn span() -> impl Strategy<Value = (usize, usize, bool, u8)> {
    (0..64usize, 1..6usize, any::<bool>(), any::<u8>())
}

proptest! {
    #[test]
    fn prop_merge_keeps_only_anchored_sorted_unique(
        content in "[a-z ]{0,60}",
        carried in proptest::collection::vec(span(), 0..12),
        fresh in proptest::collection::vec(span(), 0..12),
    ) {
        let merged = merge::merge(
            suggestions(&content, &carried),
            suggestions(&content, &fresh),
            &content,
        );

        prop_assert!(merged.iter().all(|s| s.anchors_in(&content)));
        prop_assert!(merged
            .windows(2)
            .all(|w| (w[0].start_offset, w[0].end_offset) <= (w[1].start_offset, w[1].end_offset)));

        let mut keys = HashSet::new();
        for s in &merged {
            prop_assert!(keys.insert(s.semantic_key()));
        }
    }

    #[test]
    fn prop_dedupe_is_idempotent(
        content in "[a-z ]{0,60}",
        spans in proptest::collection::vec(span(), 0..16),
    ) {
        let once = merge::dedupe(suggestions(&content, &spans));
        let ids: Vec<_> = once.iter().map(|s| s.id.clone()).collect();
        let twice: Vec<_> = merge::dedupe(once).into_iter().map(|s| s.id).collect();
        prop_assert_eq!(ids, twice);
    }

    #[test]
    fn prop_relocate_points_at_original_text(
        content in "[a-z ]{1,60}",
        start in 0..60usize,
        len in 1..5usize,
        drift in 0..10usize,
    ) {
        let Some(original) = content.get(start..start + len) else {
            return Ok(());
        };
        let moved = Suggestion::new(SuggestionType::Spelling, original, "fix", start + drift);
        let found = merge::relocate(&moved, &content);
        prop_assert!(found.is_some());
        let at = found.unwrap_or_default();
        prop_assert_eq!(&content[at..at + len], original);
    }
}

#[test]
fn carried_suggestion_wins_over_fresh_duplicate() {
    let content = "We recieve mail.";
    let carried = Suggestion::new(SuggestionType::Spelling, "recieve", "receive", 3);
    let fresh = Suggestion::new(SuggestionType::Spelling, "recieve", "receive", 3);
    let merged = merge::merge(vec![carried.clone()], vec![fresh], content);
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].id, carried.id);
}

#[test]
fn same_text_different_kind_is_kept() {
    let content = "It is unique.";
    let merged = merge::merge(
        vec![Suggestion::new(SuggestionType::Grammar, "unique", "singular", 6)],
        vec![Suggestion::new(SuggestionType::Clarity, "unique", "singular", 6)],
        content,
    );
    assert_eq!(merged.len(), 2);
}

#[test]
fn stale_copy_does_not_shadow_valid_fresh_one() {
    let content = "We recieve mail.";
    let mut stale = Suggestion::new(SuggestionType::Spelling, "recieve", "receive", 3);
    stale.move_to(0);
    let fresh = Suggestion::new(SuggestionType::Spelling, "recieve", "receive", 3);
    let merged = merge::merge(vec![stale], vec![fresh.clone()], content);
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].id, fresh.id);
}
