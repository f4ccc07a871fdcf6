//! Property tests for gap legality.
//!
//! 1. `level_bounds` matches its closed form for every input.
//! 2. With a depth ceiling of 2, a subtree one level deep is rejected at exactly the gaps
//!    whose minimum level is 2 or more.

use gpui_structure_sorter::{LevelBounds, RowSequence, level_bounds};
use proptest::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────────

/// Levels of a valid row sequence: starts at 1 and never jumps more than one step deeper.
fn outline_strategy() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(1usize..6, 1..32).prop_map(|choices| {
        let mut levels = Vec::with_capacity(choices.len());
        let mut previous = 0;
        for choice in choices {
            let level = choice.min(previous + 1);
            levels.push(level);
            previous = level;
        }
        levels
    })
}

fn sequence(levels: &[usize]) -> RowSequence {
    let ids: Vec<String> = (0..levels.len()).map(|ix| format!("r{ix}")).collect();
    RowSequence::from_outline(
        levels
            .iter()
            .copied()
            .zip(ids.iter().map(String::as_str)),
    )
    .unwrap()
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Closed form
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn bounds_follow_closed_form(
        prev in prop::option::of(1usize..8),
        next in prop::option::of(1usize..8),
        level_delta in 0usize..5,
        max_levels in prop::option::of(0usize..10),
    ) {
        let bounds = level_bounds(prev, next, level_delta, max_levels);
        let ceiling = max_levels.filter(|max_levels| *max_levels > 0);
        let min = next.unwrap_or(1);

        let invalid = ceiling.is_some_and(|ceiling| min != 1 && min + level_delta > ceiling);
        if invalid {
            prop_assert_eq!(bounds, None);
        } else {
            let mut max = prev.map_or(1, |prev| prev + 1);
            if let Some(ceiling) = ceiling {
                max = max.min(ceiling.saturating_sub(level_delta));
            }
            prop_assert_eq!(bounds, Some(LevelBounds { min, max: max.max(min) }));
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. Depth-respecting reject over every gap of a random tree
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn deep_subtree_rejected_exactly_below_top_level(levels in outline_strategy()) {
        let rows = sequence(&levels);
        for gap in 0..=rows.len() {
            let prev = gap.checked_sub(1).and_then(|ix| rows.get(ix)).map(|row| row.level);
            let next = rows.get(gap).map(|row| row.level);
            let bounds = level_bounds(prev, next, 1, Some(2));

            let too_deep = next.is_some_and(|level| level >= 2);
            prop_assert_eq!(
                bounds.is_none(),
                too_deep,
                "gap {} between {:?} and {:?} gave {:?}",
                gap, prev, next, bounds
            );
            if let Some(bounds) = bounds {
                // Only the top level leaves room for the child.
                prop_assert_eq!(bounds, LevelBounds { min: 1, max: 1 });
            }
        }
    }
}
