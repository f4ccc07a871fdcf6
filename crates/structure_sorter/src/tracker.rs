use gpui::{Pixels, Point, px};

use crate::{
    Draggee, LayoutProvider, LevelBounds, RowBounds, RowSequence, SorterConfig, level_bounds,
};

/// An insertion point between two rows of the sequence, ignoring the draggee's own rows.
///
/// `prev`/`next` are indices into the sequence as it was when the drag started.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TargetGap {
    pub prev: Option<usize>,
    pub next: Option<usize>,
}

/// Where the draggee would land if it were dropped right now.
#[derive(Clone, Debug, PartialEq)]
pub struct DropTarget {
    pub gap: TargetGap,
    pub level: usize,
    pub bounds: LevelBounds,
    /// Row highlighted as the new parent when hovering over a row body.
    pub nest_under: Option<usize>,
    pub marker_y: Pixels,
}

impl DropTarget {
    fn same_place(&self, other: &DropTarget) -> bool {
        self.gap == other.gap && self.level == other.level && self.nest_under == other.nest_under
    }
}

/// Result of one pointer move.
#[derive(Clone, Debug, PartialEq)]
pub struct TrackerFrame {
    pub target: Option<DropTarget>,
    /// Horizontal position of the drag helper, snapped towards the target level's indent.
    pub helper_x: Pixels,
    /// Whether the target differs from the previous frame's.
    pub changed: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Zone {
    Before,
    Over,
    After,
}

/// Maps pointer positions to drop targets for one drag gesture.
#[derive(Clone, Debug)]
pub struct DragTracker {
    grab_offset_x: Pixels,
    hover_epsilon: Pixels,
    magnet_give: Pixels,
    max_levels: Option<usize>,
    target: Option<DropTarget>,
}

impl DragTracker {
    /// Start tracking. `pointer` is the mouse position at drag start, in content coordinates.
    pub fn new<L: LayoutProvider + ?Sized>(
        draggee: &Draggee,
        pointer: Point<Pixels>,
        layout: &L,
        config: &SorterConfig,
    ) -> Self {
        Self {
            grab_offset_x: pointer.x - layout.indent_for_level(draggee.level()),
            hover_epsilon: config.hover_epsilon_px(),
            magnet_give: config.magnet_give_px(),
            max_levels: config.max_levels(),
            target: None,
        }
    }

    pub fn target(&self) -> Option<&DropTarget> {
        self.target.as_ref()
    }

    pub fn update<L: LayoutProvider + ?Sized>(
        &mut self,
        pointer: Point<Pixels>,
        rows: &RowSequence,
        draggee: &Draggee,
        layout: &L,
    ) -> TrackerFrame {
        let draggee_x = pointer.x - self.grab_offset_x;
        let target = self.resolve(pointer.y, draggee_x, rows, draggee, layout);

        let changed = match (&self.target, &target) {
            (None, None) => false,
            (Some(old), Some(new)) => !old.same_place(new),
            _ => true,
        };

        let helper_x = match &target {
            Some(target) => magnetize(
                draggee_x,
                layout.indent_for_level(target.level),
                self.magnet_give,
            ),
            None => draggee_x,
        };

        if changed {
            log::debug!(
                "structure drag target: {:?}",
                target.as_ref().map(|t| (t.gap, t.level))
            );
        }
        self.target = target.clone();

        TrackerFrame {
            target,
            helper_x,
            changed,
        }
    }

    fn resolve<L: LayoutProvider + ?Sized>(
        &self,
        mouse_y: Pixels,
        draggee_x: Pixels,
        rows: &RowSequence,
        draggee: &Draggee,
        layout: &L,
    ) -> Option<DropTarget> {
        let candidates: Vec<usize> = rows
            .visible_indices()
            .into_iter()
            .filter(|ix| !draggee.contains(*ix) && layout.row_bounds(*ix).is_some())
            .collect();

        let Some((k, row_bounds)) = self.closest_candidate(mouse_y, &candidates, layout) else {
            let gap = TargetGap {
                prev: None,
                next: None,
            };
            return self.settle(gap, &[1], None, px(0.), draggee_x, rows, draggee, layout);
        };

        let row_ix = candidates[k];
        let row_level = rows.get(row_ix)?.level;
        let next_ix = candidates.get(k + 1).copied();
        let next_level = next_ix.and_then(|ix| rows.get(ix)).map(|row| row.level);

        let zone = if mouse_y < row_bounds.mid() {
            if k == 0 { Zone::Before } else { Zone::Over }
        } else {
            Zone::After
        };

        match zone {
            Zone::Before => {
                let gap = TargetGap {
                    prev: None,
                    next: Some(row_ix),
                };
                self.settle(gap, &[1], None, row_bounds.top, draggee_x, rows, draggee, layout)
            }
            Zone::Over => {
                let nested = if next_level.is_some_and(|level| level > row_level) {
                    // Append after the row's last visible descendant.
                    let end = rows.subtree_end(row_ix);
                    let mut last = k;
                    while candidates.get(last + 1).is_some_and(|ix| *ix < end) {
                        last += 1;
                    }
                    let gap = TargetGap {
                        prev: Some(candidates[last]),
                        next: candidates.get(last + 1).copied(),
                    };
                    let marker_y = layout
                        .row_bounds(candidates[last])
                        .map_or(row_bounds.bottom(), |bounds| bounds.bottom());
                    self.settle(
                        gap,
                        &[row_level + 1],
                        Some(row_ix),
                        marker_y,
                        draggee_x,
                        rows,
                        draggee,
                        layout,
                    )
                } else {
                    let gap = TargetGap {
                        prev: Some(row_ix),
                        next: next_ix,
                    };
                    self.settle(
                        gap,
                        &[row_level + 1],
                        Some(row_ix),
                        row_bounds.bottom(),
                        draggee_x,
                        rows,
                        draggee,
                        layout,
                    )
                };

                // Too deep to nest here: fall back to the gap right above the row.
                nested.or_else(|| {
                    let gap = TargetGap {
                        prev: Some(candidates[k - 1]),
                        next: Some(row_ix),
                    };
                    self.settle(
                        gap,
                        &[row_level],
                        None,
                        row_bounds.top,
                        draggee_x,
                        rows,
                        draggee,
                        layout,
                    )
                })
            }
            Zone::After => {
                let gap = TargetGap {
                    prev: Some(row_ix),
                    next: next_ix,
                };
                // A first child of the row, a sibling of the row, or a sibling of any
                // ancestor that still ends here. Deeper rows below pin the floor.
                let floor = next_level.unwrap_or(1).min(row_level + 1);
                let levels: Vec<usize> = (floor..=row_level + 1).collect();
                self.settle(
                    gap,
                    &levels,
                    None,
                    row_bounds.bottom(),
                    draggee_x,
                    rows,
                    draggee,
                    layout,
                )
            }
        }
    }

    /// Rows are scanned top to bottom; the closest midpoint wins, but a later row only takes
    /// over once the cursor has reached its top edge (give or take the hover epsilon).
    fn closest_candidate<L: LayoutProvider + ?Sized>(
        &self,
        mouse_y: Pixels,
        candidates: &[usize],
        layout: &L,
    ) -> Option<(usize, RowBounds)> {
        let mut best: Option<(usize, RowBounds, f32)> = None;
        for (k, ix) in candidates.iter().enumerate() {
            let Some(bounds) = layout.row_bounds(*ix) else {
                continue;
            };
            let dist: f32 = (mouse_y - bounds.mid()).into();
            let dist = dist.abs();
            match best {
                None => best = Some((k, bounds, dist)),
                Some((_, _, best_dist)) => {
                    if dist < best_dist && bounds.top <= mouse_y + self.hover_epsilon {
                        best = Some((k, bounds, dist));
                    } else if dist > best_dist {
                        break;
                    }
                }
            }
        }
        best.map(|(k, bounds, _)| (k, bounds))
    }

    #[allow(clippy::too_many_arguments)]
    fn settle<L: LayoutProvider + ?Sized>(
        &self,
        gap: TargetGap,
        levels: &[usize],
        nest_under: Option<usize>,
        marker_y: Pixels,
        draggee_x: Pixels,
        rows: &RowSequence,
        draggee: &Draggee,
        layout: &L,
    ) -> Option<DropTarget> {
        let prev_level = gap.prev.and_then(|ix| rows.get(ix)).map(|row| row.level);
        let next_level = gap.next.and_then(|ix| rows.get(ix)).map(|row| row.level);

        let level_delta = match (draggee.level_delta(), self.max_levels) {
            (Some(level_delta), _) => level_delta,
            (None, None) => 0,
            // The subtree depth matters here but is still unknown.
            (None, Some(_)) => return None,
        };
        let bounds = level_bounds(prev_level, next_level, level_delta, self.max_levels)?;

        let level = snap_level(
            levels.iter().copied().filter(|level| bounds.contains(*level)),
            draggee_x,
            layout,
        )?;

        Some(DropTarget {
            gap,
            level,
            bounds,
            nest_under,
            marker_y,
        })
    }
}

/// Pick the level whose indent is closest to `x`. Ties go to the first candidate.
pub fn snap_level<L: LayoutProvider + ?Sized>(
    levels: impl IntoIterator<Item = usize>,
    x: Pixels,
    layout: &L,
) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for level in levels {
        let dist: f32 = (x - layout.indent_for_level(level)).into();
        let dist = dist.abs();
        if best.is_none_or(|(_, best_dist)| dist < best_dist) {
            best = Some((level, dist));
        }
    }
    best.map(|(level, _)| level)
}

/// Keep `x` within `give` of `indent`.
pub fn magnetize(x: Pixels, indent: Pixels, give: Pixels) -> Pixels {
    let low = indent - give;
    let high = indent + give;
    if x < low {
        low
    } else if x > high {
        high
    } else {
        x
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use gpui::point;

    use super::*;
    use crate::RowLayout;

    const ROW: f32 = 20.;

    fn layout(rows: &RowSequence) -> RowLayout {
        RowLayout::uniform(rows.len(), px(ROW))
            .indent_width(px(16.))
            .indent_offset(px(12.))
    }

    /// Start dragging `id` from the middle of its row, grabbing it right at its indent.
    fn start(rows: &RowSequence, id: &str, config: &SorterConfig) -> (Draggee, DragTracker) {
        let ix = rows.position(&id.to_string().into()).unwrap();
        let draggee = Draggee::capture(rows, ix).unwrap();
        let layout = layout(rows);
        let x = layout.indent_for_level(draggee.level());
        let y = px(ROW * ix as f32 + ROW / 2.);
        let tracker = DragTracker::new(&draggee, point(x, y), &layout, config);
        (draggee, tracker)
    }

    fn move_to(
        tracker: &mut DragTracker,
        rows: &RowSequence,
        draggee: &Draggee,
        x: f32,
        y: f32,
    ) -> TrackerFrame {
        tracker.update(point(px(x), px(y)), rows, draggee, &layout(rows))
    }

    fn abc() -> RowSequence {
        RowSequence::from_outline([(1, "A"), (2, "B"), (1, "C")]).unwrap()
    }

    #[test]
    fn horizontal_offset_picks_nearest_indent() {
        let rows = abc();
        let config = SorterConfig::default();
        let (draggee, mut tracker) = start(&rows, "C", &config);

        // Lower half of B, the last candidate: C may become B's child, B's sibling (level 2)
        // or A's. Indents are 12px for level 1, 28px for level 2 and 44px for level 3.
        let frame = move_to(&mut tracker, &rows, &draggee, 27., 35.);
        let target = frame.target.unwrap();
        assert_eq!(
            target.gap,
            TargetGap {
                prev: Some(1),
                next: None
            }
        );
        assert_eq!(target.level, 2);

        let frame = move_to(&mut tracker, &rows, &draggee, 19., 35.);
        assert_eq!(frame.target.unwrap().level, 1);

        let frame = move_to(&mut tracker, &rows, &draggee, 21., 35.);
        assert_eq!(frame.target.unwrap().level, 2);
    }

    #[test]
    fn gap_before_deeper_row_inserts_first_child() {
        let rows = abc();
        let (draggee, mut tracker) = start(&rows, "C", &SorterConfig::default());

        // Lower half of A: next row B is one level deeper.
        let frame = move_to(&mut tracker, &rows, &draggee, 0., 15.);
        let target = frame.target.unwrap();
        assert_eq!(target.level, 2);
        assert_eq!(target.nest_under, None);
        assert_eq!(
            target.gap,
            TargetGap {
                prev: Some(0),
                next: Some(1)
            }
        );
    }

    #[test]
    fn hovering_a_row_nests_under_it() {
        let rows = RowSequence::from_outline([(1, "A"), (1, "B"), (1, "C")]).unwrap();
        let (draggee, mut tracker) = start(&rows, "C", &SorterConfig::default());

        let frame = move_to(&mut tracker, &rows, &draggee, 12., 22.);
        let target = frame.target.unwrap();
        assert_eq!(target.nest_under, Some(1));
        assert_eq!(target.level, 2);
        assert_eq!(target.marker_y, px(40.));
    }

    #[test]
    fn hovering_a_parent_appends_after_its_children() {
        let rows =
            RowSequence::from_outline([(1, "A"), (1, "B"), (2, "B1"), (2, "B2"), (1, "C")])
                .unwrap();
        let (draggee, mut tracker) = start(&rows, "C", &SorterConfig::default());

        let frame = move_to(&mut tracker, &rows, &draggee, 12., 22.);
        let target = frame.target.unwrap();
        assert_eq!(target.nest_under, Some(1));
        assert_eq!(
            target.gap,
            TargetGap {
                prev: Some(3),
                next: None
            }
        );
        assert_eq!(target.level, 2);
        assert_eq!(target.marker_y, px(80.));
    }

    #[test]
    fn sibling_gap_offers_sibling_and_child_levels() {
        let rows = RowSequence::from_outline([(1, "A"), (2, "B"), (2, "C"), (1, "D")]).unwrap();
        let (draggee, mut tracker) = start(&rows, "D", &SorterConfig::default());

        // Lower half of B, next to its sibling C. Level 1 would skip under C.
        let frame = move_to(&mut tracker, &rows, &draggee, 0., 35.);
        assert_eq!(frame.target.unwrap().level, 2);

        let frame = move_to(&mut tracker, &rows, &draggee, 200., 35.);
        let target = frame.target.unwrap();
        assert_eq!(target.level, 3);
        assert_eq!(
            target.gap,
            TargetGap {
                prev: Some(1),
                next: Some(2)
            }
        );
    }

    #[test]
    fn first_row_can_take_a_child() {
        let rows = RowSequence::from_outline([(1, "A"), (1, "B")]).unwrap();
        let (draggee, mut tracker) = start(&rows, "B", &SorterConfig::default());

        let frame = move_to(&mut tracker, &rows, &draggee, 28., 15.);
        let target = frame.target.unwrap();
        assert_eq!(
            target.gap,
            TargetGap {
                prev: Some(0),
                next: None
            }
        );
        assert_eq!(target.level, 2);

        let frame = move_to(&mut tracker, &rows, &draggee, 12., 15.);
        assert_eq!(frame.target.unwrap().level, 1);
    }

    #[test]
    fn every_legal_level_is_reachable_from_a_gap() {
        let rows = RowSequence::from_outline([
            (1, "A"),
            (2, "B"),
            (3, "C"),
            (2, "D"),
            (1, "E"),
            (1, "F"),
        ])
        .unwrap();
        let (draggee, mut tracker) = start(&rows, "F", &SorterConfig::default());

        for ix in 0..5 {
            // Lower half of each row but the draggee.
            let y = ROW * ix as f32 + ROW * 0.75;
            let mut reached = BTreeSet::new();
            let mut bounds = None;
            for x in -20..200 {
                let target = move_to(&mut tracker, &rows, &draggee, x as f32, y)
                    .target
                    .unwrap();
                assert_eq!(target.gap.prev, Some(ix));
                reached.insert(target.level);
                bounds = Some(target.bounds);
            }
            let bounds = bounds.unwrap();
            assert_eq!(
                reached,
                bounds.levels().collect::<BTreeSet<_>>(),
                "gap after row {ix}"
            );
        }
    }

    #[test]
    fn top_of_first_row_inserts_before_it() {
        let rows = abc();
        let (draggee, mut tracker) = start(&rows, "B", &SorterConfig::default());

        let frame = move_to(&mut tracker, &rows, &draggee, 60., 2.);
        let target = frame.target.unwrap();
        assert_eq!(
            target.gap,
            TargetGap {
                prev: None,
                next: Some(0)
            }
        );
        assert_eq!(target.level, 1);
        assert_eq!(target.marker_y, px(0.));
    }

    #[test]
    fn max_levels_blocks_deep_gaps() {
        let rows = RowSequence::from_outline([(1, "A"), (2, "B"), (1, "C"), (2, "C1")]).unwrap();
        let config = SorterConfig {
            max_levels: Some(2),
            ..SorterConfig::default()
        };
        let (draggee, mut tracker) = start(&rows, "C", &config);

        // C carries a child, so it cannot go below A.
        let frame = move_to(&mut tracker, &rows, &draggee, 12., 15.);
        assert!(frame.target.is_none());

        // Hovering B would nest C at level 3; the gap above B needs level 2 as well.
        let frame = move_to(&mut tracker, &rows, &draggee, 12., 25.);
        assert!(frame.target.is_none());
    }

    #[test]
    fn unknown_level_delta_only_matters_with_a_ceiling() {
        let mut rows = abc();
        rows.set_more_pending(true);

        let (draggee, mut tracker) = start(&rows, "C", &SorterConfig::default());
        assert_eq!(draggee.level_delta(), None);
        assert!(move_to(&mut tracker, &rows, &draggee, 28., 35.).target.is_some());

        let config = SorterConfig {
            max_levels: Some(5),
            ..SorterConfig::default()
        };
        let (mut draggee, mut tracker) = start(&rows, "C", &config);
        assert!(move_to(&mut tracker, &rows, &draggee, 28., 35.).target.is_none());

        draggee.resolve_level_delta(0);
        assert!(move_to(&mut tracker, &rows, &draggee, 28., 35.).target.is_some());
    }

    #[test]
    fn changed_only_when_target_moves() {
        let rows = abc();
        let (draggee, mut tracker) = start(&rows, "C", &SorterConfig::default());

        assert!(move_to(&mut tracker, &rows, &draggee, 28., 35.).changed);
        assert!(!move_to(&mut tracker, &rows, &draggee, 29., 36.).changed);
        assert!(move_to(&mut tracker, &rows, &draggee, 12., 35.).changed);
    }

    #[test]
    fn helper_snaps_within_give() {
        let rows = abc();
        let (draggee, mut tracker) = start(&rows, "C", &SorterConfig::default());

        // Far right resolves the deepest level, and the helper stays near its indent.
        let frame = move_to(&mut tracker, &rows, &draggee, 90., 35.);
        assert_eq!(frame.target.unwrap().level, 3);
        assert_eq!(frame.helper_x, px(54.));

        let frame = move_to(&mut tracker, &rows, &draggee, 30., 35.);
        assert_eq!(frame.helper_x, px(30.));
    }

    #[test]
    fn closest_row_prefers_the_entered_row() {
        let rows = RowSequence::from_outline([(1, "A"), (1, "B"), (1, "C")]).unwrap();
        let layout = RowLayout::new([px(100.), px(10.), px(20.)]);
        let draggee = Draggee::capture(&rows, 2).unwrap();
        let tracker = DragTracker::new(
            &draggee,
            point(px(12.), px(5.)),
            &layout,
            &SorterConfig::default(),
        );

        // 90px is inside A, even though B's midpoint (105px) is closer.
        let (k, bounds) = tracker.closest_candidate(px(90.), &[0, 1], &layout).unwrap();
        assert_eq!(k, 0);
        assert_eq!(bounds.top, px(0.));

        let (k, _) = tracker.closest_candidate(px(98.), &[0, 1], &layout).unwrap();
        assert_eq!(k, 1);
    }

    #[test]
    fn snap_and_magnet_helpers() {
        let layout = RowLayout::uniform(0, px(20.));
        assert_eq!(snap_level([1, 2, 3], px(30.), &layout), Some(2));
        assert_eq!(snap_level([1, 2, 3], px(-50.), &layout), Some(1));
        assert_eq!(snap_level(std::iter::empty::<usize>(), px(0.), &layout), None);

        assert_eq!(magnetize(px(5.), px(20.), px(4.)), px(16.));
        assert_eq!(magnetize(px(22.), px(20.), px(4.)), px(22.));
    }
}
