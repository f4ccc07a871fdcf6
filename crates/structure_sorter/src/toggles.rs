use crate::{RowId, RowSequence};

/// An expand/collapse toggle appearing on or disappearing from a row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ToggleChange {
    Added(RowId),
    Removed(RowId),
}

/// Keeps `descendant_count` and the expand toggles of candidate parents in line with the
/// draggee's current target.
///
/// Updates are scheduled on every target change and applied at most once per frame by
/// [`AncestorToggles::flush`]. Only the ancestors that differ between the applied chain and
/// the new one are touched, so intermediate targets never count twice.
#[derive(Clone, Debug)]
pub struct AncestorToggles {
    weight: usize,
    applied: Vec<RowId>,
    pending: Option<Vec<RowId>>,
}

impl AncestorToggles {
    /// `original` is the draggee's ancestor chain at drag start, `weight` its row count.
    pub fn new(original: Vec<RowId>, weight: usize) -> Self {
        Self {
            weight,
            applied: original,
            pending: None,
        }
    }

    /// The chain currently reflected in the rows.
    pub fn applied(&self) -> &[RowId] {
        &self.applied
    }

    pub fn is_scheduled(&self) -> bool {
        self.pending.is_some()
    }

    /// Queue `chain` for the next flush.
    ///
    /// Returns `true` when no flush was queued yet, i.e. a frame callback is needed.
    pub fn schedule(&mut self, chain: Vec<RowId>) -> bool {
        self.pending.replace(chain).is_none()
    }

    pub fn flush(&mut self, rows: &mut RowSequence) -> Vec<ToggleChange> {
        match self.pending.take() {
            Some(chain) => self.apply(chain, rows),
            None => Vec::new(),
        }
    }

    /// Apply `chain` right away, dropping anything still queued.
    pub fn apply(&mut self, chain: Vec<RowId>, rows: &mut RowSequence) -> Vec<ToggleChange> {
        self.pending = None;
        let mut changes = Vec::new();

        for id in self.applied.iter().filter(|id| !chain.contains(id)) {
            let Some(row) = rows.row_mut(id) else {
                continue;
            };
            let before = row.descendant_count;
            row.descendant_count = before.saturating_sub(self.weight);
            if before > 0 && row.descendant_count == 0 {
                changes.push(ToggleChange::Removed(id.clone()));
            }
        }

        for id in chain.iter().filter(|id| !self.applied.contains(id)) {
            let Some(row) = rows.row_mut(id) else {
                continue;
            };
            if row.descendant_count == 0 {
                row.collapsed = false;
                changes.push(ToggleChange::Added(id.clone()));
            }
            row.descendant_count += self.weight;
        }

        self.applied = chain;
        changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(ids: &[&'static str]) -> Vec<RowId> {
        ids.iter().map(|id| RowId::from(*id)).collect()
    }

    fn counts(rows: &RowSequence) -> Vec<usize> {
        rows.rows().iter().map(|row| row.descendant_count).collect()
    }

    #[test]
    fn moving_between_parents_updates_toggles() {
        // `c` is being dragged out of `b` towards `d`.
        let mut rows =
            RowSequence::from_outline([(1, "a"), (2, "b"), (3, "c"), (1, "d")]).unwrap();
        let mut toggles = AncestorToggles::new(ids(&["a", "b"]), 1);

        assert!(toggles.schedule(ids(&["d"])));
        assert!(!toggles.schedule(ids(&["d"])));
        assert_eq!(counts(&rows), vec![2, 1, 0, 0]);

        let changes = toggles.flush(&mut rows);
        assert_eq!(
            changes,
            vec![
                ToggleChange::Removed("b".into()),
                ToggleChange::Added("d".into())
            ]
        );
        assert_eq!(counts(&rows), vec![1, 0, 0, 1]);
        assert!(toggles.flush(&mut rows).is_empty());
    }

    #[test]
    fn shared_ancestors_are_left_alone() {
        let mut rows =
            RowSequence::from_outline([(1, "a"), (2, "b"), (3, "c"), (2, "d")]).unwrap();
        let mut toggles = AncestorToggles::new(ids(&["a", "b"]), 1);

        toggles.apply(ids(&["a", "d"]), &mut rows);
        assert_eq!(counts(&rows), vec![3, 0, 0, 1]);
    }

    #[test]
    fn new_toggle_starts_expanded() {
        let mut rows = RowSequence::from_outline([(1, "a"), (1, "b")]).unwrap();
        rows.rows_mut()[0].collapsed = true;
        let mut toggles = AncestorToggles::new(Vec::new(), 2);

        toggles.apply(ids(&["a"]), &mut rows);
        assert!(!rows.rows()[0].collapsed);
        assert_eq!(rows.rows()[0].descendant_count, 2);
    }

    #[test]
    fn returning_to_the_origin_is_neutral() {
        let mut rows =
            RowSequence::from_outline([(1, "a"), (2, "b"), (1, "c"), (1, "d")]).unwrap();
        let original = counts(&rows);
        let mut toggles = AncestorToggles::new(ids(&["a"]), 1);

        for chain in [ids(&["c"]), ids(&["d"]), Vec::new(), ids(&["c"])] {
            toggles.schedule(chain);
            toggles.flush(&mut rows);
        }
        toggles.apply(ids(&["a"]), &mut rows);
        assert_eq!(counts(&rows), original);
    }
}
