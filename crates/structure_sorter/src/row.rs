use std::ops::Range;

use gpui::SharedString;

use crate::SorterError;

/// Stable identifier of a rendered row.
pub type RowId = SharedString;

/// One rendered line of the structure listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Row {
    pub id: RowId,
    pub label: SharedString,
    /// Nesting depth, `1` is top level.
    pub level: usize,
    /// Rendered descendants count. Only used to show or hide the expand toggle.
    pub descendant_count: usize,
    pub collapsed: bool,
    /// Locale/variant tag of the underlying entity, passed through verbatim to the server.
    pub site: Option<SharedString>,
}

impl Row {
    pub fn new(id: impl Into<RowId>, level: usize) -> Self {
        let id = id.into();
        Self {
            label: id.clone(),
            id,
            level,
            descendant_count: 0,
            collapsed: false,
            site: None,
        }
    }

    pub fn label(mut self, label: impl Into<SharedString>) -> Self {
        self.label = label.into();
        self
    }

    pub fn descendant_count(mut self, count: usize) -> Self {
        self.descendant_count = count;
        self
    }

    pub fn collapsed(mut self, collapsed: bool) -> Self {
        self.collapsed = collapsed;
        self
    }

    pub fn site(mut self, site: impl Into<SharedString>) -> Self {
        self.site = Some(site.into());
        self
    }

    #[inline]
    pub fn has_toggle(&self) -> bool {
        self.descendant_count > 0
    }
}

/// The rendered rows of a structure, in depth-first pre-order.
///
/// A row's descendants are the maximal run of rows right after it whose level is
/// strictly greater than its own.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RowSequence {
    rows: Vec<Row>,
    more_pending: bool,
}

impl RowSequence {
    pub fn new(rows: impl Into<Vec<Row>>) -> Result<Self, SorterError> {
        let rows = rows.into();
        validate(&rows)?;
        Ok(Self {
            rows,
            more_pending: false,
        })
    }

    /// Build the sequence from a `(level, id)` outline, mostly useful in tests and demos.
    pub fn from_outline<'a>(
        outline: impl IntoIterator<Item = (usize, &'a str)>,
    ) -> Result<Self, SorterError> {
        let mut rows: Vec<Row> = outline
            .into_iter()
            .map(|(level, id)| Row::new(SharedString::from(id.to_string()), level))
            .collect();
        for ix in 0..rows.len() {
            let level = rows[ix].level;
            rows[ix].descendant_count = rows[ix + 1..]
                .iter()
                .take_while(|row| row.level > level)
                .count();
        }
        Self::new(rows)
    }

    #[inline]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[inline]
    pub fn get(&self, ix: usize) -> Option<&Row> {
        self.rows.get(ix)
    }

    pub fn position(&self, id: &RowId) -> Option<usize> {
        self.rows.iter().position(|row| row.id == *id)
    }

    pub fn row(&self, id: &RowId) -> Option<&Row> {
        self.rows.iter().find(|row| row.id == *id)
    }

    pub(crate) fn row_mut(&mut self, id: &RowId) -> Option<&mut Row> {
        self.rows.iter_mut().find(|row| row.id == *id)
    }

    /// Whether the server still has rows after the last rendered one.
    #[inline]
    pub fn has_more_pending(&self) -> bool {
        self.more_pending
    }

    pub fn set_more_pending(&mut self, more_pending: bool) {
        self.more_pending = more_pending;
    }

    /// Index one past the last descendant of `ix`.
    pub fn subtree_end(&self, ix: usize) -> usize {
        let Some(start) = self.rows.get(ix) else {
            return self.rows.len();
        };
        let mut end = ix + 1;
        while end < self.rows.len() && self.rows[end].level > start.level {
            end += 1;
        }
        end
    }

    /// The contiguous descendant run of `ix`, possibly empty.
    pub fn descendant_run(&self, ix: usize) -> Range<usize> {
        if ix >= self.rows.len() {
            return self.rows.len()..self.rows.len();
        }
        ix + 1..self.subtree_end(ix)
    }

    /// Existing ancestors of `ix`, root first, stopping once `up_to_level` is reached.
    ///
    /// Pass `0` to collect the whole chain.
    pub fn ancestor_chain(&self, ix: usize, up_to_level: usize) -> Vec<usize> {
        let Some(row) = self.rows.get(ix) else {
            return Vec::new();
        };
        self.collect_ancestors(ix, row.level, up_to_level, 0..0)
    }

    /// Ancestors a row at `level` would get if it were inserted right before `gap`,
    /// ignoring the rows in `skip`.
    pub fn ancestors_at(&self, gap: usize, level: usize, skip: Range<usize>) -> Vec<usize> {
        self.collect_ancestors(gap.min(self.rows.len()), level, 0, skip)
    }

    fn collect_ancestors(
        &self,
        before: usize,
        level: usize,
        up_to_level: usize,
        skip: Range<usize>,
    ) -> Vec<usize> {
        let mut chain = Vec::new();
        let mut current = level;
        let mut ix = before;
        while ix > 0 && current > up_to_level && current > 0 {
            ix -= 1;
            if skip.contains(&ix) {
                continue;
            }
            if self.rows[ix].level < current {
                current = self.rows[ix].level;
                if current <= up_to_level {
                    break;
                }
                chain.push(ix);
            }
        }
        chain.reverse();
        chain
    }

    /// Indices of rows not hidden under a collapsed ancestor, in order.
    pub fn visible_indices(&self) -> Vec<usize> {
        let mut visible = Vec::with_capacity(self.rows.len());
        let mut hidden_below: Option<usize> = None;
        for (ix, row) in self.rows.iter().enumerate() {
            if hidden_below.is_some_and(|level| row.level > level) {
                continue;
            }
            hidden_below = row.collapsed.then_some(row.level);
            visible.push(ix);
        }
        visible
    }

    /// Whether `ix` heads the final block of rows, i.e. nothing rendered follows its subtree.
    pub fn is_last_block(&self, ix: usize) -> bool {
        ix < self.rows.len() && self.subtree_end(ix) == self.rows.len()
    }

    pub(crate) fn rows_mut(&mut self) -> &mut Vec<Row> {
        &mut self.rows
    }

    pub(crate) fn restore(&mut self, rows: Vec<Row>) {
        self.rows = rows;
    }

    pub(crate) fn extend(&mut self, rows: Vec<Row>) -> Result<(), SorterError> {
        let previous = self.rows.last().map(|row| row.level).unwrap_or(0);
        validate_from(&rows, previous, self.rows.len())?;
        self.rows.extend(rows);
        Ok(())
    }

    /// Indented outline of the rows, one id per line.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for row in &self.rows {
            out.push_str(&"  ".repeat(row.level.saturating_sub(1)));
            out.push_str(row.id.as_str());
            out.push('\n');
        }
        out
    }
}

fn validate(rows: &[Row]) -> Result<(), SorterError> {
    validate_from(rows, 0, 0)
}

pub(crate) fn validate_from(
    rows: &[Row],
    mut previous: usize,
    offset: usize,
) -> Result<(), SorterError> {
    for (ix, row) in rows.iter().enumerate() {
        if row.level == 0 || row.level > previous + 1 {
            return Err(SorterError::InvalidSequence {
                index: offset + ix,
                level: row.level,
                previous,
            });
        }
        previous = row.level;
    }
    Ok(())
}

/// The row being dragged together with its descendant run, captured at drag start.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Draggee {
    id: RowId,
    range: Range<usize>,
    level: usize,
    level_delta: Option<usize>,
}

impl Draggee {
    pub fn capture(rows: &RowSequence, ix: usize) -> Option<Self> {
        let row = rows.get(ix)?;
        let range = ix..rows.subtree_end(ix);
        let deepest = rows.rows()[range.clone()]
            .iter()
            .map(|row| row.level)
            .max()
            .unwrap_or(row.level);
        // More rows of this subtree may still be on the server.
        let level_delta = if rows.has_more_pending() && rows.is_last_block(ix) {
            None
        } else {
            Some(deepest - row.level)
        };
        Some(Self {
            id: row.id.clone(),
            range,
            level: row.level,
            level_delta,
        })
    }

    #[inline]
    pub fn id(&self) -> &RowId {
        &self.id
    }

    /// Rows covered by the draggee in the sequence it was captured from.
    #[inline]
    pub fn range(&self) -> Range<usize> {
        self.range.clone()
    }

    #[inline]
    pub fn root_ix(&self) -> usize {
        self.range.start
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.range.len()
    }

    #[inline]
    pub fn level(&self) -> usize {
        self.level
    }

    /// Depth of the subtree below the root, `None` while it is still being looked up.
    #[inline]
    pub fn level_delta(&self) -> Option<usize> {
        self.level_delta
    }

    pub(crate) fn resolve_level_delta(&mut self, level_delta: usize) {
        self.level_delta = Some(level_delta);
    }

    #[inline]
    pub fn contains(&self, ix: usize) -> bool {
        self.range.contains(&ix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outline() -> RowSequence {
        RowSequence::from_outline([(1, "a"), (2, "b"), (3, "c"), (2, "d"), (1, "e")]).unwrap()
    }

    #[test]
    fn descendant_run_stops_at_same_level() {
        let rows = outline();
        assert_eq!(rows.descendant_run(0), 1..4);
        assert_eq!(rows.descendant_run(1), 2..3);
        assert_eq!(rows.descendant_run(4), 5..5);
        assert_eq!(rows.descendant_run(0), rows.descendant_run(0));
    }

    #[test]
    fn ancestor_chain_is_root_first() {
        let rows = outline();
        assert!(rows.ancestor_chain(4, 0).is_empty());
        assert_eq!(rows.ancestor_chain(2, 0), vec![0, 1]);
        assert_eq!(rows.ancestor_chain(3, 0), vec![0]);
        assert_eq!(rows.ancestor_chain(2, 1), vec![1]);
    }

    #[test]
    fn ancestors_at_skips_rows() {
        let rows = outline();
        // a level-3 row placed right before `e`, with `b`'s subtree ignored
        assert_eq!(rows.ancestors_at(4, 3, 1..3), vec![0, 3]);
        assert_eq!(rows.ancestors_at(5, 1, 0..0), Vec::<usize>::new());
    }

    #[test]
    fn from_outline_counts_children() {
        let rows = outline();
        let counts: Vec<_> = rows.rows().iter().map(|row| row.descendant_count).collect();
        assert_eq!(counts, vec![3, 1, 0, 0, 0]);
    }

    #[test]
    fn rejects_level_jumps() {
        let err = RowSequence::from_outline([(1, "a"), (3, "b")]).unwrap_err();
        assert!(matches!(
            err,
            SorterError::InvalidSequence {
                index: 1,
                level: 3,
                previous: 1
            }
        ));
        assert!(RowSequence::from_outline([(2, "a")]).is_err());
        assert!(RowSequence::from_outline([(1, "a"), (0, "b")]).is_err());
    }

    #[test]
    fn collapsed_rows_hide_their_descendants() {
        let mut rows = outline();
        assert_eq!(rows.visible_indices(), vec![0, 1, 2, 3, 4]);
        rows.rows_mut()[1].collapsed = true;
        assert_eq!(rows.visible_indices(), vec![0, 1, 3, 4]);
        rows.rows_mut()[0].collapsed = true;
        assert_eq!(rows.visible_indices(), vec![0, 4]);
    }

    #[test]
    fn last_block() {
        let rows = outline();
        assert!(!rows.is_last_block(0));
        assert!(rows.is_last_block(4));
        assert!(!rows.is_last_block(5));
    }

    #[test]
    fn draggee_level_delta() {
        let mut rows = outline();
        let draggee = Draggee::capture(&rows, 0).unwrap();
        assert_eq!(draggee.range(), 0..4);
        assert_eq!(draggee.level_delta(), Some(2));

        rows.set_more_pending(true);
        assert_eq!(Draggee::capture(&rows, 4).unwrap().level_delta(), None);
        assert_eq!(Draggee::capture(&rows, 1).unwrap().level_delta(), Some(1));
    }

    #[test]
    fn dump_indents_by_level() {
        assert_eq!(outline().dump().trim_end(), "a\n  b\n    c\n  d\ne");
    }
}
