use gpui::{Pixels, px};

use crate::RowSequence;

/// Vertical extent of one rendered row, in list content coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RowBounds {
    pub top: Pixels,
    pub height: Pixels,
}

impl RowBounds {
    #[inline]
    pub fn bottom(&self) -> Pixels {
        self.top + self.height
    }

    #[inline]
    pub fn mid(&self) -> Pixels {
        self.top + self.height / 2.0
    }
}

/// Geometry the drag tracker reads, kept apart from any rendering surface.
pub trait LayoutProvider {
    /// Left edge of a row's content at `level`.
    fn indent_for_level(&self, level: usize) -> Pixels;

    /// Bounds of the row at `ix`, `None` when it has no layout.
    fn row_bounds(&self, ix: usize) -> Option<RowBounds>;
}

/// Cached row geometry indexed like the row sequence. Hidden rows have no bounds.
#[derive(Clone, Debug)]
pub struct RowLayout {
    slots: Vec<Option<RowBounds>>,
    content_height: Pixels,
    indent_width: Pixels,
    indent_offset: Pixels,
}

impl RowLayout {
    pub fn new(heights: impl IntoIterator<Item = Pixels>) -> Self {
        Self::with_hidden(heights.into_iter().map(Some))
    }

    /// Stack the visible rows (`Some(height)`) top to bottom, skipping hidden ones.
    pub fn with_hidden(heights: impl IntoIterator<Item = Option<Pixels>>) -> Self {
        let mut slots = Vec::new();
        let mut top = px(0.);
        for height in heights {
            let Some(mut h) = height else {
                slots.push(None);
                continue;
            };
            let hf: f32 = h.into();
            if !hf.is_finite() || hf <= 0.0 {
                h = px(1.);
            }
            slots.push(Some(RowBounds { top, height: h }));
            top = top + h;
        }
        Self {
            slots,
            content_height: top,
            indent_width: px(16.),
            indent_offset: px(12.),
        }
    }

    pub fn uniform(row_count: usize, row_height: Pixels) -> Self {
        Self::new(std::iter::repeat_n(row_height, row_count))
    }

    /// Uniform rows for the visible part of `rows`.
    pub fn for_sequence(rows: &RowSequence, row_height: Pixels) -> Self {
        let mut heights = vec![None; rows.len()];
        for ix in rows.visible_indices() {
            heights[ix] = Some(row_height);
        }
        Self::with_hidden(heights)
    }

    pub fn indent_width(mut self, indent_width: Pixels) -> Self {
        self.indent_width = indent_width;
        self
    }

    pub fn indent_offset(mut self, indent_offset: Pixels) -> Self {
        self.indent_offset = indent_offset;
        self
    }

    #[inline]
    pub fn row_count(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn content_height(&self) -> Pixels {
        self.content_height
    }
}

impl LayoutProvider for RowLayout {
    fn indent_for_level(&self, level: usize) -> Pixels {
        self.indent_offset + self.indent_width * level.saturating_sub(1)
    }

    fn row_bounds(&self, ix: usize) -> Option<RowBounds> {
        self.slots.get(ix).copied().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_rows() {
        let layout = RowLayout::uniform(3, px(20.));
        assert_eq!(layout.row_count(), 3);
        assert_eq!(
            layout.row_bounds(1),
            Some(RowBounds {
                top: px(20.),
                height: px(20.)
            })
        );
        assert_eq!(layout.row_bounds(3), None);
        assert_eq!(layout.content_height(), px(60.));
    }

    #[test]
    fn collapsed_rows_have_no_bounds() {
        let mut rows = RowSequence::from_outline([(1, "a"), (2, "b"), (1, "c")]).unwrap();
        rows.rows_mut()[0].collapsed = true;
        let layout = RowLayout::for_sequence(&rows, px(20.));
        assert_eq!(layout.row_bounds(1), None);
        assert_eq!(layout.row_bounds(2).map(|bounds| bounds.top), Some(px(20.)));
        assert_eq!(layout.content_height(), px(40.));
    }

    #[test]
    fn degenerate_heights_are_clamped() {
        let layout = RowLayout::new([px(10.), px(0.), px(-4.), px(f32::NAN)]);
        assert_eq!(layout.content_height(), px(13.));
    }

    #[test]
    fn indent_steps_per_level() {
        let layout = RowLayout::uniform(0, px(20.))
            .indent_width(px(24.))
            .indent_offset(px(8.));
        assert_eq!(layout.indent_for_level(1), px(8.));
        assert_eq!(layout.indent_for_level(3), px(56.));
    }
}
