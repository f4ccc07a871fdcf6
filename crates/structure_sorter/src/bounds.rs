use std::ops::RangeInclusive;

/// The legal nesting levels a dragged subtree may adopt at one gap.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LevelBounds {
    pub min: usize,
    pub max: usize,
}

impl LevelBounds {
    #[inline]
    pub fn contains(&self, level: usize) -> bool {
        level >= self.min && level <= self.max
    }

    #[inline]
    pub fn levels(&self) -> RangeInclusive<usize> {
        self.min..=self.max
    }

    pub fn clamp(&self, level: usize) -> usize {
        level.max(self.min).min(self.max)
    }
}

/// Compute the level bounds of the gap between `prev_level` and `next_level`.
///
/// `None` means the gap cannot take the draggee at all: its subtree would end up deeper
/// than `max_levels`. A `max_levels` of `None` or `Some(0)` means unlimited nesting.
pub fn level_bounds(
    prev_level: Option<usize>,
    next_level: Option<usize>,
    level_delta: usize,
    max_levels: Option<usize>,
) -> Option<LevelBounds> {
    let min = next_level.unwrap_or(1);
    let mut max = prev_level.map_or(1, |level| level + 1);

    if let Some(max_levels) = max_levels.filter(|max_levels| *max_levels > 0) {
        if min != 1 && min + level_delta > max_levels {
            return None;
        }
        max = max.min(max_levels.saturating_sub(level_delta));
    }
    if max < min {
        max = min;
    }

    Some(LevelBounds { min, max })
}
