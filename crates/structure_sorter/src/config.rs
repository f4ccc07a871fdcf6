use gpui::{Pixels, px};
use serde::{Deserialize, Serialize};

use crate::SorterError;

/// Tuning for one structure listing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SorterConfig {
    /// Deepest level any row may reach. `None` and `Some(0)` both mean unlimited.
    pub max_levels: Option<usize>,
    /// Horizontal step between two levels, in pixels.
    pub indent_width: f32,
    /// Left edge of top-level rows, in pixels.
    pub indent_offset: f32,
    pub row_height: f32,
    /// How far the drag helper may stray from the snapped level's indent.
    pub magnet_give: f32,
    /// Vertical slack used when deciding which row the cursor has entered.
    pub hover_epsilon: f32,
}

impl Default for SorterConfig {
    fn default() -> Self {
        Self {
            max_levels: None,
            indent_width: 16.,
            indent_offset: 12.,
            row_height: 28.,
            magnet_give: 10.,
            hover_epsilon: 4.,
        }
    }
}

impl SorterConfig {
    pub fn from_json(json: &str) -> Result<Self, SorterError> {
        Ok(serde_json::from_str(json)?)
    }

    /// The depth ceiling, if any.
    pub fn max_levels(&self) -> Option<usize> {
        self.max_levels.filter(|max_levels| *max_levels > 0)
    }

    pub fn indent_width_px(&self) -> Pixels {
        px(self.indent_width)
    }

    pub fn indent_offset_px(&self) -> Pixels {
        px(self.indent_offset)
    }

    pub fn row_height_px(&self) -> Pixels {
        px(self.row_height)
    }

    pub fn magnet_give_px(&self) -> Pixels {
        px(self.magnet_give.max(0.))
    }

    pub fn hover_epsilon_px(&self) -> Pixels {
        px(self.hover_epsilon.max(0.))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = SorterConfig::from_json(r#"{ "maxLevels": 3, "indentWidth": 24 }"#).unwrap();
        assert_eq!(config.max_levels(), Some(3));
        assert_eq!(config.indent_width, 24.);
        assert_eq!(config.row_height, 28.);
    }

    #[test]
    fn zero_max_levels_is_unlimited() {
        let config = SorterConfig::from_json(r#"{ "maxLevels": 0 }"#).unwrap();
        assert_eq!(config.max_levels(), None);
        assert_eq!(SorterConfig::default().max_levels(), None);
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(matches!(
            SorterConfig::from_json("{ maxLevels: }"),
            Err(SorterError::Config(_))
        ));
    }
}
