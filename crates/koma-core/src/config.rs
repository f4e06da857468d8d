//! Composer tuning knobs.

use crate::error::ConfigError;
use crate::geometry::MinSize;
use serde::{Deserialize, Serialize};

/// Configuration shared by the scene graph, interaction engine and
/// exporter.
///
/// Every field has a default matching the editor's stock behavior, so a
/// partial JSON document (`{"snap_threshold": 6}`) is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposerConfig {
    /// Inner margin objects must stay inside, per panel edge.
    pub panel_margin: f32,

    /// Minimum size for ellipse-family bubbles (speech, oval, halftone,
    /// whisper, rough, thought).
    pub min_ellipse_bubble: MinSize,
    /// Minimum size for rectangle and rounded-rectangle bubbles.
    pub min_rect_bubble: MinSize,
    /// Minimum size for shout/sfx bursts.
    pub min_burst_bubble: MinSize,
    /// Minimum size for text elements and asset placements.
    pub min_object: MinSize,

    /// Distance at which an edge reports a snap guide.
    pub snap_threshold: f32,
    /// Offset applied to duplicates and pasted objects.
    pub duplicate_offset: f32,
    /// Rotation step used when the snap modifier is held, in degrees.
    pub rotation_snap_deg: f32,

    /// Global undo depth; the oldest snapshot is dropped beyond this.
    pub history_depth: usize,
    /// Mask undo depth per panel.
    pub mask_history_depth: usize,

    /// Width of new pages (panels inherit it).
    pub page_width: f32,
    /// Vertical gap between panels in full-page export.
    pub page_gutter: f32,

    pub brush_radius: f32,
    pub eraser_radius: f32,

    /// Auto-fit font size bounds for bubble text.
    pub min_font_size: f32,
    pub max_font_size: f32,

    pub min_zoom: f32,
    pub max_zoom: f32,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            panel_margin: 18.0,
            min_ellipse_bubble: MinSize::new(160.0, 72.0),
            min_rect_bubble: MinSize::new(120.0, 60.0),
            min_burst_bubble: MinSize::new(140.0, 90.0),
            min_object: MinSize::new(24.0, 24.0),
            snap_threshold: 4.0,
            duplicate_offset: 20.0,
            rotation_snap_deg: 15.0,
            history_depth: 100,
            mask_history_depth: 50,
            page_width: 800.0,
            page_gutter: 30.0,
            brush_radius: 18.0,
            eraser_radius: 24.0,
            min_font_size: 10.0,
            max_font_size: 30.0,
            min_zoom: 0.25,
            max_zoom: 4.0,
        }
    }
}

impl ComposerConfig {
    /// Parse a (possibly partial) JSON config.
    ///
    /// # Errors
    /// Returns `ConfigError::Parse` on malformed JSON and
    /// `ConfigError::Invalid` when a bound is inverted or non-positive.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: ComposerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.panel_margin < 0.0 {
            return Err(ConfigError::Invalid("panel_margin must be >= 0".into()));
        }
        if self.min_font_size <= 0.0 || self.min_font_size > self.max_font_size {
            return Err(ConfigError::Invalid(
                "font size bounds must satisfy 0 < min <= max".into(),
            ));
        }
        if self.min_zoom <= 0.0 || self.min_zoom > self.max_zoom {
            return Err(ConfigError::Invalid(
                "zoom bounds must satisfy 0 < min <= max".into(),
            ));
        }
        if self.rotation_snap_deg <= 0.0 {
            return Err(ConfigError::Invalid("rotation_snap_deg must be > 0".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = ComposerConfig::from_json(r#"{ "snap_threshold": 6 }"#).unwrap();
        assert_eq!(config.snap_threshold, 6.0);
        assert_eq!(config.panel_margin, 18.0);
        assert_eq!(config.min_ellipse_bubble, MinSize::new(160.0, 72.0));
    }

    #[test]
    fn inverted_font_bounds_rejected() {
        let err = ComposerConfig::from_json(r#"{ "min_font_size": 40 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn malformed_json_rejected() {
        assert!(matches!(
            ComposerConfig::from_json("{ nope"),
            Err(ConfigError::Parse(_))
        ));
    }
}
