//! Core data model for composer documents.
//!
//! A document is a strict ownership tree (episodes → pages → panels →
//! objects) with one exception: asset placements hold a non-owning
//! reference into the document-global asset library. Objects are a tagged
//! union (`SceneObject`) sharing a common geometry (`HasGeometry`) so the
//! interaction engine can treat "anything with a box" uniformly while the
//! compositor dispatches on the kind.

use crate::config::ComposerConfig;
use crate::geometry::{MinSize, Rect};
use crate::id::{AssetId, EpisodeId, GroupId, ObjectId, PageId, PanelId};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

// ─── Colors ──────────────────────────────────────────────────────────────

/// RGBA color. Stored as 4 × f32 [0.0, 1.0].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

/// Helper to parse a single hex digit.
fn hex_val(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

impl Color {
    pub const BLACK: Color = Color::rgba(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Color = Color::rgba(1.0, 1.0, 1.0, 1.0);

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Parse `#RGB`, `#RRGGBB` or `#RRGGBBAA`. The `#` is optional.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        let bytes = hex.as_bytes();
        let pair = |i: usize| -> Option<f32> {
            Some((hex_val(bytes[i])? << 4 | hex_val(bytes[i + 1])?) as f32 / 255.0)
        };

        match bytes.len() {
            3 => {
                let r = hex_val(bytes[0])?;
                let g = hex_val(bytes[1])?;
                let b = hex_val(bytes[2])?;
                Some(Self::rgba(
                    (r * 17) as f32 / 255.0,
                    (g * 17) as f32 / 255.0,
                    (b * 17) as f32 / 255.0,
                    1.0,
                ))
            }
            6 => Some(Self::rgba(pair(0)?, pair(2)?, pair(4)?, 1.0)),
            8 => Some(Self::rgba(pair(0)?, pair(2)?, pair(4)?, pair(6)?)),
            _ => None,
        }
    }

    /// Emit as `#RRGGBB`, or `#RRGGBBAA` when not fully opaque.
    pub fn to_hex(&self) -> String {
        let [r, g, b, a] = self.to_rgba8();
        if a == 255 {
            format!("#{r:02X}{g:02X}{b:02X}")
        } else {
            format!("#{r:02X}{g:02X}{b:02X}{a:02X}")
        }
    }

    pub fn to_rgba8(&self) -> [u8; 4] {
        let q = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b), q(self.a)]
    }
}

// ─── Path data ───────────────────────────────────────────────────────────

/// A single path command (SVG-like but simplified).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PathCmd {
    MoveTo(f32, f32),
    LineTo(f32, f32),
    QuadTo(f32, f32, f32, f32),            // control, end
    CubicTo(f32, f32, f32, f32, f32, f32), // c1, c2, end
    Close,
}

// ─── Font ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontSpec {
    pub family: String,
    pub weight: u16, // 100..900
    pub italic: bool,
    pub size: f32,
}

impl Default for FontSpec {
    fn default() -> Self {
        Self {
            family: "Comic Neue".into(),
            weight: 400,
            italic: false,
            size: 24.0,
        }
    }
}

impl FontSpec {
    pub fn is_bold(&self) -> bool {
        self.weight >= 600
    }
}

// ─── Geometry shared by every object ─────────────────────────────────────

/// Box, rotation and flips. Rotation is in degrees, clockwise, about the
/// box center, normalized to `[0, 360)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub rotation: f32,
    pub flip_h: bool,
    pub flip_v: bool,
}

impl Geometry {
    pub fn from_rect(rect: Rect) -> Self {
        Self {
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
            ..Default::default()
        }
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    pub fn set_bounds(&mut self, rect: Rect) {
        self.x = rect.x;
        self.y = rect.y;
        self.width = rect.width;
        self.height = rect.height;
    }

    pub fn center(&self) -> (f32, f32) {
        self.bounds().center()
    }
}

/// Anything placed in a panel with a box.
pub trait HasGeometry {
    fn id(&self) -> ObjectId;
    fn panel_id(&self) -> PanelId;
    fn geometry(&self) -> &Geometry;
    fn geometry_mut(&mut self) -> &mut Geometry;
    fn z_index(&self) -> Option<i32>;
    fn is_hidden(&self) -> bool;
}

// ─── Bubbles ─────────────────────────────────────────────────────────────

/// Bubble style variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BubbleType {
    #[default]
    Speech,
    RoughSpeech,
    HalftoneSpeech,
    Thought,
    Whisper,
    Shout,
    Sfx,
    Rectangle,
    RoundedRectangle,
    Oval,
}

/// Silhouette generator a bubble type maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeFamily {
    Ellipse,
    Rough,
    Cloud,
    Burst,
    Box,
}

impl BubbleType {
    pub const ALL: [BubbleType; 10] = [
        BubbleType::Speech,
        BubbleType::RoughSpeech,
        BubbleType::HalftoneSpeech,
        BubbleType::Thought,
        BubbleType::Whisper,
        BubbleType::Shout,
        BubbleType::Sfx,
        BubbleType::Rectangle,
        BubbleType::RoundedRectangle,
        BubbleType::Oval,
    ];

    pub fn family(self) -> ShapeFamily {
        match self {
            BubbleType::Speech
            | BubbleType::HalftoneSpeech
            | BubbleType::Whisper
            | BubbleType::Oval => ShapeFamily::Ellipse,
            BubbleType::RoughSpeech => ShapeFamily::Rough,
            BubbleType::Thought => ShapeFamily::Cloud,
            BubbleType::Shout | BubbleType::Sfx => ShapeFamily::Burst,
            BubbleType::Rectangle | BubbleType::RoundedRectangle => ShapeFamily::Box,
        }
    }

    /// Shout and sfx are self-contained bursts and never carry a tail.
    pub fn supports_tail(self) -> bool {
        !matches!(self, BubbleType::Shout | BubbleType::Sfx)
    }

    /// Bubble text weight: bold for bursts, normal otherwise.
    pub fn is_bold(self) -> bool {
        matches!(self, BubbleType::Shout | BubbleType::Sfx)
    }

    pub fn min_size(self, config: &ComposerConfig) -> MinSize {
        match self.family() {
            ShapeFamily::Ellipse | ShapeFamily::Rough | ShapeFamily::Cloud => {
                config.min_ellipse_bubble
            }
            ShapeFamily::Burst => config.min_burst_bubble,
            ShapeFamily::Box => config.min_rect_bubble,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TailDirection {
    BottomLeft,
    BottomRight,
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum FontSizePolicy {
    /// Derived from text length and box area on every render.
    #[default]
    Auto,
    Fixed(f32),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bubble {
    pub id: ObjectId,
    pub panel_id: PanelId,
    pub geometry: Geometry,
    pub z_index: Option<i32>,
    #[serde(default)]
    pub hidden: bool,
    pub bubble_type: BubbleType,
    pub tail: Option<TailDirection>,
    pub text: String,
    pub font_size: FontSizePolicy,
    /// White text on a black body.
    #[serde(default)]
    pub inverted: bool,
}

impl Bubble {
    /// Whether a tail is drawn: present and supported by the type.
    pub fn renders_tail(&self) -> Option<TailDirection> {
        self.tail.filter(|_| self.bubble_type.supports_tail())
    }
}

// ─── Text elements ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextStroke {
    pub width: f32,
    pub color: Color,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextElement {
    pub id: ObjectId,
    pub panel_id: PanelId,
    pub geometry: Geometry,
    pub z_index: Option<i32>,
    #[serde(default)]
    pub hidden: bool,
    pub text: String,
    pub font: FontSpec,
    pub color: Color,
    pub stroke: Option<TextStroke>,
    pub background: Option<Color>,
}

// ─── Assets ──────────────────────────────────────────────────────────────

/// An entry in the document-global asset library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub id: AssetId,
    pub name: String,
    /// Content reference returned by the asset store (URL or equivalent).
    pub source: String,
}

/// One placement of a library asset inside a panel. The same asset may be
/// placed many times with independent transforms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetPlacement {
    pub id: ObjectId,
    pub panel_id: PanelId,
    pub asset_id: AssetId,
    pub geometry: Geometry,
    pub z_index: Option<i32>,
    #[serde(default)]
    pub hidden: bool,
}

// ─── Scene objects ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    Bubble,
    Text,
    Asset,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SceneObject {
    Bubble(Bubble),
    Text(TextElement),
    Asset(AssetPlacement),
}

impl SceneObject {
    pub fn kind(&self) -> ObjectKind {
        match self {
            SceneObject::Bubble(_) => ObjectKind::Bubble,
            SceneObject::Text(_) => ObjectKind::Text,
            SceneObject::Asset(_) => ObjectKind::Asset,
        }
    }

    pub(crate) fn set_id(&mut self, id: ObjectId) {
        match self {
            SceneObject::Bubble(b) => b.id = id,
            SceneObject::Text(t) => t.id = id,
            SceneObject::Asset(a) => a.id = id,
        }
    }

    pub(crate) fn set_panel(&mut self, panel: PanelId) {
        match self {
            SceneObject::Bubble(b) => b.panel_id = panel,
            SceneObject::Text(t) => t.panel_id = panel,
            SceneObject::Asset(a) => a.panel_id = panel,
        }
    }

    pub(crate) fn set_z_index(&mut self, z: Option<i32>) {
        match self {
            SceneObject::Bubble(b) => b.z_index = z,
            SceneObject::Text(t) => t.z_index = z,
            SceneObject::Asset(a) => a.z_index = z,
        }
    }

    pub(crate) fn set_hidden(&mut self, hidden: bool) {
        match self {
            SceneObject::Bubble(b) => b.hidden = hidden,
            SceneObject::Text(t) => t.hidden = hidden,
            SceneObject::Asset(a) => a.hidden = hidden,
        }
    }

    /// Minimum box for this object under `config`.
    pub fn min_size(&self, config: &ComposerConfig) -> MinSize {
        match self {
            SceneObject::Bubble(b) => b.bubble_type.min_size(config),
            SceneObject::Text(_) | SceneObject::Asset(_) => config.min_object,
        }
    }

    pub fn as_bubble(&self) -> Option<&Bubble> {
        match self {
            SceneObject::Bubble(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&TextElement> {
        match self {
            SceneObject::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_asset(&self) -> Option<&AssetPlacement> {
        match self {
            SceneObject::Asset(a) => Some(a),
            _ => None,
        }
    }
}

impl HasGeometry for SceneObject {
    fn id(&self) -> ObjectId {
        match self {
            SceneObject::Bubble(b) => b.id,
            SceneObject::Text(t) => t.id,
            SceneObject::Asset(a) => a.id,
        }
    }

    fn panel_id(&self) -> PanelId {
        match self {
            SceneObject::Bubble(b) => b.panel_id,
            SceneObject::Text(t) => t.panel_id,
            SceneObject::Asset(a) => a.panel_id,
        }
    }

    fn geometry(&self) -> &Geometry {
        match self {
            SceneObject::Bubble(b) => &b.geometry,
            SceneObject::Text(t) => &t.geometry,
            SceneObject::Asset(a) => &a.geometry,
        }
    }

    fn geometry_mut(&mut self) -> &mut Geometry {
        match self {
            SceneObject::Bubble(b) => &mut b.geometry,
            SceneObject::Text(t) => &mut t.geometry,
            SceneObject::Asset(a) => &mut a.geometry,
        }
    }

    fn z_index(&self) -> Option<i32> {
        match self {
            SceneObject::Bubble(b) => b.z_index,
            SceneObject::Text(t) => t.z_index,
            SceneObject::Asset(a) => a.z_index,
        }
    }

    fn is_hidden(&self) -> bool {
        match self {
            SceneObject::Bubble(b) => b.hidden,
            SceneObject::Text(t) => t.hidden,
            SceneObject::Asset(a) => a.hidden,
        }
    }
}

/// Partial attribute update for `SceneGraph::update_object`.
///
/// `None` leaves a field untouched. Kind-specific fields are ignored for
/// objects of another kind. Nullable attributes use `Option<Option<_>>`
/// so they can be cleared.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectPatch {
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub rotation: Option<f32>,
    pub flip_h: Option<bool>,
    pub flip_v: Option<bool>,
    pub z_index: Option<Option<i32>>,
    pub hidden: Option<bool>,
    pub text: Option<String>,

    pub bubble_type: Option<BubbleType>,
    pub tail: Option<Option<TailDirection>>,
    pub font_size: Option<FontSizePolicy>,
    pub inverted: Option<bool>,

    pub font: Option<FontSpec>,
    pub color: Option<Color>,
    pub stroke: Option<Option<TextStroke>>,
    pub background: Option<Option<Color>>,
}

impl ObjectPatch {
    pub fn position(x: f32, y: f32) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            ..Default::default()
        }
    }

    pub fn bounds(rect: Rect) -> Self {
        Self {
            x: Some(rect.x),
            y: Some(rect.y),
            width: Some(rect.width),
            height: Some(rect.height),
            ..Default::default()
        }
    }

    pub fn rotation(deg: f32) -> Self {
        Self {
            rotation: Some(deg),
            ..Default::default()
        }
    }

    /// Merge into `object`.
    pub fn apply(&self, object: &mut SceneObject) {
        let g = object.geometry_mut();
        if let Some(v) = self.x {
            g.x = v;
        }
        if let Some(v) = self.y {
            g.y = v;
        }
        if let Some(v) = self.width {
            g.width = v;
        }
        if let Some(v) = self.height {
            g.height = v;
        }
        if let Some(v) = self.rotation {
            g.rotation = crate::geometry::normalize_degrees(v);
        }
        if let Some(v) = self.flip_h {
            g.flip_h = v;
        }
        if let Some(v) = self.flip_v {
            g.flip_v = v;
        }
        if let Some(v) = self.z_index {
            object.set_z_index(v);
        }
        if let Some(v) = self.hidden {
            object.set_hidden(v);
        }

        match object {
            SceneObject::Bubble(b) => {
                if let Some(v) = &self.text {
                    b.text.clone_from(v);
                }
                if let Some(v) = self.bubble_type {
                    b.bubble_type = v;
                }
                if let Some(v) = self.tail {
                    b.tail = v;
                }
                if let Some(v) = self.font_size {
                    b.font_size = v;
                }
                if let Some(v) = self.inverted {
                    b.inverted = v;
                }
            }
            SceneObject::Text(t) => {
                if let Some(v) = &self.text {
                    t.text.clone_from(v);
                }
                if let Some(v) = &self.font {
                    t.font = v.clone();
                }
                if let Some(v) = self.color {
                    t.color = v;
                }
                if let Some(v) = self.stroke {
                    t.stroke = v;
                }
                if let Some(v) = self.background {
                    t.background = v;
                }
            }
            SceneObject::Asset(_) => {}
        }
    }
}

// ─── Groups ──────────────────────────────────────────────────────────────

/// Objects that move together. An object belongs to at most one group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub members: SmallVec<[ObjectId; 4]>,
}

// ─── Mask ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaskDot {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
}

/// A freehand-painted selection region, kept apart from the object graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mask {
    pub dots: Vec<MaskDot>,
}

impl Mask {
    pub fn stamp(&mut self, x: f32, y: f32, radius: f32) {
        self.dots.push(MaskDot { x, y, radius });
    }

    /// Remove every dot whose center lies within `radius` of `(x, y)`.
    /// Returns how many were removed.
    pub fn erase(&mut self, x: f32, y: f32, radius: f32) -> usize {
        let before = self.dots.len();
        let r2 = radius * radius;
        self.dots.retain(|d| {
            let dx = d.x - x;
            let dy = d.y - y;
            dx * dx + dy * dy > r2
        });
        before - self.dots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dots.is_empty()
    }
}

// ─── Document structure ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    pub id: EpisodeId,
    pub title: String,
    pub order: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: PageId,
    pub episode_id: EpisodeId,
    pub order: i32,
    pub width: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizePreset {
    #[default]
    Wide,
    Square,
    Tall,
    Custom,
}

impl SizePreset {
    /// Default panel height for a page of `width`.
    pub fn default_height(self, width: f32) -> f32 {
        match self {
            SizePreset::Wide => (width * 0.5).round(),
            SizePreset::Square => width,
            SizePreset::Tall => (width * 1.5).round(),
            SizePreset::Custom => (width * 0.75).round(),
        }
    }
}

/// Script metadata attached to a panel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelMeta {
    pub title: String,
    pub characters: Vec<String>,
    pub location: String,
    pub time: String,
    pub stage_direction: String,
    pub dialogue: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStatus {
    #[default]
    Pending,
    Generating,
    Done,
    Failed,
}

/// How a multi-scene panel is split into sub-rectangles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneLayout {
    #[default]
    Grid,
    Sequence,
    Dynamic,
}

/// A sub-region of a panel with its own generated image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub id: ObjectId,
    pub description: String,
    pub rect: Rect,
    pub status: GenerationStatus,
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Panel {
    pub id: PanelId,
    pub page_id: PageId,
    pub order: i32,
    pub height: f32,
    pub size_preset: SizePreset,
    #[serde(default)]
    pub meta: PanelMeta,
    /// Content reference of the background raster.
    pub background: Option<String>,
    #[serde(default)]
    pub scene_layout: SceneLayout,
    #[serde(default)]
    pub scenes: Vec<Scene>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_hex_roundtrip() {
        let c = Color::from_hex("#6C5CE7").unwrap();
        assert_eq!(c.to_hex(), "#6C5CE7");

        let c2 = Color::from_hex("#FF000080").unwrap();
        assert!((c2.a - 128.0 / 255.0).abs() < 0.01);
        assert_eq!(c2.to_hex().len(), 9);

        assert_eq!(Color::from_hex("fff").unwrap(), Color::WHITE);
        assert!(Color::from_hex("#12345").is_none());
    }

    #[test]
    fn tail_support_excludes_bursts() {
        for ty in BubbleType::ALL {
            let expected = !matches!(ty, BubbleType::Shout | BubbleType::Sfx);
            assert_eq!(ty.supports_tail(), expected, "{ty:?}");
        }
    }

    #[test]
    fn ellipse_family_minimum() {
        let config = ComposerConfig::default();
        assert_eq!(
            BubbleType::Speech.min_size(&config),
            MinSize::new(160.0, 72.0)
        );
        assert_eq!(
            BubbleType::Thought.min_size(&config),
            MinSize::new(160.0, 72.0)
        );
    }

    #[test]
    fn patch_ignores_foreign_fields() {
        let mut obj = SceneObject::Asset(AssetPlacement {
            id: ObjectId::intern("asset_patch"),
            panel_id: ObjectId::intern("panel_patch"),
            asset_id: ObjectId::intern("lib_patch"),
            geometry: Geometry::from_rect(Rect::new(10.0, 10.0, 50.0, 50.0)),
            z_index: None,
            hidden: false,
        });
        let patch = ObjectPatch {
            x: Some(30.0),
            text: Some("ignored".into()),
            rotation: Some(-90.0),
            ..Default::default()
        };
        patch.apply(&mut obj);
        assert_eq!(obj.geometry().x, 30.0);
        assert_eq!(obj.geometry().rotation, 270.0);
    }

    #[test]
    fn mask_erase_removes_within_radius() {
        let mut mask = Mask::default();
        mask.stamp(0.0, 0.0, 5.0);
        mask.stamp(10.0, 0.0, 5.0);
        mask.stamp(40.0, 0.0, 5.0);
        assert_eq!(mask.erase(5.0, 0.0, 6.0), 2);
        assert_eq!(mask.dots.len(), 1);
        assert_eq!(mask.dots[0].x, 40.0);
    }
}
