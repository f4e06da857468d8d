//! CPU compositor.
//!
//! Draws one panel onto a `tiny_skia::Pixmap` in a fixed back-to-front
//! order:
//!
//! 1. white panel fill, background raster fit and centered, scene images
//! 2. asset placements
//! 3. bubbles (synthesized layers, then centered wrapped text)
//! 4. text elements (background, 4-way stroke, fill)
//!
//! Within each step objects go by ascending z. Hidden objects are skipped,
//! exactly as in the live view. Missing assets and undecoded images draw
//! nothing.

use crate::export::ExportError;
use crate::fonts::{FontBook, line_path};
use crate::hit::object_transform;
use crate::images::ImageCache;
use crate::text::{layout_centered, resolve_font_size, text_box};
use koma_core::geometry::Rect;
use koma_core::model::*;
use koma_core::shape::{LayerPaint, synthesize_bubble};
use koma_core::{ComposerConfig, PanelId, SceneGraph};
use tiny_skia::{
    FillRule, FilterQuality, LineCap, LineJoin, Mask, Paint, Path, PathBuilder, Pixmap,
    PixmapPaint, Stroke, StrokeDash, Transform,
};

/// Bubble outline width in pixels.
pub const BUBBLE_STROKE: f32 = 3.0;
const WHISPER_DASH: [f32; 2] = [10.0, 6.0];
const HALFTONE_STEP: f32 = 7.0;
const HALFTONE_DOT: f32 = 1.6;
const HALFTONE_ALPHA: f32 = 0.3;
/// Horizontal shear for italic text without an italic face.
const ITALIC_SHEAR: f32 = -0.2;

/// `kurbo` affine → `tiny_skia` transform.
pub fn to_skia(affine: kurbo::Affine) -> Transform {
    let [a, b, c, d, e, f] = affine.as_coeffs();
    Transform::from_row(a as f32, b as f32, c as f32, d as f32, e as f32, f as f32)
}

/// Build a `tiny_skia::Path` from path commands. `None` when empty.
pub fn build_path(cmds: &[PathCmd]) -> Option<Path> {
    let mut pb = PathBuilder::new();
    for cmd in cmds {
        match *cmd {
            PathCmd::MoveTo(x, y) => pb.move_to(x, y),
            PathCmd::LineTo(x, y) => pb.line_to(x, y),
            PathCmd::QuadTo(cx, cy, x, y) => pb.quad_to(cx, cy, x, y),
            PathCmd::CubicTo(c1x, c1y, c2x, c2y, x, y) => pb.cubic_to(c1x, c1y, c2x, c2y, x, y),
            PathCmd::Close => pb.close(),
        }
    }
    pb.finish()
}

fn solid(color: Color) -> Paint<'static> {
    let [r, g, b, a] = color.to_rgba8();
    let mut paint = Paint::default();
    paint.set_color_rgba8(r, g, b, a);
    paint.anti_alias = true;
    paint
}

fn outline_stroke(width: f32, dash: Option<&[f32]>) -> Stroke {
    Stroke {
        width,
        line_cap: LineCap::Round,
        line_join: LineJoin::Round,
        dash: dash.and_then(|d| StrokeDash::new(d.to_vec(), 0.0)),
        ..Stroke::default()
    }
}

/// Everything the compositor reads besides the scene graph.
pub struct Compositor<'a> {
    pub images: &'a ImageCache,
    pub fonts: &'a FontBook,
    pub config: &'a ComposerConfig,
}

impl<'a> Compositor<'a> {
    pub fn new(images: &'a ImageCache, fonts: &'a FontBook, config: &'a ComposerConfig) -> Self {
        Self {
            images,
            fonts,
            config,
        }
    }

    /// Render one panel into a fresh pixmap of its own size.
    pub fn render_panel(&self, graph: &SceneGraph, panel: PanelId) -> Result<Pixmap, ExportError> {
        let bounds = graph
            .panel_bounds(panel)
            .ok_or(ExportError::UnknownPanel(panel))?;
        let (w, h) = (bounds.width.ceil() as u32, bounds.height.ceil() as u32);
        let mut pixmap = Pixmap::new(w, h).ok_or(ExportError::EmptyImage {
            width: w,
            height: h,
        })?;
        self.draw_panel(&mut pixmap, graph, panel, Transform::identity())?;
        Ok(pixmap)
    }

    /// Draw a panel with its origin mapped through `base`. Drawing is
    /// clipped to the panel rectangle so tails cannot bleed into
    /// neighbouring panels.
    pub fn draw_panel(
        &self,
        pixmap: &mut Pixmap,
        graph: &SceneGraph,
        panel_id: PanelId,
        base: Transform,
    ) -> Result<(), ExportError> {
        let panel = graph
            .panel(panel_id)
            .ok_or(ExportError::UnknownPanel(panel_id))?;
        let bounds = graph
            .panel_bounds(panel_id)
            .ok_or(ExportError::UnknownPanel(panel_id))?;

        let Some(rect) = tiny_skia::Rect::from_xywh(0.0, 0.0, bounds.width, bounds.height) else {
            log::debug!("panel {panel_id} has no area");
            return Ok(());
        };
        let clip = Mask::new(pixmap.width(), pixmap.height()).map(|mut m| {
            m.fill_path(&PathBuilder::from_rect(rect), FillRule::Winding, false, base);
            m
        });
        let clip = clip.as_ref();

        // 1. panel fill, background, scenes
        pixmap.fill_rect(rect, &solid(Color::WHITE), base, clip);
        if let Some(source) = &panel.background {
            self.draw_fitted(pixmap, source, bounds, base, clip);
        }
        for scene in &panel.scenes {
            if let Some(source) = &scene.image {
                self.draw_fitted(pixmap, source, scene.rect, base, clip);
            }
        }

        let objects: Vec<&SceneObject> = graph
            .objects_in_panel(panel_id)
            .into_iter()
            .filter(|o| !o.is_hidden())
            .collect();

        // 2. placements
        for placement in objects.iter().filter_map(|o| o.as_asset()) {
            self.draw_placement(pixmap, graph, placement, base, clip);
        }
        // 3. bubbles
        for bubble in objects.iter().filter_map(|o| o.as_bubble()) {
            self.draw_bubble(pixmap, bubble, base, clip);
        }
        // 4. text elements
        for text in objects.iter().filter_map(|o| o.as_text()) {
            self.draw_text_element(pixmap, text, base, clip);
        }
        Ok(())
    }

    /// Scale an image to fit `target` preserving aspect ratio, centered.
    fn draw_fitted(
        &self,
        pixmap: &mut Pixmap,
        source: &str,
        target: Rect,
        base: Transform,
        clip: Option<&Mask>,
    ) {
        let Some(image) = self.images.get(source) else {
            log::debug!("image {source} not loaded; skipped");
            return;
        };
        let (iw, ih) = (image.width() as f32, image.height() as f32);
        let scale = (target.width / iw).min(target.height / ih);
        let (dw, dh) = (iw * scale, ih * scale);
        let t = base
            .pre_translate(
                target.x + (target.width - dw) / 2.0,
                target.y + (target.height - dh) / 2.0,
            )
            .pre_scale(scale, scale);
        pixmap.draw_pixmap(0, 0, image.as_ref(), &image_paint(), t, clip);
    }

    fn draw_placement(
        &self,
        pixmap: &mut Pixmap,
        graph: &SceneGraph,
        placement: &AssetPlacement,
        base: Transform,
        clip: Option<&Mask>,
    ) {
        let Some(asset) = graph.asset(placement.asset_id) else {
            log::debug!(
                "placement {} references missing asset {}",
                placement.id,
                placement.asset_id
            );
            return;
        };
        let Some(image) = self.images.get(&asset.source) else {
            log::debug!("asset {} not loaded; skipped", asset.id);
            return;
        };
        let g = &placement.geometry;
        let t = base
            .pre_concat(to_skia(object_transform(g)))
            .pre_scale(g.width / image.width() as f32, g.height / image.height() as f32);
        pixmap.draw_pixmap(0, 0, image.as_ref(), &image_paint(), t, clip);
    }

    fn draw_bubble(
        &self,
        pixmap: &mut Pixmap,
        bubble: &Bubble,
        base: Transform,
        clip: Option<&Mask>,
    ) {
        let t = base.pre_concat(to_skia(object_transform(&bubble.geometry)));
        let (fill, ink) = if bubble.inverted {
            (Color::BLACK, Color::WHITE)
        } else {
            (Color::WHITE, Color::BLACK)
        };

        let shape = synthesize_bubble(bubble);
        for layer in &shape.layers {
            let Some(path) = build_path(&layer.path) else {
                continue;
            };
            match layer.paint {
                LayerPaint::Fill => {
                    pixmap.fill_path(&path, &solid(fill), FillRule::Winding, t, clip);
                }
                LayerPaint::Stroke => {
                    let stroke = outline_stroke(BUBBLE_STROKE, None);
                    pixmap.stroke_path(&path, &solid(ink), &stroke, t, clip);
                }
                LayerPaint::DashedStroke => {
                    let stroke = outline_stroke(BUBBLE_STROKE, Some(&WHISPER_DASH));
                    pixmap.stroke_path(&path, &solid(ink), &stroke, t, clip);
                }
                LayerPaint::HalftoneFill => {
                    self.draw_halftone(pixmap, &path, bubble, ink, t);
                }
            }
        }

        if bubble.text.trim().is_empty() {
            return;
        }
        let family = FontSpec::default().family;
        let bold = bubble.bubble_type.is_bold();
        let size = resolve_font_size(bubble, self.config);
        let measure = self.fonts.measure(&family);
        let layout = layout_centered(&bubble.text, text_box(bubble), size, bold, &measure);
        self.draw_lines(pixmap, &layout.lines, &family, size, bold, ink, t, clip);
    }

    /// Dot screen clipped to the bubble body.
    fn draw_halftone(
        &self,
        pixmap: &mut Pixmap,
        body: &Path,
        bubble: &Bubble,
        ink: Color,
        t: Transform,
    ) {
        let Some(mut mask) = Mask::new(pixmap.width(), pixmap.height()) else {
            return;
        };
        mask.fill_path(body, FillRule::Winding, true, t);

        let (w, h) = (bubble.geometry.width, bubble.geometry.height);
        let mut pb = PathBuilder::new();
        let mut y = HALFTONE_STEP / 2.0;
        let mut row = 0;
        while y < h {
            // offset alternate rows for a diamond screen
            let mut x = if row % 2 == 0 { HALFTONE_STEP / 2.0 } else { HALFTONE_STEP };
            while x < w {
                pb.push_circle(x, y, HALFTONE_DOT);
                x += HALFTONE_STEP;
            }
            y += HALFTONE_STEP;
            row += 1;
        }
        let Some(dots) = pb.finish() else {
            return;
        };
        let dot_color = Color { a: HALFTONE_ALPHA, ..ink };
        pixmap.fill_path(&dots, &solid(dot_color), FillRule::Winding, t, Some(&mask));
    }

    fn draw_text_element(
        &self,
        pixmap: &mut Pixmap,
        text: &TextElement,
        base: Transform,
        clip: Option<&Mask>,
    ) {
        let g = &text.geometry;
        let mut t = base.pre_concat(to_skia(object_transform(g)));

        if let Some(bg) = text.background
            && let Some(rect) = tiny_skia::Rect::from_xywh(0.0, 0.0, g.width, g.height)
        {
            pixmap.fill_rect(rect, &solid(bg), t, clip);
        }
        if text.text.trim().is_empty() {
            return;
        }
        if text.font.italic {
            // shear about the vertical center so the box stays put
            t = t.pre_concat(Transform::from_row(
                1.0,
                0.0,
                ITALIC_SHEAR,
                1.0,
                -ITALIC_SHEAR * g.height / 2.0,
                0.0,
            ));
        }

        let bold = text.font.is_bold();
        let size = text.font.size;
        let measure = self.fonts.measure(&text.font.family);
        let layout = layout_centered(
            &text.text,
            Rect::new(0.0, 0.0, g.width, g.height),
            size,
            bold,
            &measure,
        );

        if let Some(stroke) = text.stroke {
            let d = stroke.width;
            for (dx, dy) in [(-d, 0.0), (d, 0.0), (0.0, -d), (0.0, d)] {
                self.draw_lines(
                    pixmap,
                    &layout.lines,
                    &text.font.family,
                    size,
                    bold,
                    stroke.color,
                    t.pre_translate(dx, dy),
                    clip,
                );
            }
        }
        self.draw_lines(
            pixmap,
            &layout.lines,
            &text.font.family,
            size,
            bold,
            text.color,
            t,
            clip,
        );
    }

    #[allow(clippy::too_many_arguments)]
    fn draw_lines(
        &self,
        pixmap: &mut Pixmap,
        lines: &[crate::text::LaidLine],
        family: &str,
        size: f32,
        bold: bool,
        color: Color,
        t: Transform,
        clip: Option<&Mask>,
    ) {
        let Some((font, real_bold)) = self.fonts.face(family, bold) else {
            log::debug!("no font registered for {family}; glyphs skipped");
            return;
        };
        let paint = solid(color);
        for line in lines {
            let Some(path) = line_path(font, &line.text, line.x, line.baseline, size) else {
                continue;
            };
            pixmap.fill_path(&path, &paint, FillRule::Winding, t, clip);
            if bold && !real_bold {
                let stroke = outline_stroke(size * 0.05, None);
                pixmap.stroke_path(&path, &paint, &stroke, t, clip);
            }
        }
    }
}

fn image_paint() -> PixmapPaint {
    PixmapPaint {
        quality: FilterQuality::Bilinear,
        ..PixmapPaint::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::images::tests::png_bytes;
    use koma_core::geometry::Viewport;
    use koma_core::scene::{AssetInit, BubbleInit};

    fn fixture() -> (SceneGraph, PanelId) {
        let mut graph = SceneGraph::new();
        let ep = graph.add_episode("e");
        let page = graph.add_page(ep).unwrap();
        let panel = graph.add_panel(page, SizePreset::Wide).unwrap();
        (graph, panel)
    }

    fn rgba_at(pixmap: &Pixmap, x: u32, y: u32) -> [u8; 4] {
        let c = pixmap.pixel(x, y).unwrap().demultiply();
        [c.red(), c.green(), c.blue(), c.alpha()]
    }

    #[test]
    fn affine_conversion_matches_kurbo() {
        let affine = kurbo::Affine::new([1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let t = to_skia(affine);
        let mut p = [tiny_skia::Point::from_xy(1.0, 1.0)];
        t.map_points(&mut p);
        let q = affine * kurbo::Point::new(1.0, 1.0);
        assert_eq!((p[0].x, p[0].y), (q.x as f32, q.y as f32));
    }

    #[test]
    fn empty_panel_is_white() {
        let (graph, panel) = fixture();
        let images = ImageCache::new();
        let fonts = FontBook::new();
        let config = ComposerConfig::default();
        let pixmap = Compositor::new(&images, &fonts, &config)
            .render_panel(&graph, panel)
            .unwrap();
        assert_eq!((pixmap.width(), pixmap.height()), (800, 400));
        assert_eq!(rgba_at(&pixmap, 10, 10), [255, 255, 255, 255]);
    }

    #[test]
    fn inverted_bubble_body_is_black() {
        let (mut graph, panel) = fixture();
        let id = graph
            .add_bubble(panel, BubbleInit::default(), Viewport::whole(800.0, 400.0))
            .unwrap();
        let images = ImageCache::new();
        let fonts = FontBook::new();
        let config = ComposerConfig::default();
        let compositor = Compositor::new(&images, &fonts, &config);

        let (cx, cy) = graph.object(id).unwrap().geometry().center();
        let plain = compositor.render_panel(&graph, panel).unwrap();
        assert_eq!(rgba_at(&plain, cx as u32, cy as u32), [255, 255, 255, 255]);

        graph
            .update_object(
                id,
                &ObjectPatch {
                    inverted: Some(true),
                    ..Default::default()
                },
            )
            .unwrap();
        let inverted = compositor.render_panel(&graph, panel).unwrap();
        assert_eq!(rgba_at(&inverted, cx as u32, cy as u32), [0, 0, 0, 255]);
    }

    #[test]
    fn hidden_and_missing_assets_draw_nothing() {
        let (mut graph, panel) = fixture();
        let asset = graph.add_asset_entry("red", "mem://red.png");
        let vp = Viewport::whole(800.0, 400.0);
        let id = graph
            .add_asset(
                panel,
                AssetInit {
                    asset_id: asset,
                    natural_size: Some((100.0, 100.0)),
                },
                vp,
            )
            .unwrap();
        let (cx, cy) = graph.object(id).unwrap().geometry().center();
        let fonts = FontBook::new();
        let config = ComposerConfig::default();

        // not decoded yet
        let empty = ImageCache::new();
        let pixmap = Compositor::new(&empty, &fonts, &config)
            .render_panel(&graph, panel)
            .unwrap();
        assert_eq!(rgba_at(&pixmap, cx as u32, cy as u32), [255, 255, 255, 255]);

        let mut images = ImageCache::new();
        images
            .insert_encoded("mem://red.png", &png_bytes(4, 4, [255, 0, 0, 255]))
            .unwrap();
        let compositor = Compositor::new(&images, &fonts, &config);
        let shown = compositor.render_panel(&graph, panel).unwrap();
        assert_eq!(rgba_at(&shown, cx as u32, cy as u32), [255, 0, 0, 255]);

        graph.set_hidden(id, true).unwrap();
        let hidden = compositor.render_panel(&graph, panel).unwrap();
        assert_eq!(rgba_at(&hidden, cx as u32, cy as u32), [255, 255, 255, 255]);
    }

    #[test]
    fn background_is_fit_and_centered() {
        let (mut graph, panel) = fixture();
        graph.set_background(panel, Some("mem://bg.png".into()));
        let mut images = ImageCache::new();
        // square image in an 800×400 panel → 400×400 centered at x 200..600
        images
            .insert_encoded("mem://bg.png", &png_bytes(10, 10, [0, 0, 255, 255]))
            .unwrap();
        let fonts = FontBook::new();
        let config = ComposerConfig::default();
        let pixmap = Compositor::new(&images, &fonts, &config)
            .render_panel(&graph, panel)
            .unwrap();
        assert_eq!(rgba_at(&pixmap, 400, 200), [0, 0, 255, 255]);
        assert_eq!(rgba_at(&pixmap, 100, 200), [255, 255, 255, 255]);
        assert_eq!(rgba_at(&pixmap, 700, 200), [255, 255, 255, 255]);
    }

    #[test]
    fn bubble_text_without_font_still_renders_body() {
        let (mut graph, panel) = fixture();
        let init = BubbleInit {
            text: "Hello!".into(),
            ..Default::default()
        };
        graph.add_bubble(panel, init, Viewport::whole(800.0, 400.0)).unwrap();
        let images = ImageCache::new();
        let fonts = FontBook::new();
        let config = ComposerConfig::default();
        assert!(
            Compositor::new(&images, &fonts, &config)
                .render_panel(&graph, panel)
                .is_ok()
        );
    }
}
