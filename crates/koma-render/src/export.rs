//! Panel and page export to PNG.
//!
//! Export re-draws the scene graph through the same [`Compositor`] the live
//! view uses, so what is hidden on screen is absent from the file.

use crate::raster::Compositor;
use koma_core::model::Color;
use koma_core::{ComposerConfig, PageId, PanelId, SceneGraph};
use tiny_skia::{Pixmap, Transform};

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("unknown panel: {0}")]
    UnknownPanel(PanelId),

    #[error("unknown page: {0}")]
    UnknownPage(PageId),

    #[error("page {0} has no panels")]
    EmptyPage(PageId),

    #[error("cannot allocate a {width}x{height} image")]
    EmptyImage { width: u32, height: u32 },

    #[error("png encoding failed: {0}")]
    Png(String),
}

/// Page layout and output scaling.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportOptions {
    /// Vertical gap between stacked panels, in page pixels.
    pub gutter: f32,
    /// Color of the gutter and any area not covered by a panel.
    pub background: Color,
    /// Output pixels per page pixel.
    pub scale: f32,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            gutter: 30.0,
            background: Color::WHITE,
            scale: 1.0,
        }
    }
}

impl ExportOptions {
    /// Defaults with the gutter taken from the document's config.
    pub fn for_config(config: &ComposerConfig) -> Self {
        Self {
            gutter: config.page_gutter.max(0.0),
            ..Self::default()
        }
    }
}

/// A rendered artifact ready to be written out.
#[derive(Debug, Clone)]
pub struct ExportImage {
    pub file_name: String,
    pub width: u32,
    pub height: u32,
    pub pixmap: Pixmap,
}

impl ExportImage {
    pub fn encode_png(&self) -> Result<Vec<u8>, ExportError> {
        self.pixmap
            .encode_png()
            .map_err(|e| ExportError::Png(e.to_string()))
    }
}

/// Stacked page height: `Σ heights + gutter · (n − 1)`.
pub fn page_height(heights: &[f32], gutter: f32) -> f32 {
    if heights.is_empty() {
        return 0.0;
    }
    heights.iter().sum::<f32>() + gutter * (heights.len() - 1) as f32
}

fn allocate(width: f32, height: f32, scale: f32) -> Result<Pixmap, ExportError> {
    let (w, h) = ((width * scale).ceil() as u32, (height * scale).ceil() as u32);
    Pixmap::new(w, h).ok_or(ExportError::EmptyImage {
        width: w,
        height: h,
    })
}

/// Render a single panel to `panel-<id>.png`.
pub fn export_panel(
    compositor: &Compositor<'_>,
    graph: &SceneGraph,
    panel: PanelId,
    options: &ExportOptions,
) -> Result<ExportImage, ExportError> {
    let bounds = graph
        .panel_bounds(panel)
        .ok_or(ExportError::UnknownPanel(panel))?;
    let mut pixmap = allocate(bounds.width, bounds.height, options.scale)?;
    let base = Transform::from_scale(options.scale, options.scale);
    compositor.draw_panel(&mut pixmap, graph, panel, base)?;
    log::info!("exported panel {panel} ({}x{})", pixmap.width(), pixmap.height());
    Ok(ExportImage {
        file_name: format!("panel-{panel}.png"),
        width: pixmap.width(),
        height: pixmap.height(),
        pixmap,
    })
}

/// Render every panel of a page, top to bottom in panel order, to
/// `page-<id>.png`.
pub fn export_page(
    compositor: &Compositor<'_>,
    graph: &SceneGraph,
    page: PageId,
    options: &ExportOptions,
) -> Result<ExportImage, ExportError> {
    let page_ref = graph.page(page).ok_or(ExportError::UnknownPage(page))?;
    let panels = graph.panels_of(page);
    if panels.is_empty() {
        return Err(ExportError::EmptyPage(page));
    }
    let heights: Vec<f32> = panels.iter().map(|p| p.height).collect();
    let height = page_height(&heights, options.gutter);
    let mut pixmap = allocate(page_ref.width, height, options.scale)?;
    let [r, g, b, a] = options.background.to_rgba8();
    pixmap.fill(tiny_skia::Color::from_rgba8(r, g, b, a));

    let mut y = 0.0;
    for panel in &panels {
        let base = Transform::from_scale(options.scale, options.scale).pre_translate(0.0, y);
        compositor.draw_panel(&mut pixmap, graph, panel.id, base)?;
        y += panel.height + options.gutter;
    }
    log::info!(
        "exported page {page}: {} panels, {}x{}",
        panels.len(),
        pixmap.width(),
        pixmap.height()
    );
    Ok(ExportImage {
        file_name: format!("page-{page}.png"),
        width: pixmap.width(),
        height: pixmap.height(),
        pixmap,
    })
}

/// Every panel id a page export draws, in order.
pub fn page_panels(graph: &SceneGraph, page: PageId) -> Vec<PanelId> {
    graph.panels_of(page).iter().map(|p| p.id).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fonts::FontBook;
    use crate::images::ImageCache;
    use koma_core::model::SizePreset;
    use koma_core::{ComposerConfig, Viewport};
    use koma_core::scene::BubbleInit;
    use pretty_assertions::assert_eq;

    #[test]
    fn stacked_height_includes_gutters() {
        assert_eq!(page_height(&[400.0, 600.0, 400.0], 30.0), 1460.0);
        assert_eq!(page_height(&[250.0], 30.0), 250.0);
        assert_eq!(page_height(&[], 30.0), 0.0);
    }

    #[test]
    fn three_panel_page_is_1460_tall() {
        let mut graph = SceneGraph::new();
        let ep = graph.add_episode("e");
        let page = graph.add_page(ep).unwrap();
        for h in [400.0, 600.0, 400.0] {
            let p = graph.add_panel(page, SizePreset::Custom).unwrap();
            graph.set_panel_height(p, h).unwrap();
        }
        let images = ImageCache::new();
        let fonts = FontBook::new();
        let config = ComposerConfig::default();
        let compositor = Compositor::new(&images, &fonts, &config);

        let image = export_page(&compositor, &graph, page, &ExportOptions::default()).unwrap();
        assert_eq!((image.width, image.height), (800, 1460));
        assert_eq!(image.file_name, format!("page-{page}.png"));
        assert!(image.encode_png().unwrap().starts_with(b"\x89PNG"));
    }

    #[test]
    fn page_gutter_follows_the_config() {
        let config = ComposerConfig {
            page_gutter: 10.0,
            ..ComposerConfig::default()
        };
        let mut graph = SceneGraph::with_config(config.clone());
        let ep = graph.add_episode("e");
        let page = graph.add_page(ep).unwrap();
        for h in [400.0, 600.0, 400.0] {
            let p = graph.add_panel(page, SizePreset::Custom).unwrap();
            graph.set_panel_height(p, h).unwrap();
        }
        let images = ImageCache::new();
        let fonts = FontBook::new();
        let compositor = Compositor::new(&images, &fonts, &config);

        let options = ExportOptions::for_config(graph.config());
        assert_eq!(options.gutter, 10.0);
        let image = export_page(&compositor, &graph, page, &options).unwrap();
        assert_eq!(image.height, 1420);
    }

    #[test]
    fn gutter_uses_background_color() {
        let mut graph = SceneGraph::new();
        let ep = graph.add_episode("e");
        let page = graph.add_page(ep).unwrap();
        graph.add_panel(page, SizePreset::Wide).unwrap();
        graph.add_panel(page, SizePreset::Wide).unwrap();
        let images = ImageCache::new();
        let fonts = FontBook::new();
        let config = ComposerConfig::default();
        let compositor = Compositor::new(&images, &fonts, &config);
        let options = ExportOptions {
            background: Color::BLACK,
            ..Default::default()
        };

        let image = export_page(&compositor, &graph, page, &options).unwrap();
        // panel 0 spans 0..400, gutter 400..430, panel 1 430..830
        let px = |y| image.pixmap.pixel(10, y).unwrap().demultiply();
        assert_eq!(px(200).red(), 255);
        assert_eq!(px(415).red(), 0);
        assert_eq!(px(600).red(), 255);
    }

    #[test]
    fn panel_export_scales() {
        let mut graph = SceneGraph::new();
        let ep = graph.add_episode("e");
        let page = graph.add_page(ep).unwrap();
        let panel = graph.add_panel(page, SizePreset::Wide).unwrap();
        graph
            .add_bubble(panel, BubbleInit::default(), Viewport::whole(800.0, 400.0))
            .unwrap();
        let images = ImageCache::new();
        let fonts = FontBook::new();
        let config = ComposerConfig::default();
        let compositor = Compositor::new(&images, &fonts, &config);
        let options = ExportOptions {
            scale: 0.5,
            ..Default::default()
        };

        let image = export_panel(&compositor, &graph, panel, &options).unwrap();
        assert_eq!((image.width, image.height), (400, 200));
        assert_eq!(image.file_name, format!("panel-{panel}.png"));
    }

    #[test]
    fn empty_and_unknown_pages_fail() {
        let mut graph = SceneGraph::new();
        let ep = graph.add_episode("e");
        let page = graph.add_page(ep).unwrap();
        let images = ImageCache::new();
        let fonts = FontBook::new();
        let config = ComposerConfig::default();
        let compositor = Compositor::new(&images, &fonts, &config);
        let options = ExportOptions::default();

        assert!(matches!(
            export_page(&compositor, &graph, page, &options),
            Err(ExportError::EmptyPage(_))
        ));
        let panel = graph.add_panel(page, SizePreset::Wide).unwrap();
        graph.delete_panel(panel).unwrap();
        assert!(matches!(
            export_panel(&compositor, &graph, panel, &options),
            Err(ExportError::UnknownPanel(_))
        ));
    }
}
