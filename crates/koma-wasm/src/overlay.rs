//! Canvas2D editing chrome drawn over the rasterized panel.
//!
//! The panel itself comes from the tiny-skia compositor; this module only
//! adds what never appears in an export: selection boxes, handles, the
//! rotation knob, snap guides and the mask overlay.

use koma_core::model::HasGeometry;
use koma_editor::resize::{ROTATE_KNOB_OFFSET, ResizeHandle, rotate_knob};
use koma_editor::{Composer, GuideAxis, View};
use koma_render::hit::object_transform;
use kurbo::Affine;
use web_sys::CanvasRenderingContext2d;

/// Theme-dependent colors for the editing chrome.
pub struct OverlayTheme {
    pub bg: &'static str,
    pub panel_border: &'static str,
    pub accent: &'static str,
    pub guide: &'static str,
    pub mask: &'static str,
}

impl OverlayTheme {
    pub fn light() -> Self {
        Self {
            bg: "#F5F5F7",
            panel_border: "#D2D2D7",
            accent: "#6C5CE7",
            guide: "#FF2D95",
            mask: "rgba(108, 92, 231, 0.35)",
        }
    }

    pub fn dark() -> Self {
        Self {
            bg: "#1C1C1E",
            panel_border: "#3A3A3C",
            accent: "#A29BFE",
            guide: "#FF6BB5",
            mask: "rgba(162, 155, 254, 0.35)",
        }
    }
}

const HANDLE_SIZE: f64 = 8.0;

fn view_affine(view: &View) -> Affine {
    Affine::new([
        f64::from(view.zoom),
        0.0,
        0.0,
        f64::from(view.zoom),
        f64::from(view.offset_x),
        f64::from(view.offset_y),
    ])
}

fn apply(ctx: &CanvasRenderingContext2d, affine: Affine) {
    let [a, b, c, d, e, f] = affine.as_coeffs();
    let _ = ctx.set_transform(a, b, c, d, e, f);
}

/// Draw all chrome for the composer's active panel.
pub fn draw(ctx: &CanvasRenderingContext2d, composer: &Composer, theme: &OverlayTheme) {
    let Some(panel) = composer.active_panel() else {
        return;
    };
    let graph = composer.graph();
    let Some(bounds) = graph.panel_bounds(panel) else {
        return;
    };
    let view = composer.view();
    let zoom = f64::from(view.zoom);
    let base = view_affine(&view);

    ctx.save();
    apply(ctx, base);

    ctx.set_stroke_style_str(theme.panel_border);
    ctx.set_line_width(1.0 / zoom);
    ctx.stroke_rect(0.0, 0.0, f64::from(bounds.width), f64::from(bounds.height));

    if let Some(mask) = graph.mask(panel) {
        ctx.set_fill_style_str(theme.mask);
        for dot in &mask.dots {
            ctx.begin_path();
            let _ = ctx.arc(
                f64::from(dot.x),
                f64::from(dot.y),
                f64::from(dot.radius),
                0.0,
                std::f64::consts::TAU,
            );
            ctx.fill();
        }
    }

    ctx.set_stroke_style_str(theme.guide);
    ctx.set_line_width(1.0 / zoom);
    let dash = 4.0 / zoom;
    let _ = ctx.set_line_dash(&js_sys::Array::of2(
        &wasm_bindgen::JsValue::from_f64(dash),
        &wasm_bindgen::JsValue::from_f64(dash),
    ));
    for guide in composer.guides() {
        let p = f64::from(guide.position);
        ctx.begin_path();
        match guide.axis {
            GuideAxis::Vertical => {
                ctx.move_to(p, 0.0);
                ctx.line_to(p, f64::from(bounds.height));
            }
            GuideAxis::Horizontal => {
                ctx.move_to(0.0, p);
                ctx.line_to(f64::from(bounds.width), p);
            }
        }
        ctx.stroke();
    }
    let _ = ctx.set_line_dash(&js_sys::Array::new());

    let selection = graph.selection();
    for id in selection {
        let Some(object) = graph.object(*id) else {
            continue;
        };
        if object.panel_id() != panel {
            continue;
        }
        let g = object.geometry();
        apply(ctx, base * object_transform(g));
        let (w, h) = (f64::from(g.width), f64::from(g.height));

        ctx.set_stroke_style_str(theme.accent);
        ctx.set_line_width(1.5 / zoom);
        ctx.stroke_rect(0.0, 0.0, w, h);

        if selection.len() == 1 && !object.is_hidden() {
            draw_handles(ctx, g.width, g.height, zoom, theme);
        }
    }

    ctx.restore();
}

/// Resize squares and the rotation knob, in the object's local frame.
fn draw_handles(
    ctx: &CanvasRenderingContext2d,
    width: f32,
    height: f32,
    zoom: f64,
    theme: &OverlayTheme,
) {
    let size = HANDLE_SIZE / zoom;
    ctx.set_fill_style_str("#FFFFFF");
    ctx.set_stroke_style_str(theme.accent);
    ctx.set_line_width(1.5 / zoom);
    for handle in ResizeHandle::ALL {
        let (x, y) = handle.anchor(width, height);
        let (x, y) = (f64::from(x) - size / 2.0, f64::from(y) - size / 2.0);
        ctx.fill_rect(x, y, size, size);
        ctx.stroke_rect(x, y, size, size);
    }

    let (kx, ky) = rotate_knob(width);
    let (kx, ky) = (f64::from(kx), f64::from(ky));
    ctx.begin_path();
    ctx.move_to(kx, 0.0);
    ctx.line_to(kx, ky + f64::from(ROTATE_KNOB_OFFSET) / 4.0);
    ctx.stroke();
    ctx.begin_path();
    let _ = ctx.arc(kx, ky, size / 1.5, 0.0, std::f64::consts::TAU);
    ctx.fill();
    ctx.stroke();
}
