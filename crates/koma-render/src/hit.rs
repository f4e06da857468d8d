//! Hit testing: point → object lookup.
//!
//! Walks a panel's objects front-to-back (reverse of paint order) and
//! tests the point in each object's local frame, so rotated and flipped
//! boxes hit exactly where they are drawn.

use kurbo::{Affine, Point, Vec2};
use koma_core::geometry::Rect;
use koma_core::model::{Geometry, HasGeometry, SceneObject};
use koma_core::{ObjectId, PanelId, SceneGraph};

/// Local box space (`0..w × 0..h`) → panel space.
///
/// Flips mirror about the box center, then the box rotates clockwise
/// about its center.
pub fn object_transform(g: &Geometry) -> Affine {
    let (w, h) = (f64::from(g.width), f64::from(g.height));
    let sx = if g.flip_h { -1.0 } else { 1.0 };
    let sy = if g.flip_v { -1.0 } else { 1.0 };
    Affine::translate(Vec2::new(f64::from(g.x) + w / 2.0, f64::from(g.y) + h / 2.0))
        * Affine::rotate(f64::from(g.rotation).to_radians())
        * Affine::scale_non_uniform(sx, sy)
        * Affine::translate(Vec2::new(-w / 2.0, -h / 2.0))
}

/// Map a panel-space point into the object's local box space.
pub fn to_local(g: &Geometry, px: f32, py: f32) -> (f32, f32) {
    let p = object_transform(g).inverse() * Point::new(f64::from(px), f64::from(py));
    (p.x as f32, p.y as f32)
}

/// Map a local box-space point into panel space.
pub fn to_panel(g: &Geometry, lx: f32, ly: f32) -> (f32, f32) {
    let p = object_transform(g) * Point::new(f64::from(lx), f64::from(ly));
    (p.x as f32, p.y as f32)
}

/// Whether a panel-space point falls inside the object's (possibly
/// rotated) box.
pub fn object_contains(g: &Geometry, px: f32, py: f32) -> bool {
    let (lx, ly) = to_local(g, px, py);
    lx >= 0.0 && lx <= g.width && ly >= 0.0 && ly <= g.height
}

/// Axis-aligned bounds of the transformed box.
pub fn visual_bounds(g: &Geometry) -> Rect {
    let corners = [
        to_panel(g, 0.0, 0.0),
        to_panel(g, g.width, 0.0),
        to_panel(g, g.width, g.height),
        to_panel(g, 0.0, g.height),
    ];
    let (mut x0, mut y0) = (f32::MAX, f32::MAX);
    let (mut x1, mut y1) = (f32::MIN, f32::MIN);
    for (x, y) in corners {
        x0 = x0.min(x);
        y0 = y0.min(y);
        x1 = x1.max(x);
        y1 = y1.max(y);
    }
    Rect::new(x0, y0, x1 - x0, y1 - y0)
}

/// Find the topmost visible object at `(px, py)` in `panel`.
/// Returns `None` on empty canvas.
pub fn hit_test(graph: &SceneGraph, panel: PanelId, px: f32, py: f32) -> Option<ObjectId> {
    graph
        .objects_in_panel(panel)
        .into_iter()
        .rev()
        .filter(|o| !o.is_hidden())
        .find(|o| object_contains(o.geometry(), px, py))
        .map(SceneObject::id)
}
