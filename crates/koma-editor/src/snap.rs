//! Advisory snap guides.
//!
//! While a box is moved or resized, any of its edges or center lines that
//! come within the threshold of a candidate line is reported as a guide.
//! Candidates are the canvas edges and center plus the edges and centers
//! of every other visible object. Positions are never adjusted.

use koma_core::geometry::Rect;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GuideAxis {
    /// A vertical line at some `x`.
    Vertical,
    /// A horizontal line at some `y`.
    Horizontal,
}

/// One alignment line to draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Guide {
    pub axis: GuideAxis,
    pub position: f32,
}

fn xs(r: &Rect) -> [f32; 3] {
    [r.x, r.x + r.width / 2.0, r.right()]
}

fn ys(r: &Rect) -> [f32; 3] {
    [r.y, r.y + r.height / 2.0, r.bottom()]
}

/// Guides for `moving` against `canvas` and `others`.
pub fn guides(moving: Rect, others: &[Rect], canvas: Rect, threshold: f32) -> Vec<Guide> {
    let mut out: Vec<Guide> = Vec::new();
    let mut push = |axis: GuideAxis, position: f32| {
        if !out.iter().any(|g| g.axis == axis && g.position == position) {
            out.push(Guide { axis, position });
        }
    };

    for candidate in std::iter::once(&canvas).chain(others) {
        for cx in xs(candidate) {
            if xs(&moving).iter().any(|x| (x - cx).abs() <= threshold) {
                push(GuideAxis::Vertical, cx);
            }
        }
        for cy in ys(candidate) {
            if ys(&moving).iter().any(|y| (y - cy).abs() <= threshold) {
                push(GuideAxis::Horizontal, cy);
            }
        }
    }
    out
}

/// Smallest box covering all of `rects`.
pub fn union(rects: &[Rect]) -> Option<Rect> {
    let first = rects.first()?;
    let (mut x0, mut y0, mut x1, mut y1) = (first.x, first.y, first.right(), first.bottom());
    for r in &rects[1..] {
        x0 = x0.min(r.x);
        y0 = y0.min(r.y);
        x1 = x1.max(r.right());
        y1 = y1.max(r.bottom());
    }
    Some(Rect::new(x0, y0, x1 - x0, y1 - y0))
}
