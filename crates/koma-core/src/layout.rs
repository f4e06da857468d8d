//! Scene layouts: split a panel into non-overlapping sub-rectangles for
//! multi-scene generation.
//!
//! Rectangles tile the panel exactly; neighbours share an edge and never
//! overlap (`Rect::intersects` is strict).

use crate::geometry::Rect;
use crate::model::SceneLayout;

/// Share of the panel width given to the lead scene in `Dynamic` layout.
const DYNAMIC_LEAD: f32 = 0.6;

/// Compute `count` scene rectangles covering a `width × height` panel.
pub fn scene_rects(layout: SceneLayout, count: usize, width: f32, height: f32) -> Vec<Rect> {
    if count == 0 {
        return Vec::new();
    }
    if count == 1 {
        return vec![Rect::new(0.0, 0.0, width, height)];
    }
    match layout {
        SceneLayout::Grid => grid(count, width, height),
        SceneLayout::Sequence => sequence(count, width, height),
        SceneLayout::Dynamic => dynamic(count, width, height),
    }
}

/// Near-square grid; the last row stretches its cells to fill the width.
fn grid(count: usize, width: f32, height: f32) -> Vec<Rect> {
    let cols = (count as f32).sqrt().ceil() as usize;
    let rows = count.div_ceil(cols);
    let cell_h = height / rows as f32;

    let mut rects = Vec::with_capacity(count);
    for row in 0..rows {
        let in_row = (count - row * cols).min(cols);
        let cell_w = width / in_row as f32;
        for col in 0..in_row {
            rects.push(Rect::new(
                col as f32 * cell_w,
                row as f32 * cell_h,
                cell_w,
                cell_h,
            ));
        }
    }
    rects
}

/// Equal strips along the panel's long axis, read left-to-right or
/// top-to-bottom.
fn sequence(count: usize, width: f32, height: f32) -> Vec<Rect> {
    let n = count as f32;
    (0..count)
        .map(|i| {
            let i = i as f32;
            if width >= height {
                Rect::new(i * width / n, 0.0, width / n, height)
            } else {
                Rect::new(0.0, i * height / n, width, height / n)
            }
        })
        .collect()
}

/// One large lead scene on the left, the rest stacked on the right.
fn dynamic(count: usize, width: f32, height: f32) -> Vec<Rect> {
    let lead_w = width * DYNAMIC_LEAD;
    let rest = count - 1;
    let cell_h = height / rest as f32;

    let mut rects = Vec::with_capacity(count);
    rects.push(Rect::new(0.0, 0.0, lead_w, height));
    for i in 0..rest {
        rects.push(Rect::new(
            lead_w,
            i as f32 * cell_h,
            width - lead_w,
            cell_h,
        ));
    }
    rects
}
