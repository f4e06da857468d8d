//! Resize handles and the rotation knob.
//!
//! Handles live in the object's local box space, so they follow its
//! rotation and flips. Resizing works on the unrotated box: each handle
//! moves only the edges it owns and the opposite edges stay put.

use koma_core::geometry::{MinSize, Rect};
use koma_core::model::Geometry;
use koma_render::hit::to_local;

/// Distance of the rotation knob above the top-center of the box.
pub const ROTATE_KNOB_OFFSET: f32 = 28.0;
/// Pick radius around a handle, in panel pixels.
pub const HANDLE_TOLERANCE: f32 = 8.0;

/// The 8 resize handles: corners and edge midpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResizeHandle {
    N,
    S,
    E,
    W,
    NE,
    NW,
    SE,
    SW,
}

/// Which edges a handle drags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Edges {
    pub left: bool,
    pub top: bool,
    pub right: bool,
    pub bottom: bool,
}

impl ResizeHandle {
    pub const ALL: [ResizeHandle; 8] = [
        ResizeHandle::NW,
        ResizeHandle::N,
        ResizeHandle::NE,
        ResizeHandle::E,
        ResizeHandle::SE,
        ResizeHandle::S,
        ResizeHandle::SW,
        ResizeHandle::W,
    ];

    pub fn edges(self) -> Edges {
        use ResizeHandle::*;
        Edges {
            left: matches!(self, W | NW | SW),
            top: matches!(self, N | NW | NE),
            right: matches!(self, E | NE | SE),
            bottom: matches!(self, S | SE | SW),
        }
    }

    /// Handle position in local box space.
    pub fn anchor(self, width: f32, height: f32) -> (f32, f32) {
        let e = self.edges();
        let x = if e.left {
            0.0
        } else if e.right {
            width
        } else {
            width / 2.0
        };
        let y = if e.top {
            0.0
        } else if e.bottom {
            height
        } else {
            height / 2.0
        };
        (x, y)
    }

    /// CSS cursor name for the unrotated handle.
    pub fn cursor(self) -> &'static str {
        use ResizeHandle::*;
        match self {
            N | S => "ns-resize",
            E | W => "ew-resize",
            NE | SW => "nesw-resize",
            NW | SE => "nwse-resize",
        }
    }
}

/// What a pointer-down on a selected object's chrome grabbed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handle {
    Resize(ResizeHandle),
    Rotate,
}

/// Rotation knob position in local box space.
pub fn rotate_knob(width: f32) -> (f32, f32) {
    (width / 2.0, -ROTATE_KNOB_OFFSET)
}

/// The handle under a panel-space point, if any. The knob wins over a
/// resize handle when both are in range.
pub fn handle_at(g: &Geometry, px: f32, py: f32, tolerance: f32) -> Option<Handle> {
    let (lx, ly) = to_local(g, px, py);
    let near = |(hx, hy): (f32, f32)| (lx - hx).hypot(ly - hy) <= tolerance;
    if near(rotate_knob(g.width)) {
        return Some(Handle::Rotate);
    }
    ResizeHandle::ALL
        .into_iter()
        .find(|h| near(h.anchor(g.width, g.height)))
        .map(Handle::Resize)
}

/// Recompute a box after dragging `handle` by `(dx, dy)` (local axes).
///
/// Only the handle's edges move. Each moving edge is clamped so the box
/// stays inside `bounds` and keeps at least `min` size. Edges the handle
/// does not own never move.
pub fn resize_box(
    original: Rect,
    handle: ResizeHandle,
    dx: f32,
    dy: f32,
    bounds: Rect,
    min: MinSize,
) -> Rect {
    let e = handle.edges();
    let (mut l, mut t) = (original.x, original.y);
    let (mut r, mut b) = (original.right(), original.bottom());

    if e.left {
        l = (l + dx).min(r - min.width).max(bounds.x);
    }
    if e.right {
        r = (r + dx).max(l + min.width).min(bounds.right());
    }
    if e.top {
        t = (t + dy).min(b - min.height).max(bounds.y);
    }
    if e.bottom {
        b = (b + dy).max(t + min.height).min(bounds.bottom());
    }
    Rect::new(l, t, r - l, b - t)
}
