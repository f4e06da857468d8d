//! Axis-aligned boxes and the clamping rules every object obeys inside a
//! panel.

use serde::{Deserialize, Serialize};

/// An axis-aligned box in panel coordinates (pixels, y down).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.x && px <= self.right() && py >= self.y && py <= self.bottom()
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Strict AABB overlap; touching edges do not count.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.right()
            && self.right() > other.x
            && self.y < other.bottom()
            && self.bottom() > other.y
    }

    /// Shrink by `inset` on every side. Never produces a negative size.
    pub fn inset(&self, inset: f32) -> Rect {
        Rect {
            x: self.x + inset,
            y: self.y + inset,
            width: (self.width - inset * 2.0).max(0.0),
            height: (self.height - inset * 2.0).max(0.0),
        }
    }
}

/// Minimum box size for an object kind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MinSize {
    pub width: f32,
    pub height: f32,
}

impl MinSize {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// The visible part of a panel, in panel coordinates. New objects are
/// centered in it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    /// A viewport showing the whole `width × height` panel.
    pub fn whole(width: f32, height: f32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width,
            height,
        }
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// Clamp a top-left coordinate so a span of `size` stays inside
/// `[lo, hi]`. A span wider than the range pins to `lo`.
pub fn clamp_span(pos: f32, size: f32, lo: f32, hi: f32) -> f32 {
    let max = hi - size;
    if max < lo { lo } else { pos.clamp(lo, max) }
}

/// Clamp a box inside `bounds` without resizing it.
pub fn clamp_into(rect: Rect, bounds: Rect) -> Rect {
    Rect {
        x: clamp_span(rect.x, rect.width, bounds.x, bounds.right()),
        y: clamp_span(rect.y, rect.height, bounds.y, bounds.bottom()),
        ..rect
    }
}

/// Normalize an angle in degrees to `[0, 360)`.
pub fn normalize_degrees(deg: f32) -> f32 {
    let r = deg.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if r >= 360.0 { 0.0 } else { r }
}
