//! Gesture state machine states and the pure math behind them.
//!
//! Only one gesture is active at a time. Each state carries what it
//! captured at pointer-down, so every move recomputes from the original
//! values instead of accumulating deltas.

use crate::resize::ResizeHandle;
use crate::tools::MaskMode;
use koma_core::geometry::{Rect, normalize_degrees};
use koma_core::model::{Geometry, Mask};
use koma_core::{ObjectId, PanelId};

/// One moved object and where it started.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveOrigin {
    pub id: ObjectId,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl MoveOrigin {
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum Gesture {
    #[default]
    Idle,
    Moving {
        /// Pointer at pointer-down, panel space.
        start: (f32, f32),
        origins: Vec<MoveOrigin>,
        /// Global history is recorded on the first real movement.
        recorded: bool,
        /// Plain press on an object that was already part of a larger
        /// selection. A release without movement narrows the selection
        /// to it.
        narrow_to: Option<ObjectId>,
    },
    Resizing {
        id: ObjectId,
        handle: ResizeHandle,
        start: (f32, f32),
        original: Geometry,
    },
    Rotating {
        id: ObjectId,
        center: (f32, f32),
        /// Pointer angle at pointer-down, degrees.
        initial_angle: f32,
        original_rotation: f32,
    },
    Panning {
        /// Pointer at pointer-down, screen space.
        start: (f32, f32),
        origin_offset: (f32, f32),
    },
    Painting {
        panel: PanelId,
        mode: MaskMode,
        /// Mask before the stroke, recorded once the stroke changes it.
        before: Option<Mask>,
    },
}

/// Discriminant of [`Gesture`] for hosts and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureKind {
    Idle,
    Moving,
    Resizing,
    Rotating,
    Panning,
    Painting,
}

impl Gesture {
    pub fn kind(&self) -> GestureKind {
        match self {
            Gesture::Idle => GestureKind::Idle,
            Gesture::Moving { .. } => GestureKind::Moving,
            Gesture::Resizing { .. } => GestureKind::Resizing,
            Gesture::Rotating { .. } => GestureKind::Rotating,
            Gesture::Panning { .. } => GestureKind::Panning,
            Gesture::Painting { .. } => GestureKind::Painting,
        }
    }

    pub fn is_active(&self) -> bool {
        !matches!(self, Gesture::Idle)
    }
}

/// Angle of `(x, y)` around `center`, degrees.
pub fn pointer_angle(center: (f32, f32), x: f32, y: f32) -> f32 {
    (y - center.1).atan2(x - center.0).to_degrees()
}

/// New stored rotation: `original + Δ`, with `Δ` rounded to multiples of
/// `snap` degrees when given, normalized to `[0, 360)`.
pub fn apply_rotation(original: f32, delta: f32, snap: Option<f32>) -> f32 {
    let delta = match snap {
        Some(step) if step > 0.0 => (delta / step).round() * step,
        _ => delta,
    };
    normalize_degrees(original + delta)
}

/// Clamp a move delta so every box stays inside `bounds` after moving by
/// it. Boxes move together, so the tightest box limits all of them. A box
/// that cannot fit pins the delta to its lower bound.
pub fn clamp_group_delta(boxes: &[Rect], dx: f32, dy: f32, bounds: Rect) -> (f32, f32) {
    let (mut lo_x, mut hi_x) = (f32::NEG_INFINITY, f32::INFINITY);
    let (mut lo_y, mut hi_y) = (f32::NEG_INFINITY, f32::INFINITY);
    for b in boxes {
        lo_x = lo_x.max(bounds.x - b.x);
        hi_x = hi_x.min(bounds.right() - b.right());
        lo_y = lo_y.max(bounds.y - b.y);
        hi_y = hi_y.min(bounds.bottom() - b.bottom());
    }
    (dx.min(hi_x).max(lo_x), dy.min(hi_y).max(lo_y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn rotation_snaps_and_wraps() {
        assert_eq!(apply_rotation(0.0, 370.0, Some(15.0)), 15.0);
        assert_eq!(apply_rotation(350.0, 17.0, Some(15.0)), 5.0);
        assert_eq!(apply_rotation(10.0, -20.0, None), 350.0);
        assert!((apply_rotation(0.0, 7.3, None) - 7.3).abs() < 1e-5);
    }

    #[test]
    fn pointer_angle_is_screen_clockwise() {
        assert_eq!(pointer_angle((0.0, 0.0), 10.0, 0.0), 0.0);
        assert_eq!(pointer_angle((0.0, 0.0), 0.0, 10.0), 90.0);
    }

    #[test]
    fn group_delta_limited_by_tightest_box() {
        let bounds = Rect::new(18.0, 18.0, 764.0, 364.0);
        let boxes = [Rect::new(100.0, 100.0, 50.0, 50.0), Rect::new(700.0, 300.0, 60.0, 60.0)];
        // right box can only go 22 right and 22 down
        assert_eq!(clamp_group_delta(&boxes, 100.0, 100.0, bounds), (22.0, 22.0));
        // left box can only go 82 left and up
        assert_eq!(clamp_group_delta(&boxes, -500.0, -500.0, bounds), (-82.0, -82.0));
        assert_eq!(clamp_group_delta(&boxes, 5.0, -5.0, bounds), (5.0, -5.0));
    }

    #[test]
    fn gesture_kind_reports_state() {
        assert_eq!(Gesture::default().kind(), GestureKind::Idle);
        assert!(!Gesture::Idle.is_active());
    }
}
