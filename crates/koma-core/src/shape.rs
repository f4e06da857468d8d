//! Bubble shape synthesis.
//!
//! Pure functions from `(type, width, height, tail, seed)` to an ordered
//! draw list. Nothing here is cached: the editor re-synthesizes on every
//! frame, and the seeded jitter keeps that stable.
//!
//! ## Tail seams
//!
//! Tails are rooted a few pixels *inside* the body so fills overlap. The
//! layer order hides the seam where tail and body meet:
//!
//! | Family | Order (back → front) |
//! |--------|----------------------|
//! | ellipse, rough, cloud | tail stroke → body fill → body stroke → tail fill |
//! | box | tail stroke → body fill → tail fill → outline with gap |
//!
//! Bursts (shout/sfx) never have tails.

use crate::model::{Bubble, BubbleType, PathCmd, ShapeFamily, TailDirection};
use crate::seed::{seed_signed, seed_unit};
use std::f32::consts::{FRAC_PI_2, TAU};
use std::fmt::Write as _;

/// Ellipse radii as a fraction of the box.
pub const ELLIPSE_RX: f32 = 0.48;
pub const ELLIPSE_RY: f32 = 0.44;

pub const ROUGH_POINTS: usize = 28;
const ROUGH_RADIUS_JITTER: f32 = 0.06;
const ROUGH_ANGLE_JITTER: f32 = 0.04;

pub const CLOUD_POINTS: usize = 14;
/// Outward push of each scallop apex, in pixels.
pub const CLOUD_BUMP: f32 = 12.0;

pub const SHOUT_SPIKES: usize = 12;
pub const SFX_SPIKES: usize = 18;

/// How far tail roots sit inside the parent silhouette.
pub const ELLIPSE_TAIL_INSET: f32 = 8.0;
pub const BOX_TAIL_INSET: f32 = 6.0;
/// Distance from the body box to the tail tip.
pub const TAIL_REACH: f32 = 36.0;

/// Bézier circle constant, 4/3·(√2−1).
const KAPPA: f32 = 0.552_284_8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerRole {
    Body,
    Tail,
    Outline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerPaint {
    Fill,
    Stroke,
    DashedStroke,
    /// Dot screen clipped to the path, drawn over the body fill.
    HalftoneFill,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShapeLayer {
    pub role: LayerRole,
    pub paint: LayerPaint,
    pub path: Vec<PathCmd>,
}

/// Ordered draw list for one bubble, in bubble-local coordinates
/// (`0..width × 0..height`; tails may reach outside the box).
#[derive(Debug, Clone, PartialEq)]
pub struct BubbleShape {
    pub layers: Vec<ShapeLayer>,
}

impl BubbleShape {
    /// The body silhouette path.
    pub fn body(&self) -> Option<&[PathCmd]> {
        self.layers
            .iter()
            .find(|l| l.role == LayerRole::Body)
            .map(|l| l.path.as_slice())
    }

    pub fn has_tail(&self) -> bool {
        self.layers.iter().any(|l| l.role == LayerRole::Tail)
    }

    /// SVG path data of every layer, one line each. Used to compare
    /// silhouettes byte for byte.
    pub fn to_svg_path(&self) -> String {
        let mut out = String::new();
        for layer in &self.layers {
            let _ = write!(out, "{:?}/{:?}:", layer.role, layer.paint);
            write_svg(&mut out, &layer.path);
            out.push('\n');
        }
        out
    }
}

fn write_svg(out: &mut String, path: &[PathCmd]) {
    for cmd in path {
        let _ = match *cmd {
            PathCmd::MoveTo(x, y) => write!(out, "M{x} {y}"),
            PathCmd::LineTo(x, y) => write!(out, "L{x} {y}"),
            PathCmd::QuadTo(cx, cy, x, y) => write!(out, "Q{cx} {cy} {x} {y}"),
            PathCmd::CubicTo(c1x, c1y, c2x, c2y, x, y) => {
                write!(out, "C{c1x} {c1y} {c2x} {c2y} {x} {y}")
            }
            PathCmd::Close => write!(out, "Z"),
        };
    }
}

/// Synthesize the draw list for a bubble, seeded by its id.
pub fn synthesize_bubble(bubble: &Bubble) -> BubbleShape {
    synthesize(
        bubble.bubble_type,
        bubble.geometry.width,
        bubble.geometry.height,
        bubble.renders_tail(),
        bubble.id.as_str(),
    )
}

/// Synthesize the draw list for a bubble of `bubble_type`.
///
/// Callers clamp `w`/`h` to the type's minimum first; synthesis itself is
/// total and never fails.
pub fn synthesize(
    bubble_type: BubbleType,
    w: f32,
    h: f32,
    tail: Option<TailDirection>,
    seed: &str,
) -> BubbleShape {
    let tail = tail.filter(|_| bubble_type.supports_tail());
    let family = bubble_type.family();

    let body = match family {
        ShapeFamily::Ellipse => ellipse_path(w, h),
        ShapeFamily::Rough => rough_ellipse_path(w, h, seed),
        ShapeFamily::Cloud => cloud_path(w, h),
        ShapeFamily::Burst => {
            let spikes = if bubble_type == BubbleType::Sfx {
                SFX_SPIKES
            } else {
                SHOUT_SPIKES
            };
            burst_path(w, h, spikes, bubble_type == BubbleType::Sfx, seed)
        }
        ShapeFamily::Box => box_path(w, h, corner_radius(bubble_type, w, h)),
    };

    let stroke = if bubble_type == BubbleType::Whisper {
        LayerPaint::DashedStroke
    } else {
        LayerPaint::Stroke
    };

    let mut layers = Vec::with_capacity(5);
    let layer = |role, paint, path: &Vec<PathCmd>| ShapeLayer {
        role,
        paint,
        path: path.clone(),
    };

    match (family, tail) {
        (ShapeFamily::Box, Some(dir)) => {
            let tail = box_tail(w, h, dir);
            let outline = box_outline_with_gap(w, h, corner_radius(bubble_type, w, h), dir);
            layers.push(layer(LayerRole::Tail, stroke, &tail));
            layers.push(layer(LayerRole::Body, LayerPaint::Fill, &body));
            layers.push(layer(LayerRole::Tail, LayerPaint::Fill, &tail));
            layers.push(ShapeLayer {
                role: LayerRole::Outline,
                paint: stroke,
                path: outline,
            });
        }
        (_, Some(dir)) => {
            let tail = ellipse_tail(w, h, dir);
            layers.push(layer(LayerRole::Tail, stroke, &tail));
            layers.push(layer(LayerRole::Body, LayerPaint::Fill, &body));
            if bubble_type == BubbleType::HalftoneSpeech {
                layers.push(layer(LayerRole::Body, LayerPaint::HalftoneFill, &body));
            }
            layers.push(layer(LayerRole::Body, stroke, &body));
            layers.push(layer(LayerRole::Tail, LayerPaint::Fill, &tail));
        }
        (_, None) => {
            layers.push(layer(LayerRole::Body, LayerPaint::Fill, &body));
            if bubble_type == BubbleType::HalftoneSpeech {
                layers.push(layer(LayerRole::Body, LayerPaint::HalftoneFill, &body));
            }
            layers.push(layer(LayerRole::Body, stroke, &body));
        }
    }

    BubbleShape { layers }
}

fn corner_radius(bubble_type: BubbleType, w: f32, h: f32) -> f32 {
    match bubble_type {
        BubbleType::RoundedRectangle => (w.min(h) * 0.2).min(24.0),
        _ => 0.0,
    }
}

// ─── Silhouettes ─────────────────────────────────────────────────────────

/// Ellipse centered in the box with radii `0.48w × 0.44h`, as four cubic
/// arcs starting at 3 o'clock.
pub fn ellipse_path(w: f32, h: f32) -> Vec<PathCmd> {
    let (cx, cy) = (w / 2.0, h / 2.0);
    let (rx, ry) = (w * ELLIPSE_RX, h * ELLIPSE_RY);
    let (kx, ky) = (rx * KAPPA, ry * KAPPA);
    vec![
        PathCmd::MoveTo(cx + rx, cy),
        PathCmd::CubicTo(cx + rx, cy + ky, cx + kx, cy + ry, cx, cy + ry),
        PathCmd::CubicTo(cx - kx, cy + ry, cx - rx, cy + ky, cx - rx, cy),
        PathCmd::CubicTo(cx - rx, cy - ky, cx - kx, cy - ry, cx, cy - ry),
        PathCmd::CubicTo(cx + kx, cy - ry, cx + rx, cy - ky, cx + rx, cy),
        PathCmd::Close,
    ]
}

/// Hand-drawn ellipse: jittered samples joined by quadratics through
/// their midpoints.
pub fn rough_ellipse_path(w: f32, h: f32, seed: &str) -> Vec<PathCmd> {
    let (cx, cy) = (w / 2.0, h / 2.0);
    let (rx, ry) = (w * ELLIPSE_RX, h * ELLIPSE_RY);

    let points: Vec<(f32, f32)> = (0..ROUGH_POINTS)
        .map(|i| {
            let n = i as u32;
            let t = i as f32 / ROUGH_POINTS as f32 * TAU
                + seed_signed(seed, n + 1000) * ROUGH_ANGLE_JITTER;
            let f = 1.0 + seed_signed(seed, n) * ROUGH_RADIUS_JITTER;
            (cx + rx * f * t.cos(), cy + ry * f * t.sin())
        })
        .collect();

    smooth_closed(&points)
}

/// Scalloped thought cloud: each edge between samples bulges outward along
/// the radial normal through its midpoint.
pub fn cloud_path(w: f32, h: f32) -> Vec<PathCmd> {
    let (cx, cy) = (w / 2.0, h / 2.0);
    let bump = CLOUD_BUMP;
    // Keep the apexes inside the box.
    let rx = (w / 2.0 - bump).max(w * 0.25);
    let ry = (h / 2.0 - bump).max(h * 0.25);

    let points: Vec<(f32, f32)> = (0..CLOUD_POINTS)
        .map(|i| {
            let t = i as f32 / CLOUD_POINTS as f32 * TAU;
            (cx + rx * t.cos(), cy + ry * t.sin())
        })
        .collect();

    let mut path = Vec::with_capacity(CLOUD_POINTS + 2);
    path.push(PathCmd::MoveTo(points[0].0, points[0].1));
    for i in 0..CLOUD_POINTS {
        let a = points[i];
        let b = points[(i + 1) % CLOUD_POINTS];
        let mid = ((a.0 + b.0) / 2.0, (a.1 + b.1) / 2.0);
        let (nx, ny) = normalize(mid.0 - cx, mid.1 - cy);
        // The quadratic apex sits halfway to its control point.
        let ctrl = (mid.0 + nx * bump * 2.0, mid.1 + ny * bump * 2.0);
        path.push(PathCmd::QuadTo(ctrl.0, ctrl.1, b.0, b.1));
    }
    path.push(PathCmd::Close);
    path
}

/// Spiky burst polygon alternating outer and inner radii, jittered in both
/// radius and angle.
pub fn burst_path(w: f32, h: f32, spikes: usize, short: bool, seed: &str) -> Vec<PathCmd> {
    let (cx, cy) = (w / 2.0, h / 2.0);
    let (rx, ry) = (w / 2.0, h / 2.0);
    let inner = if short { 0.82 } else { 0.68 };
    let count = spikes * 2;
    let step = TAU / count as f32;

    let mut path = Vec::with_capacity(count + 1);
    for i in 0..count {
        let n = i as u32;
        let angle = i as f32 * step - FRAC_PI_2 + seed_signed(seed, n + 2000) * step * 0.3;
        let f = if i % 2 == 0 {
            0.88 + 0.12 * seed_unit(seed, n)
        } else {
            inner * (1.0 + 0.06 * seed_signed(seed, n))
        };
        let p = (cx + rx * f * angle.cos(), cy + ry * f * angle.sin());
        path.push(if i == 0 {
            PathCmd::MoveTo(p.0, p.1)
        } else {
            PathCmd::LineTo(p.0, p.1)
        });
    }
    path.push(PathCmd::Close);
    path
}

/// Closed (optionally rounded) rectangle covering the whole box.
pub fn box_path(w: f32, h: f32, r: f32) -> Vec<PathCmd> {
    let mut p = vec![PathCmd::MoveTo(r, 0.0), PathCmd::LineTo(w - r, 0.0)];
    corner(&mut p, (w, 0.0), (w, r), r);
    p.push(PathCmd::LineTo(w, h - r));
    corner(&mut p, (w, h), (w - r, h), r);
    p.push(PathCmd::LineTo(r, h));
    corner(&mut p, (0.0, h), (0.0, h - r), r);
    p.push(PathCmd::LineTo(0.0, r));
    corner(&mut p, (0.0, 0.0), (r, 0.0), r);
    p.push(PathCmd::Close);
    p
}

fn corner(path: &mut Vec<PathCmd>, at: (f32, f32), end: (f32, f32), r: f32) {
    if r > 0.0 {
        path.push(PathCmd::QuadTo(at.0, at.1, end.0, end.1));
    } else {
        path.push(PathCmd::LineTo(end.0, end.1));
    }
}

// ─── Tails ───────────────────────────────────────────────────────────────

fn tail_half_width(w: f32, h: f32) -> f32 {
    w.min(h) * 0.12
}

/// Teardrop from `root` to `tip` whose base runs along `perp`.
fn teardrop(root: (f32, f32), tip: (f32, f32), perp: (f32, f32), half: f32) -> Vec<PathCmd> {
    let a = (root.0 + perp.0 * half, root.1 + perp.1 * half);
    let b = (root.0 - perp.0 * half, root.1 - perp.1 * half);
    let bulge = half * 0.5;
    let ca = (
        (a.0 + tip.0) / 2.0 + perp.0 * bulge,
        (a.1 + tip.1) / 2.0 + perp.1 * bulge,
    );
    let cb = (
        (b.0 + tip.0) / 2.0 - perp.0 * bulge,
        (b.1 + tip.1) / 2.0 - perp.1 * bulge,
    );
    vec![
        PathCmd::MoveTo(a.0, a.1),
        PathCmd::QuadTo(ca.0, ca.1, tip.0, tip.1),
        PathCmd::QuadTo(cb.0, cb.1, b.0, b.1),
        PathCmd::Close,
    ]
}

/// Tail for ellipse-like bodies, rooted `ELLIPSE_TAIL_INSET` inside the
/// ellipse boundary.
pub fn ellipse_tail(w: f32, h: f32, dir: TailDirection) -> Vec<PathCmd> {
    let (cx, cy) = (w / 2.0, h / 2.0);
    let (rx, ry) = (w * ELLIPSE_RX, h * ELLIPSE_RY);
    let (angle, tip) = match dir {
        TailDirection::BottomLeft => (115f32.to_radians(), (w * 0.18, h + TAIL_REACH)),
        TailDirection::BottomRight => (65f32.to_radians(), (w * 0.82, h + TAIL_REACH)),
        TailDirection::Left => (165f32.to_radians(), (-TAIL_REACH, h * 0.7)),
        TailDirection::Right => (15f32.to_radians(), (w + TAIL_REACH, h * 0.7)),
    };
    let edge = (cx + rx * angle.cos(), cy + ry * angle.sin());
    let (ix, iy) = normalize(cx - edge.0, cy - edge.1);
    let root = (
        edge.0 + ix * ELLIPSE_TAIL_INSET,
        edge.1 + iy * ELLIPSE_TAIL_INSET,
    );
    let (dx, dy) = normalize(tip.0 - root.0, tip.1 - root.1);
    teardrop(root, tip, (-dy, dx), tail_half_width(w, h))
}

/// Where a box tail attaches: root point, tip, and the edge it leaves.
fn box_tail_anchor(w: f32, h: f32, dir: TailDirection) -> ((f32, f32), (f32, f32)) {
    match dir {
        TailDirection::BottomLeft => ((w * 0.3, h - BOX_TAIL_INSET), (w * 0.15, h + TAIL_REACH)),
        TailDirection::BottomRight => ((w * 0.7, h - BOX_TAIL_INSET), (w * 0.85, h + TAIL_REACH)),
        TailDirection::Left => ((BOX_TAIL_INSET, h * 0.6), (-TAIL_REACH, h * 0.75)),
        TailDirection::Right => ((w - BOX_TAIL_INSET, h * 0.6), (w + TAIL_REACH, h * 0.75)),
    }
}

/// Tail for rectangle bodies. The base runs parallel to the edge it
/// leaves so the gap in the outline matches it exactly.
pub fn box_tail(w: f32, h: f32, dir: TailDirection) -> Vec<PathCmd> {
    let (root, tip) = box_tail_anchor(w, h, dir);
    let perp = match dir {
        TailDirection::BottomLeft | TailDirection::BottomRight => (1.0, 0.0),
        TailDirection::Left | TailDirection::Right => (0.0, 1.0),
    };
    teardrop(root, tip, perp, tail_half_width(w, h))
}

/// Open clockwise outline of a (rounded) rectangle that skips the span
/// where the tail leaves, so tail and body read as one line.
pub fn box_outline_with_gap(w: f32, h: f32, r: f32, dir: TailDirection) -> Vec<PathCmd> {
    let (root, _) = box_tail_anchor(w, h, dir);
    let half = tail_half_width(w, h);
    let mut p = Vec::with_capacity(12);

    match dir {
        TailDirection::BottomLeft | TailDirection::BottomRight => {
            // Bottom edge runs right → left clockwise.
            let (g0, g1) = (root.0 - half, root.0 + half);
            p.push(PathCmd::MoveTo(g0, h));
            p.push(PathCmd::LineTo(r, h));
            corner(&mut p, (0.0, h), (0.0, h - r), r);
            p.push(PathCmd::LineTo(0.0, r));
            corner(&mut p, (0.0, 0.0), (r, 0.0), r);
            p.push(PathCmd::LineTo(w - r, 0.0));
            corner(&mut p, (w, 0.0), (w, r), r);
            p.push(PathCmd::LineTo(w, h - r));
            corner(&mut p, (w, h), (w - r, h), r);
            p.push(PathCmd::LineTo(g1, h));
        }
        TailDirection::Left => {
            // Left edge runs bottom → top clockwise.
            let (g0, g1) = (root.1 - half, root.1 + half);
            p.push(PathCmd::MoveTo(0.0, g0));
            p.push(PathCmd::LineTo(0.0, r));
            corner(&mut p, (0.0, 0.0), (r, 0.0), r);
            p.push(PathCmd::LineTo(w - r, 0.0));
            corner(&mut p, (w, 0.0), (w, r), r);
            p.push(PathCmd::LineTo(w, h - r));
            corner(&mut p, (w, h), (w - r, h), r);
            p.push(PathCmd::LineTo(r, h));
            corner(&mut p, (0.0, h), (0.0, h - r), r);
            p.push(PathCmd::LineTo(0.0, g1));
        }
        TailDirection::Right => {
            // Right edge runs top → bottom clockwise.
            let (g0, g1) = (root.1 - half, root.1 + half);
            p.push(PathCmd::MoveTo(w, g1));
            p.push(PathCmd::LineTo(w, h - r));
            corner(&mut p, (w, h), (w - r, h), r);
            p.push(PathCmd::LineTo(r, h));
            corner(&mut p, (0.0, h), (0.0, h - r), r);
            p.push(PathCmd::LineTo(0.0, r));
            corner(&mut p, (0.0, 0.0), (r, 0.0), r);
            p.push(PathCmd::LineTo(w - r, 0.0));
            corner(&mut p, (w, 0.0), (w, r), r);
            p.push(PathCmd::LineTo(w, g0));
        }
    }
    p
}

// ─── Helpers ─────────────────────────────────────────────────────────────

fn normalize(x: f32, y: f32) -> (f32, f32) {
    let len = (x * x + y * y).sqrt();
    if len <= f32::EPSILON {
        (0.0, 0.0)
    } else {
        (x / len, y / len)
    }
}

/// Closed curve through the midpoints of consecutive samples, using each
/// sample as the quadratic control point.
fn smooth_closed(points: &[(f32, f32)]) -> Vec<PathCmd> {
    let n = points.len();
    let mid = |a: (f32, f32), b: (f32, f32)| ((a.0 + b.0) / 2.0, (a.1 + b.1) / 2.0);
    let start = mid(points[n - 1], points[0]);
    let mut path = Vec::with_capacity(n + 2);
    path.push(PathCmd::MoveTo(start.0, start.1));
    for i in 0..n {
        let p = points[i];
        let m = mid(p, points[(i + 1) % n]);
        path.push(PathCmd::QuadTo(p.0, p.1, m.0, m.1));
    }
    path.push(PathCmd::Close);
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points_of(path: &[PathCmd]) -> Vec<(f32, f32)> {
        path.iter()
            .filter_map(|c| match *c {
                PathCmd::MoveTo(x, y) | PathCmd::LineTo(x, y) => Some((x, y)),
                PathCmd::QuadTo(_, _, x, y) => Some((x, y)),
                PathCmd::CubicTo(_, _, _, _, x, y) => Some((x, y)),
                PathCmd::Close => None,
            })
            .collect()
    }

    #[test]
    fn ellipse_extremes_match_radii() {
        let path = ellipse_path(200.0, 100.0);
        let pts = points_of(&path);
        let close =
            |a: (f32, f32), b: (f32, f32)| (a.0 - b.0).abs() < 1e-3 && (a.1 - b.1).abs() < 1e-3;
        assert!(close(pts[0], (196.0, 50.0)), "{:?}", pts[0]);
        assert!(close(pts[1], (100.0, 94.0)), "{:?}", pts[1]);
        assert!(close(pts[2], (4.0, 50.0)), "{:?}", pts[2]);
        assert!(close(pts[3], (100.0, 6.0)), "{:?}", pts[3]);
    }

    #[test]
    fn rough_ellipse_is_deterministic_and_seed_sensitive() {
        let a = rough_ellipse_path(240.0, 120.0, "bubble_9");
        let b = rough_ellipse_path(240.0, 120.0, "bubble_9");
        let c = rough_ellipse_path(240.0, 120.0, "bubble_10");
        assert_eq!(a, b);
        assert_ne!(a, c);
        // move + one quad per sample + close
        assert_eq!(a.len(), ROUGH_POINTS + 2);
    }

    #[test]
    fn cloud_has_one_scallop_per_point() {
        let path = cloud_path(240.0, 140.0);
        let quads = path
            .iter()
            .filter(|c| matches!(c, PathCmd::QuadTo(..)))
            .count();
        assert_eq!(quads, CLOUD_POINTS);
    }

    #[test]
    fn cloud_scallops_bulge_outward() {
        let (w, h) = (240.0, 140.0);
        let (cx, cy) = (w / 2.0, h / 2.0);
        let path = cloud_path(w, h);
        let mut prev = match path[0] {
            PathCmd::MoveTo(x, y) => (x, y),
            _ => panic!("expected MoveTo"),
        };
        for cmd in &path[1..] {
            if let PathCmd::QuadTo(qx, qy, x, y) = *cmd {
                let mid = ((prev.0 + x) / 2.0, (prev.1 + y) / 2.0);
                let d_mid = (mid.0 - cx).hypot(mid.1 - cy);
                let d_ctrl = (qx - cx).hypot(qy - cy);
                assert!(d_ctrl > d_mid);
                prev = (x, y);
            }
        }
    }

    #[test]
    fn burst_spike_counts() {
        let shout = burst_path(240.0, 160.0, SHOUT_SPIKES, false, "s");
        let sfx = burst_path(240.0, 160.0, SFX_SPIKES, true, "s");
        assert_eq!(points_of(&shout).len(), SHOUT_SPIKES * 2);
        assert_eq!(points_of(&sfx).len(), SFX_SPIKES * 2);
    }

    #[test]
    fn burst_stays_inside_box() {
        let (w, h) = (200.0, 120.0);
        for (x, y) in points_of(&burst_path(w, h, SHOUT_SPIKES, false, "bubble_3")) {
            assert!((0.0..=w).contains(&x) && (0.0..=h).contains(&y), "({x},{y})");
        }
    }

    #[test]
    fn bursts_never_get_tails() {
        for ty in [BubbleType::Shout, BubbleType::Sfx] {
            let shape = synthesize(ty, 240.0, 160.0, Some(TailDirection::Left), "b");
            assert!(!shape.has_tail());
        }
    }

    #[test]
    fn ellipse_tail_order_hides_seam() {
        let shape = synthesize(
            BubbleType::Speech,
            240.0,
            120.0,
            Some(TailDirection::BottomLeft),
            "b",
        );
        let order: Vec<(LayerRole, LayerPaint)> =
            shape.layers.iter().map(|l| (l.role, l.paint)).collect();
        assert_eq!(
            order,
            vec![
                (LayerRole::Tail, LayerPaint::Stroke),
                (LayerRole::Body, LayerPaint::Fill),
                (LayerRole::Body, LayerPaint::Stroke),
                (LayerRole::Tail, LayerPaint::Fill),
            ]
        );
    }

    #[test]
    fn box_tail_uses_gapped_outline() {
        let shape = synthesize(
            BubbleType::RoundedRectangle,
            240.0,
            120.0,
            Some(TailDirection::Right),
            "b",
        );
        let last = shape.layers.last().unwrap();
        assert_eq!(last.role, LayerRole::Outline);
        assert!(!last.path.contains(&PathCmd::Close));
    }

    #[test]
    fn outline_gap_matches_tail_base() {
        let (w, h) = (240.0, 120.0);
        let outline = box_outline_with_gap(w, h, 0.0, TailDirection::BottomLeft);
        let tail = box_tail(w, h, TailDirection::BottomLeft);
        let half = tail_half_width(w, h);
        let (first, last) = (points_of(&outline)[0], *points_of(&outline).last().unwrap());
        assert_eq!(first, (w * 0.3 - half, h));
        assert_eq!(last, (w * 0.3 + half, h));
        // tail base is parallel to the bottom edge, inset inside the body
        let base = points_of(&tail);
        assert_eq!(base[0].1, h - BOX_TAIL_INSET);
        assert_eq!(base[2].1, h - BOX_TAIL_INSET);
    }

    #[test]
    fn ellipse_tail_root_inside_body() {
        let (w, h) = (240.0, 120.0);
        let pts = points_of(&ellipse_tail(w, h, TailDirection::Right));
        // base corners are the first and last points; the root is between them
        let (a, b) = (pts[0], pts[2]);
        let root = ((a.0 + b.0) / 2.0, (a.1 + b.1) / 2.0);
        let nx = (root.0 - w / 2.0) / (w * ELLIPSE_RX);
        let ny = (root.1 - h / 2.0) / (h * ELLIPSE_RY);
        assert!(nx * nx + ny * ny < 1.0, "root {root:?} outside ellipse");
    }

    #[test]
    fn whisper_uses_dashed_outline() {
        let shape = synthesize(BubbleType::Whisper, 200.0, 100.0, None, "w");
        assert!(shape.layers.iter().any(|l| l.paint == LayerPaint::DashedStroke));
    }

    #[test]
    fn synthesis_is_byte_identical_per_seed() {
        for ty in [
            BubbleType::RoughSpeech,
            BubbleType::Shout,
            BubbleType::Sfx,
            BubbleType::Thought,
        ] {
            let tail = Some(TailDirection::BottomRight);
            let a = synthesize(ty, 260.0, 150.0, tail, "bubble_4").to_svg_path();
            let b = synthesize(ty, 260.0, 150.0, tail, "bubble_4").to_svg_path();
            assert_eq!(a, b, "{ty:?}");
            assert!(!a.is_empty());
        }
    }

    #[test]
    fn halftone_adds_dot_layer() {
        let shape = synthesize(BubbleType::HalftoneSpeech, 200.0, 100.0, None, "h");
        assert!(shape.layers.iter().any(|l| l.paint == LayerPaint::HalftoneFill));
    }
}
