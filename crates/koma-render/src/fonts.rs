//! Font registry and glyph outlines.
//!
//! Glyphs are turned into `tiny_skia::Path`s rather than coverage
//! bitmaps so text follows the owning object's rotation and flips with
//! the same transform as the bubble outline.

use crate::text::{EstimateMeasure, TextMeasure};
use ab_glyph::{Font, FontArc, GlyphId, OutlineCurve, PxScale, ScaleFont};
use std::collections::HashMap;
use std::fmt;
use tiny_skia::{Path, PathBuilder};

#[derive(Debug, thiserror::Error)]
pub enum FontError {
    #[error("invalid font data for {family}: {message}")]
    Invalid { family: String, message: String },
}

/// Fonts by family name. The first registered family doubles as the
/// fallback for unknown families.
#[derive(Clone, Default)]
pub struct FontBook {
    faces: HashMap<String, FontArc>,
    fallback: Option<String>,
}

impl fmt::Debug for FontBook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut families: Vec<&String> = self.faces.keys().collect();
        families.sort();
        f.debug_struct("FontBook")
            .field("families", &families)
            .field("fallback", &self.fallback)
            .finish()
    }
}

fn bold_key(family: &str) -> String {
    format!("{family}#bold")
}

impl FontBook {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a regular face for `family` from TTF/OTF bytes.
    pub fn register(&mut self, family: &str, bytes: Vec<u8>) -> Result<(), FontError> {
        let font = parse(family, bytes)?;
        self.faces.insert(family.to_owned(), font);
        if self.fallback.is_none() {
            self.fallback = Some(family.to_owned());
        }
        log::debug!("registered font family {family}");
        Ok(())
    }

    /// Register a bold face for `family`. Without one, bold text is
    /// emboldened by stroking the regular outline.
    pub fn register_bold(&mut self, family: &str, bytes: Vec<u8>) -> Result<(), FontError> {
        let font = parse(family, bytes)?;
        self.faces.insert(bold_key(family), font);
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Resolve a face. The flag is `true` when a real bold face was found
    /// for a bold request.
    pub fn face(&self, family: &str, bold: bool) -> Option<(&FontArc, bool)> {
        if bold && let Some(f) = self.faces.get(&bold_key(family)) {
            return Some((f, true));
        }
        if let Some(f) = self.faces.get(family) {
            return Some((f, false));
        }
        let fallback = self.fallback.as_deref()?;
        if bold && let Some(f) = self.faces.get(&bold_key(fallback)) {
            return Some((f, true));
        }
        self.faces.get(fallback).map(|f| (f, false))
    }

    /// A [`TextMeasure`] for one family.
    pub fn measure<'a>(&'a self, family: &'a str) -> FamilyMeasure<'a> {
        FamilyMeasure { book: self, family }
    }
}

fn parse(family: &str, bytes: Vec<u8>) -> Result<FontArc, FontError> {
    FontArc::try_from_vec(bytes).map_err(|e| FontError::Invalid {
        family: family.to_owned(),
        message: e.to_string(),
    })
}

/// Measures with real advances when the family resolves, otherwise with
/// the average-glyph estimate.
pub struct FamilyMeasure<'a> {
    book: &'a FontBook,
    family: &'a str,
}

impl TextMeasure for FamilyMeasure<'_> {
    fn advance(&self, text: &str, size: f32, bold: bool) -> f32 {
        match self.book.face(self.family, bold) {
            Some((font, _)) => line_advance(font, text, size),
            None => EstimateMeasure.advance(text, size, bold),
        }
    }
}

/// Pen advance of a line including kerning.
pub fn line_advance(font: &FontArc, text: &str, size: f32) -> f32 {
    let scaled = font.as_scaled(PxScale::from(size));
    let mut width = 0.0;
    let mut prev: Option<GlyphId> = None;
    for ch in text.chars() {
        let id = scaled.glyph_id(ch);
        if let Some(p) = prev {
            width += scaled.kern(p, id);
        }
        width += scaled.h_advance(id);
        prev = Some(id);
    }
    width
}

/// Outline of one line of text with its pen starting at `(x, baseline)`.
/// Returns `None` for whitespace-only lines.
pub fn line_path(font: &FontArc, text: &str, x: f32, baseline: f32, size: f32) -> Option<Path> {
    let scaled = font.as_scaled(PxScale::from(size));
    let (sx, sy) = (scaled.h_scale_factor(), scaled.v_scale_factor());
    let mut pb = PathBuilder::new();
    let mut pen = x;
    let mut prev: Option<GlyphId> = None;

    for ch in text.chars() {
        let id = scaled.glyph_id(ch);
        if let Some(p) = prev {
            pen += scaled.kern(p, id);
        }
        if let Some(outline) = font.outline(id) {
            // Font units are y-up.
            let map = |p: ab_glyph::Point| (pen + p.x * sx, baseline - p.y * sy);
            let mut last: Option<(f32, f32)> = None;
            for curve in &outline.curves {
                let (start, end) = match curve {
                    OutlineCurve::Line(a, b) => (map(*a), map(*b)),
                    OutlineCurve::Quad(a, _, b) => (map(*a), map(*b)),
                    OutlineCurve::Cubic(a, _, _, b) => (map(*a), map(*b)),
                };
                if last != Some(start) {
                    if last.is_some() {
                        pb.close();
                    }
                    pb.move_to(start.0, start.1);
                }
                match curve {
                    OutlineCurve::Line(_, _) => pb.line_to(end.0, end.1),
                    OutlineCurve::Quad(_, c, _) => {
                        let c = map(*c);
                        pb.quad_to(c.0, c.1, end.0, end.1);
                    }
                    OutlineCurve::Cubic(_, c0, c1, _) => {
                        let (c0, c1) = (map(*c0), map(*c1));
                        pb.cubic_to(c0.0, c0.1, c1.0, c1.1, end.0, end.1);
                    }
                }
                last = Some(end);
            }
            if last.is_some() {
                pb.close();
            }
        }
        pen += scaled.h_advance(id);
        prev = Some(id);
    }
    pb.finish()
}
