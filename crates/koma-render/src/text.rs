//! Bubble text: auto font sizing, word wrap, and centered line layout.
//!
//! All of this is pure and re-run on every frame. The font size depends
//! only on the text and the current box, so it always matches what the
//! user sees while resizing.

use koma_core::ComposerConfig;
use koma_core::geometry::Rect;
use koma_core::model::{Bubble, FontSizePolicy, ShapeFamily};

/// Line height as a multiple of the font size.
pub const LINE_HEIGHT: f32 = 1.2;
/// Baseline offset from the top of a line, as a multiple of the font size.
const ASCENT: f32 = 0.9;

/// Width measurement for a run of text.
pub trait TextMeasure {
    fn advance(&self, text: &str, size: f32, bold: bool) -> f32;
}

/// Average-glyph estimate used when no font is loaded.
#[derive(Debug, Clone, Copy, Default)]
pub struct EstimateMeasure;

impl TextMeasure for EstimateMeasure {
    fn advance(&self, text: &str, size: f32, bold: bool) -> f32 {
        let em = if bold { 0.58 } else { 0.52 };
        text.chars().count() as f32 * size * em
    }
}

/// Font size that shrinks as text grows relative to the box:
/// `sqrt(area / (len · 2.2)) · 0.9`, clamped to `[min, max]`.
/// Empty text gets `max`.
pub fn auto_font_size(text: &str, width: f32, height: f32, min: f32, max: f32) -> f32 {
    let len = text.trim().chars().count();
    if len == 0 {
        return max;
    }
    let area = (width * height).max(0.0);
    let size = (area / (len as f32 * 2.2)).sqrt() * 0.9;
    size.clamp(min, max)
}

/// The region text is laid out in, in bubble-local coordinates. Keeps
/// words clear of the silhouette.
pub fn text_box(bubble: &Bubble) -> Rect {
    let (w, h) = (bubble.geometry.width, bubble.geometry.height);
    let (px, py) = match bubble.bubble_type.family() {
        ShapeFamily::Ellipse | ShapeFamily::Rough => (w * 0.15, h * 0.18),
        ShapeFamily::Cloud => (w * 0.18, h * 0.22),
        ShapeFamily::Burst => (w * 0.24, h * 0.28),
        ShapeFamily::Box => (10.0, 8.0),
    };
    Rect::new(px, py, (w - 2.0 * px).max(1.0), (h - 2.0 * py).max(1.0))
}

/// Stored size, or the auto-fit size for the bubble's current text box.
pub fn resolve_font_size(bubble: &Bubble, config: &ComposerConfig) -> f32 {
    match bubble.font_size {
        FontSizePolicy::Fixed(size) => size,
        FontSizePolicy::Auto => {
            let b = text_box(bubble);
            auto_font_size(
                &bubble.text,
                b.width,
                b.height,
                config.min_font_size,
                config.max_font_size,
            )
        }
    }
}

/// Greedy word wrap. Explicit newlines are kept; a word wider than the
/// line is broken between characters.
pub fn wrap_lines(
    text: &str,
    max_width: f32,
    size: f32,
    bold: bool,
    measure: &dyn TextMeasure,
) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            let candidate = if line.is_empty() {
                word.to_owned()
            } else {
                format!("{line} {word}")
            };
            if measure.advance(&candidate, size, bold) <= max_width {
                line = candidate;
                continue;
            }
            if !line.is_empty() {
                lines.push(std::mem::take(&mut line));
            }
            if measure.advance(word, size, bold) <= max_width {
                line = word.to_owned();
            } else {
                for ch in word.chars() {
                    let mut next = line.clone();
                    next.push(ch);
                    if !line.is_empty() && measure.advance(&next, size, bold) > max_width {
                        lines.push(std::mem::replace(&mut line, ch.to_string()));
                    } else {
                        line = next;
                    }
                }
            }
        }
        lines.push(line);
    }
    // A trailing newline should not leave a dangling empty line.
    while lines.len() > 1 && lines.last().is_some_and(String::is_empty) {
        lines.pop();
    }
    lines
}

#[derive(Debug, Clone, PartialEq)]
pub struct LaidLine {
    pub text: String,
    /// Left edge of the line.
    pub x: f32,
    pub baseline: f32,
    pub width: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextLayout {
    pub size: f32,
    pub bold: bool,
    pub lines: Vec<LaidLine>,
}

/// Wrap `text` into `rect` and center the block both ways.
pub fn layout_centered(
    text: &str,
    rect: Rect,
    size: f32,
    bold: bool,
    measure: &dyn TextMeasure,
) -> TextLayout {
    let wrapped = wrap_lines(text, rect.width, size, bold, measure);
    let line_height = size * LINE_HEIGHT;
    let block = line_height * wrapped.len() as f32;
    let top = rect.y + (rect.height - block) / 2.0;

    let lines = wrapped
        .into_iter()
        .enumerate()
        .map(|(i, text)| {
            let width = measure.advance(&text, size, bold);
            LaidLine {
                x: rect.x + (rect.width - width) / 2.0,
                baseline: top + i as f32 * line_height + size * ASCENT,
                width,
                text,
            }
        })
        .collect();

    TextLayout { size, bold, lines }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Every character is exactly `size` wide.
    struct Mono;

    impl TextMeasure for Mono {
        fn advance(&self, text: &str, size: f32, _bold: bool) -> f32 {
            text.chars().count() as f32 * size
        }
    }

    #[test]
    fn auto_size_is_clamped() {
        assert_eq!(auto_font_size("", 200.0, 100.0, 10.0, 30.0), 30.0);
        assert_eq!(auto_font_size("Hi", 400.0, 300.0, 10.0, 30.0), 30.0);
        let long = "word ".repeat(200);
        assert_eq!(auto_font_size(&long, 100.0, 60.0, 10.0, 30.0), 10.0);
    }

    #[test]
    fn auto_size_shrinks_with_length() {
        let short = auto_font_size("Hello there", 160.0, 70.0, 10.0, 30.0);
        let long =
            auto_font_size("Hello there, how have you been lately?", 160.0, 70.0, 10.0, 30.0);
        assert!(long < short, "{long} !< {short}");
        // sqrt(11200 / (38 · 2.2)) · 0.9
        assert!((long - 10.418).abs() < 0.01, "{long}");
    }

    #[test]
    fn wrap_breaks_on_words() {
        let lines = wrap_lines("aa bb cc", 5.0, 1.0, false, &Mono);
        assert_eq!(lines, vec!["aa bb", "cc"]);
    }

    #[test]
    fn wrap_keeps_newlines_and_splits_long_words() {
        let lines = wrap_lines("abcdefg\nhi", 3.0, 1.0, false, &Mono);
        assert_eq!(lines, vec!["abc", "def", "g", "hi"]);
    }

    #[test]
    fn layout_is_centered() {
        let layout = layout_centered("ab", Rect::new(0.0, 0.0, 10.0, 12.0), 1.0, false, &Mono);
        let line = &layout.lines[0];
        assert_eq!(line.x, 4.0);
        assert_eq!(line.width, 2.0);
        // one 1.2-high line centered in 12
        assert!((line.baseline - (5.4 + 0.9)).abs() < 1e-4);
    }
}
