//! Font resolution with a built-in last-resort bitmap face.

use std::{path::PathBuf, sync::Arc};

use image::{Pixel, Rgba, RgbaImage};
use once_cell::sync::OnceCell;
use rusttype::{Font, Scale, point};
use tracing::{debug, warn};

const BITMAP_GLYPH_WIDTH: u32 = 5;
const BITMAP_GLYPH_HEIGHT: u32 = 7;
const BITMAP_ADVANCE: f32 = (BITMAP_GLYPH_WIDTH + 1) as f32;
const BITMAP_LINE_HEIGHT: f32 = (BITMAP_GLYPH_HEIGHT + 2) as f32;

/// Resolves a usable font for a requested point size.
///
/// Candidates are tried in order; the first file that exists and parses as a
/// scalable font is cached for the process lifetime. When none loads, every
/// resolution yields the built-in fixed-size bitmap face, so resolution
/// itself can never fail.
pub struct FontResolver {
    candidates: Vec<PathBuf>,
    loaded: OnceCell<Option<Arc<Font<'static>>>>,
}

impl FontResolver {
    pub fn new(candidates: Vec<PathBuf>) -> Self {
        Self {
            candidates,
            loaded: OnceCell::new(),
        }
    }

    pub fn resolve(&self, size_pt: u32) -> ResolvedFont {
        match self.loaded.get_or_init(|| self.load_first_candidate()) {
            Some(font) => ResolvedFont::Scalable {
                font: Arc::clone(font),
                scale: Scale::uniform(size_pt.max(1) as f32),
            },
            None => ResolvedFont::Bitmap,
        }
    }

    fn load_first_candidate(&self) -> Option<Arc<Font<'static>>> {
        for path in &self.candidates {
            let bytes = match std::fs::read(path) {
                Ok(bytes) => bytes,
                // Missing candidates are expected; only parse failures are surprising.
                Err(_) => continue,
            };
            match Font::try_from_vec(bytes) {
                Some(font) => {
                    debug!(
                        target = "memeforge::render",
                        path = %path.display(),
                        "loaded scalable font"
                    );
                    return Some(Arc::new(font));
                }
                None => warn!(
                    target = "memeforge::render",
                    path = %path.display(),
                    "font file exists but failed to parse"
                ),
            }
        }

        warn!(
            target = "memeforge::render",
            "no scalable font candidate loaded; using built-in bitmap face"
        );
        None
    }
}

/// A font handle the layout engine and compositor can measure and draw with.
pub enum ResolvedFont {
    Scalable {
        font: Arc<Font<'static>>,
        scale: Scale,
    },
    /// Fixed-size 5x7 face covering the upper-cased ASCII repertoire.
    /// Ignores the requested point size.
    Bitmap,
}

impl ResolvedFont {
    /// Pixel width of a single line of text in this font.
    pub fn line_width(&self, text: &str) -> f32 {
        match self {
            ResolvedFont::Scalable { font, scale } => font
                .layout(text, *scale, point(0.0, 0.0))
                .last()
                .map(|glyph| glyph.position().x + glyph.unpositioned().h_metrics().advance_width)
                .unwrap_or(0.0),
            ResolvedFont::Bitmap => text.chars().count() as f32 * BITMAP_ADVANCE,
        }
    }

    /// Vertical advance between consecutive lines.
    pub fn line_height(&self) -> f32 {
        match self {
            ResolvedFont::Scalable { font, scale } => {
                let metrics = font.v_metrics(*scale);
                metrics.ascent - metrics.descent + metrics.line_gap
            }
            ResolvedFont::Bitmap => BITMAP_LINE_HEIGHT,
        }
    }

    /// Draw one line with its top-left corner at `(x, y)`, alpha-blending
    /// glyph coverage scaled by the color's alpha channel onto the canvas.
    pub fn draw_line(&self, canvas: &mut RgbaImage, x: f32, y: f32, text: &str, color: Rgba<u8>) {
        match self {
            ResolvedFont::Scalable { font, scale } => {
                let baseline = y + font.v_metrics(*scale).ascent;
                for glyph in font.layout(text, *scale, point(x, baseline)) {
                    if let Some(bounds) = glyph.pixel_bounding_box() {
                        glyph.draw(|gx, gy, coverage| {
                            blend_pixel(
                                canvas,
                                bounds.min.x + gx as i32,
                                bounds.min.y + gy as i32,
                                color,
                                coverage,
                            );
                        });
                    }
                }
            }
            ResolvedFont::Bitmap => {
                let mut caret = x.round() as i32;
                let top = y.round() as i32;
                for ch in text.chars() {
                    let rows = bitmap_glyph(ch);
                    for (row, bits) in rows.iter().enumerate() {
                        for col in 0..BITMAP_GLYPH_WIDTH {
                            if bits & (0b1_0000 >> col) != 0 {
                                blend_pixel(
                                    canvas,
                                    caret + col as i32,
                                    top + row as i32,
                                    color,
                                    1.0,
                                );
                            }
                        }
                    }
                    caret += BITMAP_ADVANCE as i32;
                }
            }
        }
    }
}

fn blend_pixel(canvas: &mut RgbaImage, x: i32, y: i32, color: Rgba<u8>, coverage: f32) {
    if x < 0 || y < 0 {
        return;
    }
    let (x, y) = (x as u32, y as u32);
    if x >= canvas.width() || y >= canvas.height() {
        return;
    }
    let alpha = (color[3] as f32 * coverage.clamp(0.0, 1.0)).round() as u8;
    if alpha == 0 {
        return;
    }
    canvas
        .get_pixel_mut(x, y)
        .blend(&Rgba([color[0], color[1], color[2], alpha]));
}

/// 5x7 glyph rows, bit 4 = leftmost column. Upper-case letters, digits, and
/// the punctuation that survives upper-casing; anything else renders as a
/// hollow box.
fn bitmap_glyph(ch: char) -> [u8; 7] {
    match ch.to_ascii_uppercase() {
        ' ' => [0; 7],
        'A' => [0b01110, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'B' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10001, 0b10001, 0b11110],
        'C' => [0b01110, 0b10001, 0b10000, 0b10000, 0b10000, 0b10001, 0b01110],
        'D' => [0b11110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b11110],
        'E' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b11111],
        'F' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b10000],
        'G' => [0b01110, 0b10001, 0b10000, 0b10111, 0b10001, 0b10001, 0b01111],
        'H' => [0b10001, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'I' => [0b01110, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        'J' => [0b00111, 0b00010, 0b00010, 0b00010, 0b00010, 0b10010, 0b01100],
        'K' => [0b10001, 0b10010, 0b10100, 0b11000, 0b10100, 0b10010, 0b10001],
        'L' => [0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b11111],
        'M' => [0b10001, 0b11011, 0b10101, 0b10101, 0b10001, 0b10001, 0b10001],
        'N' => [0b10001, 0b11001, 0b10101, 0b10011, 0b10001, 0b10001, 0b10001],
        'O' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'P' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10000, 0b10000, 0b10000],
        'Q' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10101, 0b10010, 0b01101],
        'R' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10100, 0b10010, 0b10001],
        'S' => [0b01111, 0b10000, 0b10000, 0b01110, 0b00001, 0b00001, 0b11110],
        'T' => [0b11111, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100],
        'U' => [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'V' => [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01010, 0b00100],
        'W' => [0b10001, 0b10001, 0b10001, 0b10101, 0b10101, 0b11011, 0b10001],
        'X' => [0b10001, 0b10001, 0b01010, 0b00100, 0b01010, 0b10001, 0b10001],
        'Y' => [0b10001, 0b10001, 0b01010, 0b00100, 0b00100, 0b00100, 0b00100],
        'Z' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b10000, 0b11111],
        '0' => [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110],
        '1' => [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        '2' => [0b01110, 0b10001, 0b00001, 0b00110, 0b01000, 0b10000, 0b11111],
        '3' => [0b11111, 0b00010, 0b00100, 0b00010, 0b00001, 0b10001, 0b01110],
        '4' => [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010],
        '5' => [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110],
        '6' => [0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110],
        '7' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000],
        '8' => [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110],
        '9' => [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100],
        '.' => [0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b01100, 0b01100],
        ',' => [0b00000, 0b00000, 0b00000, 0b00000, 0b00110, 0b00110, 0b00100],
        '!' => [0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00000, 0b00100],
        '?' => [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b00000, 0b00100],
        '\'' => [0b00100, 0b00100, 0b01000, 0b00000, 0b00000, 0b00000, 0b00000],
        '-' => [0b00000, 0b00000, 0b00000, 0b11111, 0b00000, 0b00000, 0b00000],
        ':' => [0b00000, 0b01100, 0b01100, 0b00000, 0b01100, 0b01100, 0b00000],
        _ => [0b11111, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b11111],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolver_without_candidates_yields_bitmap() {
        let resolver = FontResolver::new(Vec::new());
        assert!(matches!(resolver.resolve(50), ResolvedFont::Bitmap));
    }

    #[test]
    fn missing_candidate_paths_fall_through() {
        let resolver = FontResolver::new(vec![PathBuf::from("/nonexistent/font.ttf")]);
        assert!(matches!(resolver.resolve(50), ResolvedFont::Bitmap));
    }

    #[test]
    fn bitmap_width_is_linear_in_characters() {
        let font = ResolvedFont::Bitmap;
        assert_eq!(font.line_width(""), 0.0);
        assert_eq!(font.line_width("HELLO"), 5.0 * BITMAP_ADVANCE);
    }

    #[test]
    fn bitmap_draw_marks_pixels() {
        let font = ResolvedFont::Bitmap;
        let mut canvas = RgbaImage::from_pixel(32, 16, Rgba([0, 0, 0, 255]));
        font.draw_line(&mut canvas, 1.0, 1.0, "I", Rgba([255, 255, 255, 255]));
        let touched = canvas.pixels().filter(|px| px[0] > 0).count();
        assert!(touched > 0);
    }

    #[test]
    fn bitmap_draw_clips_at_canvas_edges() {
        let font = ResolvedFont::Bitmap;
        let mut canvas = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255]));
        // Must not panic when the glyph extends past the right/bottom edge.
        font.draw_line(&mut canvas, 2.0, 2.0, "WWW", Rgba([255, 255, 255, 255]));
        font.draw_line(&mut canvas, -3.0, -3.0, "W", Rgba([255, 255, 255, 255]));
    }
}
