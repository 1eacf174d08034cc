//! Hex color parsing for text layers.

use image::Rgba;

/// Parse a `#rrggbb` string into an RGBA color whose alpha channel encodes
/// the layer opacity percentage. Unparseable strings fall back to opaque
/// white.
pub fn parse_hex_color(value: &str, opacity_pct: u8) -> Rgba<u8> {
    let alpha = (f32::from(opacity_pct.min(100)) / 100.0 * 255.0).round() as u8;
    match decode_rgb(value) {
        Some([r, g, b]) => Rgba([r, g, b, alpha]),
        None => Rgba([255, 255, 255, 255]),
    }
}

fn decode_rgb(value: &str) -> Option<[u8; 3]> {
    let trimmed = value.trim();
    let digits = trimmed.strip_prefix('#').unwrap_or(trimmed);
    if digits.len() != 6 {
        return None;
    }
    let bytes = hex::decode(digits).ok()?;
    Some([bytes[0], bytes[1], bytes[2]])
}
