//! Paints text layers onto the template image and produces the final JPEG.

use image::{Rgb, RgbImage, Rgba, RgbaImage};

use crate::domain::job::TextLayer;

use super::{
    color::parse_hex_color,
    fonts::{FontResolver, ResolvedFont},
    layout::wrap_text,
};

/// Gap kept between a layer's text block and the image's right edge.
const RIGHT_MARGIN: f32 = 20.0;
/// Below this usable width the layer is re-laid-out centered instead.
const MIN_WRAP_WIDTH: f32 = 100.0;
/// Left offset and per-side gap used for the centered fallback layout.
const SIDE_MARGIN: f32 = 40.0;
/// Border stamps cover every integer offset within this reach of the anchor.
const BORDER_REACH: i32 = 2;

const JPEG_QUALITY: u8 = 95;

pub struct Compositor {
    fonts: FontResolver,
}

impl Compositor {
    pub fn new(fonts: FontResolver) -> Self {
        Self { fonts }
    }

    /// Paint all layers onto `canvas` in list order; later layers end up on
    /// top of earlier ones. The canvas keeps its alpha channel so the caller
    /// can flatten once after the last layer.
    pub fn compose(
        &self,
        mut canvas: RgbaImage,
        layers: &[TextLayer],
        border_enabled: bool,
    ) -> RgbaImage {
        for layer in layers {
            self.paint_layer(&mut canvas, layer, border_enabled);
        }
        canvas
    }

    fn paint_layer(&self, canvas: &mut RgbaImage, layer: &TextLayer, border_enabled: bool) {
        let font = self.fonts.resolve(layer.size);
        let (left, wrap_width) = layer_geometry(canvas.width(), layer.x_pos);
        let text = layer.text.to_uppercase();
        let wrapped = wrap_text(&text, &font, wrap_width);

        if border_enabled {
            let border = parse_hex_color(&layer.border_color_hex, layer.opacity);
            for dy in -BORDER_REACH..=BORDER_REACH {
                for dx in -BORDER_REACH..=BORDER_REACH {
                    draw_block(canvas, &font, left + dx, layer.y_pos + dy, &wrapped, border);
                }
            }
        }

        let fill = parse_hex_color(&layer.color, layer.opacity);
        draw_block(canvas, &font, left, layer.y_pos, &wrapped, fill);
    }
}

/// Effective left offset and wrap width for a layer.
///
/// The usable width runs from the layer's x offset to the right margin; when
/// that leaves too little room the layer falls back to a centered block with
/// a fixed side margin.
pub fn layer_geometry(image_width: u32, x_pos: i32) -> (i32, f32) {
    let usable = image_width as f32 - x_pos as f32 - RIGHT_MARGIN;
    if usable < MIN_WRAP_WIDTH {
        (
            SIDE_MARGIN as i32,
            image_width as f32 - 2.0 * SIDE_MARGIN,
        )
    } else {
        (x_pos, usable)
    }
}

/// Draw a multi-line block anchored at `(x, y)`, center-aligning shorter
/// lines against the widest line of the block.
fn draw_block(
    canvas: &mut RgbaImage,
    font: &ResolvedFont,
    x: i32,
    y: i32,
    text: &str,
    color: Rgba<u8>,
) {
    let lines: Vec<&str> = text.split('\n').collect();
    let block_width = lines
        .iter()
        .map(|line| font.line_width(line))
        .fold(0.0_f32, f32::max);
    let line_height = font.line_height();

    for (index, line) in lines.iter().enumerate() {
        if line.is_empty() {
            continue;
        }
        let line_x = x as f32 + (block_width - font.line_width(line)) / 2.0;
        let line_y = y as f32 + index as f32 * line_height;
        font.draw_line(canvas, line_x, line_y, line, color);
    }
}

/// Flatten the working buffer onto an opaque white background so layer
/// translucency never reaches the stored artifact.
pub fn flatten(image: &RgbaImage) -> RgbImage {
    let mut out = RgbImage::from_pixel(image.width(), image.height(), Rgb([255, 255, 255]));
    for (x, y, pixel) in image.enumerate_pixels() {
        let alpha = f32::from(pixel[3]) / 255.0;
        let inverse = 1.0 - alpha;
        let dst = out.get_pixel_mut(x, y);
        for channel in 0..3 {
            dst[channel] =
                (f32::from(pixel[channel]) * alpha + f32::from(dst[channel]) * inverse).round()
                    as u8;
        }
    }
    out
}

pub fn encode_jpeg(image: &RgbImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buffer = Vec::new();
    let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, JPEG_QUALITY);
    encoder.encode_image(image)?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bitmap_compositor() -> Compositor {
        Compositor::new(FontResolver::new(Vec::new()))
    }

    fn layer(text: &str, x: i32, y: i32, color: &str) -> TextLayer {
        TextLayer {
            text: text.to_string(),
            x_pos: x,
            y_pos: y,
            size: 50,
            color: color.to_string(),
            opacity: 100,
            border_color_hex: "#000000".to_string(),
        }
    }

    #[test]
    fn empty_layer_list_leaves_the_canvas_untouched() {
        let compositor = bitmap_compositor();
        let canvas = RgbaImage::from_pixel(64, 64, Rgba([73, 109, 137, 255]));
        let reference = canvas.clone();
        let composed = compositor.compose(canvas, &[], true);
        assert_eq!(composed.as_raw(), reference.as_raw());
    }

    #[test]
    fn later_layers_paint_over_earlier_ones() {
        let compositor = bitmap_compositor();
        let canvas = RgbaImage::from_pixel(200, 64, Rgba([0, 0, 0, 255]));
        // Same anchor, no border: the second layer's fill must win wherever
        // both layers set pixels.
        let layers = [
            layer("HHHH", 120, 10, "#ff0000"),
            layer("HHHH", 120, 10, "#00ff00"),
        ];
        let composed = compositor.compose(canvas, &layers, false);
        let lit: Vec<&Rgba<u8>> = composed.pixels().filter(|px| px[1] > 0 || px[0] > 0).collect();
        assert!(!lit.is_empty());
        for pixel in lit {
            assert_eq!(pixel[0], 0, "red layer visible above green");
            assert_eq!(pixel[1], 255);
        }
    }

    #[test]
    fn border_stamps_surround_the_fill() {
        let compositor = bitmap_compositor();
        let canvas = RgbaImage::from_pixel(200, 64, Rgba([40, 40, 40, 255]));
        let mut bordered = layer("H", 120, 20, "#ffffff");
        bordered.border_color_hex = "#ff0000".to_string();
        let composed = compositor.compose(canvas, &[bordered], true);

        let red = composed
            .pixels()
            .filter(|px| px[0] == 255 && px[1] == 0)
            .count();
        let white = composed
            .pixels()
            .filter(|px| px[0] == 255 && px[1] == 255 && px[2] == 255)
            .count();
        assert!(red > 0, "border color missing");
        assert!(white > 0, "fill color missing");
    }

    #[test]
    fn border_can_be_disabled_per_job() {
        let compositor = bitmap_compositor();
        let canvas = RgbaImage::from_pixel(200, 64, Rgba([40, 40, 40, 255]));
        let mut bordered = layer("H", 120, 20, "#ffffff");
        bordered.border_color_hex = "#ff0000".to_string();
        let composed = compositor.compose(canvas, &[bordered], false);
        let red = composed
            .pixels()
            .filter(|px| px[0] == 255 && px[1] == 0)
            .count();
        assert_eq!(red, 0);
    }

    #[test]
    fn narrow_remainder_recenters_the_layer() {
        // x_pos close to the right edge leaves less than the minimum wrap
        // width, so the layer falls back to the side-margin layout.
        let (left, width) = layer_geometry(800, 750);
        assert_eq!(left, SIDE_MARGIN as i32);
        assert_eq!(width, 800.0 - 2.0 * SIDE_MARGIN);

        let (left, width) = layer_geometry(800, 50);
        assert_eq!(left, 50);
        assert_eq!(width, 800.0 - 50.0 - RIGHT_MARGIN);
    }

    #[test]
    fn flatten_blends_translucency_onto_white() {
        let mut canvas = RgbaImage::from_pixel(2, 1, Rgba([0, 0, 0, 0]));
        canvas.put_pixel(1, 0, Rgba([0, 0, 0, 128]));
        let flat = flatten(&canvas);
        assert_eq!(flat.get_pixel(0, 0), &Rgb([255, 255, 255]));
        let blended = flat.get_pixel(1, 0);
        assert!(blended[0] > 100 && blended[0] < 150);
    }

    #[test]
    fn encode_produces_a_jpeg_stream() {
        let image = RgbImage::from_pixel(16, 16, Rgb([73, 109, 137]));
        let bytes = encode_jpeg(&image).expect("encode");
        // JPEG SOI marker.
        assert_eq!(&bytes[..2], &[0xff, 0xd8]);
    }
}
