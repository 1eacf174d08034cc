//! End-to-end render pipeline checks against the public crate API.

use image::{Rgb, Rgba, RgbaImage};
use memeforge::application::render::{
    Compositor, FontResolver, encode_jpeg, flatten, layer_geometry, wrap_text,
};
use memeforge::domain::job::TextLayer;

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
fn wrapped_lines_stay_within_the_limit() {
    let font = FontResolver::new(Vec::new()).resolve(50);
    let corpus = [
        "WHEN YOU FINALLY FIX THE BUG BUT CREATE THREE MORE",
        "ONE\nSINGLE WORD PER PARAGRAPH\nHERE",
        "SUPERCALIFRAGILISTICEXPIALIDOCIOUS IS ONE WORD",
        "A B C D E F G H I J K L M N O P",
    ];

    for text in corpus {
        for width in [30.0_f32, 60.0, 90.0, 150.0] {
            let wrapped = wrap_text(text, &font, width);
            for line in wrapped.split('\n') {
                let measured = font.line_width(line);
                let single_word = !line.trim().contains(' ');
                assert!(
                    measured <= width || single_word,
                    "line `{line}` measures {measured} over limit {width}"
                );
            }
        }
    }
}

#[test]
fn wrapping_preserves_every_word() {
    let font = FontResolver::new(Vec::new()).resolve(50);
    let text = "THE QUICK BROWN FOX JUMPS OVER THE LAZY DOG";
    let wrapped = wrap_text(text, &font, 60.0);
    let original: Vec<&str> = text.split_whitespace().collect();
    let rewrapped: Vec<&str> = wrapped.split_whitespace().collect();
    assert_eq!(original, rewrapped);
}

#[test]
fn later_layer_is_on_top_at_the_overlap() {
    let compositor = bitmap_compositor();
    let canvas = RgbaImage::from_pixel(800, 64, Rgba([0, 0, 0, 255]));

    // The second 'H' of the first layer and the first 'H' of the second
    // layer share pixel columns; the later layer must win there.
    let layers = [layer("HH", 0, 10, "#ff0000"), layer("HH", 6, 10, "#00ff00")];
    let composed = compositor.compose(canvas, &layers, false);

    assert_eq!(composed.get_pixel(6, 10), &Rgba([0, 255, 0, 255]));
    // A pixel only the first layer touches stays red.
    assert_eq!(composed.get_pixel(0, 10), &Rgba([255, 0, 0, 255]));
}

#[test]
fn job_without_layers_reencodes_the_template_unchanged() {
    let compositor = bitmap_compositor();
    let template = RgbaImage::from_pixel(120, 90, Rgba([73, 109, 137, 255]));

    let composed = compositor.compose(template.clone(), &[], true);
    let output = encode_jpeg(&flatten(&composed)).expect("encode");
    let reference = encode_jpeg(&flatten(&template)).expect("encode");

    assert_eq!(output, reference);
}

#[test]
fn upper_casing_happens_inside_the_compositor() {
    let compositor = bitmap_compositor();
    let canvas = RgbaImage::from_pixel(800, 64, Rgba([0, 0, 0, 255]));

    let lower = compositor.compose(canvas.clone(), &[layer("hi", 0, 10, "#ffffff")], false);
    let upper = compositor.compose(canvas, &[layer("HI", 0, 10, "#ffffff")], false);

    assert_eq!(lower.as_raw(), upper.as_raw());
}

#[test]
fn translucent_layers_never_reach_the_artifact() {
    let compositor = bitmap_compositor();
    let canvas = RgbaImage::from_pixel(800, 64, Rgba([0, 0, 0, 255]));
    let mut translucent = layer("HELLO", 0, 10, "#ffffff");
    translucent.opacity = 30;

    let composed = compositor.compose(canvas, &[translucent], false);
    let flat = flatten(&composed);

    for pixel in flat.pixels() {
        // Fully opaque output: every channel is a definite value, and the
        // 30% white over black lands strictly between the two.
        assert!(pixel[0] <= 100);
    }
    assert!(flat.pixels().any(|px| px[0] > 0));
}

#[test]
fn geometry_recenters_only_when_space_runs_out() {
    let (left, width) = layer_geometry(800, 0);
    assert_eq!(left, 0);
    assert!(width > 700.0);

    let (recentered_left, recentered_width) = layer_geometry(800, 790);
    assert!(recentered_left > 0);
    assert!(recentered_width > 0.0);
    assert!(recentered_width < 800.0);
}

#[test]
fn flattened_output_is_opaque_white_where_nothing_was_drawn() {
    let transparent = RgbaImage::from_pixel(10, 10, Rgba([0, 0, 0, 0]));
    let flat = flatten(&transparent);
    for pixel in flat.pixels() {
        assert_eq!(pixel, &Rgb([255, 255, 255]));
    }
}
