//! The render pipeline: font resolution, text layout, and compositing.

mod color;
mod compositor;
mod fonts;
mod layout;

pub use color::parse_hex_color;
pub use compositor::{Compositor, encode_jpeg, flatten, layer_geometry};
pub use fonts::{FontResolver, ResolvedFont};
pub use layout::wrap_text;
