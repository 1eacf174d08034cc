//! Wire types for render jobs as published by the intake API.

use serde::{Deserialize, Serialize};

/// One positioned, styled piece of text to composite onto the template.
///
/// Field names and defaults follow the broker JSON contract; order within
/// [`RenderJob::text_lines`] is paint order, so later layers occlude earlier
/// ones where they overlap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextLayer {
    pub text: String,
    #[serde(default)]
    pub x_pos: i32,
    pub y_pos: i32,
    #[serde(default = "default_size")]
    pub size: u32,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default = "default_opacity")]
    pub opacity: u8,
    #[serde(default = "default_border_color")]
    pub border_color_hex: String,
}

/// A queued render request. Lives only on the wire between the intake API
/// and the worker; the task row is the durable record of its outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderJob {
    pub id: String,
    pub template_url: String,
    #[serde(default)]
    pub text_lines: Vec<TextLayer>,
    #[serde(default = "default_text_border")]
    pub text_border: bool,
}

fn default_size() -> u32 {
    50
}

fn default_color() -> String {
    "#ffffff".to_string()
}

fn default_opacity() -> u8 {
    100
}

fn default_border_color() -> String {
    "#000000".to_string()
}

fn default_text_border() -> bool {
    true
}
