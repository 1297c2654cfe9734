//! Drawing sinks for replay verification.
//!
//! [`DrawingSink`] is the replay target shared by every item in the test
//! catalog. [`RecordingSink`] captures replayed commands as plain values so
//! tests can assert on them.

use crate::items::ImageData;

/// Replay target for the test catalog.
///
/// A real consumer would rasterize or forward these calls; tests record
/// them instead.
pub trait DrawingSink {
    /// Sets the current stroke width.
    fn set_stroke_width(&mut self, width: f32);

    /// Translates the current transform.
    fn translate(&mut self, dx: f32, dy: f32);

    /// Fills an axis-aligned rectangle.
    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32);

    /// Draws a decoded image.
    fn draw_image(&mut self, image: &ImageData);

    /// Draws a text run.
    fn draw_text(&mut self, text: &str);

    /// Pushes the current graphics state.
    fn save(&mut self);

    /// Pops the most recently saved graphics state.
    fn restore(&mut self);
}

/// One observed sink call, captured as a plain value.
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayOp {
    /// `set_stroke_width` was called.
    StrokeWidth(f32),
    /// `translate` was called.
    Translate(f32, f32),
    /// `fill_rect` was called with (x, y, width, height).
    Rect(f32, f32, f32, f32),
    /// `draw_image` was called; dimensions of the image.
    Image(u32, u32),
    /// `draw_text` was called.
    Text(String),
    /// `save` was called.
    Save,
    /// `restore` was called.
    Restore,
}

/// Sink that records every call in order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    /// Calls observed so far, in replay order.
    pub ops: Vec<DisplayOp>,
}

impl DrawingSink for RecordingSink {
    fn set_stroke_width(&mut self, width: f32) {
        self.ops.push(DisplayOp::StrokeWidth(width));
    }

    fn translate(&mut self, dx: f32, dy: f32) {
        self.ops.push(DisplayOp::Translate(dx, dy));
    }

    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32) {
        self.ops.push(DisplayOp::Rect(x, y, width, height));
    }

    fn draw_image(&mut self, image: &ImageData) {
        self.ops.push(DisplayOp::Image(image.width, image.height));
    }

    fn draw_text(&mut self, text: &str) {
        self.ops.push(DisplayOp::Text(text.to_owned()));
    }

    fn save(&mut self) {
        self.ops.push(DisplayOp::Save);
    }

    fn restore(&mut self) {
        self.ops.push(DisplayOp::Restore);
    }
}
