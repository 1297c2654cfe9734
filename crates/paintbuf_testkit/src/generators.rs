//! Property-based generators for buffer scripts.
//!
//! A script is a sequence of inline appends with known replay effects.
//! Out-of-line items need a writing client, so they are not generated
//! here; codec-level tests compose them explicitly.

use crate::items::{DrawImage, FillRect, ImageData, Restore, Save, SetStrokeWidth, TestCatalog, Translate};
use crate::sink::DisplayOp;
use paintbuf_core::{BufferResult, ItemBuffer};
use proptest::prelude::*;
use std::sync::Arc;

/// One scripted inline append with its expected replay effect.
#[derive(Debug, Clone)]
pub enum ScriptedItem {
    /// Append a [`SetStrokeWidth`].
    StrokeWidth(f32),
    /// Append a [`Translate`].
    Translate(f32, f32),
    /// Append a [`FillRect`].
    Rect(f32, f32, f32, f32),
    /// Append a [`DrawImage`] of a 2x2 image filled with the given byte.
    Image(u8),
    /// Append a [`Save`].
    Save,
    /// Append a [`Restore`].
    Restore,
}

impl ScriptedItem {
    /// Appends this item to `buffer`.
    ///
    /// # Errors
    ///
    /// Propagates any append failure.
    pub fn append_to(&self, buffer: &mut ItemBuffer<TestCatalog>) -> BufferResult<()> {
        match *self {
            Self::StrokeWidth(width) => buffer.append(SetStrokeWidth { width }),
            Self::Translate(dx, dy) => buffer.append(Translate { dx, dy }),
            Self::Rect(x, y, width, height) => buffer.append(FillRect {
                x,
                y,
                width,
                height,
            }),
            Self::Image(value) => buffer.append(DrawImage {
                image: Arc::new(ImageData::solid(2, 2, value)),
            }),
            Self::Save => buffer.append(Save),
            Self::Restore => buffer.append(Restore),
        }
    }

    /// The sink call replaying this item must produce.
    #[must_use]
    pub fn expected_op(&self) -> DisplayOp {
        match *self {
            Self::StrokeWidth(width) => DisplayOp::StrokeWidth(width),
            Self::Translate(dx, dy) => DisplayOp::Translate(dx, dy),
            Self::Rect(x, y, width, height) => DisplayOp::Rect(x, y, width, height),
            Self::Image(_) => DisplayOp::Image(2, 2),
            Self::Save => DisplayOp::Save,
            Self::Restore => DisplayOp::Restore,
        }
    }
}

/// Strategy for finite, exactly-representable coordinates.
pub fn coordinate_strategy() -> impl Strategy<Value = f32> {
    any::<i16>().prop_map(f32::from)
}

/// Strategy for a single scripted item.
pub fn scripted_item_strategy() -> impl Strategy<Value = ScriptedItem> {
    prop_oneof![
        coordinate_strategy().prop_map(ScriptedItem::StrokeWidth),
        (coordinate_strategy(), coordinate_strategy())
            .prop_map(|(dx, dy)| ScriptedItem::Translate(dx, dy)),
        (
            coordinate_strategy(),
            coordinate_strategy(),
            coordinate_strategy(),
            coordinate_strategy(),
        )
            .prop_map(|(x, y, w, h)| ScriptedItem::Rect(x, y, w, h)),
        any::<u8>().prop_map(ScriptedItem::Image),
        Just(ScriptedItem::Save),
        Just(ScriptedItem::Restore),
    ]
}

/// Strategy for a whole script of up to `max_len` items.
pub fn script_strategy(max_len: usize) -> impl Strategy<Value = Vec<ScriptedItem>> {
    prop::collection::vec(scripted_item_strategy(), 0..max_len)
}
