//! The test item catalog.
//!
//! Seven item types covering every record shape the buffer supports:
//! fixed-size inline payloads, zero-payload markers, an inline item that
//! parks a refcounted resource, and an out-of-line item that travels
//! through the client codec.

use crate::sink::DrawingSink;
use paintbuf_core::{
    BufferResult, Catalog, Item, ItemInfo, ItemType, ResourceReader, ResourceSlot, ResourceWriter,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Decoded RGBA image pixels, shared between the recorder and replayer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// RGBA bytes, `width * height * 4` of them.
    pub pixels: Vec<u8>,
}

impl ImageData {
    /// Builds an image with every byte set to `value`.
    #[must_use]
    pub fn solid(width: u32, height: u32, value: u8) -> Self {
        Self {
            width,
            height,
            pixels: vec![value; (width * height * 4) as usize],
        }
    }
}

fn read_f32(bytes: &[u8]) -> f32 {
    f32::from_le_bytes(bytes.try_into().expect("4-byte field"))
}

/// Sets the stroke width for subsequent drawing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SetStrokeWidth {
    /// New stroke width.
    pub width: f32,
}

impl Item for SetStrokeWidth {
    type Sink = dyn DrawingSink;
    const TYPE: ItemType = ItemType::new(1);
    const PAYLOAD_SIZE: usize = 4;

    fn write_payload(&self, out: &mut [u8], _resources: &mut ResourceWriter<'_>) -> BufferResult<()> {
        out.copy_from_slice(&self.width.to_le_bytes());
        Ok(())
    }

    fn read_payload(payload: &[u8], _resources: &ResourceReader<'_>) -> BufferResult<Self> {
        Ok(Self {
            width: read_f32(payload),
        })
    }

    fn apply(&self, sink: &mut (dyn DrawingSink + 'static)) -> BufferResult<()> {
        sink.set_stroke_width(self.width);
        Ok(())
    }
}

/// Translates the current transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Translate {
    /// Horizontal offset.
    pub dx: f32,
    /// Vertical offset.
    pub dy: f32,
}

impl Item for Translate {
    type Sink = dyn DrawingSink;
    const TYPE: ItemType = ItemType::new(2);
    const PAYLOAD_SIZE: usize = 8;

    fn write_payload(&self, out: &mut [u8], _resources: &mut ResourceWriter<'_>) -> BufferResult<()> {
        out[..4].copy_from_slice(&self.dx.to_le_bytes());
        out[4..].copy_from_slice(&self.dy.to_le_bytes());
        Ok(())
    }

    fn read_payload(payload: &[u8], _resources: &ResourceReader<'_>) -> BufferResult<Self> {
        Ok(Self {
            dx: read_f32(&payload[..4]),
            dy: read_f32(&payload[4..]),
        })
    }

    fn apply(&self, sink: &mut (dyn DrawingSink + 'static)) -> BufferResult<()> {
        sink.translate(self.dx, self.dy);
        Ok(())
    }
}

/// Fills an axis-aligned rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FillRect {
    /// Left edge.
    pub x: f32,
    /// Top edge.
    pub y: f32,
    /// Width.
    pub width: f32,
    /// Height.
    pub height: f32,
}

impl Item for FillRect {
    type Sink = dyn DrawingSink;
    const TYPE: ItemType = ItemType::new(3);
    const IS_DRAWING: bool = true;
    const PAYLOAD_SIZE: usize = 16;

    fn write_payload(&self, out: &mut [u8], _resources: &mut ResourceWriter<'_>) -> BufferResult<()> {
        out[..4].copy_from_slice(&self.x.to_le_bytes());
        out[4..8].copy_from_slice(&self.y.to_le_bytes());
        out[8..12].copy_from_slice(&self.width.to_le_bytes());
        out[12..].copy_from_slice(&self.height.to_le_bytes());
        Ok(())
    }

    fn read_payload(payload: &[u8], _resources: &ResourceReader<'_>) -> BufferResult<Self> {
        Ok(Self {
            x: read_f32(&payload[..4]),
            y: read_f32(&payload[4..8]),
            width: read_f32(&payload[8..12]),
            height: read_f32(&payload[12..]),
        })
    }

    fn apply(&self, sink: &mut (dyn DrawingSink + 'static)) -> BufferResult<()> {
        sink.fill_rect(self.x, self.y, self.width, self.height);
        Ok(())
    }
}

/// Draws a shared image.
///
/// The pixel data is parked in the buffer's resource arena; only the slot
/// id lands in segment memory, so clearing the buffer is what finally
/// drops the pixels.
#[derive(Debug, Clone)]
pub struct DrawImage {
    /// The image to draw.
    pub image: Arc<ImageData>,
}

impl Item for DrawImage {
    type Sink = dyn DrawingSink;
    const TYPE: ItemType = ItemType::new(4);
    const IS_DRAWING: bool = true;
    const PAYLOAD_SIZE: usize = 4;

    fn write_payload(&self, out: &mut [u8], resources: &mut ResourceWriter<'_>) -> BufferResult<()> {
        let slot = resources.attach(self.image.clone());
        out.copy_from_slice(&slot.as_u32().to_le_bytes());
        Ok(())
    }

    fn read_payload(payload: &[u8], resources: &ResourceReader<'_>) -> BufferResult<Self> {
        let slot = ResourceSlot::new(u32::from_le_bytes(
            payload.try_into().expect("4-byte field"),
        ));
        Ok(Self {
            image: resources.get::<ImageData>(slot)?,
        })
    }

    fn apply(&self, sink: &mut (dyn DrawingSink + 'static)) -> BufferResult<()> {
        sink.draw_image(&self.image);
        Ok(())
    }
}

/// Draws a text run. Out-of-line: the variable-length string travels
/// through the writing/reading client pair as an opaque blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawText {
    /// The text to draw.
    pub text: String,
}

impl Item for DrawText {
    type Sink = dyn DrawingSink;
    const TYPE: ItemType = ItemType::new(5);
    const IS_INLINE: bool = false;
    const IS_DRAWING: bool = true;

    fn apply(&self, sink: &mut (dyn DrawingSink + 'static)) -> BufferResult<()> {
        sink.draw_text(&self.text);
        Ok(())
    }
}

/// Pushes the graphics state. Zero-payload marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Save;

impl Item for Save {
    type Sink = dyn DrawingSink;
    const TYPE: ItemType = ItemType::new(6);

    fn write_payload(&self, _out: &mut [u8], _resources: &mut ResourceWriter<'_>) -> BufferResult<()> {
        Ok(())
    }

    fn read_payload(_payload: &[u8], _resources: &ResourceReader<'_>) -> BufferResult<Self> {
        Ok(Self)
    }

    fn apply(&self, sink: &mut (dyn DrawingSink + 'static)) -> BufferResult<()> {
        sink.save();
        Ok(())
    }
}

/// Pops the graphics state. Zero-payload marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Restore;

impl Item for Restore {
    type Sink = dyn DrawingSink;
    const TYPE: ItemType = ItemType::new(7);

    fn write_payload(&self, _out: &mut [u8], _resources: &mut ResourceWriter<'_>) -> BufferResult<()> {
        Ok(())
    }

    fn read_payload(_payload: &[u8], _resources: &ResourceReader<'_>) -> BufferResult<Self> {
        Ok(Self)
    }

    fn apply(&self, sink: &mut (dyn DrawingSink + 'static)) -> BufferResult<()> {
        sink.restore();
        Ok(())
    }
}

/// The closed catalog over items 1 through 7.
pub struct TestCatalog;

impl Catalog for TestCatalog {
    type Sink = dyn DrawingSink;

    fn lookup(item_type: ItemType) -> Option<ItemInfo<dyn DrawingSink>> {
        match item_type {
            SetStrokeWidth::TYPE => Some(ItemInfo::of::<SetStrokeWidth>()),
            Translate::TYPE => Some(ItemInfo::of::<Translate>()),
            FillRect::TYPE => Some(ItemInfo::of::<FillRect>()),
            DrawImage::TYPE => Some(ItemInfo::of::<DrawImage>()),
            DrawText::TYPE => Some(ItemInfo::of::<DrawText>()),
            Save::TYPE => Some(ItemInfo::of::<Save>()),
            Restore::TYPE => Some(ItemInfo::of::<Restore>()),
            _ => None,
        }
    }
}
