//! Item trait and the per-tag dispatch table.
//!
//! Records of different layouts are stored back to back with no vtable
//! pointers in the byte stream. Dispatch happens through [`ItemInfo`], a
//! plain table of function pointers keyed by tag via [`Catalog::lookup`],
//! which keeps packing tight and confines every tag-to-type decision to one
//! place.

use crate::error::BufferResult;
use crate::resource::{ResourceArena, ResourceReader, ResourceWriter};
use crate::types::ItemType;
use std::any::Any;

/// One buffered command type.
///
/// Inline items have a fixed-size payload written directly into segment
/// memory; everything else travels through the writing/reading client pair
/// as an opaque encoded blob and never has a resident in-buffer form. The
/// inline/out-of-line split is static per type, not per instance.
pub trait Item: Sized + 'static {
    /// Sink this item executes against during replay.
    type Sink: ?Sized;

    /// Tag identifying this type in the shared tag domain.
    const TYPE: ItemType;

    /// Whether the payload is placed directly in segment memory.
    const IS_INLINE: bool = true;

    /// Whether replay consumers should treat this as a drawing command, as
    /// opposed to bookkeeping state.
    const IS_DRAWING: bool = false;

    /// Exact encoded payload size in bytes. Ignored for out-of-line items.
    const PAYLOAD_SIZE: usize = 0;

    /// Writes the payload into `out`, which is exactly
    /// [`Item::PAYLOAD_SIZE`] bytes. Reference-counted resources the item
    /// owns are parked through `resources` and referenced by slot id.
    ///
    /// Out-of-line items keep the default body, which panics: the buffer
    /// never calls it for them.
    fn write_payload(
        &self,
        out: &mut [u8],
        resources: &mut ResourceWriter<'_>,
    ) -> BufferResult<()> {
        let _ = (out, resources);
        panic!("{} has no inline representation", Self::TYPE);
    }

    /// Reads a payload previously written by [`Item::write_payload`].
    fn read_payload(payload: &[u8], resources: &ResourceReader<'_>) -> BufferResult<Self> {
        let _ = (payload, resources);
        panic!("{} has no inline representation", Self::TYPE);
    }

    /// Executes this item against `sink`. This is the replay path.
    fn apply(&self, sink: &mut Self::Sink) -> BufferResult<()>;
}

/// Per-tag behavior record: layout facts plus type-erased apply dispatch.
pub struct ItemInfo<S: ?Sized> {
    /// Tag this entry describes.
    pub item_type: ItemType,
    /// Fixed payload size for inline records.
    pub payload_size: usize,
    /// Whether records of this tag are placed inline.
    pub is_inline: bool,
    /// Whether this tag is a drawing command.
    pub is_drawing: bool,
    apply_inline: fn(&[u8], &ResourceArena, &mut S) -> BufferResult<()>,
    apply_decoded: fn(&dyn Any, &mut S) -> BufferResult<()>,
}

impl<S: ?Sized> Clone for ItemInfo<S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S: ?Sized> Copy for ItemInfo<S> {}

impl<S: ?Sized> ItemInfo<S> {
    /// Builds the dispatch entry for `T`.
    #[must_use]
    pub const fn of<T: Item<Sink = S>>() -> Self {
        Self {
            item_type: T::TYPE,
            payload_size: T::PAYLOAD_SIZE,
            is_inline: T::IS_INLINE,
            is_drawing: T::IS_DRAWING,
            apply_inline: apply_inline_erased::<T>,
            apply_decoded: apply_decoded_erased::<T>,
        }
    }

    pub(crate) fn apply_inline(
        &self,
        payload: &[u8],
        arena: &ResourceArena,
        sink: &mut S,
    ) -> BufferResult<()> {
        (self.apply_inline)(payload, arena, sink)
    }

    pub(crate) fn apply_decoded(&self, item: &dyn Any, sink: &mut S) -> BufferResult<()> {
        (self.apply_decoded)(item, sink)
    }
}

impl<S: ?Sized> std::fmt::Debug for ItemInfo<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ItemInfo")
            .field("item_type", &self.item_type)
            .field("payload_size", &self.payload_size)
            .field("is_inline", &self.is_inline)
            .field("is_drawing", &self.is_drawing)
            .finish_non_exhaustive()
    }
}

fn apply_inline_erased<T: Item>(
    payload: &[u8],
    arena: &ResourceArena,
    sink: &mut T::Sink,
) -> BufferResult<()> {
    T::read_payload(payload, &ResourceReader::new(arena))?.apply(sink)
}

fn apply_decoded_erased<T: Item>(item: &dyn Any, sink: &mut T::Sink) -> BufferResult<()> {
    let item = item
        .downcast_ref::<T>()
        .unwrap_or_else(|| panic!("decoded item is not a {}", T::TYPE));
    item.apply(sink)
}

/// A closed catalog of item types sharing one tag domain and one sink.
///
/// `lookup` is the single tag-to-behavior mapping; a record whose tag is
/// unknown to the catalog cannot be sized and is treated as corruption
/// during iteration.
pub trait Catalog: 'static {
    /// Sink all items in this catalog execute against.
    type Sink: ?Sized;

    /// Returns the dispatch entry for `item_type`, or `None` for tags
    /// outside the catalog.
    fn lookup(item_type: ItemType) -> Option<ItemInfo<Self::Sink>>;
}
