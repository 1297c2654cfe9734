//! Non-owning views of buffered records.

use crate::catalog::{Catalog, Item, ItemInfo};
use crate::error::{BufferError, BufferResult};
use crate::layout::TYPE_SLOT_SIZE;
use crate::resource::{ResourceArena, ResourceReader};
use crate::types::{ItemType, ResourceSlot};
use std::any::Any;
use std::fmt;
use std::ops::Deref;

/// A view onto one typed record living inside a segment.
///
/// The handle borrows its backing segment and is only valid while the buffer
/// is alive and unmutated. For out-of-line records it additionally owns the
/// item materialized by the reading client.
pub struct ItemHandle<'a, C: Catalog> {
    info: ItemInfo<C::Sink>,
    /// Full padded record, including the 8-byte type slot.
    record: &'a [u8],
    payload_len: usize,
    decoded: Option<Box<dyn Any>>,
    resources: &'a ResourceArena,
    slots: &'a [ResourceSlot],
}

impl<'a, C: Catalog> ItemHandle<'a, C> {
    pub(crate) fn inline(
        info: ItemInfo<C::Sink>,
        record: &'a [u8],
        resources: &'a ResourceArena,
        slots: &'a [ResourceSlot],
    ) -> Self {
        Self {
            info,
            record,
            payload_len: info.payload_size,
            decoded: None,
            resources,
            slots,
        }
    }

    pub(crate) fn decoded(
        info: ItemInfo<C::Sink>,
        record: &'a [u8],
        payload_len: usize,
        item: Box<dyn Any>,
        resources: &'a ResourceArena,
    ) -> Self {
        Self {
            info,
            record,
            payload_len,
            decoded: Some(item),
            resources,
            slots: &[],
        }
    }

    /// Tag of the viewed record.
    #[must_use]
    pub fn item_type(&self) -> ItemType {
        self.info.item_type
    }

    /// Whether the record is a drawing command rather than bookkeeping
    /// state.
    #[must_use]
    pub fn is_drawing(&self) -> bool {
        self.info.is_drawing
    }

    /// Payload bytes of the record (excluding type slot and padding).
    #[must_use]
    pub fn payload(&self) -> &'a [u8] {
        &self.record[TYPE_SLOT_SIZE..TYPE_SLOT_SIZE + self.payload_len]
    }

    /// The full padded record bytes, starting at the type slot.
    #[must_use]
    pub fn raw_bytes(&self) -> &'a [u8] {
        self.record
    }

    /// Reads the record as an item of type `T`.
    ///
    /// # Panics
    ///
    /// Panics if `T::TYPE` is not the record's tag. A mismatched cast is a
    /// caller contract violation, never a recoverable condition.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be read back, e.g. when a
    /// referenced resource has already been finalized.
    pub fn get<T: Item<Sink = C::Sink>>(&self) -> BufferResult<ItemRef<'_, T>> {
        assert_eq!(
            T::TYPE,
            self.item_type(),
            "typed access to a {} record as {}",
            self.item_type(),
            T::TYPE,
        );
        match &self.decoded {
            Some(item) => {
                let item = item
                    .downcast_ref::<T>()
                    .unwrap_or_else(|| panic!("decoded item is not a {}", T::TYPE));
                Ok(ItemRef::Borrowed(item))
            }
            None => {
                let reader = ResourceReader::new(self.resources);
                Ok(ItemRef::Owned(T::read_payload(self.payload(), &reader)?))
            }
        }
    }

    /// Executes the record against `sink` via type-erased dispatch.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be read back or the sink
    /// rejects the command.
    pub fn apply(&self, sink: &mut C::Sink) -> BufferResult<()> {
        match &self.decoded {
            Some(item) => self.info.apply_decoded(item.as_ref(), sink),
            None => self
                .info
                .apply_inline(self.payload(), self.resources, sink),
        }
    }

    /// Finalizes the record in place by releasing the resources it parked.
    ///
    /// Idempotent; a later `clear()` will not release them again.
    pub fn destroy(&self) {
        for slot in self.slots {
            self.resources.release(*slot);
        }
    }

    /// Bitwise-copies the padded record into `dest` and returns the number
    /// of bytes written.
    ///
    /// # Errors
    ///
    /// Returns an error if `dest` is smaller than the padded record.
    pub fn copy_to(&self, dest: &mut [u8]) -> BufferResult<usize> {
        let len = self.record.len();
        if dest.len() < len {
            return Err(BufferError::CopyDestination {
                record: len,
                destination: dest.len(),
            });
        }
        dest[..len].copy_from_slice(self.record);
        Ok(len)
    }
}

impl<C: Catalog> fmt::Debug for ItemHandle<'_, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemHandle")
            .field("item_type", &self.item_type())
            .field("payload_len", &self.payload_len)
            .field("decoded", &self.decoded.is_some())
            .finish_non_exhaustive()
    }
}

/// Typed access to a record's item, either borrowed from a decoded box or
/// rebuilt from payload bytes.
pub enum ItemRef<'a, T> {
    /// Borrowed from the reading client's decoded item.
    Borrowed(&'a T),
    /// Rebuilt from the inline payload.
    Owned(T),
}

impl<T> Deref for ItemRef<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        match self {
            Self::Borrowed(item) => item,
            Self::Owned(item) => item,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ItemRef<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        (**self).fmt(f)
    }
}
