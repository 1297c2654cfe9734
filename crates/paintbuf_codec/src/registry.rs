//! Tag-indexed codec dispatch.
//!
//! A registry entry pairs monomorphized encode/decode functions for one
//! item type, erased behind plain function pointers. The writing and
//! reading sides of a boundary must register the same types; a tag with
//! no entry on the reading side fails per record during replay.

use crate::error::{CodecError, CodecResult};
use bytes::Bytes;
use paintbuf_core::{Item, ItemType};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::Any;
use std::collections::HashMap;

type EncodeFn = fn(ItemType, &dyn Any) -> CodecResult<Bytes>;
type DecodeFn = fn(ItemType, &[u8]) -> CodecResult<Box<dyn Any>>;

#[derive(Clone, Copy)]
struct CodecEntry {
    encode: EncodeFn,
    decode: DecodeFn,
}

/// Maps item tags to CBOR encode/decode functions.
///
/// Built once at startup and shared read-only by the writing and reading
/// clients.
#[derive(Default)]
pub struct CodecRegistry {
    entries: HashMap<ItemType, CodecEntry>,
}

impl CodecRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the codec for `T` under `T::TYPE`, replacing any earlier
    /// entry for that tag.
    pub fn register<T>(&mut self)
    where
        T: Item + Serialize + DeserializeOwned,
    {
        self.entries.insert(
            T::TYPE,
            CodecEntry {
                encode: encode_erased::<T>,
                decode: decode_erased::<T>,
            },
        );
    }

    /// Builder-style [`CodecRegistry::register`].
    #[must_use]
    pub fn with<T>(mut self) -> Self
    where
        T: Item + Serialize + DeserializeOwned,
    {
        self.register::<T>();
        self
    }

    /// Whether a codec is registered for `item_type`.
    #[must_use]
    pub fn is_registered(&self, item_type: ItemType) -> bool {
        self.entries.contains_key(&item_type)
    }

    pub(crate) fn encode(&self, item_type: ItemType, item: &dyn Any) -> CodecResult<Bytes> {
        let entry = self
            .entries
            .get(&item_type)
            .ok_or(CodecError::Unregistered { item_type })?;
        (entry.encode)(item_type, item)
    }

    pub(crate) fn decode(&self, item_type: ItemType, bytes: &[u8]) -> CodecResult<Box<dyn Any>> {
        let entry = self
            .entries
            .get(&item_type)
            .ok_or(CodecError::Unregistered { item_type })?;
        (entry.decode)(item_type, bytes)
    }
}

impl std::fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut tags: Vec<ItemType> = self.entries.keys().copied().collect();
        tags.sort();
        f.debug_struct("CodecRegistry").field("tags", &tags).finish()
    }
}

fn encode_erased<T>(item_type: ItemType, item: &dyn Any) -> CodecResult<Bytes>
where
    T: Item + Serialize,
{
    let Some(item) = item.downcast_ref::<T>() else {
        panic!("encoding a {item_type} record from a mismatched item");
    };
    let mut out = Vec::new();
    ciborium::ser::into_writer(item, &mut out)
        .map_err(|e| CodecError::encoding_failed(item_type, e.to_string()))?;
    Ok(Bytes::from(out))
}

fn decode_erased<T>(item_type: ItemType, bytes: &[u8]) -> CodecResult<Box<dyn Any>>
where
    T: Item + DeserializeOwned,
{
    let item: T = ciborium::de::from_reader(bytes)
        .map_err(|e| CodecError::decoding_failed(item_type, e.to_string()))?;
    Ok(Box::new(item))
}
