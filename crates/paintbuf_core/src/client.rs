//! Writing/reading client capabilities.
//!
//! Clients are optional collaborators injected when a buffer is built. A
//! writing client takes over segment allocation (e.g. backing segments with
//! shared memory for cross-process transfer) and produces opaque encodings
//! for out-of-line items; a reading client turns those encodings back into
//! typed items during replay. The buffer calls both synchronously and makes
//! no retry decisions of its own.

use crate::error::BufferResult;
use crate::segment::ClientSegment;
use crate::types::ItemType;
use bytes::Bytes;
use std::any::Any;

/// Capability consumed on the recording side.
pub trait WritingClient: Send {
    /// Allocates a backing block of at least `min_bytes`.
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot obtain memory; the buffer
    /// surfaces this from `append` without retrying.
    fn allocate_segment(&mut self, min_bytes: usize) -> BufferResult<ClientSegment>;

    /// Takes a backing block back. Called exactly once per allocated block,
    /// when the owning buffer is cleared or dropped.
    fn release_segment(&mut self, segment: ClientSegment);

    /// Encodes an out-of-line item into an opaque blob.
    ///
    /// `item` is the concrete item type registered for `item_type`; the
    /// client downcasts and serializes it however the matched reading client
    /// expects.
    ///
    /// # Errors
    ///
    /// Returns an error if the item cannot be encoded; the append fails and
    /// nothing is written to the buffer.
    fn encode_item(&mut self, item_type: ItemType, item: &dyn Any) -> BufferResult<Bytes>;
}

/// Capability consumed on the replay side.
pub trait ReadingClient: Send {
    /// Decodes an opaque blob back into the boxed concrete item for
    /// `item_type`.
    ///
    /// # Errors
    ///
    /// Returns an error if the blob is malformed. The failure is surfaced
    /// for that one record only; iteration continues past it.
    fn decode_item(&self, item_type: ItemType, bytes: &[u8]) -> BufferResult<Box<dyn Any>>;
}
