//! Replay iteration over buffered records.
//!
//! A cursor walks sealed segments in insertion order, then the writable
//! segment's written bytes, yielding one [`ItemHandle`] per record. Decode
//! failures reported by the reading client are surfaced per record and the
//! walk continues past them (the record extent is known from the length
//! field); an unknown tag makes the record unsizable, so the walk ends with
//! a corruption error instead.

use crate::buffer::ItemBuffer;
use crate::catalog::Catalog;
use crate::error::{BufferError, BufferResult};
use crate::handle::ItemHandle;
use crate::layout::{padded_size, record_payload_len, record_type, TYPE_SLOT_SIZE};
use crate::segment::Segment;

/// Lazy, restartable walk over every record in an [`ItemBuffer`].
pub struct ItemCursor<'a, C: Catalog> {
    buffer: &'a ItemBuffer<C>,
    segments: Vec<&'a Segment>,
    segment_index: usize,
    offset: usize,
    finished: bool,
}

impl<'a, C: Catalog> ItemCursor<'a, C> {
    pub(crate) fn new(buffer: &'a ItemBuffer<C>) -> Self {
        Self {
            buffer,
            segments: buffer.ordered_segments(),
            segment_index: 0,
            offset: 0,
            finished: false,
        }
    }

    /// Reads the record at the current position, advancing past it.
    ///
    /// `Ok(None)` means the walk is complete. A `Decode` error leaves the
    /// cursor positioned after the failing record; every other error ends
    /// the walk.
    fn next_record(&mut self) -> BufferResult<Option<ItemHandle<'a, C>>> {
        loop {
            let Some(&segment) = self.segments.get(self.segment_index) else {
                return Ok(None);
            };
            let bytes = segment.bytes();
            if self.offset >= bytes.len() {
                self.segment_index += 1;
                self.offset = 0;
                continue;
            }

            let offset = self.offset;
            let available = bytes.len() - offset;
            if available < TYPE_SLOT_SIZE {
                self.finished = true;
                return Err(BufferError::TruncatedRecord {
                    segment: segment.id(),
                    offset,
                    needed: TYPE_SLOT_SIZE,
                    available,
                });
            }

            let record = &bytes[offset..];
            let item_type = record_type(record);
            let Some(info) = C::lookup(item_type) else {
                self.finished = true;
                return Err(BufferError::UnknownItemType {
                    tag: item_type.as_u8(),
                    offset,
                    segment: segment.id(),
                });
            };

            let payload_len = if info.is_inline {
                info.payload_size
            } else {
                record_payload_len(record)
            };
            let padded = padded_size(payload_len);
            if available < padded {
                self.finished = true;
                return Err(BufferError::TruncatedRecord {
                    segment: segment.id(),
                    offset,
                    needed: padded,
                    available,
                });
            }
            let record = &bytes[offset..offset + padded];
            self.offset += padded;

            if info.is_inline {
                let slots = self.buffer.pending_slots(segment.id(), offset);
                return Ok(Some(ItemHandle::inline(
                    info,
                    record,
                    self.buffer.resources(),
                    slots,
                )));
            }

            let Some(client) = self.buffer.reading_client() else {
                panic!("replaying out-of-line {item_type} requires a reading client");
            };
            let blob = &record[TYPE_SLOT_SIZE..TYPE_SLOT_SIZE + payload_len];
            // The cursor already advanced, so an Err here skips one record.
            let item = client.decode_item(item_type, blob)?;
            return Ok(Some(ItemHandle::decoded(
                info,
                record,
                payload_len,
                item,
                self.buffer.resources(),
            )));
        }
    }
}

impl<'a, C: Catalog> Iterator for ItemCursor<'a, C> {
    type Item = BufferResult<ItemHandle<'a, C>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.next_record() {
            Ok(Some(handle)) => Some(Ok(handle)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(err) => Some(Err(err)),
        }
    }
}
