//! Segment bookkeeping: owned vs client-backed byte ranges.

use crate::types::SegmentId;

/// A backing block handed out by a [`crate::WritingClient`].
///
/// The buffer writes records into `bytes` but never releases the block
/// itself: when the segment is cleared, the whole handle travels back to the
/// client through [`crate::WritingClient::release_segment`], and the client
/// decides what release means (unmapping shared memory, returning the block
/// to a pool, and so on).
#[derive(Debug)]
pub struct ClientSegment {
    /// Client-chosen identifier for the backing block, e.g. a shared-memory
    /// key. Opaque to the buffer.
    pub token: u64,
    /// The writable byte range.
    pub bytes: Vec<u8>,
}

/// Who owns a segment's backing memory.
#[derive(Debug)]
pub(crate) enum SegmentBacking {
    /// Heap block the buffer allocated and drops itself.
    Owned(Vec<u8>),
    /// Client-supplied block, handed back to the client on release.
    Client(ClientSegment),
}

/// One contiguous byte range holding zero or more records.
///
/// Invariant: `written <= capacity`, and `written` is always a multiple of
/// the record alignment because the write cursor only ever advances by
/// padded record sizes.
#[derive(Debug)]
pub(crate) struct Segment {
    id: SegmentId,
    backing: SegmentBacking,
    written: usize,
}

impl Segment {
    /// Creates an empty internally-owned segment of `capacity` bytes.
    pub(crate) fn owned(id: SegmentId, capacity: usize) -> Self {
        Self {
            id,
            backing: SegmentBacking::Owned(vec![0; capacity]),
            written: 0,
        }
    }

    /// Wraps a client-supplied backing block.
    pub(crate) fn from_client(id: SegmentId, block: ClientSegment) -> Self {
        Self {
            id,
            backing: SegmentBacking::Client(block),
            written: 0,
        }
    }

    /// Wraps transferred segment bytes that arrive fully written and sealed.
    pub(crate) fn sealed_owned(id: SegmentId, data: Vec<u8>) -> Self {
        let written = data.len();
        Self {
            id,
            backing: SegmentBacking::Owned(data),
            written,
        }
    }

    pub(crate) fn id(&self) -> SegmentId {
        self.id
    }

    pub(crate) fn capacity(&self) -> usize {
        match &self.backing {
            SegmentBacking::Owned(bytes) => bytes.len(),
            SegmentBacking::Client(block) => block.bytes.len(),
        }
    }

    pub(crate) fn written(&self) -> usize {
        self.written
    }

    pub(crate) fn remaining(&self) -> usize {
        self.capacity() - self.written
    }

    /// The written prefix of the segment.
    pub(crate) fn bytes(&self) -> &[u8] {
        match &self.backing {
            SegmentBacking::Owned(bytes) => &bytes[..self.written],
            SegmentBacking::Client(block) => &block.bytes[..self.written],
        }
    }

    /// Scratch view of the next `len` unwritten bytes.
    ///
    /// The cursor does not move until [`Segment::advance`] is called, so a
    /// failed record write leaves the segment unchanged.
    pub(crate) fn tail_mut(&mut self, len: usize) -> &mut [u8] {
        let start = self.written;
        let end = start + len;
        match &mut self.backing {
            SegmentBacking::Owned(bytes) => &mut bytes[start..end],
            SegmentBacking::Client(block) => &mut block.bytes[start..end],
        }
    }

    pub(crate) fn advance(&mut self, len: usize) {
        debug_assert!(self.written + len <= self.capacity());
        self.written += len;
    }

    pub(crate) fn into_backing(self) -> SegmentBacking {
        self.backing
    }
}
