//! The append-only item buffer.

use crate::catalog::{Catalog, Item};
use crate::client::{ReadingClient, WritingClient};
use crate::cursor::ItemCursor;
use crate::error::{BufferError, BufferResult};
use crate::layout::{padded_size, write_type_slot, TYPE_SLOT_SIZE};
use crate::resource::{ResourceArena, ResourceWriter};
use crate::segment::{Segment, SegmentBacking};
use crate::types::{ItemType, ResourceSlot, SegmentId};
use std::any::Any;
use std::marker::PhantomData;
use tracing::{debug, trace};

/// Allocation policy for internally-owned segments.
///
/// Capacities double from `initial_segment_capacity` up to
/// `max_segment_capacity` to amortize allocation count, and are always at
/// least the padded size of the record being appended. A record whose padded
/// size exceeds `max_segment_capacity` is a caller error.
#[derive(Debug, Clone)]
pub struct BufferConfig {
    /// Capacity of the first internally-allocated segment, in bytes.
    pub initial_segment_capacity: usize,
    /// Ceiling on internally-allocated segment capacity, in bytes.
    pub max_segment_capacity: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            initial_segment_capacity: 1024,
            max_segment_capacity: 1 << 20,
        }
    }
}

/// A record that parked resources and still owes their release.
#[derive(Debug)]
struct PendingFinalize {
    segment: SegmentId,
    offset: usize,
    slots: Vec<ResourceSlot>,
}

/// Append-only accumulator of typed records.
///
/// One writable segment at a time plus a list of sealed read-only segments;
/// appending never moves or invalidates previously written records. Not
/// internally synchronized: build it on one thread, then move it to hand it
/// off.
pub struct ItemBuffer<C: Catalog> {
    config: BufferConfig,
    writing: Option<Box<dyn WritingClient>>,
    reading: Option<Box<dyn ReadingClient>>,
    writable: Option<Segment>,
    sealed: Vec<Segment>,
    resources: ResourceArena,
    /// Records owing finalization, in append (address) order.
    pending: Vec<PendingFinalize>,
    next_segment_id: u64,
    last_owned_capacity: usize,
    _catalog: PhantomData<fn() -> C>,
}

impl<C: Catalog> ItemBuffer<C> {
    /// Creates an empty buffer with no clients attached; segments come from
    /// the internal grow policy.
    #[must_use]
    pub fn new(config: BufferConfig) -> Self {
        Self::with_clients(config, None, None)
    }

    /// Creates an empty buffer with optional writing/reading clients.
    ///
    /// Clients are capabilities fixed for the buffer's lifetime; there is no
    /// way to attach one later.
    #[must_use]
    pub fn with_clients(
        config: BufferConfig,
        writing: Option<Box<dyn WritingClient>>,
        reading: Option<Box<dyn ReadingClient>>,
    ) -> Self {
        Self {
            config,
            writing,
            reading,
            writable: None,
            sealed: Vec::new(),
            resources: ResourceArena::new(),
            pending: Vec::new(),
            next_segment_id: 0,
            last_owned_capacity: 0,
            _catalog: PhantomData,
        }
    }

    /// Rebuilds a buffer from transferred segment bytes, e.g. on the far
    /// side of a cross-process hand-off. All segments arrive sealed; opaque
    /// records inside them require `reading` to replay.
    #[must_use]
    pub fn from_segments(
        segments: Vec<Vec<u8>>,
        reading: Option<Box<dyn ReadingClient>>,
    ) -> Self {
        let mut buffer = Self::with_clients(BufferConfig::default(), None, reading);
        for data in segments {
            let id = buffer.next_segment_id();
            buffer.sealed.push(Segment::sealed_owned(id, data));
        }
        buffer
    }

    /// Whether the buffer holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sealed.is_empty() && self.writable.as_ref().map_or(true, |s| s.written() == 0)
    }

    /// Total written bytes across sealed segments and the writable segment.
    #[must_use]
    pub fn size_in_bytes(&self) -> usize {
        let sealed: usize = self.sealed.iter().map(Segment::written).sum();
        sealed + self.writable.as_ref().map_or(0, Segment::written)
    }

    /// Number of segments, including the writable one.
    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.sealed.len() + usize::from(self.writable.is_some())
    }

    /// Appends one item to the end of the buffer.
    ///
    /// Inline items are placed directly in the writable segment, sealing it
    /// and starting a new one when the padded record does not fit.
    /// Out-of-line items are encoded by the writing client and appended as
    /// an opaque blob; the item itself never becomes resident.
    ///
    /// # Panics
    ///
    /// Panics if `T` is out-of-line and no writing client is attached, or if
    /// the record cannot fit in any segment the internal allocator may
    /// produce.
    ///
    /// # Errors
    ///
    /// Returns an error if the writing client fails to allocate a segment or
    /// to encode the item. Nothing is written in that case.
    pub fn append<T: Item<Sink = C::Sink>>(&mut self, item: T) -> BufferResult<()> {
        if !T::IS_INLINE {
            assert!(
                self.writing.is_some(),
                "appending out-of-line {} requires a writing client",
                T::TYPE,
            );
            return self.append_encoded(T::TYPE, &item);
        }

        let padded = padded_size(T::PAYLOAD_SIZE);
        self.ensure_writable(padded)?;
        let arena = &self.resources;
        let Some(segment) = self.writable.as_mut() else {
            unreachable!("ensure_writable leaves a writable segment");
        };

        let offset = segment.written();
        let record = segment.tail_mut(padded);
        write_type_slot(record, T::TYPE, 0);
        let mut writer = ResourceWriter::new(arena);
        if let Err(err) =
            item.write_payload(&mut record[TYPE_SLOT_SIZE..TYPE_SLOT_SIZE + T::PAYLOAD_SIZE], &mut writer)
        {
            // Failed records leave no trace: cursor untouched, slots freed.
            for slot in writer.into_attached() {
                arena.release(slot);
            }
            return Err(err);
        }
        record[TYPE_SLOT_SIZE + T::PAYLOAD_SIZE..].fill(0);

        let segment_id = segment.id();
        segment.advance(padded);
        let slots = writer.into_attached();
        if !slots.is_empty() {
            self.pending.push(PendingFinalize {
                segment: segment_id,
                offset,
                slots,
            });
        }
        Ok(())
    }

    fn append_encoded(&mut self, item_type: ItemType, item: &dyn Any) -> BufferResult<()> {
        let blob = {
            let Some(client) = self.writing.as_mut() else {
                unreachable!("checked by append");
            };
            client.encode_item(item_type, item)?
        };
        trace!(%item_type, blob_len = blob.len(), "encoded out-of-line item");
        if u32::try_from(blob.len()).is_err() {
            return Err(BufferError::encode(
                item_type,
                format!("encoded blob of {} bytes exceeds the length field", blob.len()),
            ));
        }

        let padded = padded_size(blob.len());
        self.ensure_writable(padded)?;
        let Some(segment) = self.writable.as_mut() else {
            unreachable!("ensure_writable leaves a writable segment");
        };

        let record = segment.tail_mut(padded);
        write_type_slot(record, item_type, blob.len() as u32);
        record[TYPE_SLOT_SIZE..TYPE_SLOT_SIZE + blob.len()].copy_from_slice(&blob);
        record[TYPE_SLOT_SIZE + blob.len()..].fill(0);
        segment.advance(padded);
        Ok(())
    }

    /// Makes sure the writable segment can take `needed` more bytes, sealing
    /// it and allocating a replacement when it cannot.
    fn ensure_writable(&mut self, needed: usize) -> BufferResult<()> {
        if let Some(segment) = &self.writable {
            if segment.remaining() >= needed {
                return Ok(());
            }
        }

        if let Some(full) = self.writable.take() {
            debug!(segment = %full.id(), written = full.written(), "sealing segment");
            self.sealed.push(full);
        }

        let id = self.next_segment_id();
        let segment = if let Some(client) = self.writing.as_mut() {
            let block = client.allocate_segment(needed)?;
            if block.bytes.len() < needed {
                return Err(BufferError::allocation(
                    needed,
                    format!("client returned a {}-byte block", block.bytes.len()),
                ));
            }
            Segment::from_client(id, block)
        } else {
            assert!(
                needed <= self.config.max_segment_capacity,
                "record of {needed} bytes exceeds the maximum segment capacity of {}",
                self.config.max_segment_capacity,
            );
            Segment::owned(id, self.next_owned_capacity(needed))
        };
        debug!(segment = %segment.id(), capacity = segment.capacity(), "opened writable segment");
        self.writable = Some(segment);
        Ok(())
    }

    fn next_owned_capacity(&mut self, needed: usize) -> usize {
        let grown = if self.last_owned_capacity == 0 {
            self.config.initial_segment_capacity
        } else {
            (self.last_owned_capacity * 2).min(self.config.max_segment_capacity)
        };
        let capacity = grown.max(needed);
        self.last_owned_capacity = capacity;
        capacity
    }

    fn next_segment_id(&mut self) -> SegmentId {
        let id = SegmentId::new(self.next_segment_id);
        self.next_segment_id += 1;
        id
    }

    /// Walks every record in replay order: sealed segments in insertion
    /// order, then the writable segment's written bytes. Restartable; each
    /// call starts a fresh pass.
    #[must_use]
    pub fn iter(&self) -> ItemCursor<'_, C> {
        ItemCursor::new(self)
    }

    /// Visits the written bytes of every segment in replay order.
    ///
    /// This is the flattening/transfer path: the visited byte ranges can be
    /// fed to [`ItemBuffer::from_segments`] on the far side of a boundary.
    pub fn for_each_segment(&self, mut f: impl FnMut(SegmentId, &[u8])) {
        for segment in self.sealed.iter().chain(self.writable.iter()) {
            f(segment.id(), segment.bytes());
        }
    }

    /// Finalizes every record still owing destruction, releases every
    /// segment, and returns the buffer to its initial empty state.
    ///
    /// Idempotent: calling `clear` on an empty buffer is a no-op.
    pub fn clear(&mut self) {
        for pending in self.pending.drain(..) {
            for slot in pending.slots {
                self.resources.release(slot);
            }
        }
        self.resources.reset();

        for segment in self.sealed.drain(..).chain(self.writable.take()) {
            match segment.into_backing() {
                SegmentBacking::Owned(_) => {}
                SegmentBacking::Client(block) => {
                    let Some(client) = self.writing.as_mut() else {
                        unreachable!("client segments exist only with a writing client");
                    };
                    client.release_segment(block);
                }
            }
        }
        self.last_owned_capacity = 0;
        debug!("cleared item buffer");
    }

    pub(crate) fn ordered_segments(&self) -> Vec<&Segment> {
        self.sealed.iter().chain(self.writable.iter()).collect()
    }

    pub(crate) fn reading_client(&self) -> Option<&dyn ReadingClient> {
        self.reading.as_deref()
    }

    pub(crate) fn resources(&self) -> &ResourceArena {
        &self.resources
    }

    /// Slots parked by the record at (`segment`, `offset`), if any.
    pub(crate) fn pending_slots(&self, segment: SegmentId, offset: usize) -> &[ResourceSlot] {
        // Pending entries are pushed in append order, so they are sorted by
        // (segment, offset).
        self.pending
            .binary_search_by_key(&(segment, offset), |p| (p.segment, p.offset))
            .map(|index| self.pending[index].slots.as_slice())
            .unwrap_or(&[])
    }
}

impl<C: Catalog> Drop for ItemBuffer<C> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<C: Catalog> std::fmt::Debug for ItemBuffer<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ItemBuffer")
            .field("segment_count", &self.segment_count())
            .field("size_in_bytes", &self.size_in_bytes())
            .field("pending_finalizers", &self.pending.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ItemInfo;
    use crate::layout::record_payload_len;
    use crate::resource::ResourceReader;
    use crate::segment::ClientSegment;
    use bytes::Bytes;
    use parking_lot::Mutex;
    use proptest::prelude::*;
    use std::sync::Arc;

    #[derive(Debug, Clone, PartialEq)]
    enum Op {
        M3([u8; 3]),
        M5([u8; 5]),
        M10([u8; 10]),
        Hold(u64),
        Note(String),
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Mark3([u8; 3]);

    impl Item for Mark3 {
        type Sink = Vec<Op>;
        const TYPE: ItemType = ItemType::new(1);
        const PAYLOAD_SIZE: usize = 3;

        fn write_payload(
            &self,
            out: &mut [u8],
            _resources: &mut ResourceWriter<'_>,
        ) -> BufferResult<()> {
            out.copy_from_slice(&self.0);
            Ok(())
        }

        fn read_payload(payload: &[u8], _resources: &ResourceReader<'_>) -> BufferResult<Self> {
            Ok(Self(payload.try_into().unwrap()))
        }

        fn apply(&self, sink: &mut Vec<Op>) -> BufferResult<()> {
            sink.push(Op::M3(self.0));
            Ok(())
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Mark5([u8; 5]);

    impl Item for Mark5 {
        type Sink = Vec<Op>;
        const TYPE: ItemType = ItemType::new(2);
        const PAYLOAD_SIZE: usize = 5;

        fn write_payload(
            &self,
            out: &mut [u8],
            _resources: &mut ResourceWriter<'_>,
        ) -> BufferResult<()> {
            out.copy_from_slice(&self.0);
            Ok(())
        }

        fn read_payload(payload: &[u8], _resources: &ResourceReader<'_>) -> BufferResult<Self> {
            Ok(Self(payload.try_into().unwrap()))
        }

        fn apply(&self, sink: &mut Vec<Op>) -> BufferResult<()> {
            sink.push(Op::M5(self.0));
            Ok(())
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Mark10([u8; 10]);

    impl Item for Mark10 {
        type Sink = Vec<Op>;
        const TYPE: ItemType = ItemType::new(3);
        const IS_DRAWING: bool = true;
        const PAYLOAD_SIZE: usize = 10;

        fn write_payload(
            &self,
            out: &mut [u8],
            _resources: &mut ResourceWriter<'_>,
        ) -> BufferResult<()> {
            out.copy_from_slice(&self.0);
            Ok(())
        }

        fn read_payload(payload: &[u8], _resources: &ResourceReader<'_>) -> BufferResult<Self> {
            Ok(Self(payload.try_into().unwrap()))
        }

        fn apply(&self, sink: &mut Vec<Op>) -> BufferResult<()> {
            sink.push(Op::M10(self.0));
            Ok(())
        }
    }

    /// Inline item owning a refcounted resource; exercises the finalizer
    /// path.
    struct Hold {
        value: Arc<u64>,
    }

    impl Item for Hold {
        type Sink = Vec<Op>;
        const TYPE: ItemType = ItemType::new(4);
        const PAYLOAD_SIZE: usize = 4;

        fn write_payload(
            &self,
            out: &mut [u8],
            resources: &mut ResourceWriter<'_>,
        ) -> BufferResult<()> {
            let slot = resources.attach(self.value.clone());
            out.copy_from_slice(&slot.as_u32().to_le_bytes());
            Ok(())
        }

        fn read_payload(payload: &[u8], resources: &ResourceReader<'_>) -> BufferResult<Self> {
            let slot = ResourceSlot::new(u32::from_le_bytes(payload.try_into().unwrap()));
            Ok(Self {
                value: resources.get::<u64>(slot)?,
            })
        }

        fn apply(&self, sink: &mut Vec<Op>) -> BufferResult<()> {
            sink.push(Op::Hold(*self.value));
            Ok(())
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Note {
        text: String,
    }

    impl Item for Note {
        type Sink = Vec<Op>;
        const TYPE: ItemType = ItemType::new(5);
        const IS_INLINE: bool = false;
        const IS_DRAWING: bool = true;

        fn apply(&self, sink: &mut Vec<Op>) -> BufferResult<()> {
            sink.push(Op::Note(self.text.clone()));
            Ok(())
        }
    }

    struct Cat;

    impl Catalog for Cat {
        type Sink = Vec<Op>;

        fn lookup(item_type: ItemType) -> Option<ItemInfo<Vec<Op>>> {
            match item_type {
                Mark3::TYPE => Some(ItemInfo::of::<Mark3>()),
                Mark5::TYPE => Some(ItemInfo::of::<Mark5>()),
                Mark10::TYPE => Some(ItemInfo::of::<Mark10>()),
                Hold::TYPE => Some(ItemInfo::of::<Hold>()),
                Note::TYPE => Some(ItemInfo::of::<Note>()),
                _ => None,
            }
        }
    }

    #[derive(Default)]
    struct PoolState {
        allocated: Vec<u64>,
        released: Vec<u64>,
        fail_alloc: bool,
        fail_encode: bool,
    }

    /// Writing client backed by plain heap blocks, tracking every
    /// allocation so tests can assert all of them come home.
    struct PoolClient {
        state: Arc<Mutex<PoolState>>,
        capacity: usize,
        next_token: u64,
    }

    impl PoolClient {
        fn new(capacity: usize) -> (Self, Arc<Mutex<PoolState>>) {
            let state = Arc::new(Mutex::new(PoolState::default()));
            (
                Self {
                    state: state.clone(),
                    capacity,
                    next_token: 0,
                },
                state,
            )
        }
    }

    impl WritingClient for PoolClient {
        fn allocate_segment(&mut self, min_bytes: usize) -> BufferResult<ClientSegment> {
            let mut state = self.state.lock();
            if state.fail_alloc {
                return Err(BufferError::allocation(min_bytes, "pool exhausted"));
            }
            let token = self.next_token;
            self.next_token += 1;
            state.allocated.push(token);
            Ok(ClientSegment {
                token,
                bytes: vec![0; min_bytes.max(self.capacity)],
            })
        }

        fn release_segment(&mut self, segment: ClientSegment) {
            self.state.lock().released.push(segment.token);
        }

        fn encode_item(&mut self, item_type: ItemType, item: &dyn Any) -> BufferResult<Bytes> {
            if self.state.lock().fail_encode {
                return Err(BufferError::encode(item_type, "client refused"));
            }
            let note = item.downcast_ref::<Note>().expect("only notes are out-of-line");
            Ok(Bytes::copy_from_slice(note.text.as_bytes()))
        }
    }

    struct StubReader;

    impl ReadingClient for StubReader {
        fn decode_item(&self, item_type: ItemType, bytes: &[u8]) -> BufferResult<Box<dyn Any>> {
            if bytes == b"corrupt" {
                return Err(BufferError::decode(item_type, "mangled blob"));
            }
            let text = String::from_utf8(bytes.to_vec())
                .map_err(|e| BufferError::decode(item_type, e.to_string()))?;
            Ok(Box::new(Note { text }))
        }
    }

    fn small_config(initial: usize) -> BufferConfig {
        BufferConfig {
            initial_segment_capacity: initial,
            max_segment_capacity: 1 << 20,
        }
    }

    fn replay(buffer: &ItemBuffer<Cat>) -> Vec<Op> {
        let mut sink = Vec::new();
        for handle in buffer.iter() {
            handle.unwrap().apply(&mut sink).unwrap();
        }
        sink
    }

    /// Re-walks raw segment bytes, returning every record's start offset.
    fn record_offsets(buffer: &ItemBuffer<Cat>) -> Vec<usize> {
        let mut offsets = Vec::new();
        buffer.for_each_segment(|_, bytes| {
            let mut offset = 0;
            while offset < bytes.len() {
                offsets.push(offset);
                let info = Cat::lookup(ItemType::new(bytes[offset])).expect("known tag");
                let payload_len = if info.is_inline {
                    info.payload_size
                } else {
                    record_payload_len(&bytes[offset..])
                };
                offset += padded_size(payload_len);
            }
        });
        offsets
    }

    #[test]
    fn starts_empty_with_no_segments() {
        let buffer = ItemBuffer::<Cat>::new(BufferConfig::default());
        assert!(buffer.is_empty());
        assert_eq!(buffer.segment_count(), 0);
        assert_eq!(buffer.size_in_bytes(), 0);
        assert_eq!(buffer.iter().count(), 0);
    }

    #[test]
    fn clear_on_empty_is_noop() {
        let mut buffer = ItemBuffer::<Cat>::new(BufferConfig::default());
        buffer.clear();
        buffer.clear();
        assert!(buffer.is_empty());
    }

    #[test]
    fn first_append_allocates_a_segment() {
        let mut buffer = ItemBuffer::<Cat>::new(BufferConfig::default());
        buffer.append(Mark3([1, 2, 3])).unwrap();
        assert_eq!(buffer.segment_count(), 1);
        assert_eq!(buffer.size_in_bytes(), 16);
        assert!(!buffer.is_empty());
    }

    #[test]
    fn rollover_scenario() {
        // Two records of padded size 16 fill a 32-byte segment exactly; the
        // third record (padded size 24) forces a new segment.
        let mut buffer = ItemBuffer::<Cat>::new(small_config(32));
        buffer.append(Mark3([1, 2, 3])).unwrap();
        buffer.append(Mark5([4, 5, 6, 7, 8])).unwrap();
        assert_eq!(buffer.segment_count(), 1);
        assert_eq!(buffer.size_in_bytes(), 32);

        buffer.append(Mark10([9; 10])).unwrap();
        assert_eq!(buffer.segment_count(), 2);
        assert_eq!(buffer.size_in_bytes(), 56);

        let ops = replay(&buffer);
        assert_eq!(
            ops,
            vec![
                Op::M3([1, 2, 3]),
                Op::M5([4, 5, 6, 7, 8]),
                Op::M10([9; 10]),
            ]
        );
    }

    #[test]
    fn records_never_split_across_segments() {
        // Every segment stays capped at 16 bytes, so each record fills one
        // segment exactly.
        let config = BufferConfig {
            initial_segment_capacity: 16,
            max_segment_capacity: 16,
        };
        let mut buffer = ItemBuffer::<Cat>::new(config);
        for i in 0..20u8 {
            buffer.append(Mark3([i, i, i])).unwrap();
        }
        assert_eq!(buffer.segment_count(), 20);

        let ops = replay(&buffer);
        let expected: Vec<Op> = (0..20u8).map(|i| Op::M3([i, i, i])).collect();
        assert_eq!(ops, expected);
    }

    #[test]
    fn grow_policy_doubles_up_to_ceiling() {
        // Padded Mark10 records are 24 bytes; capacities run 32, 64, 128,
        // 256, so segments hold 1, 2, 5 and 10 records respectively.
        let config = BufferConfig {
            initial_segment_capacity: 32,
            max_segment_capacity: 256,
        };
        let mut buffer = ItemBuffer::<Cat>::new(config);
        for _ in 0..18 {
            buffer.append(Mark10([0; 10])).unwrap();
        }
        assert_eq!(buffer.segment_count(), 4);
    }

    #[test]
    #[should_panic(expected = "exceeds the maximum segment capacity")]
    fn oversized_record_is_a_contract_violation() {
        let config = BufferConfig {
            initial_segment_capacity: 16,
            max_segment_capacity: 16,
        };
        let mut buffer = ItemBuffer::<Cat>::new(config);
        let _ = buffer.append(Mark10([0; 10]));
    }

    #[test]
    #[should_panic(expected = "requires a writing client")]
    fn out_of_line_without_writing_client_panics() {
        let mut buffer = ItemBuffer::<Cat>::new(BufferConfig::default());
        let _ = buffer.append(Note {
            text: "hello".into(),
        });
    }

    #[test]
    fn typed_access_reads_back_payloads() {
        let mut buffer = ItemBuffer::<Cat>::new(BufferConfig::default());
        buffer.append(Mark5([10, 20, 30, 40, 50])).unwrap();

        let handle = buffer.iter().next().unwrap().unwrap();
        assert_eq!(handle.item_type(), Mark5::TYPE);
        assert!(!handle.is_drawing());
        let item = handle.get::<Mark5>().unwrap();
        assert_eq!(*item, Mark5([10, 20, 30, 40, 50]));
    }

    #[test]
    #[should_panic(expected = "typed access")]
    fn typed_access_with_wrong_type_panics() {
        let mut buffer = ItemBuffer::<Cat>::new(BufferConfig::default());
        buffer.append(Mark3([0, 0, 0])).unwrap();
        let handle = buffer.iter().next().unwrap().unwrap();
        let _ = handle.get::<Mark5>();
    }

    #[test]
    fn copy_to_duplicates_the_padded_record() {
        let mut buffer = ItemBuffer::<Cat>::new(BufferConfig::default());
        buffer.append(Mark3([7, 8, 9])).unwrap();
        let handle = buffer.iter().next().unwrap().unwrap();

        let mut dest = [0xAAu8; 16];
        assert_eq!(handle.copy_to(&mut dest).unwrap(), 16);
        assert_eq!(&dest, handle.raw_bytes());

        let mut short = [0u8; 8];
        assert!(matches!(
            handle.copy_to(&mut short),
            Err(BufferError::CopyDestination { .. })
        ));
    }

    #[test]
    fn finalizers_run_exactly_once_on_clear() {
        let value = Arc::new(77u64);
        let mut buffer = ItemBuffer::<Cat>::new(BufferConfig::default());
        buffer.append(Hold {
            value: value.clone(),
        })
        .unwrap();
        assert_eq!(Arc::strong_count(&value), 2);

        assert_eq!(replay(&buffer), vec![Op::Hold(77)]);

        buffer.clear();
        assert_eq!(Arc::strong_count(&value), 1);
        buffer.clear();
        assert_eq!(Arc::strong_count(&value), 1);
    }

    #[test]
    fn finalizers_run_on_drop() {
        let value = Arc::new(5u64);
        {
            let mut buffer = ItemBuffer::<Cat>::new(BufferConfig::default());
            buffer.append(Hold {
                value: value.clone(),
            })
            .unwrap();
            assert_eq!(Arc::strong_count(&value), 2);
        }
        assert_eq!(Arc::strong_count(&value), 1);
    }

    #[test]
    fn destroy_releases_early_and_clear_does_not_double_release() {
        let value = Arc::new(3u64);
        let mut buffer = ItemBuffer::<Cat>::new(BufferConfig::default());
        buffer.append(Hold {
            value: value.clone(),
        })
        .unwrap();

        {
            let handle = buffer.iter().next().unwrap().unwrap();
            handle.destroy();
            handle.destroy();
        }
        assert_eq!(Arc::strong_count(&value), 1);

        // Reading a destroyed record's payload reports the stale slot.
        let handle = buffer.iter().next().unwrap().unwrap();
        assert!(matches!(
            handle.get::<Hold>(),
            Err(BufferError::MissingResource { .. })
        ));

        buffer.clear();
        assert_eq!(Arc::strong_count(&value), 1);
    }

    #[test]
    fn encoded_items_roundtrip_through_clients() {
        let (client, _state) = PoolClient::new(64);
        let mut buffer = ItemBuffer::<Cat>::with_clients(
            BufferConfig::default(),
            Some(Box::new(client)),
            Some(Box::new(StubReader)),
        );
        buffer.append(Mark3([1, 1, 1])).unwrap();
        buffer.append(Note {
            text: "between".into(),
        })
        .unwrap();
        buffer.append(Mark5([2; 5])).unwrap();

        let ops = replay(&buffer);
        assert_eq!(
            ops,
            vec![
                Op::M3([1, 1, 1]),
                Op::Note("between".into()),
                Op::M5([2; 5]),
            ]
        );

        let handles: Vec<_> = buffer.iter().map(|h| h.unwrap()).collect();
        assert!(handles[1].is_drawing());
        let note = handles[1].get::<Note>().unwrap();
        assert_eq!(note.text, "between");
    }

    #[test]
    fn client_segments_all_come_home() {
        let (client, state) = PoolClient::new(32);
        let mut buffer = ItemBuffer::<Cat>::with_clients(
            BufferConfig::default(),
            Some(Box::new(client)),
            None,
        );
        for i in 0..10u8 {
            buffer.append(Mark10([i; 10])).unwrap();
        }
        assert!(buffer.segment_count() > 1);

        buffer.clear();
        let state = state.lock();
        assert!(!state.allocated.is_empty());
        assert_eq!(state.released, state.allocated);
    }

    #[test]
    fn client_allocation_failure_is_an_error() {
        let (client, state) = PoolClient::new(32);
        state.lock().fail_alloc = true;
        let mut buffer = ItemBuffer::<Cat>::with_clients(
            BufferConfig::default(),
            Some(Box::new(client)),
            None,
        );
        let err = buffer.append(Mark3([0; 3])).unwrap_err();
        assert!(matches!(err, BufferError::SegmentAllocation { .. }));
        assert!(buffer.is_empty());
    }

    #[test]
    fn client_encode_failure_is_an_error() {
        let (client, state) = PoolClient::new(32);
        state.lock().fail_encode = true;
        let mut buffer = ItemBuffer::<Cat>::with_clients(
            BufferConfig::default(),
            Some(Box::new(client)),
            None,
        );
        let err = buffer
            .append(Note { text: "x".into() })
            .unwrap_err();
        assert!(matches!(err, BufferError::Encode { .. }));
        assert!(buffer.is_empty());
    }

    #[test]
    fn decode_failure_skips_one_record_only() {
        let (client, _state) = PoolClient::new(256);
        let mut buffer = ItemBuffer::<Cat>::with_clients(
            BufferConfig::default(),
            Some(Box::new(client)),
            Some(Box::new(StubReader)),
        );
        buffer.append(Note { text: "ok".into() }).unwrap();
        buffer.append(Note {
            text: "corrupt".into(),
        })
        .unwrap();
        buffer.append(Note { text: "ok2".into() }).unwrap();

        let results: Vec<_> = buffer.iter().collect();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().get::<Note>().unwrap().text, "ok");
        assert!(matches!(results[1], Err(BufferError::Decode { .. })));
        assert_eq!(results[2].as_ref().unwrap().get::<Note>().unwrap().text, "ok2");
    }

    #[test]
    #[should_panic(expected = "requires a reading client")]
    fn decoding_without_reading_client_panics() {
        let (client, _state) = PoolClient::new(64);
        let mut buffer = ItemBuffer::<Cat>::with_clients(
            BufferConfig::default(),
            Some(Box::new(client)),
            None,
        );
        buffer.append(Note { text: "x".into() }).unwrap();
        let _ = buffer.iter().next();
    }

    #[test]
    fn unknown_tag_ends_iteration_with_corruption() {
        let mut segment = vec![0u8; 16];
        segment[0] = 0xEE;
        let buffer = ItemBuffer::<Cat>::from_segments(vec![segment], None);

        let results: Vec<_> = buffer.iter().collect();
        assert_eq!(results.len(), 1);
        assert!(matches!(
            results[0],
            Err(BufferError::UnknownItemType { tag: 0xEE, .. })
        ));
    }

    #[test]
    fn truncated_record_ends_iteration() {
        // A Mark10 record claims 24 bytes but only 16 were transferred.
        let mut segment = vec![0u8; 16];
        segment[0] = Mark10::TYPE.as_u8();
        let buffer = ItemBuffer::<Cat>::from_segments(vec![segment], None);

        let results: Vec<_> = buffer.iter().collect();
        assert_eq!(results.len(), 1);
        assert!(matches!(
            results[0],
            Err(BufferError::TruncatedRecord { .. })
        ));
    }

    #[test]
    fn transferred_segments_replay_identically() {
        let (client, _state) = PoolClient::new(48);
        let mut buffer = ItemBuffer::<Cat>::with_clients(
            BufferConfig::default(),
            Some(Box::new(client)),
            Some(Box::new(StubReader)),
        );
        buffer.append(Mark3([1, 2, 3])).unwrap();
        buffer.append(Note {
            text: "across".into(),
        })
        .unwrap();
        buffer.append(Mark10([4; 10])).unwrap();
        let expected = replay(&buffer);

        let mut transferred = Vec::new();
        buffer.for_each_segment(|_, bytes| transferred.push(bytes.to_vec()));
        let far_side = ItemBuffer::<Cat>::from_segments(transferred, Some(Box::new(StubReader)));
        assert_eq!(replay(&far_side), expected);
    }

    #[test]
    fn clear_returns_buffer_to_initial_state() {
        let mut buffer = ItemBuffer::<Cat>::new(small_config(32));
        for i in 0..8u8 {
            buffer.append(Mark5([i; 5])).unwrap();
        }
        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.segment_count(), 0);
        assert_eq!(buffer.size_in_bytes(), 0);

        // The buffer is reusable after a clear.
        buffer.append(Mark3([9, 9, 9])).unwrap();
        assert_eq!(replay(&buffer), vec![Op::M3([9, 9, 9])]);
    }

    #[derive(Debug, Clone)]
    enum Scripted {
        M3([u8; 3]),
        M5([u8; 5]),
        M10([u8; 10]),
    }

    impl Scripted {
        fn append_to(&self, buffer: &mut ItemBuffer<Cat>) {
            match self {
                Self::M3(v) => buffer.append(Mark3(*v)).unwrap(),
                Self::M5(v) => buffer.append(Mark5(*v)).unwrap(),
                Self::M10(v) => buffer.append(Mark10(*v)).unwrap(),
            }
        }

        fn expected(&self) -> Op {
            match self {
                Self::M3(v) => Op::M3(*v),
                Self::M5(v) => Op::M5(*v),
                Self::M10(v) => Op::M10(*v),
            }
        }
    }

    fn scripted_strategy() -> impl Strategy<Value = Scripted> {
        prop_oneof![
            proptest::array::uniform3(any::<u8>()).prop_map(Scripted::M3),
            proptest::array::uniform5(any::<u8>()).prop_map(Scripted::M5),
            proptest::array::uniform10(any::<u8>()).prop_map(Scripted::M10),
        ]
    }

    proptest! {
        #[test]
        fn order_is_preserved_across_rollovers(
            script in proptest::collection::vec(scripted_strategy(), 0..64),
        ) {
            let mut buffer = ItemBuffer::<Cat>::new(small_config(32));
            for item in &script {
                item.append_to(&mut buffer);
            }

            let expected: Vec<Op> = script.iter().map(Scripted::expected).collect();
            prop_assert_eq!(replay(&buffer), expected);
        }

        #[test]
        fn every_record_starts_aligned(
            script in proptest::collection::vec(scripted_strategy(), 0..64),
        ) {
            let mut buffer = ItemBuffer::<Cat>::new(small_config(32));
            for item in &script {
                item.append_to(&mut buffer);
            }

            let offsets = record_offsets(&buffer);
            prop_assert_eq!(offsets.len(), script.len());
            for offset in offsets {
                prop_assert_eq!(offset % crate::ITEM_ALIGNMENT, 0);
            }
        }
    }
}
