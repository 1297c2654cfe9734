//! CBOR-backed writing/reading clients.
//!
//! [`CborWritingClient`] hands out plain heap blocks for segment backing
//! and encodes out-of-line items through a shared [`CodecRegistry`];
//! [`CborReadingClient`] is its replay-side counterpart. Registry errors
//! are folded into the buffer's own error type at this boundary.

use crate::registry::CodecRegistry;
use bytes::Bytes;
use paintbuf_core::{
    BufferError, BufferResult, ClientSegment, ItemType, ReadingClient, WritingClient,
};
use std::any::Any;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::warn;

/// Default capacity of allocated segment blocks, in bytes.
pub const DEFAULT_SEGMENT_CAPACITY: usize = 16 * 1024;

/// Writing client backed by heap blocks and a CBOR codec registry.
pub struct CborWritingClient {
    registry: Arc<CodecRegistry>,
    segment_capacity: usize,
    next_token: u64,
    outstanding: HashSet<u64>,
}

impl CborWritingClient {
    /// Creates a client allocating [`DEFAULT_SEGMENT_CAPACITY`] blocks.
    #[must_use]
    pub fn new(registry: Arc<CodecRegistry>) -> Self {
        Self::with_segment_capacity(registry, DEFAULT_SEGMENT_CAPACITY)
    }

    /// Creates a client with a custom block capacity.
    #[must_use]
    pub fn with_segment_capacity(registry: Arc<CodecRegistry>, segment_capacity: usize) -> Self {
        Self {
            registry,
            segment_capacity,
            next_token: 0,
            outstanding: HashSet::new(),
        }
    }

    /// Number of allocated blocks not yet released back.
    #[must_use]
    pub fn outstanding_segments(&self) -> usize {
        self.outstanding.len()
    }
}

impl WritingClient for CborWritingClient {
    fn allocate_segment(&mut self, min_bytes: usize) -> BufferResult<ClientSegment> {
        let token = self.next_token;
        self.next_token += 1;
        self.outstanding.insert(token);
        Ok(ClientSegment {
            token,
            bytes: vec![0; min_bytes.max(self.segment_capacity)],
        })
    }

    fn release_segment(&mut self, segment: ClientSegment) {
        if !self.outstanding.remove(&segment.token) {
            warn!(token = segment.token, "released a segment this client never allocated");
        }
    }

    fn encode_item(&mut self, item_type: ItemType, item: &dyn Any) -> BufferResult<Bytes> {
        self.registry
            .encode(item_type, item)
            .map_err(|e| BufferError::encode(item_type, e.to_string()))
    }
}

/// Reading client decoding CBOR blobs through a codec registry.
pub struct CborReadingClient {
    registry: Arc<CodecRegistry>,
}

impl CborReadingClient {
    /// Creates a reading client over `registry`.
    #[must_use]
    pub fn new(registry: Arc<CodecRegistry>) -> Self {
        Self { registry }
    }
}

impl ReadingClient for CborReadingClient {
    fn decode_item(&self, item_type: ItemType, bytes: &[u8]) -> BufferResult<Box<dyn Any>> {
        self.registry
            .decode(item_type, bytes)
            .map_err(|e| BufferError::decode(item_type, e.to_string()))
    }
}

/// Builds a matched writing/reading client pair over one registry.
#[must_use]
pub fn client_pair(
    registry: Arc<CodecRegistry>,
) -> (Box<dyn WritingClient>, Box<dyn ReadingClient>) {
    (
        Box::new(CborWritingClient::new(registry.clone())),
        Box::new(CborReadingClient::new(registry)),
    )
}
