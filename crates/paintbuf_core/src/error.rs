//! Error types for the paintbuf core.
//!
//! Only recoverable failures surface here: allocation failures reported by a
//! writing client, client encode/decode failures, and corruption discovered
//! while walking segment bytes. Contract violations (mismatched typed casts,
//! out-of-line appends without a writing client, records too large for any
//! segment) panic instead, because they indicate a caller invariant breach.

use crate::types::{ItemType, ResourceSlot, SegmentId};
use thiserror::Error;

/// Result type for buffer operations.
pub type BufferResult<T> = Result<T, BufferError>;

/// Errors that can occur while appending to or replaying an item buffer.
#[derive(Debug, Error)]
pub enum BufferError {
    /// The writing client could not produce a new segment.
    #[error("segment allocation failed ({needed} bytes needed): {message}")]
    SegmentAllocation {
        /// Minimum number of bytes that was requested.
        needed: usize,
        /// Client-reported reason.
        message: String,
    },

    /// The writing client failed to encode an out-of-line item.
    #[error("encoding {item_type} failed: {message}")]
    Encode {
        /// Tag of the item that failed to encode.
        item_type: ItemType,
        /// Client-reported reason.
        message: String,
    },

    /// The reading client failed to decode an out-of-line record.
    #[error("decoding {item_type} failed: {message}")]
    Decode {
        /// Tag of the record that failed to decode.
        item_type: ItemType,
        /// Client-reported reason.
        message: String,
    },

    /// A record carries a tag the catalog does not know.
    #[error("unknown item type {tag} at offset {offset} in {segment}")]
    UnknownItemType {
        /// The unrecognized tag byte.
        tag: u8,
        /// Offset of the record within its segment.
        offset: usize,
        /// Segment containing the record.
        segment: SegmentId,
    },

    /// A record extends past the written extent of its segment.
    #[error(
        "truncated record at offset {offset} in {segment}: \
         needs {needed} bytes, {available} available"
    )]
    TruncatedRecord {
        /// Segment containing the record.
        segment: SegmentId,
        /// Offset of the record within its segment.
        offset: usize,
        /// Bytes the record requires.
        needed: usize,
        /// Bytes remaining in the segment.
        available: usize,
    },

    /// A payload references a resource slot that is no longer resident.
    #[error("resource {slot} is no longer resident")]
    MissingResource {
        /// The stale slot.
        slot: ResourceSlot,
    },

    /// A payload references a resource slot holding a different type.
    #[error("resource {slot} holds a different type than requested")]
    ResourceTypeMismatch {
        /// The mistyped slot.
        slot: ResourceSlot,
    },

    /// A copy destination is too small for the record.
    #[error("copy destination too small: record is {record} bytes, destination {destination}")]
    CopyDestination {
        /// Padded size of the record.
        record: usize,
        /// Size of the destination.
        destination: usize,
    },
}

impl BufferError {
    /// Creates a segment allocation error.
    pub fn allocation(needed: usize, message: impl Into<String>) -> Self {
        Self::SegmentAllocation {
            needed,
            message: message.into(),
        }
    }

    /// Creates an encode error for `item_type`.
    pub fn encode(item_type: ItemType, message: impl Into<String>) -> Self {
        Self::Encode {
            item_type,
            message: message.into(),
        }
    }

    /// Creates a decode error for `item_type`.
    pub fn decode(item_type: ItemType, message: impl Into<String>) -> Self {
        Self::Decode {
            item_type,
            message: message.into(),
        }
    }
}
