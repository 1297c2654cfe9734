//! Error types for the codec crate.

use paintbuf_core::ItemType;
use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while encoding or decoding item blobs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// No codec was registered for the item's tag.
    #[error("no codec registered for {item_type}")]
    Unregistered {
        /// Tag with no registry entry.
        item_type: ItemType,
    },

    /// Failed to encode an item to CBOR.
    #[error("encoding {item_type} failed: {message}")]
    EncodingFailed {
        /// Tag of the item being encoded.
        item_type: ItemType,
        /// Description of the encoding error.
        message: String,
    },

    /// Failed to decode CBOR bytes back into an item.
    #[error("decoding {item_type} failed: {message}")]
    DecodingFailed {
        /// Tag of the item being decoded.
        item_type: ItemType,
        /// Description of the decoding error.
        message: String,
    },
}

impl CodecError {
    /// Create an encoding failed error.
    pub fn encoding_failed(item_type: ItemType, message: impl Into<String>) -> Self {
        Self::EncodingFailed {
            item_type,
            message: message.into(),
        }
    }

    /// Create a decoding failed error.
    pub fn decoding_failed(item_type: ItemType, message: impl Into<String>) -> Self {
        Self::DecodingFailed {
            item_type,
            message: message.into(),
        }
    }
}
