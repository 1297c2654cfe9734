//! # PaintBuf Codec
//!
//! CBOR encoding/decoding clients for PaintBuf item buffers.
//!
//! Out-of-line items never have an in-buffer form; they travel through a
//! writing/reading client pair as opaque blobs. This crate provides that
//! pair backed by CBOR:
//!
//! - [`CodecRegistry`] maps item tags to serde-derived encode/decode
//!   functions
//! - [`CborWritingClient`] allocates segment blocks and encodes items on
//!   the recording side
//! - [`CborReadingClient`] decodes blobs back into typed items during
//!   replay
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use paintbuf_codec::{client_pair, CodecRegistry};
//! use paintbuf_core::{BufferConfig, ItemBuffer};
//!
//! let registry = Arc::new(CodecRegistry::new().with::<DrawText>());
//! let (writing, reading) = client_pair(registry);
//! let buffer = ItemBuffer::<MyCatalog>::with_clients(
//!     BufferConfig::default(),
//!     Some(writing),
//!     Some(reading),
//! );
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod client;
mod error;
mod registry;

pub use client::{client_pair, CborReadingClient, CborWritingClient, DEFAULT_SEGMENT_CAPACITY};
pub use error::{CodecError, CodecResult};
pub use registry::CodecRegistry;
