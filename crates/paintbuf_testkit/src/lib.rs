//! # PaintBuf Testkit
//!
//! Test utilities for PaintBuf.
//!
//! This crate provides:
//! - A closed test catalog covering every record shape the buffer
//!   supports (fixed-size inline, zero-payload, resource-carrying, and
//!   out-of-line items)
//! - Recording sinks for replay verification
//! - Property-based script generators using proptest
//! - Replay helpers shared by cross-crate tests
//!
//! ## Usage
//!
//! ```rust,ignore
//! use paintbuf_core::{BufferConfig, ItemBuffer};
//! use paintbuf_testkit::prelude::*;
//!
//! #[test]
//! fn records_replay_in_order() {
//!     let mut buffer = ItemBuffer::<TestCatalog>::new(BufferConfig::default());
//!     buffer.append(SetStrokeWidth { width: 2.0 }).unwrap();
//!     assert_eq!(replay(&buffer).unwrap(), vec![DisplayOp::StrokeWidth(2.0)]);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod generators;
pub mod integration;
pub mod items;
pub mod sink;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::generators::*;
    pub use crate::integration::*;
    pub use crate::items::*;
    pub use crate::sink::*;
}

pub use generators::*;
pub use integration::*;
pub use items::*;
pub use sink::*;
