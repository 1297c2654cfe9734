//! # PaintBuf Core
//!
//! Append-only, typed binary item buffer for recording heterogeneous
//! drawing commands into contiguous memory segments and replaying them
//! later.
//!
//! This crate provides:
//! - Record layout rules (8-byte type slot, 8-byte record alignment)
//! - The [`Item`]/[`Catalog`] dispatch table over a closed tag set
//! - Segments with explicit owned-vs-client backing
//! - The [`ItemBuffer`] accumulator with segment rollover and a geometric
//!   grow policy
//! - Replay iteration via [`ItemCursor`] and non-owning [`ItemHandle`] views
//! - [`WritingClient`]/[`ReadingClient`] capabilities for client-controlled
//!   allocation and opaque item encoding across process or persistence
//!   boundaries
//!
//! The concrete item catalog, the sink records are applied to, and the
//! client implementations all live outside this crate.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod buffer;
mod catalog;
mod client;
mod cursor;
mod error;
mod handle;
mod layout;
mod resource;
mod segment;
mod types;

pub use buffer::{BufferConfig, ItemBuffer};
pub use catalog::{Catalog, Item, ItemInfo};
pub use client::{ReadingClient, WritingClient};
pub use cursor::ItemCursor;
pub use error::{BufferError, BufferResult};
pub use handle::{ItemHandle, ItemRef};
pub use layout::{align_up, padded_size, ITEM_ALIGNMENT, TYPE_SLOT_SIZE};
pub use resource::{Resource, ResourceArena, ResourceReader, ResourceWriter};
pub use segment::ClientSegment;
pub use types::{ItemType, ResourceSlot, SegmentId};
