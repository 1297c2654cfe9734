//! Replay helpers and end-to-end buffer scenarios.

use crate::items::TestCatalog;
use crate::sink::{DisplayOp, RecordingSink};
use paintbuf_core::{BufferError, BufferResult, ItemBuffer};

/// Replays every record in `buffer` into a fresh recording sink.
///
/// # Errors
///
/// Returns the first iteration or apply error.
pub fn replay(buffer: &ItemBuffer<TestCatalog>) -> BufferResult<Vec<DisplayOp>> {
    let mut sink = RecordingSink::default();
    for handle in buffer.iter() {
        handle?.apply(&mut sink)?;
    }
    Ok(sink.ops)
}

/// Replays `buffer`, collecting per-record errors instead of stopping.
///
/// Decode failures are reported per record while iteration continues;
/// corruption ends the walk, leaving the error as the last entry.
#[must_use]
pub fn replay_lossy(buffer: &ItemBuffer<TestCatalog>) -> (Vec<DisplayOp>, Vec<BufferError>) {
    let mut sink = RecordingSink::default();
    let mut errors = Vec::new();
    for result in buffer.iter() {
        match result {
            Ok(handle) => {
                if let Err(err) = handle.apply(&mut sink) {
                    errors.push(err);
                }
            }
            Err(err) => errors.push(err),
        }
    }
    (sink.ops, errors)
}
