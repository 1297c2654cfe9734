//! Record layout rules shared by every segment.
//!
//! Each record is a fixed 8-byte type slot followed by the payload, padded so
//! that the next record starts on an 8-byte boundary. The slot holds the tag
//! byte, three reserved zero bytes, and a little-endian `u32` payload length
//! that is only meaningful for out-of-line (client-encoded) records; inline
//! payload lengths are static per type and the field is written as zero.

use crate::types::ItemType;

/// Alignment of every record start within a segment.
pub const ITEM_ALIGNMENT: usize = 8;

/// Size of the type slot preceding every payload.
pub const TYPE_SLOT_SIZE: usize = 8;

/// Rounds `n` up to the next multiple of [`ITEM_ALIGNMENT`].
#[must_use]
pub const fn align_up(n: usize) -> usize {
    (n + ITEM_ALIGNMENT - 1) & !(ITEM_ALIGNMENT - 1)
}

/// Returns the total number of segment bytes a record with `payload_len`
/// payload bytes occupies, including the type slot and trailing padding.
#[must_use]
pub const fn padded_size(payload_len: usize) -> usize {
    align_up(TYPE_SLOT_SIZE + payload_len)
}

/// Writes a type slot at the start of `record`.
///
/// `payload_len` must be zero for inline records.
pub(crate) fn write_type_slot(record: &mut [u8], item_type: ItemType, payload_len: u32) {
    record[0] = item_type.as_u8();
    record[1..4].fill(0);
    record[4..TYPE_SLOT_SIZE].copy_from_slice(&payload_len.to_le_bytes());
}

/// Reads the tag byte of the record starting at `record[0]`.
pub(crate) fn record_type(record: &[u8]) -> ItemType {
    ItemType::new(record[0])
}

/// Reads the out-of-line payload length from a type slot.
pub(crate) fn record_payload_len(record: &[u8]) -> usize {
    let bytes: [u8; 4] = [record[4], record[5], record[6], record[7]];
    u32::from_le_bytes(bytes) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn align_up_multiples() {
        assert_eq!(align_up(0), 0);
        assert_eq!(align_up(1), 8);
        assert_eq!(align_up(8), 8);
        assert_eq!(align_up(9), 16);
    }

    #[test]
    fn padded_size_includes_slot() {
        assert_eq!(padded_size(0), 8);
        assert_eq!(padded_size(3), 16);
        assert_eq!(padded_size(5), 16);
        assert_eq!(padded_size(8), 16);
        assert_eq!(padded_size(10), 24);
    }

    #[test]
    fn type_slot_roundtrip() {
        let mut record = [0xFFu8; 16];
        write_type_slot(&mut record, ItemType::new(9), 300);
        assert_eq!(record_type(&record), ItemType::new(9));
        assert_eq!(record_payload_len(&record), 300);
        assert_eq!(&record[1..4], &[0, 0, 0]);
    }
}
