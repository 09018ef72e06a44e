//! Shared helpers for the two string encodings used by mesh and skeleton files.
//!
//! Most names are stored as UTF-8 terminated by a [LINE_DELIMITER] byte.
//! The dependency info extension stores names with a fixed 4 byte length prefix instead.
//! Each byte of the prefix carries 7 bits of the length with the most significant group first.
//! The high bit of every prefix byte is ignored when reading and always written as zero.
use crate::{Error, Result};

/// The delimiter for version strings and names.
pub const LINE_DELIMITER: u8 = b'\n';

/// The number of bytes in the length prefix of a packed string.
pub const PACKED_LENGTH_SIZE: usize = 4;

/// The largest length representable with 28 bits.
pub const MAX_PACKED_LENGTH: usize = (1 << 28) - 1;

/// Encodes `length` as 4 groups of 7 bits with the most significant group first.
pub fn pack_length(length: usize) -> Result<[u8; PACKED_LENGTH_SIZE]> {
    if length > MAX_PACKED_LENGTH {
        return Err(Error::ConstraintViolation(format!(
            "String length {} exceeds the maximum packed length {}.",
            length, MAX_PACKED_LENGTH
        )));
    }

    Ok([
        ((length >> 21) & 0x7F) as u8,
        ((length >> 14) & 0x7F) as u8,
        ((length >> 7) & 0x7F) as u8,
        (length & 0x7F) as u8,
    ])
}

/// Decodes a length written by [pack_length].
pub fn unpack_length(bytes: [u8; PACKED_LENGTH_SIZE]) -> usize {
    bytes
        .iter()
        .fold(0usize, |length, b| (length << 7) | (*b & 0x7F) as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hexlit::hex;

    #[test]
    fn pack_length_small() {
        assert_eq!(hex!("00000005"), pack_length(5).unwrap());
    }

    #[test]
    fn pack_length_uses_seven_bits_per_byte() {
        // 200 = 0b1_1001000 doesn't fit in the last byte.
        assert_eq!(hex!("00000148"), pack_length(200).unwrap());
        assert_eq!(200, unpack_length(hex!("00000148")));
    }

    #[test]
    fn pack_length_max() {
        assert_eq!(hex!("7F7F7F7F"), pack_length(MAX_PACKED_LENGTH).unwrap());
        assert_eq!(MAX_PACKED_LENGTH, unpack_length(hex!("7F7F7F7F")));
    }

    #[test]
    fn pack_length_too_large() {
        let result = pack_length(MAX_PACKED_LENGTH + 1);
        assert!(matches!(result, Err(Error::ConstraintViolation(_))));
    }

    #[test]
    fn unpack_length_ignores_high_bits() {
        assert_eq!(3, unpack_length(hex!("80808083")));
    }
}
