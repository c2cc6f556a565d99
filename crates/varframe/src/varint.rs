//! Unsigned variable-length integers.
//!
//! Little-endian groups of 7 bits, high bit set on every byte except the last.

/// Longest encoding of a `u64`.
pub const MAX_VARINT_LEN: usize = 10;

/// Outcome of decoding a varint from the front of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Uvarint {
    /// A terminated varint of `len` bytes.
    Complete { value: u64, len: usize },
    /// The buffer ended before the varint terminated.
    Incomplete,
    /// The varint does not fit in 64 bits.
    Overflow,
}

/// Encode `value` into `dst`, returning the number of bytes written.
///
/// # Panics
///
/// Panics if `dst` is shorter than the encoding; [`MAX_VARINT_LEN`] bytes
/// always suffice.
pub fn encode_uvarint(mut value: u64, dst: &mut [u8]) -> usize {
    let mut i = 0;
    while value >= 0x80 {
        dst[i] = (value as u8) | 0x80;
        value >>= 7;
        i += 1;
    }
    dst[i] = value as u8;
    i + 1
}

/// Decode a varint from the front of `buf`.
pub fn decode_uvarint(buf: &[u8]) -> Uvarint {
    let mut value = 0u64;
    let mut shift = 0u32;
    for (i, &byte) in buf.iter().enumerate() {
        if i == MAX_VARINT_LEN - 1 && byte > 1 {
            // Only one bit of the 64 is left for the tenth byte.
            return Uvarint::Overflow;
        }
        if byte < 0x80 {
            return Uvarint::Complete {
                value: value | (u64::from(byte) << shift),
                len: i + 1,
            };
        }
        value |= u64::from(byte & 0x7f) << shift;
        shift += 7;
    }
    Uvarint::Incomplete
}

/// Number of bytes needed to encode `value`.
pub fn uvarint_len(value: u64) -> usize {
    let bits = 64 - (value | 1).leading_zeros() as usize;
    bits.div_ceil(7)
}
