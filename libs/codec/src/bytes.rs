//! # Byte Codec - Fixed-Width Big-Endian Primitives
//!
//! ## Purpose
//!
//! Stateless conversions between network-order integers, text, doubles and
//! byte sequences. Every multi-byte value on the ioMessage wire is big-endian.
//!
//! ## Text Encoding
//!
//! Strings travel as one byte per character: the low eight bits of each code
//! point. This is not UTF-8 safe; characters above U+00FF are truncated on
//! encode. [`bytes_to_string`] is the exact inverse for U+0000..=U+00FF.
//!
//! ## Overflow
//!
//! Encoding into an explicit width ([`uint_to_bytes`]) never panics. A value
//! that does not fit yields an empty vector and a warning; callers treat the
//! empty result as "field omitted".

use byteorder::{BigEndian, ByteOrder};
use tracing::warn;

use crate::error::{CodecError, CodecResult};

/// Largest width of a wire integer
pub const MAX_UINT_WIDTH: usize = 8;

/// Encode a 2-byte big-endian unsigned short
#[inline]
pub fn short_to_bytes(value: u16) -> [u8; 2] {
    let mut buf = [0u8; 2];
    BigEndian::write_u16(&mut buf, value);
    buf
}

/// Encode a 4-byte big-endian unsigned int
#[inline]
pub fn int_to_bytes(value: u32) -> [u8; 4] {
    let mut buf = [0u8; 4];
    BigEndian::write_u32(&mut buf, value);
    buf
}

/// Encode an 8-byte big-endian unsigned long
#[inline]
pub fn long_to_bytes(value: u64) -> [u8; 8] {
    let mut buf = [0u8; 8];
    BigEndian::write_u64(&mut buf, value);
    buf
}

/// Encode a double as 8 IEEE-754 big-endian bytes
#[inline]
pub fn decimal_to_bytes(value: f64) -> [u8; 8] {
    let mut buf = [0u8; 8];
    BigEndian::write_f64(&mut buf, value);
    buf
}

/// Encode `value` into exactly `width` big-endian bytes
///
/// Returns an empty vector (and logs a warning) when the width is outside
/// 1..=8 or the value needs more than `width` bytes.
pub fn uint_to_bytes(value: u64, width: usize) -> Vec<u8> {
    if width == 0 || width > MAX_UINT_WIDTH {
        warn!("Number to bytes: invalid width {}", width);
        return Vec::new();
    }
    if !fits_width(value, width) {
        warn!(
            "Number to bytes: value {} does not fit in {} bytes",
            value, width
        );
        return Vec::new();
    }

    let mut buf = vec![0u8; width];
    BigEndian::write_uint(&mut buf, value, width);
    buf
}

/// True when `value` can be written in `width` bytes without loss
#[inline]
pub fn fits_width(value: u64, width: usize) -> bool {
    match width {
        0 => value == 0,
        w if w >= MAX_UINT_WIDTH => true,
        w => value >> (w * 8) == 0,
    }
}

/// Encode text as one byte per character
pub fn string_to_bytes(text: &str) -> Vec<u8> {
    text.chars().map(|c| (u32::from(c) & 0xFF) as u8).collect()
}

/// Number of wire bytes [`string_to_bytes`] produces for `text`
#[inline]
pub fn wire_len(text: &str) -> usize {
    text.chars().count()
}

/// Decode one-byte-per-character text
pub fn bytes_to_string(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Read a big-endian unsigned integer of `width` bytes at `offset`
///
/// Supports the full 64-bit range; `width` must be 1..=8.
pub fn read_uint_be(data: &[u8], offset: usize, width: usize) -> CodecResult<u64> {
    if width == 0 || width > MAX_UINT_WIDTH {
        return Err(CodecError::invalid_width(
            width,
            format!("read at offset {}", offset),
        ));
    }
    let end = offset
        .checked_add(width)
        .filter(|&end| end <= data.len())
        .ok_or_else(|| CodecError::truncated("uint", offset, width, data.len()))?;

    Ok(BigEndian::read_uint(&data[offset..end], width))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_width_encoding_is_big_endian() {
        assert_eq!(short_to_bytes(4), [0x00, 0x04]);
        assert_eq!(int_to_bytes(0x0102_0304), [0x01, 0x02, 0x03, 0x04]);
        assert_eq!(
            long_to_bytes(0x0102_0304_0506_0708),
            [1, 2, 3, 4, 5, 6, 7, 8]
        );
    }

    #[test]
    fn test_decimal_to_bytes() {
        assert_eq!(decimal_to_bytes(1.0), [0x3F, 0xF0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_uint_overflow_yields_empty() {
        assert_eq!(uint_to_bytes(0x1FF, 1), Vec::<u8>::new());
        assert_eq!(uint_to_bytes(1, 0), Vec::<u8>::new());
        assert_eq!(uint_to_bytes(1, 9), Vec::<u8>::new());
        assert_eq!(uint_to_bytes(0xFF, 1), vec![0xFF]);
        assert_eq!(uint_to_bytes(0x0102, 3), vec![0x00, 0x01, 0x02]);
        assert_eq!(uint_to_bytes(u64::MAX, 8), vec![0xFF; 8]);
    }

    #[test]
    fn test_read_uint_full_precision() {
        let data = long_to_bytes(u64::MAX - 1);
        assert_eq!(read_uint_be(&data, 0, 8).unwrap(), u64::MAX - 1);

        // Beyond 2^53
        let big = (1u64 << 60) + 3;
        assert_eq!(read_uint_be(&long_to_bytes(big), 0, 8).unwrap(), big);
    }

    #[test]
    fn test_read_uint_bounds() {
        let data = [0x00, 0x05];
        assert_eq!(read_uint_be(&data, 1, 1).unwrap(), 5);
        assert!(matches!(
            read_uint_be(&data, 1, 2),
            Err(CodecError::TruncatedField { .. })
        ));
        assert!(matches!(
            read_uint_be(&data, 0, 0),
            Err(CodecError::InvalidWidth { .. })
        ));
    }

    #[test]
    fn test_one_byte_per_character() {
        assert_eq!(string_to_bytes("ab"), vec![0x61, 0x62]);
        // U+0101 keeps only its low byte
        assert_eq!(string_to_bytes("\u{0101}"), vec![0x01]);
        assert_eq!(bytes_to_string(&[0x61, 0xE9]), "a\u{e9}");
        assert_eq!(wire_len("h\u{e9}llo"), 5);
    }
}
