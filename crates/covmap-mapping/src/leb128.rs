//! Unsigned LEB128.

use crate::{MappingError, Result};

/// Append `value` as unsigned LEB128.
#[inline]
pub fn write_uleb128(buf: &mut Vec<u8>, mut value: u64) {
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        buf.push(byte);
        if value == 0 {
            break;
        }
    }
}

/// Read an unsigned LEB128 value at `*pos`, advancing it.
pub fn read_uleb128(data: &[u8], pos: &mut usize) -> Result<u64> {
    let mut value = 0u64;
    let mut shift = 0u32;
    loop {
        let byte = *data.get(*pos).ok_or(MappingError::Truncated)?;
        *pos += 1;
        let low = u64::from(byte & 0x7f);
        if shift >= 64 || (shift == 63 && low > 1) {
            return Err(MappingError::VarintOverflow);
        }
        value |= low << shift;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
        shift += 7;
    }
}

/// Number of bytes `value` occupies as unsigned LEB128.
pub const fn uleb128_len(value: u64) -> usize {
    let bits = 64 - (value | 1).leading_zeros() as usize;
    bits.div_ceil(7)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(value: u64) -> Vec<u8> {
        let mut buf = Vec::new();
        write_uleb128(&mut buf, value);
        buf
    }

    #[test]
    fn test_known_encodings() {
        assert_eq!(encode(0), [0x00]);
        assert_eq!(encode(127), [0x7f]);
        assert_eq!(encode(128), [0x80, 0x01]);
        assert_eq!(encode(624_485), [0xe5, 0x8e, 0x26]);
        assert_eq!(encode(u64::MAX).len(), 10);
    }

    #[test]
    fn test_read_advances_position() {
        let data = [0xe5, 0x8e, 0x26, 0x05];
        let mut pos = 0;
        assert_eq!(read_uleb128(&data, &mut pos), Ok(624_485));
        assert_eq!(pos, 3);
        assert_eq!(read_uleb128(&data, &mut pos), Ok(5));
        assert_eq!(pos, 4);
    }

    #[test]
    fn test_read_truncated() {
        let mut pos = 0;
        assert_eq!(read_uleb128(&[0x80, 0x80], &mut pos), Err(MappingError::Truncated));
    }

    #[test]
    fn test_read_overflow() {
        let mut data = vec![0xff; 10];
        data.push(0x01);
        let mut pos = 0;
        assert_eq!(read_uleb128(&data, &mut pos), Err(MappingError::VarintOverflow));
    }

    #[test]
    fn test_len_matches_encoding() {
        for value in [0, 1, 127, 128, 16_383, 16_384, 1 << 31, u64::MAX] {
            assert_eq!(uleb128_len(value), encode(value).len(), "value {value}");
        }
    }
}
