//! LEB128 varint encoding, the base-128 little-endian representation used for
//! every `Varint`-wiretype field and for tag keys themselves.

use super::WireError;

/// Decodes a LEB128-encoded `u64` from the front of `buf`.
///
/// Returns the decoded value and the number of bytes consumed. Fails if
/// `buf` ends before a terminating byte (continuation bit clear) is seen, or
/// if more than 10 bytes would be required (the value would not fit in a
/// `u64`).
pub fn read_varint(buf: &[u8]) -> Result<(u64, usize), WireError> {
    // Fast path: the whole 10-byte worst case fits in `buf`, or the
    // available tail itself ends with a terminator. Either way we can
    // decode straight-line without rechecking `i < buf.len()` each byte.
    let limit = buf.len().min(10);
    let mut value: u64 = 0;
    for i in 0..limit {
        let byte = buf[i];
        value |= ((byte & 0x7f) as u64) << (i * 7);
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
    }
    if limit == 10 {
        Err(WireError::MalformedVarint)
    } else {
        Err(WireError::Truncated)
    }
}

/// Decodes a LEB128-encoded `u32` from the front of `buf`, capped at 5 bytes.
pub fn read_varint32(buf: &[u8]) -> Result<(u32, usize), WireError> {
    let (value, consumed) = read_varint(buf)?;
    if consumed > 5 || value > u32::MAX as u64 {
        return Err(WireError::MalformedVarint);
    }
    Ok((value as u32, consumed))
}

/// Appends `value` to `out` in LEB128 form. Always emits at least one byte,
/// and never an unnecessary continuation byte (canonical encoding).
pub fn write_varint(value: u64, out: &mut Vec<u8>) {
    let mut value = value;
    loop {
        if value < 0x80 {
            out.push(value as u8);
            return;
        }
        out.push(((value & 0x7f) | 0x80) as u8);
        value >>= 7;
    }
}

/// The number of bytes [`write_varint`] would emit for `value`.
pub fn encoded_len_varint(value: u64) -> usize {
    // Each additional group of 7 bits needs one more byte; this is a
    // branch-table over the 10 possible widths rather than a loop.
    match value {
        0..=0x7f => 1,
        0x80..=0x3fff => 2,
        0x4000..=0x1f_ffff => 3,
        0x20_0000..=0xfff_ffff => 4,
        0x1000_0000..=0x7_ffff_ffff => 5,
        0x8_0000_0000..=0x3ff_ffff_ffff => 6,
        0x400_0000_0000..=0x1_ffff_ffff_ffff => 7,
        0x2_0000_0000_0000..=0xff_ffff_ffff_ffff => 8,
        0x100_0000_0000_0000..=0x7fff_ffff_ffff_ffff => 9,
        _ => 10,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_one_byte() {
        let mut out = Vec::new();
        write_varint(0, &mut out);
        assert_eq!(out, vec![0x00]);
        assert_eq!(encoded_len_varint(0), 1);
    }

    #[test]
    fn max_is_ten_bytes() {
        let mut out = Vec::new();
        write_varint(u64::MAX, &mut out);
        assert_eq!(out.len(), 10);
        assert_eq!(encoded_len_varint(u64::MAX), 10);
        let (value, consumed) = read_varint(&out).unwrap();
        assert_eq!(value, u64::MAX);
        assert_eq!(consumed, 10);
    }

    #[test]
    fn round_trip_is_canonical() {
        for value in [0u64, 1, 127, 128, 300, 16384, u32::MAX as u64, u64::MAX] {
            let mut out = Vec::new();
            write_varint(value, &mut out);
            assert_eq!(out.len(), encoded_len_varint(value));
            let (decoded, consumed) = read_varint(&out).unwrap();
            assert_eq!(decoded, value);
            assert_eq!(consumed, out.len());
        }
    }

    #[test]
    fn truncated_varint_fails() {
        // Continuation bit set on the last available byte: can't know if
        // more bytes follow.
        assert_eq!(read_varint(&[0x80]), Err(WireError::Truncated));
        assert_eq!(read_varint(&[]), Err(WireError::Truncated));
    }

    #[test]
    fn overlong_varint_fails() {
        let overlong = [0x80; 10];
        assert_eq!(read_varint(&overlong), Err(WireError::MalformedVarint));
    }

    #[test]
    fn varint32_rejects_wide_values() {
        let mut out = Vec::new();
        write_varint(u64::from(u32::MAX) + 1, &mut out);
        assert_eq!(read_varint32(&out), Err(WireError::MalformedVarint));
    }
}
