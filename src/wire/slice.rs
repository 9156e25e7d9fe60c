//! The borrowed, read-only cursor over a byte slice.

use super::{read_varint, read_varint32, WireError};

/// A borrowed, read-only cursor over a byte slice. All reads are zero-copy:
/// [`Reader::read_bytes`] hands back a sub-slice of the original buffer
/// rather than an owned copy.
#[derive(Debug, Clone, Copy)]
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Reader { buf, pos: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.buf.len()
    }

    pub fn remaining(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    /// Absolute offset from the start of the buffer this reader was
    /// constructed with — used to annotate errors.
    pub fn offset(&self) -> usize {
        self.pos
    }

    pub(super) fn advance(&mut self, n: usize) {
        self.pos += n;
    }

    pub(super) fn buf(&self) -> &'a [u8] {
        self.buf
    }

    pub fn read_varint(&mut self) -> Result<u64, WireError> {
        let (value, consumed) = read_varint(self.remaining())?;
        self.advance(consumed);
        Ok(value)
    }

    pub fn read_varint32(&mut self) -> Result<u32, WireError> {
        let (value, consumed) = read_varint32(self.remaining())?;
        self.advance(consumed);
        Ok(value)
    }

    pub fn read_fixed32(&mut self) -> Result<u32, WireError> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes(bytes.try_into().unwrap()))
    }

    pub fn read_fixed64(&mut self) -> Result<u64, WireError> {
        let bytes = self.take(8)?;
        Ok(u64::from_le_bytes(bytes.try_into().unwrap()))
    }

    pub(super) fn take(&mut self, n: usize) -> Result<&'a [u8], WireError> {
        if self.remaining().len() < n {
            return Err(WireError::Truncated);
        }
        let bytes = &self.remaining()[..n];
        self.advance(n);
        Ok(bytes)
    }

    /// Reads a varint length, then returns a zero-copy sub-slice of that
    /// many bytes.
    pub fn read_bytes(&mut self) -> Result<&'a [u8], WireError> {
        let len = self.read_varint()?;
        let len: usize = len
            .try_into()
            .map_err(|_| WireError::LengthExceedsRemaining)?;
        if len > self.remaining().len() {
            return Err(WireError::LengthExceedsRemaining);
        }
        self.take(len)
    }

    /// Reads exactly `n` raw bytes with no length prefix of their own — used
    /// by the format-string unpacker's `c` verb, where the length comes from
    /// an explicit argument rather than the wire.
    pub fn read_raw(&mut self, n: usize) -> Result<&'a [u8], WireError> {
        self.take(n)
    }

    /// Total length of the buffer this reader was constructed over,
    /// regardless of how much has been consumed.
    pub fn total_len(&self) -> usize {
        self.buf.len()
    }

    /// Moves the cursor to an absolute offset from the start of the buffer
    /// — used by the format-string unpacker's `*`/`+`/`-` seek verbs.
    pub fn seek(&mut self, pos: usize) -> Result<(), WireError> {
        if pos > self.buf.len() {
            return Err(WireError::LengthExceedsRemaining);
        }
        self.pos = pos;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_round_trip() {
        let bytes = [0x04, 0x03, 0x02, 0x01, 0x88, 0x77, 0x66, 0x55, 0x44, 0x33, 0x22, 0x11];
        let mut r = Reader::new(&bytes);
        assert_eq!(r.read_fixed32().unwrap(), 0x0102_0304);
        assert_eq!(r.read_fixed64().unwrap(), 0x1122_3344_5566_7788);
    }

    #[test]
    fn length_exceeding_remaining_fails() {
        let bytes = [0x05, b'h', b'i']; // declares 5 bytes, only 2 follow
        let mut r = Reader::new(&bytes);
        assert_eq!(r.read_bytes(), Err(WireError::LengthExceedsRemaining));
    }

    #[test]
    fn empty_bytes_field_reads_empty_slice() {
        let bytes = [0x00];
        let mut r = Reader::new(&bytes);
        assert_eq!(r.read_bytes().unwrap(), b"");
        assert!(r.is_empty());
    }
}
