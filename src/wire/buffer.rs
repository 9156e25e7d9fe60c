//! The owned, growable byte buffer that protobuf values are appended to.

use super::write_varint;

/// A growable, owned byte buffer. Mid-buffer insertion (for retrofitting a
/// submessage's length prefix once its body is known) is done with
/// [`Writer::insert_length_prefix`].
#[derive(Debug, Clone, Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    pub fn new() -> Self {
        Writer { buf: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Writer {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.buf
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub(super) fn buf_mut(&mut self) -> &mut Vec<u8> {
        &mut self.buf
    }

    pub fn write_varint(&mut self, value: u64) {
        write_varint(value, &mut self.buf);
    }

    pub fn write_fixed32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_fixed64(&mut self, value: u64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Writes a varint length prefix followed by the raw bytes.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.write_varint(bytes.len() as u64);
        self.buf.extend_from_slice(bytes);
    }

    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Records the current end of the buffer, to be passed to
    /// [`Writer::insert_length_prefix`] once the submessage body that
    /// follows has been written.
    pub fn mark(&self) -> usize {
        self.buf.len()
    }

    /// Computes `body_len = self.len() - mark`, then inserts a canonical
    /// varint of that length at `mark`, shifting the body forward. This is
    /// the one hot spot where a growable buffer needs mid-buffer insertion
    /// rather than a simple append — used whenever a submessage or packed
    /// field's encoded length isn't known until its body has been written.
    pub fn insert_length_prefix(&mut self, mark: usize) {
        let body_len = self.buf.len() - mark;
        let mut len_bytes = Vec::with_capacity(10);
        write_varint(body_len as u64, &mut len_bytes);
        self.buf.splice(mark..mark, len_bytes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_round_trip() {
        let mut w = Writer::new();
        w.write_fixed32(0x0102_0304);
        w.write_fixed64(0x1122_3344_5566_7788);
        assert_eq!(
            w.into_vec(),
            vec![0x04, 0x03, 0x02, 0x01, 0x88, 0x77, 0x66, 0x55, 0x44, 0x33, 0x22, 0x11]
        );
    }

    #[test]
    fn length_delimited_bytes() {
        let mut w = Writer::new();
        w.write_bytes(b"testing");
        assert_eq!(w.into_vec(), b"\x07testing");
    }

    #[test]
    fn mid_buffer_length_prefix_insertion() {
        let mut w = Writer::new();
        let mark = w.mark();
        w.write_varint(150);
        w.insert_length_prefix(mark);
        // A single-byte varint tag (150 -> 2 bytes) prefixed by its own length.
        assert_eq!(w.into_vec(), vec![0x02, 0x96, 0x01]);
    }
}
