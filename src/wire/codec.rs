//! Tag encoding, wiretype dispatch, and the group/skip logic that sits on
//! top of the raw [`Reader`](super::slice::Reader)/[`Writer`](super::buffer::Writer)
//! primitives.

use super::buffer::Writer;
use super::slice::Reader;
use super::WireError;

/// The 3-bit wiretype discriminator packed into every protobuf field key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireType {
    Varint = 0,
    SixtyFourBit = 1,
    LengthDelimited = 2,
    StartGroup = 3,
    EndGroup = 4,
    ThirtyTwoBit = 5,
}

impl WireType {
    fn from_raw(value: u32) -> Result<Self, WireError> {
        match value {
            0 => Ok(WireType::Varint),
            1 => Ok(WireType::SixtyFourBit),
            2 => Ok(WireType::LengthDelimited),
            3 => Ok(WireType::StartGroup),
            4 => Ok(WireType::EndGroup),
            5 => Ok(WireType::ThirtyTwoBit),
            _ => Err(WireError::MalformedVarint),
        }
    }
}

/// A key read off the wire: the field number plus its wiretype.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tag {
    pub field: u32,
    pub wire_type: WireType,
}

impl<'a> Reader<'a> {
    pub fn read_tag(&mut self) -> Result<Tag, WireError> {
        let key = self.read_varint32()?;
        let wire_type = WireType::from_raw(key & 0x7)?;
        Ok(Tag {
            field: key >> 3,
            wire_type,
        })
    }

    /// Reads the body of a group started by `field`: scans forward, honoring
    /// nested groups, until the matching `EndGroup` tag for the same field,
    /// and returns the body as an opaque zero-copy slice (the tag bytes of
    /// the terminating `EndGroup` are consumed but not included in the
    /// returned slice).
    pub fn read_group(&mut self, field: u32) -> Result<&'a [u8], WireError> {
        let start = self.offset();
        let mut depth = 1usize;
        loop {
            if self.is_empty() {
                return Err(WireError::UnmatchedGroup);
            }
            let before_tag = self.offset();
            let tag = self.read_tag()?;
            match tag.wire_type {
                WireType::StartGroup => depth += 1,
                WireType::EndGroup => {
                    depth -= 1;
                    if depth == 0 {
                        if tag.field != field {
                            return Err(WireError::UnmatchedGroup);
                        }
                        return Ok(&self.buf()[start..before_tag]);
                    }
                }
                other => self.skip_value(other)?,
            }
        }
    }

    /// Advances past one value of the given wiretype without interpreting
    /// it. Used by the typed decoder to discard fields not present in the
    /// schema, and internally to skip over nested values while locating the
    /// end of a group.
    pub fn skip_value(&mut self, wire_type: WireType) -> Result<(), WireError> {
        match wire_type {
            WireType::Varint => {
                self.read_varint()?;
            }
            WireType::SixtyFourBit => {
                self.read_fixed64()?;
            }
            WireType::LengthDelimited => {
                self.read_bytes()?;
            }
            WireType::StartGroup => {
                self.skip_group()?;
            }
            WireType::EndGroup => return Err(WireError::UnmatchedGroup),
            WireType::ThirtyTwoBit => {
                self.read_fixed32()?;
            }
        }
        Ok(())
    }

    /// Skips an already-opened group without caring which field number
    /// terminates it — the caller only wants to discard the bytes.
    fn skip_group(&mut self) -> Result<(), WireError> {
        let mut depth = 1usize;
        loop {
            if self.is_empty() {
                return Err(WireError::UnmatchedGroup);
            }
            let tag = self.read_tag()?;
            match tag.wire_type {
                WireType::StartGroup => depth += 1,
                WireType::EndGroup => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                other => self.skip_value(other)?,
            }
        }
    }
}

impl Writer {
    pub fn write_tag(&mut self, field: u32, wire_type: WireType) {
        let key = (field << 3) | wire_type as u32;
        self.write_varint(key as u64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_field_is_tag_then_zero_len() {
        let mut w = Writer::new();
        w.write_tag(2, WireType::LengthDelimited);
        w.write_bytes(b"");
        assert_eq!(w.into_vec(), vec![0x12, 0x00]);
    }

    #[test]
    fn submessage_length_prefix_insertion() {
        let mut w = Writer::new();
        w.write_tag(1, WireType::LengthDelimited);
        let mark = w.mark();
        w.write_tag(1, WireType::Varint);
        w.write_varint(150);
        w.insert_length_prefix(mark);
        // Scenario: Outer{inner: Inner{v: 150}} => 0A 03 08 96 01
        assert_eq!(w.into_vec(), vec![0x0A, 0x03, 0x08, 0x96, 0x01]);
    }

    #[test]
    fn unknown_top_level_tag_is_skippable() {
        let mut w = Writer::new();
        w.write_tag(99, WireType::Varint);
        w.write_varint(7);
        w.write_tag(1, WireType::Varint);
        w.write_varint(42);
        let bytes = w.into_vec();

        let mut r = Reader::new(&bytes);
        let tag = r.read_tag().unwrap();
        assert_eq!(tag.field, 99);
        r.skip_value(tag.wire_type).unwrap();
        let tag = r.read_tag().unwrap();
        assert_eq!(tag.field, 1);
        assert_eq!(r.read_varint().unwrap(), 42);
    }

    #[test]
    fn group_skip_honors_nesting() {
        let mut w = Writer::new();
        w.write_tag(3, WireType::StartGroup);
        w.write_tag(5, WireType::StartGroup);
        w.write_tag(1, WireType::Varint);
        w.write_varint(7);
        w.write_tag(5, WireType::EndGroup);
        w.write_tag(3, WireType::EndGroup);
        w.write_tag(9, WireType::Varint);
        w.write_varint(42);
        let bytes = w.into_vec();

        let mut r = Reader::new(&bytes);
        let tag = r.read_tag().unwrap();
        assert_eq!(tag.wire_type, WireType::StartGroup);
        let body = r.read_group(3).unwrap();
        assert!(!body.is_empty());
        let tag = r.read_tag().unwrap();
        assert_eq!(tag.field, 9);
        assert_eq!(r.read_varint().unwrap(), 42);
    }

    #[test]
    fn mismatched_end_group_field_fails() {
        let mut w = Writer::new();
        w.write_tag(3, WireType::StartGroup);
        w.write_tag(4, WireType::EndGroup); // wrong field number
        let bytes = w.into_vec();

        let mut r = Reader::new(&bytes);
        r.read_tag().unwrap();
        assert_eq!(r.read_group(3), Err(WireError::UnmatchedGroup));
    }
}
