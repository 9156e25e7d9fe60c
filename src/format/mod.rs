//! The format-string pack/unpack DSL (C10): a single-character scripting
//! language over the same [`wire`](crate::wire) primitives the typed
//! codec uses, for hosts that want to build or inspect wire bytes by hand
//! instead of through a schema. Grounded on `lua-protobuf`'s
//! `pbL_packdata`/`pbL_unpackdata` (`examples/original_source/lpb.c`),
//! generalized from driving a Lua stack to driving a plain `&[PackValue]`
//! argument slice and `Vec<PackValue>` result vector.

mod error;

use error::{argument_type_mismatch, level_limit_exceeded, missing_argument, seek_out_of_range, unbalanced_group};
pub use error::FormatError;

use crate::wire::{
    decode_double, decode_float, decode_sint32, decode_sint64, encode_double, encode_float,
    encode_sint32, encode_sint64, expand_sign32, Reader, Writer,
};

/// The recursion/nesting limit shared by `pack` and `unpack`'s `(`/`)`
/// group verbs (§4.9: "Level limit 100").
const MAX_LEVEL: usize = 100;

/// One argument to [`pack`], or one value yielded by [`unpack`].
#[derive(Debug, Clone, PartialEq)]
pub enum PackValue {
    Bool(bool),
    I32(i32),
    I64(i64),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Bytes(Vec<u8>),
    /// A plain, non-negative integer — used for `c`'s length argument, `#`'s
    /// length value, the `*`/`+`/`-` seek targets, and `@`'s reported
    /// offset.
    UInt(u64),
}

impl PackValue {
    fn as_u64(&self) -> Option<u64> {
        match self {
            PackValue::UInt(v) => Some(*v),
            PackValue::U64(v) => Some(*v),
            PackValue::U32(v) => Some(u64::from(*v)),
            PackValue::I64(v) => u64::try_from(*v).ok(),
            PackValue::I32(v) => u64::try_from(*v).ok(),
            _ => None,
        }
    }

    fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            PackValue::Bytes(b) => Some(b),
            _ => None,
        }
    }
}

/// A cursor over the argument slice [`pack`] consumes left to right, one
/// value per format verb (two for `c`: its length, then its bytes).
struct Args<'a> {
    values: &'a [PackValue],
    pos: usize,
}

impl<'a> Args<'a> {
    fn new(values: &'a [PackValue]) -> Self {
        Args { values, pos: 0 }
    }

    fn next(&mut self) -> Result<&'a PackValue, FormatError> {
        let value = self.values.get(self.pos).ok_or_else(missing_argument)?;
        self.pos += 1;
        Ok(value)
    }
}

/// Packs `args` according to `fmt`, returning the encoded bytes.
///
/// Each character in `fmt` consumes arguments and appends to the output
/// buffer per §4.9's table. `(`/`)` open and close a nested
/// length-delimited group, recording the buffer position at `(` and
/// inserting the minimal varint length prefix there at the matching `)`.
pub fn pack(fmt: &str, args: &[PackValue]) -> Result<Vec<u8>, FormatError> {
    let mut writer = Writer::new();
    let mut args = Args::new(args);
    let mut marks: Vec<usize> = Vec::new();

    for ch in fmt.chars() {
        match ch {
            'v' => writer.write_varint(expect_u64(args.next()?)?),
            'd' => writer.write_fixed32(expect_u32(args.next()?)?),
            'q' => writer.write_fixed64(expect_u64(args.next()?)?),
            's' => writer.write_bytes(expect_bytes(args.next()?)?),
            'c' => {
                let len = expect_u64(args.next()?)? as usize;
                let bytes = expect_bytes(args.next()?)?;
                if bytes.len() != len {
                    return Err(FormatError::length_mismatch(len, bytes.len()));
                }
                writer.write_raw(bytes);
            }
            'b' => writer.write_varint(expect_bool(args.next()?)? as u64),
            'f' => writer.write_fixed32(encode_float(expect_f32(args.next()?)?)),
            'F' => writer.write_fixed64(encode_double(expect_f64(args.next()?)?)),
            'i' => writer.write_varint(expand_sign32(expect_i32(args.next()?)?)),
            'j' => writer.write_varint(u64::from(encode_sint32(expect_i32(args.next()?)?))),
            'u' => writer.write_varint(u64::from(expect_u32(args.next()?)?)),
            'x' => writer.write_fixed32(expect_u32(args.next()?)?),
            'y' => writer.write_fixed32(expect_i32(args.next()?)? as u32),
            'I' => writer.write_varint(expect_i64(args.next()?)? as u64),
            'J' => writer.write_varint(encode_sint64(expect_i64(args.next()?)?)),
            'U' => writer.write_varint(expect_u64(args.next()?)?),
            'X' => writer.write_fixed64(expect_u64(args.next()?)?),
            'Y' => writer.write_fixed64(expect_i64(args.next()?)? as u64),
            '(' => {
                if marks.len() >= MAX_LEVEL {
                    return Err(level_limit_exceeded());
                }
                marks.push(writer.mark());
            }
            ')' => {
                let mark = marks.pop().ok_or_else(unbalanced_group)?;
                writer.insert_length_prefix(mark);
            }
            '#' => {
                let len = expect_u64(args.next()?)?;
                writer.write_varint(len);
            }
            other => return Err(FormatError::invalid_spec(other)),
        }
    }

    if !marks.is_empty() {
        return Err(unbalanced_group());
    }
    Ok(writer.into_vec())
}

/// Unpacks `bytes` according to `fmt`, returning one [`PackValue`] per
/// format verb (`c` also consumes one argument from `args`, its length;
/// `*`/`+`/`-` consume one argument, the seek target, and produce no
/// output).
pub fn unpack<'a>(fmt: &str, bytes: &'a [u8], args: &[PackValue]) -> Result<Vec<PackValue>, FormatError> {
    let mut reader = Reader::new(bytes);
    let mut stack: Vec<Reader<'a>> = Vec::new();
    let mut args = Args::new(args);
    let mut out = Vec::new();

    for ch in fmt.chars() {
        match ch {
            'v' => out.push(PackValue::U64(reader.read_varint()?)),
            'd' => out.push(PackValue::U32(reader.read_fixed32()?)),
            'q' => out.push(PackValue::U64(reader.read_fixed64()?)),
            's' => out.push(PackValue::Bytes(reader.read_bytes()?.to_vec())),
            'c' => {
                let len = expect_u64(args.next()?)? as usize;
                out.push(PackValue::Bytes(reader.read_raw(len)?.to_vec()));
            }
            'b' => out.push(PackValue::Bool(reader.read_varint()? != 0)),
            'f' => out.push(PackValue::F32(decode_float(reader.read_fixed32()?))),
            'F' => out.push(PackValue::F64(decode_double(reader.read_fixed64()?))),
            'i' => out.push(PackValue::I32(reader.read_varint()? as i32)),
            'j' => out.push(PackValue::I32(decode_sint32(reader.read_varint()? as u32))),
            'u' => out.push(PackValue::U32(reader.read_varint32()?)),
            'x' => out.push(PackValue::U32(reader.read_fixed32()?)),
            'y' => out.push(PackValue::I32(reader.read_fixed32()? as i32)),
            'I' => out.push(PackValue::I64(reader.read_varint()? as i64)),
            'J' => out.push(PackValue::I64(decode_sint64(reader.read_varint()?))),
            'U' => out.push(PackValue::U64(reader.read_varint()?)),
            'X' => out.push(PackValue::U64(reader.read_fixed64()?)),
            'Y' => out.push(PackValue::I64(reader.read_fixed64()? as i64)),
            '(' => {
                if stack.len() >= MAX_LEVEL {
                    return Err(level_limit_exceeded());
                }
                let body = reader.read_bytes()?;
                stack.push(reader);
                reader = Reader::new(body);
            }
            ')' => {
                reader = stack.pop().ok_or_else(unbalanced_group)?;
            }
            '#' => return Err(FormatError::invalid_spec('#')),
            '@' => out.push(PackValue::UInt(reader.offset() as u64)),
            '*' => {
                let pos = expect_u64(args.next()?)? as usize;
                reader.seek(pos)?;
            }
            '+' => {
                let delta = expect_u64(args.next()?)? as usize;
                reader.seek(reader.offset() + delta)?;
            }
            '-' => {
                let delta = expect_u64(args.next()?)? as usize;
                let pos = reader.offset().checked_sub(delta).ok_or_else(seek_out_of_range)?;
                reader.seek(pos)?;
            }
            other => return Err(FormatError::invalid_spec(other)),
        }
    }

    if !stack.is_empty() {
        return Err(unbalanced_group());
    }
    Ok(out)
}

fn expect_u64(v: &PackValue) -> Result<u64, FormatError> {
    v.as_u64().ok_or_else(argument_type_mismatch)
}

fn expect_u32(v: &PackValue) -> Result<u32, FormatError> {
    expect_u64(v)?.try_into().map_err(|_| argument_type_mismatch())
}

fn expect_i32(v: &PackValue) -> Result<i32, FormatError> {
    match v {
        PackValue::I32(n) => Ok(*n),
        _ => expect_u64(v)?.try_into().map_err(|_| argument_type_mismatch()),
    }
}

fn expect_i64(v: &PackValue) -> Result<i64, FormatError> {
    match v {
        PackValue::I64(n) => Ok(*n),
        PackValue::I32(n) => Ok(i64::from(*n)),
        _ => expect_u64(v)?.try_into().map_err(|_| argument_type_mismatch()),
    }
}

fn expect_f32(v: &PackValue) -> Result<f32, FormatError> {
    match v {
        PackValue::F32(n) => Ok(*n),
        _ => Err(argument_type_mismatch()),
    }
}

fn expect_f64(v: &PackValue) -> Result<f64, FormatError> {
    match v {
        PackValue::F64(n) => Ok(*n),
        _ => Err(argument_type_mismatch()),
    }
}

fn expect_bool(v: &PackValue) -> Result<bool, FormatError> {
    match v {
        PackValue::Bool(b) => Ok(*b),
        _ => Err(argument_type_mismatch()),
    }
}

fn expect_bytes(v: &PackValue) -> Result<&[u8], FormatError> {
    v.as_bytes().ok_or_else(argument_type_mismatch)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn varint_round_trips() {
        let bytes = pack("v", &[PackValue::UInt(150)]).unwrap();
        assert_eq!(bytes, vec![0x96, 0x01]);
        let values = unpack("v", &bytes, &[]).unwrap();
        assert_eq!(values, vec![PackValue::U64(150)]);
    }

    #[test]
    fn length_delimited_string() {
        let bytes = pack("s", &[PackValue::Bytes(b"testing".to_vec())]).unwrap();
        assert_eq!(bytes, b"\x07testing");
        let values = unpack("s", &bytes, &[]).unwrap();
        assert_eq!(values, vec![PackValue::Bytes(b"testing".to_vec())]);
    }

    #[test]
    fn raw_substring_uses_explicit_length() {
        let bytes = pack("c", &[PackValue::UInt(3), PackValue::Bytes(b"abc".to_vec())]).unwrap();
        assert_eq!(bytes, b"abc");
        let values = unpack("c", &bytes, &[PackValue::UInt(3)]).unwrap();
        assert_eq!(values, vec![PackValue::Bytes(b"abc".to_vec())]);
    }

    #[test]
    fn nested_group_gets_length_prefix() {
        let bytes = pack("(v)", &[PackValue::UInt(150)]).unwrap();
        assert_eq!(bytes, vec![0x02, 0x96, 0x01]);
        let values = unpack("(v)", &bytes, &[]).unwrap();
        assert_eq!(values, vec![PackValue::U64(150)]);
    }

    #[test]
    fn unbalanced_group_is_an_error() {
        assert!(pack("(v", &[PackValue::UInt(1)]).is_err());
        assert!(pack("v)", &[PackValue::UInt(1)]).is_err());
        assert!(unpack("(v", &[0x02, 0x96, 0x01], &[]).is_err());
        assert!(unpack("v)", &[0x96, 0x01], &[]).is_err());
    }

    #[test]
    fn unpack_resumes_outer_reader_after_closing_group() {
        // A group followed by another verb at the outer level: the '(' must
        // leave the outer reader parked past the group's length-delimited
        // body, not discard it, so ')' can resume reading from where the
        // group started.
        let mut bytes = pack("(v)", &[PackValue::UInt(150)]).unwrap();
        bytes.extend_from_slice(&pack("v", &[PackValue::UInt(7)]).unwrap());
        let values = unpack("(v)v", &bytes, &[]).unwrap();
        assert_eq!(values, vec![PackValue::U64(150), PackValue::U64(7)]);
    }

    #[test]
    fn offset_marker_reports_current_position() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&pack("v", &[PackValue::UInt(1)]).unwrap());
        bytes.extend_from_slice(&pack("v", &[PackValue::UInt(300)]).unwrap());
        let values = unpack("@v@v", &bytes, &[]).unwrap();
        assert_eq!(
            values,
            vec![
                PackValue::UInt(0),
                PackValue::U64(1),
                PackValue::UInt(1),
                PackValue::U64(300),
            ]
        );
    }

    #[test]
    fn seek_moves_the_cursor() {
        let bytes = pack("vv", &[PackValue::UInt(1), PackValue::UInt(300)]).unwrap();
        // Skip the first varint (1 byte), read the second, then seek back
        // to the start and re-read the first.
        let values = unpack("*v*v", &bytes, &[PackValue::UInt(1), PackValue::UInt(0)]).unwrap();
        assert_eq!(values, vec![PackValue::U64(300), PackValue::U64(1)]);
    }

    #[test]
    fn invalid_format_character_is_rejected() {
        assert!(pack("z", &[]).is_err());
        assert!(unpack("z", &[], &[]).is_err());
    }

    #[test]
    fn negative_int32_sign_extends_like_the_typed_codec() {
        let bytes = pack("i", &[PackValue::I32(-1)]).unwrap();
        assert_eq!(bytes.len(), 10);
        let values = unpack("i", &bytes, &[]).unwrap();
        assert_eq!(values, vec![PackValue::I32(-1)]);
    }

    #[test]
    fn sint32_zigzags_like_scenario_s3() {
        let bytes = pack("j", &[PackValue::I32(-2)]).unwrap();
        assert_eq!(bytes, vec![0x03]);
    }
}
