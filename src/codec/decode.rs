//! The typed decoder (C9): walks wire bytes against a [`MessageDescriptor`],
//! driving a [`ValueSink`]. Grounded on the teacher's `Value::merge_field`
//! match arms (`dynamic/message.rs`), generalized from a fixed
//! `FieldDescriptorKind` carried by a derived `Message` impl to a
//! schema-driven walk keyed by the resolved [`Kind`], and on the pseudocode
//! of the distilled spec's §4.8.

use crate::registry::{FieldDescriptor, Kind, MessageDescriptor};
use crate::value::{MapKey, Value, ValueSink};
use crate::wire::{
    decode_double, decode_float, decode_sint32, decode_sint64, Reader, WireError, WireType,
};

use super::error::DecodeError;
use super::options::DecodeOptions;

/// Decodes `bytes` against `ty`, driving `sink`, using the default
/// [`DecodeOptions`].
pub fn decode(ty: &MessageDescriptor, bytes: &[u8], sink: &mut dyn ValueSink) -> Result<(), DecodeError> {
    decode_with_options(ty, bytes, sink, &DecodeOptions::default())
}

pub fn decode_with_options(
    ty: &MessageDescriptor,
    bytes: &[u8],
    sink: &mut dyn ValueSink,
    opts: &DecodeOptions,
) -> Result<(), DecodeError> {
    let mut reader = Reader::new(bytes);
    decode_message(ty, &mut reader, sink, opts, 0, 0)
}

fn decode_message(
    ty: &MessageDescriptor,
    reader: &mut Reader,
    sink: &mut dyn ValueSink,
    opts: &DecodeOptions,
    depth: usize,
    base_offset: usize,
) -> Result<(), DecodeError> {
    if depth > opts.max_depth {
        return Err(DecodeError::recursion_limit());
    }
    #[cfg(feature = "tracing")]
    tracing::trace!(message = ty.full_name(), depth, "decoding message");

    while !reader.is_empty() {
        let tag = reader
            .read_tag()
            .map_err(|e| wire_err(reader, base_offset, None, e))?;

        let Some(field) = ty.get_field_by_tag(tag.field) else {
            reader
                .skip_value(tag.wire_type)
                .map_err(|e| wire_err(reader, base_offset, None, e))?;
            continue;
        };

        if let Some(map_entry) = field.kind().as_message().filter(|m| m.is_map_entry()) {
            let body = reader
                .read_bytes()
                .map_err(|e| wire_err(reader, base_offset, Some(field.name()), e))?;
            let body_offset = base_offset + reader.offset() - body.len();
            decode_map_entry(&field, map_entry, body, body_offset, sink, opts, depth)?;
            continue;
        }

        if field.is_repeated() {
            let element_wire_type = field.kind().wire_type();
            if field.is_packed()
                && tag.wire_type == WireType::LengthDelimited
                && element_wire_type != WireType::LengthDelimited
            {
                let body = reader
                    .read_bytes()
                    .map_err(|e| wire_err(reader, base_offset, Some(field.name()), e))?;
                let body_offset = base_offset + reader.offset() - body.len();
                let mut inner = Reader::new(body);
                while !inner.is_empty() {
                    let value = decode_scalar(&field, element_wire_type, &mut inner, body_offset)?;
                    sink.append_to(field.name(), value);
                }
            } else {
                decode_one(&field, tag.wire_type, reader, sink, opts, depth, base_offset, true)?;
            }
            continue;
        }

        decode_one(&field, tag.wire_type, reader, sink, opts, depth, base_offset, false)?;
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn decode_one(
    field: &FieldDescriptor,
    wire_type: WireType,
    reader: &mut Reader,
    sink: &mut dyn ValueSink,
    opts: &DecodeOptions,
    depth: usize,
    base_offset: usize,
    repeated: bool,
) -> Result<(), DecodeError> {
    let kind = field.kind();

    if let Some(message_ty) = kind.as_message() {
        check_wire_type(field, WireType::LengthDelimited, wire_type, reader, base_offset)?;
        let body = reader
            .read_bytes()
            .map_err(|e| wire_err(reader, base_offset, Some(field.name()), e))?;
        let body_offset = base_offset + reader.offset() - body.len();
        let mut child = if repeated {
            sink.enter_repeated_message(field.name())
        } else {
            sink.enter_message(field.name())
        };
        let mut inner = Reader::new(body);
        return decode_message(message_ty, &mut inner, &mut *child, opts, depth + 1, body_offset);
    }

    if let Some(enum_ty) = kind.as_enum() {
        check_wire_type(field, WireType::Varint, wire_type, reader, base_offset)?;
        let number = reader
            .read_varint()
            .map_err(|e| wire_err(reader, base_offset, Some(field.name()), e))? as i32;
        // `get_value_by_number` hands back an owned EnumValueDescriptor, so
        // its name is borrowed and consumed within this same match arm
        // rather than threaded out through a `let` binding.
        return match enum_ty.get_value_by_number(number) {
            Some(v) if !opts.enum_as_value => {
                emit(sink, field.name(), Value::EnumName(v.name()), repeated)
            }
            _ => emit(sink, field.name(), Value::EnumNumber(number), repeated),
        };
    }

    check_wire_type(field, kind.wire_type(), wire_type, reader, base_offset)?;
    let value = decode_scalar(field, wire_type, reader, base_offset)?;
    emit(sink, field.name(), value, repeated)
}

fn emit(sink: &mut dyn ValueSink, field: &str, value: Value<'_>, repeated: bool) -> Result<(), DecodeError> {
    if repeated {
        sink.append_to(field, value);
    } else {
        sink.set_field(field, value);
    }
    Ok(())
}

fn check_wire_type(
    field: &FieldDescriptor,
    expected: WireType,
    got: WireType,
    reader: &Reader,
    base_offset: usize,
) -> Result<(), DecodeError> {
    if expected == got {
        Ok(())
    } else {
        Err(DecodeError::wiretype_mismatch(
            field.name(),
            base_offset + reader.offset(),
            expected,
            got,
        ))
    }
}

/// Decodes one scalar payload (not message, not enum) of `field`'s kind —
/// the caller has already validated the wiretype (or, for a packed element,
/// knows it from `field.kind().wire_type()`).
fn decode_scalar<'a>(
    field: &FieldDescriptor,
    wire_type: WireType,
    reader: &mut Reader<'a>,
    base_offset: usize,
) -> Result<Value<'a>, DecodeError> {
    decode_scalar_kind(&field.kind(), Some(field.name()), wire_type, reader, base_offset)
}

fn decode_scalar_kind<'a>(
    kind: &Kind,
    field_name: Option<&str>,
    _wire_type: WireType,
    reader: &mut Reader<'a>,
    base_offset: usize,
) -> Result<Value<'a>, DecodeError> {
    let map_err = |reader: &Reader, e: WireError| wire_err(reader, base_offset, field_name, e);
    Ok(match kind {
        Kind::Bool => Value::Bool(reader.read_varint().map_err(|e| map_err(reader, e))? != 0),
        Kind::Int32 => Value::I32(reader.read_varint().map_err(|e| map_err(reader, e))? as i32),
        Kind::Int64 => Value::I64(reader.read_varint().map_err(|e| map_err(reader, e))? as i64),
        Kind::Uint32 => Value::U32(reader.read_varint().map_err(|e| map_err(reader, e))? as u32),
        Kind::Uint64 => Value::U64(reader.read_varint().map_err(|e| map_err(reader, e))?),
        Kind::Sint32 => {
            Value::I32(decode_sint32(reader.read_varint().map_err(|e| map_err(reader, e))? as u32))
        }
        Kind::Sint64 => Value::I64(decode_sint64(reader.read_varint().map_err(|e| map_err(reader, e))?)),
        Kind::Fixed32 => Value::U32(reader.read_fixed32().map_err(|e| map_err(reader, e))?),
        Kind::Fixed64 => Value::U64(reader.read_fixed64().map_err(|e| map_err(reader, e))?),
        Kind::Sfixed32 => Value::I32(reader.read_fixed32().map_err(|e| map_err(reader, e))? as i32),
        Kind::Sfixed64 => Value::I64(reader.read_fixed64().map_err(|e| map_err(reader, e))? as i64),
        Kind::Float => Value::F32(decode_float(reader.read_fixed32().map_err(|e| map_err(reader, e))?)),
        Kind::Double => Value::F64(decode_double(reader.read_fixed64().map_err(|e| map_err(reader, e))?)),
        Kind::String => {
            let bytes = reader.read_bytes().map_err(|e| map_err(reader, e))?;
            let s = std::str::from_utf8(bytes)
                .map_err(|_| wire_err(reader, base_offset, field_name, WireError::MalformedVarint))?;
            Value::String(s)
        }
        Kind::Bytes => Value::Bytes(reader.read_bytes().map_err(|e| map_err(reader, e))?),
        Kind::Message(_) | Kind::Enum(_) => {
            unreachable!("message/enum kinds are handled by decode_one before reaching decode_scalar")
        }
    })
}

fn decode_map_key<'a>(
    kind: &Kind,
    field_name: &str,
    wire_type: WireType,
    reader: &mut Reader<'a>,
    base_offset: usize,
) -> Result<MapKey<'a>, DecodeError> {
    if kind.wire_type() != wire_type {
        return Err(DecodeError::wiretype_mismatch(
            field_name,
            base_offset + reader.offset(),
            kind.wire_type(),
            wire_type,
        ));
    }
    Ok(match decode_scalar_kind(kind, Some(field_name), wire_type, reader, base_offset)? {
        Value::Bool(v) => MapKey::Bool(v),
        Value::I32(v) => MapKey::I32(v),
        Value::I64(v) => MapKey::I64(v),
        Value::U32(v) => MapKey::U32(v),
        Value::U64(v) => MapKey::U64(v),
        Value::String(v) => MapKey::String(v),
        other => unreachable!("{other:?} is not a valid map key kind"),
    })
}

fn default_value_for_kind<'a>(kind: &Kind) -> Value<'a> {
    match kind {
        Kind::Bool => Value::Bool(false),
        Kind::Int32 | Kind::Sint32 | Kind::Sfixed32 => Value::I32(0),
        Kind::Int64 | Kind::Sint64 | Kind::Sfixed64 => Value::I64(0),
        Kind::Uint32 | Kind::Fixed32 => Value::U32(0),
        Kind::Uint64 | Kind::Fixed64 => Value::U64(0),
        Kind::Float => Value::F32(0.0),
        Kind::Double => Value::F64(0.0),
        Kind::String => Value::String(""),
        Kind::Bytes => Value::Bytes(&[]),
        Kind::Enum(_) => Value::EnumNumber(0),
        Kind::Message(_) => unreachable!("map values never default to a bare message Value"),
    }
}

/// A `map<K, V>` entry (§4.7/§8 S6): decodes both orderings of key (tag 1)
/// and value (tag 2) within the entry's bytes, matching either order.
fn decode_map_entry(
    field: &FieldDescriptor,
    entry_ty: &MessageDescriptor,
    body: &[u8],
    body_offset: usize,
    sink: &mut dyn ValueSink,
    opts: &DecodeOptions,
    depth: usize,
) -> Result<(), DecodeError> {
    let key_field = entry_ty.get_field_by_tag(1).expect("map entry has a key field");
    let value_field = entry_ty.get_field_by_tag(2).expect("map entry has a value field");
    let value_kind = value_field.kind();

    let mut reader = Reader::new(body);
    let mut key: Option<MapKey> = None;
    let mut scalar_value: Option<Value> = None;
    let mut message_value: Option<(&[u8], usize)> = None;

    while !reader.is_empty() {
        let tag = reader
            .read_tag()
            .map_err(|e| wire_err(&reader, body_offset, Some(field.name()), e))?;
        match tag.field {
            1 => {
                key = Some(decode_map_key(
                    &key_field.kind(),
                    key_field.name(),
                    tag.wire_type,
                    &mut reader,
                    body_offset,
                )?);
            }
            2 if value_kind.is_message() => {
                let inner_body = reader
                    .read_bytes()
                    .map_err(|e| wire_err(&reader, body_offset, Some(field.name()), e))?;
                let inner_offset = body_offset + reader.offset() - inner_body.len();
                message_value = Some((inner_body, inner_offset));
            }
            2 => {
                scalar_value = Some(decode_scalar_kind(
                    &value_kind,
                    Some(value_field.name()),
                    tag.wire_type,
                    &mut reader,
                    body_offset,
                )?);
            }
            _ => reader
                .skip_value(tag.wire_type)
                .map_err(|e| wire_err(&reader, body_offset, Some(field.name()), e))?,
        }
    }

    let key = key.unwrap_or_else(|| match decode_scalar_kind_default(&key_field.kind()) {
        Value::Bool(v) => MapKey::Bool(v),
        Value::I32(v) => MapKey::I32(v),
        Value::I64(v) => MapKey::I64(v),
        Value::U32(v) => MapKey::U32(v),
        Value::U64(v) => MapKey::U64(v),
        Value::String(v) => MapKey::String(v),
        _ => unreachable!(),
    });

    if let Some((inner_body, inner_offset)) = message_value {
        let mut child = sink.enter_map_message(field.name(), key);
        let mut inner = Reader::new(inner_body);
        let message_ty = value_kind.as_message().expect("checked above");
        decode_message(message_ty, &mut inner, &mut *child, opts, depth + 1, inner_offset)
    } else {
        let value = scalar_value.unwrap_or_else(|| default_value_for_kind(&value_kind));
        sink.set_map(field.name(), key, value);
        Ok(())
    }
}

fn decode_scalar_kind_default(kind: &Kind) -> Value<'static> {
    default_value_for_kind(kind)
}

fn wire_err(reader: &Reader, base_offset: usize, field: Option<&str>, err: WireError) -> DecodeError {
    DecodeError::wire(field, base_offset + reader.offset(), err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::DescriptorPool;
    use crate::wire::Writer;
    use std::cell::RefCell;
    use std::collections::BTreeMap;

    fn tag_len(field: u32, body: &[u8], out: &mut Vec<u8>) {
        let mut w = Writer::new();
        w.write_tag(field, WireType::LengthDelimited);
        w.write_bytes(body);
        out.extend_from_slice(w.as_slice());
    }

    fn tag_varint(field: u32, value: u64, out: &mut Vec<u8>) {
        let mut w = Writer::new();
        w.write_tag(field, WireType::Varint);
        w.write_varint(value);
        out.extend_from_slice(w.as_slice());
    }

    fn int32_field_pool() -> (DescriptorPool, MessageDescriptor) {
        let mut field = Vec::new();
        tag_len(1, b"field1", &mut field);
        tag_varint(3, 1, &mut field);
        tag_varint(5, 5, &mut field); // TYPE_INT32

        let mut message = Vec::new();
        tag_len(1, b"Msg", &mut message);
        tag_len(2, &field, &mut message);

        let mut file = Vec::new();
        tag_len(2, b"pkg", &mut file);
        tag_len(4, &message, &mut file);

        let mut set = Vec::new();
        tag_len(1, &file, &mut set);

        let mut pool = DescriptorPool::new();
        pool.add_file_descriptor_set(&set).unwrap();
        let ty = pool.get_message_by_name("pkg.Msg").unwrap();
        (pool, ty)
    }

    #[derive(Default)]
    struct RecordingSink {
        fields: BTreeMap<String, i64>,
    }

    impl ValueSink for RecordingSink {
        fn set_field(&mut self, field: &str, value: Value<'_>) {
            if let Value::I32(v) = value {
                self.fields.insert(field.to_string(), v as i64);
            }
        }
        fn append_to(&mut self, _: &str, _: Value<'_>) {}
        fn set_map(&mut self, _: &str, _: MapKey<'_>, _: Value<'_>) {}
        fn enter_message(&mut self, _: &str) -> Box<dyn ValueSink + '_> {
            Box::new(RecordingSink::default())
        }
        fn enter_repeated_message(&mut self, _: &str) -> Box<dyn ValueSink + '_> {
            Box::new(RecordingSink::default())
        }
        fn enter_map_message(&mut self, _: &str, _: MapKey<'_>) -> Box<dyn ValueSink + '_> {
            Box::new(RecordingSink::default())
        }
    }

    #[test]
    fn s1_decodes_singular_int32() {
        let (_pool, ty) = int32_field_pool();
        let bytes = vec![0x08, 0x96, 0x01];
        let mut sink = RecordingSink::default();
        decode(&ty, &bytes, &mut sink).unwrap();
        assert_eq!(sink.fields.get("field1"), Some(&150));
    }

    #[test]
    fn unknown_field_is_skipped_and_known_one_still_decodes() {
        let (_pool, ty) = int32_field_pool();
        let mut bytes = Vec::new();
        tag_varint(99, 7, &mut bytes); // not in the schema
        tag_varint(1, 42, &mut bytes); // field1 (wire tag 1)
        let mut sink = RecordingSink::default();
        decode(&ty, &bytes, &mut sink).unwrap();
        assert_eq!(sink.fields.get("field1"), Some(&42));
    }

    #[test]
    fn wiretype_mismatch_is_an_error() {
        let (_pool, ty) = int32_field_pool();
        let mut bytes = Vec::new();
        // field1 (tag 1) emitted as a fixed64 instead of varint.
        let mut w = Writer::new();
        w.write_tag(1, WireType::SixtyFourBit);
        w.write_fixed64(5);
        bytes.extend_from_slice(w.as_slice());
        let mut sink = RecordingSink::default();
        assert!(decode(&ty, &bytes, &mut sink).is_err());
    }
}
