//! The typed encoder (C8): walks a [`MessageDescriptor`] and a
//! [`ValueSource`], emitting canonical protobuf bytes. Grounded on the
//! teacher's `Value::encode_field`/`encoded_len` match arms
//! (`dynamic/message.rs`), generalized from a fixed `prost::Message` arm
//! per `(Value, FieldKind)` pair to a schema-driven walk keyed by the
//! resolved [`Kind`] instead.

use crate::registry::{FieldDescriptor, Kind, MessageDescriptor};
use crate::value::{MapKey, Value, ValueSource};
use crate::wire::{encode_double, encode_float, encode_sint32, encode_sint64, expand_sign32, Writer};

use super::error::EncodeError;
use super::options::EncodeOptions;

/// Encodes `value` against `ty`, using the default [`EncodeOptions`].
pub fn encode(ty: &MessageDescriptor, value: &dyn ValueSource) -> Result<Vec<u8>, EncodeError> {
    encode_with_options(ty, value, &EncodeOptions::default())
}

pub fn encode_with_options(
    ty: &MessageDescriptor,
    value: &dyn ValueSource,
    opts: &EncodeOptions,
) -> Result<Vec<u8>, EncodeError> {
    let mut writer = Writer::new();
    encode_message(ty, value, &mut writer, 0, opts)?;
    Ok(writer.into_vec())
}

fn encode_message(
    ty: &MessageDescriptor,
    value: &dyn ValueSource,
    writer: &mut Writer,
    depth: usize,
    opts: &EncodeOptions,
) -> Result<(), EncodeError> {
    if depth > opts.max_depth {
        return Err(EncodeError::recursion_limit());
    }
    #[cfg(feature = "tracing")]
    tracing::trace!(message = ty.full_name(), depth, "encoding message");

    for field in ty.fields() {
        encode_field(&field, value, writer, depth, opts)?;
    }
    Ok(())
}

fn encode_field(
    field: &FieldDescriptor,
    source: &dyn ValueSource,
    writer: &mut Writer,
    depth: usize,
    opts: &EncodeOptions,
) -> Result<(), EncodeError> {
    let name = field.name();

    if let Some(map_entry) = field.kind().as_message().filter(|m| m.is_map_entry()) {
        for (key, value) in source.get_map(name) {
            encode_map_entry(field, map_entry, key, value, writer, depth, opts)?;
        }
        return Ok(());
    }

    if field.is_repeated() {
        if field.is_packed() && field.kind().is_scalar() {
            let values: Vec<_> = source.get_repeated(name).collect();
            if values.is_empty() {
                return Ok(());
            }
            writer.write_tag(field.number(), crate::wire::WireType::LengthDelimited);
            let mark = writer.mark();
            for value in &values {
                encode_scalar(name, &field.kind(), value, writer)?;
            }
            writer.insert_length_prefix(mark);
        } else {
            for value in source.get_repeated(name) {
                encode_one(field, &value, writer, depth, opts)?;
            }
        }
        return Ok(());
    }

    if let Some(value) = source.get_field(name) {
        encode_one(field, &value, writer, depth, opts)?;
    }
    Ok(())
}

fn encode_one(
    field: &FieldDescriptor,
    value: &Value<'_>,
    writer: &mut Writer,
    depth: usize,
    opts: &EncodeOptions,
) -> Result<(), EncodeError> {
    let kind = field.kind();
    match (&kind, value) {
        (Kind::Message(message_ty), Value::Message(inner)) => {
            writer.write_tag(field.number(), crate::wire::WireType::LengthDelimited);
            let mark = writer.mark();
            encode_message(message_ty, *inner, writer, depth + 1, opts)?;
            writer.insert_length_prefix(mark);
            Ok(())
        }
        (Kind::Enum(enum_ty), Value::EnumName(name)) => {
            let number = enum_ty
                .get_value_by_name(name)
                .ok_or_else(|| EncodeError::unknown_enum_value(field.name(), name))?
                .number();
            writer.write_tag(field.number(), crate::wire::WireType::Varint);
            writer.write_varint(expand_sign32(number));
            Ok(())
        }
        (Kind::Enum(_), Value::EnumNumber(number) | Value::I32(number)) => {
            writer.write_tag(field.number(), crate::wire::WireType::Varint);
            writer.write_varint(expand_sign32(*number));
            Ok(())
        }
        _ => {
            writer.write_tag(field.number(), kind.wire_type());
            encode_scalar(field.name(), &kind, value, writer)
        }
    }
}

fn encode_map_entry(
    field: &FieldDescriptor,
    entry_ty: &MessageDescriptor,
    key: MapKey<'_>,
    value: Value<'_>,
    writer: &mut Writer,
    depth: usize,
    opts: &EncodeOptions,
) -> Result<(), EncodeError> {
    let key_field = entry_ty.get_field_by_tag(1).expect("map entry has a key field");
    let value_field = entry_ty
        .get_field_by_tag(2)
        .expect("map entry has a value field");

    writer.write_tag(field.number(), crate::wire::WireType::LengthDelimited);
    let mark = writer.mark();

    // Value (tag 2) before key (tag 1): §4.7's pinned map-entry order.
    encode_one(&value_field, &value, writer, depth + 1, opts)?;
    encode_one(&key_field, &map_key_to_value(key), writer, depth + 1, opts)?;

    writer.insert_length_prefix(mark);
    Ok(())
}

fn map_key_to_value(key: MapKey<'_>) -> Value<'_> {
    match key {
        MapKey::Bool(v) => Value::Bool(v),
        MapKey::I32(v) => Value::I32(v),
        MapKey::I64(v) => Value::I64(v),
        MapKey::U32(v) => Value::U32(v),
        MapKey::U64(v) => Value::U64(v),
        MapKey::String(v) => Value::String(v),
    }
}

/// Emits the payload only (no tag) for one scalar, per §4.7's encoding
/// table. The caller has already written the field's tag.
fn encode_scalar(
    field_name: &str,
    kind: &Kind,
    value: &Value<'_>,
    writer: &mut Writer,
) -> Result<(), EncodeError> {
    match (value, kind) {
        (Value::Bool(v), Kind::Bool) => writer.write_varint(*v as u64),
        (Value::I32(v), Kind::Int32) => writer.write_varint(expand_sign32(*v)),
        (Value::I32(v), Kind::Sint32) => writer.write_varint(encode_sint32(*v) as u64),
        (Value::I32(v), Kind::Sfixed32) => writer.write_fixed32(*v as u32),
        (Value::I64(v), Kind::Int64) => writer.write_varint(*v as u64),
        (Value::I64(v), Kind::Sint64) => writer.write_varint(encode_sint64(*v)),
        (Value::I64(v), Kind::Sfixed64) => writer.write_fixed64(*v as u64),
        (Value::U32(v), Kind::Uint32) => writer.write_varint(*v as u64),
        (Value::U32(v), Kind::Fixed32) => writer.write_fixed32(*v),
        (Value::U64(v), Kind::Uint64) => writer.write_varint(*v),
        (Value::U64(v), Kind::Fixed64) => writer.write_fixed64(*v),
        (Value::F32(v), Kind::Float) => writer.write_fixed32(encode_float(*v)),
        (Value::F64(v), Kind::Double) => writer.write_fixed64(encode_double(*v)),
        (Value::String(v), Kind::String) => writer.write_bytes(v.as_bytes()),
        (Value::Bytes(v), Kind::Bytes) => writer.write_bytes(v),
        _ => return Err(EncodeError::type_mismatch(field_name)),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::DescriptorPool;
    use crate::wire::{Reader, WireType};

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

    struct OneField<'a>(&'a str, Value<'a>);

    impl ValueSource for OneField<'_> {
        fn get_field(&self, field: &str) -> Option<Value<'_>> {
            if field == self.0 {
                Some(match &self.1 {
                    Value::I32(v) => Value::I32(*v),
                    other => panic!("unsupported in test fixture: {other:?}"),
                })
            } else {
                None
            }
        }

        fn get_repeated(&self, _: &str) -> Box<dyn Iterator<Item = Value<'_>> + '_> {
            Box::new(std::iter::empty())
        }

        fn get_map(&self, _: &str) -> Box<dyn Iterator<Item = (MapKey<'_>, Value<'_>)> + '_> {
            Box::new(std::iter::empty())
        }
    }

    #[test]
    fn s1_singular_uint32_150() {
        // S1 uses a uint32 field in the spec scenario; field1 here is int32,
        // but 150 is representable either way and the byte shape matches
        // since both use plain varint encoding for small positive values.
        let (_pool, ty) = int32_field_pool();
        let source = OneField("field1", Value::I32(150));
        let bytes = encode(&ty, &source).unwrap();
        assert_eq!(bytes, vec![0x08, 0x96, 0x01]);
    }

    #[test]
    fn negative_int32_sign_extends_to_ten_bytes() {
        let (_pool, ty) = int32_field_pool();
        let source = OneField("field1", Value::I32(-1));
        let bytes = encode(&ty, &source).unwrap();
        assert_eq!(bytes.len(), 1 + 10);
    }
}
