//! The descriptor loader (C7): a hand-written decoder for the shape of
//! `descriptor.proto`'s own messages, since generating those message types
//! *is* the library under construction — the codec bootstraps itself on top
//! of [`crate::wire::Reader`] instead of a derived `prost::Message` impl, the
//! same self-hosting trick `lua-protobuf`'s `pb_load` (`examples/original_source/pb.c`)
//! plays in C.
//!
//! Grounded on the teacher's `descriptor::build` pass (`build/mod.rs`,
//! `build/visit.rs`, `build/resolve.rs`), generalized from prost-generated
//! `FileDescriptorProto` structs to tags read directly off the wire.

use std::sync::Arc;

use crate::wire::{Reader, WireError, WireType};

use super::error::DescriptorError;
use super::pool::{placeholder_enum_type, placeholder_message_type, DescriptorPool};
use super::types::{Kind, FieldDescriptor, ScalarOrRef};

/// Parses a serialized `FileDescriptorSet` and merges every `file` entry
/// into `pool`. On any failure, `pool` is restored to its pre-call state —
/// the teacher rolls back via truncating index offsets
/// (`DescriptorPoolOffsets::rollback`); here, since this pool's arena reuses
/// tombstoned slots, a snapshot-and-restore of the whole `Arc`-held inner
/// table is the simpler and equally correct analogue (an `Arc` clone is O(1)
/// until the first write forces a copy-on-write split).
pub(crate) fn load_file_descriptor_set(
    pool: &mut DescriptorPool,
    bytes: &[u8],
) -> Result<usize, DescriptorError> {
    let snapshot = pool.inner.clone();
    match load_file_descriptor_set_inner(pool, bytes) {
        Ok(()) => Ok(bytes.len()),
        Err(err) => {
            pool.inner = snapshot;
            Err(err)
        }
    }
}

fn load_file_descriptor_set_inner(
    pool: &mut DescriptorPool,
    bytes: &[u8],
) -> Result<(), DescriptorError> {
    let mut reader = Reader::new(bytes);
    while !reader.is_empty() {
        let tag = reader.read_tag().map_err(|e| wire_err(&reader, e))?;
        if tag.field == 1 && tag.wire_type == WireType::LengthDelimited {
            let body = reader.read_bytes().map_err(|e| wire_err(&reader, e))?;
            load_file_descriptor_proto(pool, body)?;
        } else {
            reader.skip_value(tag.wire_type).map_err(|e| wire_err(&reader, e))?;
        }
    }
    Ok(())
}

fn wire_err(reader: &Reader, err: WireError) -> DescriptorError {
    DescriptorError::decode(reader.offset(), err)
}

fn qualify(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}.{name}")
    }
}

fn read_string(reader: &mut Reader, body: &[u8]) -> Result<String, DescriptorError> {
    std::str::from_utf8(body)
        .map(ToString::to_string)
        .map_err(|_| wire_err(reader, WireError::MalformedVarint))
}

/// Recognized tags: `package @ 2`, `message_type[] @ 4`, `enum_type[] @ 5`,
/// `extension[] @ 7`, `service[] @ 6` (skipped, per Non-goals), `syntax @
/// 12`. Unknown tags are skipped.
fn load_file_descriptor_proto(pool: &mut DescriptorPool, bytes: &[u8]) -> Result<(), DescriptorError> {
    let package = scan_file_package(bytes)?;
    validate_syntax(bytes)?;

    #[cfg(feature = "tracing")]
    tracing::debug!(package = package.as_str(), len = bytes.len(), "loading file descriptor");

    let mut reader = Reader::new(bytes);
    while !reader.is_empty() {
        let tag = reader.read_tag().map_err(|e| wire_err(&reader, e))?;
        match tag.field {
            4 => {
                let body = reader.read_bytes().map_err(|e| wire_err(&reader, e))?;
                load_message_type(pool, &package, body)?;
            }
            5 => {
                let body = reader.read_bytes().map_err(|e| wire_err(&reader, e))?;
                load_enum_type(pool, &package, body)?;
            }
            7 => {
                let body = reader.read_bytes().map_err(|e| wire_err(&reader, e))?;
                load_extension_field(pool, body)?;
            }
            // service[] @ 6: recognized only far enough to be skipped, no
            // ServiceDescriptor is built (Non-goals: no gRPC/service dispatch).
            _ => {
                reader.skip_value(tag.wire_type).map_err(|e| wire_err(&reader, e))?;
            }
        }
    }
    Ok(())
}

fn scan_file_package(bytes: &[u8]) -> Result<String, DescriptorError> {
    let mut reader = Reader::new(bytes);
    while !reader.is_empty() {
        let tag = reader.read_tag().map_err(|e| wire_err(&reader, e))?;
        if tag.field == 2 && tag.wire_type == WireType::LengthDelimited {
            let body = reader.read_bytes().map_err(|e| wire_err(&reader, e))?;
            return read_string(&mut reader, body);
        }
        reader.skip_value(tag.wire_type).map_err(|e| wire_err(&reader, e))?;
    }
    Ok(String::new())
}

fn validate_syntax(bytes: &[u8]) -> Result<(), DescriptorError> {
    let mut reader = Reader::new(bytes);
    while !reader.is_empty() {
        let tag = reader.read_tag().map_err(|e| wire_err(&reader, e))?;
        if tag.field == 12 && tag.wire_type == WireType::LengthDelimited {
            let body = reader.read_bytes().map_err(|e| wire_err(&reader, e))?;
            let syntax = read_string(&mut reader, body)?;
            if !syntax.is_empty() && syntax != "proto2" && syntax != "proto3" {
                return Err(DescriptorError::unknown_syntax(syntax));
            }
            return Ok(());
        }
        reader.skip_value(tag.wire_type).map_err(|e| wire_err(&reader, e))?;
    }
    Ok(())
}

fn scan_name(bytes: &[u8]) -> Result<String, DescriptorError> {
    let mut reader = Reader::new(bytes);
    while !reader.is_empty() {
        let tag = reader.read_tag().map_err(|e| wire_err(&reader, e))?;
        if tag.field == 1 && tag.wire_type == WireType::LengthDelimited {
            let body = reader.read_bytes().map_err(|e| wire_err(&reader, e))?;
            return read_string(&mut reader, body);
        }
        reader.skip_value(tag.wire_type).map_err(|e| wire_err(&reader, e))?;
    }
    Ok(String::new())
}

/// `MessageOptions.map_entry @ 7` is the only option this loader reads from
/// a `DescriptorProto.options` submessage.
fn scan_map_entry_option(bytes: &[u8]) -> Result<bool, DescriptorError> {
    let mut reader = Reader::new(bytes);
    while !reader.is_empty() {
        let tag = reader.read_tag().map_err(|e| wire_err(&reader, e))?;
        if tag.field == 7 && tag.wire_type == WireType::Varint {
            return Ok(reader.read_varint().map_err(|e| wire_err(&reader, e))? != 0);
        }
        reader.skip_value(tag.wire_type).map_err(|e| wire_err(&reader, e))?;
    }
    Ok(false)
}

/// Recognized tags: `name @ 1`, `field[] @ 2`, `nested_type[] @ 3`,
/// `enum_type[] @ 4`, `extension[] @ 6`, `oneof_decl[] @ 8` (supplements the
/// distilled spec's tag table: `field.oneof_index @ 9` resolves into this
/// table, so it must be populated from somewhere — see DESIGN.md), `options
/// @ 7` (only `map_entry` honored).
fn load_message_type(pool: &mut DescriptorPool, parent: &str, bytes: &[u8]) -> Result<(), DescriptorError> {
    let name = scan_name(bytes)?;
    let qname = qualify(parent, &name);
    let type_id = pool.get_or_create_type(&qname, placeholder_message_type());

    // A real definition has arrived: clear the extension-stub marker (if
    // this type was previously only a forward-referenced `extendee`),
    // preserving any extension fields already merged into it.
    if let Some(msg) = pool
        .inner_mut()
        .types
        .get_mut(type_id.0)
        .and_then(super::types::TypeDescriptor::as_message_mut)
    {
        msg.is_extension_stub = false;
    }

    let mut reader = Reader::new(bytes);
    while !reader.is_empty() {
        let tag = reader.read_tag().map_err(|e| wire_err(&reader, e))?;
        match tag.field {
            2 => {
                let body = reader.read_bytes().map_err(|e| wire_err(&reader, e))?;
                let (field, _extendee) = parse_field(pool, body)?;
                pool.insert_field(type_id, field);
            }
            3 => {
                let body = reader.read_bytes().map_err(|e| wire_err(&reader, e))?;
                load_message_type(pool, &qname, body)?;
            }
            4 => {
                let body = reader.read_bytes().map_err(|e| wire_err(&reader, e))?;
                load_enum_type(pool, &qname, body)?;
            }
            6 => {
                let body = reader.read_bytes().map_err(|e| wire_err(&reader, e))?;
                load_extension_field(pool, body)?;
            }
            7 => {
                let body = reader.read_bytes().map_err(|e| wire_err(&reader, e))?;
                if scan_map_entry_option(body)? {
                    if let Some(msg) = pool
                        .inner_mut()
                        .types
                        .get_mut(type_id.0)
                        .and_then(super::types::TypeDescriptor::as_message_mut)
                    {
                        msg.is_map_entry = true;
                    }
                }
            }
            8 => {
                let body = reader.read_bytes().map_err(|e| wire_err(&reader, e))?;
                let oneof_name = scan_name(body)?;
                if let Some(msg) = pool
                    .inner_mut()
                    .types
                    .get_mut(type_id.0)
                    .and_then(super::types::TypeDescriptor::as_message_mut)
                {
                    msg.oneofs.push(super::types::OneofDescriptor {
                        name: Arc::from(oneof_name.as_str()),
                    });
                }
            }
            _ => {
                reader.skip_value(tag.wire_type).map_err(|e| wire_err(&reader, e))?;
            }
        }
    }
    Ok(())
}

/// Recognized tags: `name @ 1`, `value[] @ 2`, each a `name @ 1`/`number @ 2`
/// pair.
fn load_enum_type(pool: &mut DescriptorPool, parent: &str, bytes: &[u8]) -> Result<(), DescriptorError> {
    let name = scan_name(bytes)?;
    let qname = qualify(parent, &name);
    let type_id = pool.get_or_create_type(&qname, placeholder_enum_type());

    let mut reader = Reader::new(bytes);
    let mut value_count = 0usize;
    while !reader.is_empty() {
        let tag = reader.read_tag().map_err(|e| wire_err(&reader, e))?;
        if tag.field == 2 && tag.wire_type == WireType::LengthDelimited {
            let body = reader.read_bytes().map_err(|e| wire_err(&reader, e))?;
            let (vname, vnumber) = parse_enum_value(body)?;
            pool.insert_enum_value(type_id, &vname, vnumber);
            value_count += 1;
        } else {
            reader.skip_value(tag.wire_type).map_err(|e| wire_err(&reader, e))?;
        }
    }
    if value_count == 0 {
        return Err(DescriptorError::empty_enum(qname));
    }
    Ok(())
}

fn parse_enum_value(bytes: &[u8]) -> Result<(String, i32), DescriptorError> {
    let mut reader = Reader::new(bytes);
    let mut name = String::new();
    let mut number = 0i32;
    while !reader.is_empty() {
        let tag = reader.read_tag().map_err(|e| wire_err(&reader, e))?;
        match tag.field {
            1 => {
                let body = reader.read_bytes().map_err(|e| wire_err(&reader, e))?;
                name = read_string(&mut reader, body)?;
            }
            2 => {
                number = reader.read_varint().map_err(|e| wire_err(&reader, e))? as i32;
            }
            _ => {
                reader.skip_value(tag.wire_type).map_err(|e| wire_err(&reader, e))?;
            }
        }
    }
    Ok((name, number))
}

/// A top-level (`FileDescriptorProto.extension @ 7`) or nested
/// (`DescriptorProto.extension @ 6`) extension field: parses it as an
/// ordinary field, then attaches it to its `extendee` type, creating the
/// extendee as an `is_ext` stub if its real definition hasn't loaded yet
/// (§4.6's resolved open question).
fn load_extension_field(pool: &mut DescriptorPool, bytes: &[u8]) -> Result<(), DescriptorError> {
    let (field, extendee) = parse_field(pool, bytes)?;
    let extendee = extendee.ok_or_else(|| DescriptorError::decode(0, WireError::MalformedVarint))?;
    let extendee = extendee.strip_prefix('.').unwrap_or(&extendee).to_string();
    let type_id = pool.get_or_create_type(&extendee, super::pool::placeholder_message_type_stub());
    pool.insert_field(type_id, field);
    Ok(())
}

/// Recognized tags: `name @ 1`, `extendee @ 2`, `number @ 3`, `label @ 4`
/// (`3` ⇒ repeated), `type @ 5` (refuses `TYPE_GROUP = 10`), `type_name @ 6`
/// (stripped of a leading dot; resolved lazily, creating a stub type if
/// absent), `default_value @ 7`, `options @ 8` (only `packed` honored),
/// `oneof_index @ 9`.
fn parse_field(
    pool: &mut DescriptorPool,
    bytes: &[u8],
) -> Result<(FieldDescriptor, Option<String>), DescriptorError> {
    let mut reader = Reader::new(bytes);

    let mut name = String::new();
    let mut extendee: Option<String> = None;
    let mut number: u32 = 0;
    let mut repeated = false;
    let mut raw_type: Option<i32> = None;
    let mut type_name: Option<String> = None;
    let mut default_value: Option<String> = None;
    let mut packed = false;
    let mut oneof_index: Option<usize> = None;

    while !reader.is_empty() {
        let tag = reader.read_tag().map_err(|e| wire_err(&reader, e))?;
        match tag.field {
            1 => {
                let body = reader.read_bytes().map_err(|e| wire_err(&reader, e))?;
                name = read_string(&mut reader, body)?;
            }
            2 => {
                let body = reader.read_bytes().map_err(|e| wire_err(&reader, e))?;
                extendee = Some(read_string(&mut reader, body)?);
            }
            3 => {
                number = reader.read_varint().map_err(|e| wire_err(&reader, e))? as u32;
            }
            4 => {
                let label = reader.read_varint().map_err(|e| wire_err(&reader, e))?;
                repeated = label == 3;
            }
            5 => {
                raw_type = Some(reader.read_varint().map_err(|e| wire_err(&reader, e))? as i32);
            }
            6 => {
                let body = reader.read_bytes().map_err(|e| wire_err(&reader, e))?;
                let raw = read_string(&mut reader, body)?;
                type_name = Some(raw.strip_prefix('.').unwrap_or(&raw).to_string());
            }
            7 => {
                let body = reader.read_bytes().map_err(|e| wire_err(&reader, e))?;
                default_value = Some(read_string(&mut reader, body)?);
            }
            8 => {
                let body = reader.read_bytes().map_err(|e| wire_err(&reader, e))?;
                packed = scan_packed_option(body)?;
            }
            9 => {
                let idx = reader.read_varint().map_err(|e| wire_err(&reader, e))?;
                oneof_index = Some(idx as usize);
            }
            _ => {
                reader.skip_value(tag.wire_type).map_err(|e| wire_err(&reader, e))?;
            }
        }
    }

    let raw_type = raw_type.unwrap_or(9); // default TYPE_STRING is as good a fallback as any malformed input gets
    let kind = match Kind::from_proto_type(raw_type) {
        Some(ScalarOrRef::Scalar(kind)) => kind,
        Some(ScalarOrRef::Message) => {
            let type_name = type_name
                .as_deref()
                .ok_or_else(|| DescriptorError::decode(0, WireError::MalformedVarint))?;
            let type_id = pool.get_or_create_type(type_name, placeholder_message_type());
            Kind::Message(type_id)
        }
        Some(ScalarOrRef::Enum) => {
            let type_name = type_name
                .as_deref()
                .ok_or_else(|| DescriptorError::decode(0, WireError::MalformedVarint))?;
            let type_id = pool.get_or_create_type(type_name, placeholder_enum_type());
            Kind::Enum(type_id)
        }
        Some(ScalarOrRef::Group) | None => {
            return Err(DescriptorError::group_unsupported(name));
        }
    };

    let field = FieldDescriptor {
        name: Arc::from(name.as_str()),
        number,
        kind,
        repeated,
        packed,
        default_value: default_value.map(|s| Arc::from(s.as_str())),
        oneof_index,
    };
    Ok((field, extendee))
}

/// `FieldOptions.packed @ 2` is the only option this loader reads from a
/// `FieldDescriptorProto.options` submessage.
fn scan_packed_option(bytes: &[u8]) -> Result<bool, DescriptorError> {
    let mut reader = Reader::new(bytes);
    while !reader.is_empty() {
        let tag = reader.read_tag().map_err(|e| wire_err(&reader, e))?;
        if tag.field == 2 && tag.wire_type == WireType::Varint {
            return Ok(reader.read_varint().map_err(|e| wire_err(&reader, e))? != 0);
        }
        reader.skip_value(tag.wire_type).map_err(|e| wire_err(&reader, e))?;
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::Writer;

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

    /// Builds the bytes of a minimal `FileDescriptorSet` containing one
    /// file, `pkg`, with a single message `Msg { int32 v = 1; }`.
    fn simple_file_descriptor_set() -> Vec<u8> {
        let mut field = Vec::new();
        tag_len(1, b"v", &mut field); // name
        tag_varint(3, 1, &mut field); // number
        tag_varint(5, 5, &mut field); // type = TYPE_INT32

        let mut message = Vec::new();
        tag_len(1, b"Msg", &mut message); // name
        tag_len(2, &field, &mut message); // field[]

        let mut file = Vec::new();
        tag_len(2, b"pkg", &mut file); // package
        tag_len(4, &message, &mut file); // message_type[]

        let mut set = Vec::new();
        tag_len(1, &file, &mut set); // file[]
        set
    }

    #[test]
    fn loads_a_simple_message() {
        let mut pool = DescriptorPool::new();
        let bytes = simple_file_descriptor_set();
        let consumed = pool.add_file_descriptor_set(&bytes).unwrap();
        assert_eq!(consumed, bytes.len());

        let type_id = pool.message_type_id_by_name("pkg.Msg").expect("type registered");
        let ty = pool.type_descriptor(type_id).unwrap();
        let message = ty.as_message().unwrap();
        assert_eq!(message.field_count(), 1);
        let field_id = message.get_by_tag(1).unwrap();
        let field = pool.field_descriptor(field_id).unwrap();
        assert_eq!(&*field.name, "v");
    }

    #[test]
    fn unknown_top_level_tag_is_skipped() {
        let mut pool = DescriptorPool::new();
        let mut file = Vec::new();
        tag_len(2, b"pkg", &mut file);
        tag_varint(99, 7, &mut file); // unrecognized tag inside FileDescriptorProto
        let mut set = Vec::new();
        tag_len(1, &file, &mut set);
        assert!(pool.add_file_descriptor_set(&set).is_ok());
    }

    #[test]
    fn group_type_is_rejected() {
        let mut pool = DescriptorPool::new();
        let mut field = Vec::new();
        tag_len(1, b"g", &mut field);
        tag_varint(3, 1, &mut field);
        tag_varint(5, 10, &mut field); // TYPE_GROUP
        let mut message = Vec::new();
        tag_len(1, b"Msg", &mut message);
        tag_len(2, &field, &mut message);
        let mut file = Vec::new();
        tag_len(4, &message, &mut file);
        let mut set = Vec::new();
        tag_len(1, &file, &mut set);

        assert!(pool.add_file_descriptor_set(&set).is_err());
    }

    #[test]
    fn failed_load_leaves_pool_unchanged() {
        let mut pool = DescriptorPool::new();
        pool.add_file_descriptor_set(&simple_file_descriptor_set()).unwrap();

        let bad = group_type_is_rejected_bytes();
        assert!(pool.add_file_descriptor_set(&bad).is_err());
        // The earlier successful load must still be intact.
        assert!(pool.message_type_id_by_name("pkg.Msg").is_some());
    }

    fn group_type_is_rejected_bytes() -> Vec<u8> {
        let mut field = Vec::new();
        tag_len(1, b"g", &mut field);
        tag_varint(3, 1, &mut field);
        tag_varint(5, 10, &mut field);
        let mut message = Vec::new();
        tag_len(1, b"Other", &mut message);
        tag_len(2, &field, &mut message);
        let mut file = Vec::new();
        tag_len(4, &message, &mut file);
        let mut set = Vec::new();
        tag_len(1, &file, &mut set);
        set
    }

    #[test]
    fn extension_before_extendee_merges_on_later_definition() {
        let mut pool = DescriptorPool::new();

        // extension field targeting "pkg.Base" before "pkg.Base" is defined.
        let mut ext_field = Vec::new();
        tag_len(1, b"ext_v", &mut ext_field);
        tag_varint(3, 100, &mut ext_field);
        tag_varint(5, 5, &mut ext_field); // int32
        tag_len(2, b"pkg.Base", &mut ext_field); // extendee

        let mut file1 = Vec::new();
        tag_len(2, b"pkg", &mut file1);
        tag_len(7, &ext_field, &mut file1); // top-level extension
        let mut set1 = Vec::new();
        tag_len(1, &file1, &mut set1);
        pool.add_file_descriptor_set(&set1).unwrap();

        let stub = pool.get_type("pkg.Base").expect("stub created");
        assert!(pool
            .type_descriptor(stub)
            .unwrap()
            .as_message()
            .unwrap()
            .get_by_tag(100)
            .is_some());

        // Now load the real definition of "pkg.Base".
        let mut base_field = Vec::new();
        tag_len(1, b"x", &mut base_field);
        tag_varint(3, 1, &mut base_field);
        tag_varint(5, 5, &mut base_field);
        let mut message = Vec::new();
        tag_len(1, b"Base", &mut message);
        tag_len(2, &base_field, &mut message);
        let mut file2 = Vec::new();
        tag_len(2, b"pkg", &mut file2);
        tag_len(4, &message, &mut file2);
        let mut set2 = Vec::new();
        tag_len(1, &file2, &mut set2);
        pool.add_file_descriptor_set(&set2).unwrap();

        let base = pool.message_type_id_by_name("pkg.Base").unwrap();
        let message = pool.type_descriptor(base).unwrap().as_message().unwrap();
        // Both the extension field (tag 100) and the real field (tag 1) survive.
        assert!(message.get_by_tag(100).is_some());
        assert!(message.get_by_tag(1).is_some());
    }
}
