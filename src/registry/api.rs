//! Public, ergonomic handles over the registry's internal arena indices —
//! `MessageDescriptor`/`FieldDescriptor`/`EnumDescriptor`/`OneofDescriptor`,
//! each a cheap `{pool, id}` pair, mirroring the teacher's own
//! `descriptor/api.rs` split between an opaque `*Inner` storage shape and
//! the handle types hosts actually hold onto.

use std::fmt;

use super::pool::DescriptorPool;
use super::types::{self, FieldId, TypeId};

/// A protobuf message type looked up from a [`DescriptorPool`].
#[derive(Clone)]
pub struct MessageDescriptor {
    pool: DescriptorPool,
    id: TypeId,
}

impl MessageDescriptor {
    pub(crate) fn new(pool: DescriptorPool, id: TypeId) -> Option<Self> {
        match &pool.type_descriptor(id)?.kind {
            types::TypeKind::Message(_) => Some(MessageDescriptor { pool, id }),
            types::TypeKind::Enum(_) => None,
        }
    }

    pub(crate) fn id(&self) -> TypeId {
        self.id
    }

    pub(crate) fn pool(&self) -> &DescriptorPool {
        &self.pool
    }

    fn raw(&self) -> &types::MessageType {
        self.pool
            .type_descriptor(self.id)
            .and_then(types::TypeDescriptor::as_message)
            .expect("MessageDescriptor points at a live message type")
    }

    /// The fully qualified, package-prefixed name (§3: `qname`).
    pub fn full_name(&self) -> &str {
        &self.pool.type_descriptor(self.id).unwrap().qname
    }

    /// The name after the last `.` (§3: `basename`).
    pub fn name(&self) -> &str {
        &self.pool.type_descriptor(self.id).unwrap().basename
    }

    pub fn field_count(&self) -> usize {
        self.raw().field_count()
    }

    /// `true` for the synthetic message type the loader generates for a
    /// `map<K, V>` field, whose field 1 is the key and field 2 the value.
    pub fn is_map_entry(&self) -> bool {
        self.raw().is_map_entry
    }

    /// `true` if this type exists only as an unresolved `extendee` stub
    /// (§4.6's `is_ext`) — a real definition hasn't been loaded yet.
    pub fn is_extension_stub(&self) -> bool {
        self.raw().is_extension_stub
    }

    pub fn get_field_by_tag(&self, tag: u32) -> Option<FieldDescriptor> {
        let field_id = self.raw().get_by_tag(tag)?;
        Some(FieldDescriptor::new(self.pool.clone(), self.id, field_id))
    }

    pub fn get_field_by_name(&self, name: &str) -> Option<FieldDescriptor> {
        let field_id = self.raw().get_by_name(name)?;
        Some(FieldDescriptor::new(self.pool.clone(), self.id, field_id))
    }

    /// Fields in declaration order — the order the encoder falls back to
    /// (§4.5: `iter_fields`, restartable by construction since it's a
    /// snapshot `Vec` walk).
    pub fn fields(&self) -> impl Iterator<Item = FieldDescriptor> + '_ {
        self.raw()
            .fields_in_order()
            .iter()
            .map(move |&id| FieldDescriptor::new(self.pool.clone(), self.id, id))
    }

    pub fn oneofs(&self) -> impl Iterator<Item = OneofDescriptor> + '_ {
        self.raw()
            .oneofs
            .iter()
            .enumerate()
            .map(|(index, oneof)| OneofDescriptor {
                name: oneof.name.to_string(),
                index,
            })
    }
}

impl fmt::Debug for MessageDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageDescriptor")
            .field("full_name", &self.full_name())
            .finish()
    }
}

impl PartialEq for MessageDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.full_name() == other.full_name()
    }
}

impl Eq for MessageDescriptor {}

/// A protobuf enum type looked up from a [`DescriptorPool`].
#[derive(Clone)]
pub struct EnumDescriptor {
    pool: DescriptorPool,
    id: TypeId,
}

impl EnumDescriptor {
    pub(crate) fn new(pool: DescriptorPool, id: TypeId) -> Option<Self> {
        match &pool.type_descriptor(id)?.kind {
            types::TypeKind::Enum(_) => Some(EnumDescriptor { pool, id }),
            types::TypeKind::Message(_) => None,
        }
    }

    fn raw(&self) -> &types::EnumType {
        self.pool
            .type_descriptor(self.id)
            .and_then(types::TypeDescriptor::as_enum)
            .expect("EnumDescriptor points at a live enum type")
    }

    pub fn full_name(&self) -> &str {
        &self.pool.type_descriptor(self.id).unwrap().qname
    }

    pub fn name(&self) -> &str {
        &self.pool.type_descriptor(self.id).unwrap().basename
    }

    pub fn get_value_by_number(&self, number: i32) -> Option<EnumValueDescriptor> {
        let name = self.raw().get_by_number(number)?.to_string();
        Some(EnumValueDescriptor { name, number })
    }

    pub fn get_value_by_name(&self, name: &str) -> Option<EnumValueDescriptor> {
        let number = self.raw().get_by_name(name)?;
        Some(EnumValueDescriptor {
            name: name.to_string(),
            number,
        })
    }

    pub fn len(&self) -> usize {
        self.raw().len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw().is_empty()
    }
}

impl fmt::Debug for EnumDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnumDescriptor")
            .field("full_name", &self.full_name())
            .finish()
    }
}

/// A single named constant of an [`EnumDescriptor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValueDescriptor {
    name: String,
    number: i32,
}

impl EnumValueDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn number(&self) -> i32 {
        self.number
    }
}

/// One named alternative of a `oneof` group (§3: "Oneof entry").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OneofDescriptor {
    name: String,
    index: usize,
}

impl OneofDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

/// The scalar or reference type a field holds — the public reading of
/// [`super::types::Kind`], with `Message`/`Enum` resolved to their own
/// descriptor handles instead of a raw arena index (mirrors the teacher's
/// `Kind::new(pool, KindIndex)` resolution in `descriptor/api.rs`).
#[derive(Debug, Clone)]
pub enum Kind {
    Double,
    Float,
    Int32,
    Int64,
    Uint32,
    Uint64,
    Sint32,
    Sint64,
    Fixed32,
    Fixed64,
    Sfixed32,
    Sfixed64,
    Bool,
    String,
    Bytes,
    Message(MessageDescriptor),
    Enum(EnumDescriptor),
}

impl Kind {
    fn new(pool: &DescriptorPool, raw: &types::Kind) -> Self {
        match *raw {
            types::Kind::Double => Kind::Double,
            types::Kind::Float => Kind::Float,
            types::Kind::Int32 => Kind::Int32,
            types::Kind::Int64 => Kind::Int64,
            types::Kind::Uint32 => Kind::Uint32,
            types::Kind::Uint64 => Kind::Uint64,
            types::Kind::Sint32 => Kind::Sint32,
            types::Kind::Sint64 => Kind::Sint64,
            types::Kind::Fixed32 => Kind::Fixed32,
            types::Kind::Fixed64 => Kind::Fixed64,
            types::Kind::Sfixed32 => Kind::Sfixed32,
            types::Kind::Sfixed64 => Kind::Sfixed64,
            types::Kind::Bool => Kind::Bool,
            types::Kind::String => Kind::String,
            types::Kind::Bytes => Kind::Bytes,
            types::Kind::Message(id) => Kind::Message(
                MessageDescriptor::new(pool.clone(), id).expect("type_name resolved to a message"),
            ),
            types::Kind::Enum(id) => {
                Kind::Enum(EnumDescriptor::new(pool.clone(), id).expect("type_name resolved to an enum"))
            }
        }
    }

    pub fn as_message(&self) -> Option<&MessageDescriptor> {
        match self {
            Kind::Message(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<&EnumDescriptor> {
        match self {
            Kind::Enum(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_scalar(&self) -> bool {
        !matches!(self, Kind::Message(_) | Kind::Enum(_))
    }

    pub fn is_message(&self) -> bool {
        matches!(self, Kind::Message(_))
    }

    pub fn is_enum(&self) -> bool {
        matches!(self, Kind::Enum(_))
    }

    /// The wiretype this kind occupies on the wire (§4.7's scalar encoding
    /// table, restated for the public `Kind`).
    pub fn wire_type(&self) -> crate::wire::WireType {
        use crate::wire::WireType;
        match self {
            Kind::Int32
            | Kind::Int64
            | Kind::Uint32
            | Kind::Uint64
            | Kind::Sint32
            | Kind::Sint64
            | Kind::Bool
            | Kind::Enum(_) => WireType::Varint,
            Kind::Fixed32 | Kind::Sfixed32 | Kind::Float => WireType::ThirtyTwoBit,
            Kind::Fixed64 | Kind::Sfixed64 | Kind::Double => WireType::SixtyFourBit,
            Kind::String | Kind::Bytes | Kind::Message(_) => WireType::LengthDelimited,
        }
    }
}

/// A single field of a [`MessageDescriptor`].
#[derive(Clone)]
pub struct FieldDescriptor {
    pool: DescriptorPool,
    message_id: TypeId,
    id: FieldId,
}

impl FieldDescriptor {
    pub(crate) fn new(pool: DescriptorPool, message_id: TypeId, id: FieldId) -> Self {
        FieldDescriptor { pool, message_id, id }
    }

    pub(crate) fn id(&self) -> FieldId {
        self.id
    }

    fn raw(&self) -> &types::FieldDescriptor {
        self.pool
            .field_descriptor(self.id)
            .expect("FieldDescriptor points at a live field")
    }

    pub fn name(&self) -> &str {
        &self.raw().name
    }

    pub fn number(&self) -> u32 {
        self.raw().number
    }

    pub fn kind(&self) -> Kind {
        Kind::new(&self.pool, &self.raw().kind)
    }

    pub fn is_repeated(&self) -> bool {
        self.raw().repeated
    }

    pub fn is_packed(&self) -> bool {
        self.raw().packed
    }

    pub fn is_scalar(&self) -> bool {
        self.raw().is_scalar()
    }

    pub fn default_value(&self) -> Option<&str> {
        self.raw().default_value.as_deref()
    }

    pub fn containing_message(&self) -> MessageDescriptor {
        MessageDescriptor::new(self.pool.clone(), self.message_id)
            .expect("a field's containing type is always a message")
    }

    pub fn containing_oneof(&self) -> Option<OneofDescriptor> {
        let index = self.raw().oneof_index?;
        let message = self.containing_message();
        message.oneofs().nth(index)
    }
}

impl fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name())
            .field("number", &self.number())
            .finish()
    }
}

impl PartialEq for FieldDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.message_id == other.message_id && self.id == other.id
    }
}

impl Eq for FieldDescriptor {}

impl DescriptorPool {
    pub fn get_message_by_name(&self, qname: &str) -> Option<MessageDescriptor> {
        let id = self.message_type_id_by_name(qname)?;
        MessageDescriptor::new(self.clone(), id)
    }

    pub fn get_enum_by_name(&self, qname: &str) -> Option<EnumDescriptor> {
        let id = self.enum_type_id_by_name(qname)?;
        EnumDescriptor::new(self.clone(), id)
    }

    /// Restartable iteration over every message type in the pool (§4.5:
    /// `iter_types`, filtered to messages; see [`DescriptorPool::enums`] for
    /// the enum-only view).
    pub fn messages(&self) -> impl Iterator<Item = MessageDescriptor> + '_ {
        self.iter_types()
            .filter_map(move |id| MessageDescriptor::new(self.clone(), id))
    }

    pub fn enums(&self) -> impl Iterator<Item = EnumDescriptor> + '_ {
        self.iter_types()
            .filter_map(move |id| EnumDescriptor::new(self.clone(), id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::{Writer, WireType};

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

    #[test]
    fn message_descriptor_exposes_fields_in_order() {
        let mut pool = DescriptorPool::new();

        let mut field_a = Vec::new();
        tag_len(1, b"a", &mut field_a);
        tag_varint(3, 1, &mut field_a);
        tag_varint(5, 5, &mut field_a); // int32

        let mut field_b = Vec::new();
        tag_len(1, b"b", &mut field_b);
        tag_varint(3, 2, &mut field_b);
        tag_varint(5, 9, &mut field_b); // string

        let mut message = Vec::new();
        tag_len(1, b"Msg", &mut message);
        tag_len(2, &field_a, &mut message);
        tag_len(2, &field_b, &mut message);

        let mut file = Vec::new();
        tag_len(2, b"pkg", &mut file);
        tag_len(4, &message, &mut file);

        let mut set = Vec::new();
        tag_len(1, &file, &mut set);
        pool.add_file_descriptor_set(&set).unwrap();

        let message = pool.get_message_by_name("pkg.Msg").unwrap();
        let names: Vec<_> = message.fields().map(|f| f.name().to_string()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(message.get_field_by_tag(2).unwrap().name(), "b");
    }
}
