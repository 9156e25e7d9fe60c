//! The value cursor contract (§9 design note: "the codec must not bake in
//! any particular host value representation"). `ValueSource` is what the
//! encoder reads from; `ValueSink` is what the decoder writes into. Both
//! are ordinary (non-generic-method) traits so hosts can hand either side
//! across as `&dyn`/`&mut dyn`, the same shape `prost-reflect` settles on
//! for its own `DynamicMessage`/`Value`, just without baking in one
//! concrete tree type.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Serialize, Serializer};

/// A single scalar (or nested-message) value, as read from a
/// [`ValueSource`] or written to a [`ValueSink`]. Borrowed: a source hands
/// out references into its own storage, and a sink is only required to
/// read the value for the duration of the call.
pub enum Value<'a> {
    Bool(bool),
    I32(i32),
    I64(i64),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    String(&'a str),
    Bytes(&'a [u8]),
    /// An enum field presented by number (§4.7: "if the host value is an
    /// integer, emit as varint").
    EnumNumber(i32),
    /// An enum field presented by name (§4.7: "if a string, look up the
    /// enum value by name").
    EnumName(&'a str),
    /// A submessage, presented as another cursor over its own fields.
    Message(&'a dyn ValueSource),
}

impl fmt::Debug for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "Bool({v})"),
            Value::I32(v) => write!(f, "I32({v})"),
            Value::I64(v) => write!(f, "I64({v})"),
            Value::U32(v) => write!(f, "U32({v})"),
            Value::U64(v) => write!(f, "U64({v})"),
            Value::F32(v) => write!(f, "F32({v})"),
            Value::F64(v) => write!(f, "F64({v})"),
            Value::String(v) => write!(f, "String({v:?})"),
            Value::Bytes(v) => write!(f, "Bytes({} bytes)", v.len()),
            Value::EnumNumber(v) => write!(f, "EnumNumber({v})"),
            Value::EnumName(v) => write!(f, "EnumName({v:?})"),
            Value::Message(_) => write!(f, "Message(..)"),
        }
    }
}

#[cfg(feature = "serde")]
impl Serialize for Value<'_> {
    /// `ValueSource` has no way to enumerate a message's field names on its
    /// own, only to be asked for one by name, so a nested `Message` has no
    /// generic serialization: it falls back to its `Debug` text rather than
    /// refusing to serialize at all.
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Bool(v) => serializer.serialize_bool(*v),
            Value::I32(v) => serializer.serialize_i32(*v),
            Value::I64(v) => serializer.serialize_i64(*v),
            Value::U32(v) => serializer.serialize_u32(*v),
            Value::U64(v) => serializer.serialize_u64(*v),
            Value::F32(v) => serializer.serialize_f32(*v),
            Value::F64(v) => serializer.serialize_f64(*v),
            Value::String(v) => serializer.serialize_str(v),
            Value::Bytes(v) => serializer.serialize_bytes(v),
            Value::EnumNumber(v) => serializer.serialize_i32(*v),
            Value::EnumName(v) => serializer.serialize_str(v),
            Value::Message(_) => serializer.collect_str(&format_args!("{self:?}")),
        }
    }
}

/// A map key (§3: map-entry field 1), which excludes the floating-point and
/// message/bytes variants protobuf forbids as map key types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MapKey<'a> {
    Bool(bool),
    I32(i32),
    I64(i64),
    U32(u32),
    U64(u64),
    String(&'a str),
}

#[cfg(feature = "serde")]
impl Serialize for MapKey<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            MapKey::Bool(v) => serializer.serialize_bool(*v),
            MapKey::I32(v) => serializer.serialize_i32(*v),
            MapKey::I64(v) => serializer.serialize_i64(*v),
            MapKey::U32(v) => serializer.serialize_u32(*v),
            MapKey::U64(v) => serializer.serialize_u64(*v),
            MapKey::String(v) => serializer.serialize_str(v),
        }
    }
}

/// A host value tree the encoder walks field-by-field. Field lookup is by
/// name, matching the resolved [`FieldDescriptor`](crate::registry::FieldDescriptor)
/// the schema carries; a name the source doesn't recognize is simply never
/// asked for, and a field the schema doesn't have is never read (§4.7:
/// "missing names are silently skipped").
pub trait ValueSource {
    /// The value of a singular field, if the host has it set.
    fn get_field(&self, field: &str) -> Option<Value<'_>>;

    /// The elements of a repeated field, in emission order. A field the
    /// host never populated yields an empty iterator.
    fn get_repeated(&self, field: &str) -> Box<dyn Iterator<Item = Value<'_>> + '_>;

    /// The entries of a map field. Order is host-defined; the encoder does
    /// not sort (§4.3: "callers must not rely on [slot] order").
    fn get_map(&self, field: &str) -> Box<dyn Iterator<Item = (MapKey<'_>, Value<'_>)> + '_>;
}

/// A host value tree the decoder populates field-by-field. `enter_*`
/// methods return a fresh sink scoped to one nested message; the decoder
/// recurses into it and the host is responsible for attaching the finished
/// child back onto its own tree however it sees fit.
pub trait ValueSink {
    fn set_field(&mut self, field: &str, value: Value<'_>);

    fn append_to(&mut self, field: &str, value: Value<'_>);

    fn set_map(&mut self, field: &str, key: MapKey<'_>, value: Value<'_>);

    /// Begins a singular submessage field; the decoder recurses into the
    /// returned sink, then `set_field`/`append_to`/`set_map` are not called
    /// again for `field` at this level.
    fn enter_message(&mut self, field: &str) -> Box<dyn ValueSink + '_>;

    /// Begins one element of a repeated submessage field.
    fn enter_repeated_message(&mut self, field: &str) -> Box<dyn ValueSink + '_>;

    /// Begins the value half of one map entry whose value type is a
    /// message.
    fn enter_map_message(&mut self, field: &str, key: MapKey<'_>) -> Box<dyn ValueSink + '_>;
}
