//! The schema registry. Grounded on the teacher's `DescriptorPool` /
//! `DescriptorPoolInner` split (`descriptor/mod.rs`): a cheap-to-clone handle
//! wrapping an `Arc`-held inner table, mutated through `Arc::make_mut` so a
//! clone shares storage until one side actually writes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use once_cell::sync::Lazy;

use super::arena::SlotArena;
use super::error::DescriptorError;
use super::intern::Interner;
use super::loader;
use super::types::{EnumType, FieldDescriptor, FieldId, MessageType, TypeDescriptor, TypeId, TypeKind, basename_of};

/// A schema registry: interned names, type descriptors, and the field
/// descriptors they index. Cloning is an `Arc` bump (§5: "cheap to clone");
/// mutating methods take `&mut self` and copy-on-write via [`Arc::make_mut`]
/// if the pool is shared.
#[derive(Debug, Clone, Default)]
pub struct DescriptorPool {
    pub(crate) inner: Arc<DescriptorPoolInner>,
}

#[derive(Debug, Default, Clone)]
pub(crate) struct DescriptorPoolInner {
    pub(crate) strings: Interner,
    pub(crate) types: SlotArena<TypeDescriptor>,
    pub(crate) fields: SlotArena<FieldDescriptor>,
    pub(crate) names: HashMap<Arc<str>, TypeId>,
}

impl DescriptorPool {
    pub fn new() -> Self {
        DescriptorPool::default()
    }

    /// Parses `bytes` as a serialized `FileDescriptorSet` and merges its
    /// contents into this pool (§4.5: "incremental, monotonic merge"). On
    /// failure the pool is left exactly as it was before the call — the
    /// growth made while parsing the failing file is rolled back, mirroring
    /// the teacher's `DescriptorPoolOffsets::rollback`. Returns the number of
    /// bytes consumed from `bytes` on success.
    pub fn add_file_descriptor_set(&mut self, bytes: &[u8]) -> Result<usize, DescriptorError> {
        loader::load_file_descriptor_set(self, bytes)
    }

    /// Looks up a message's [`TypeId`] by qualified name. See
    /// [`api::DescriptorPool::get_message_by_name`](super::api) for the
    /// public, handle-returning counterpart hosts actually call.
    pub(crate) fn message_type_id_by_name(&self, qname: &str) -> Option<TypeId> {
        self.get_type(qname).filter(|id| {
            matches!(
                self.inner.types.get(id.0).map(|t| &t.kind),
                Some(TypeKind::Message(_))
            )
        })
    }

    pub(crate) fn enum_type_id_by_name(&self, qname: &str) -> Option<TypeId> {
        self.get_type(qname).filter(|id| {
            matches!(
                self.inner.types.get(id.0).map(|t| &t.kind),
                Some(TypeKind::Enum(_))
            )
        })
    }

    /// Strips an optional leading dot, then looks up by qualified name
    /// (§4.5: `get_type`).
    pub fn get_type(&self, qname: &str) -> Option<TypeId> {
        let qname = qname.strip_prefix('.').unwrap_or(qname);
        self.inner.names.get(qname).copied()
    }

    pub fn type_descriptor(&self, id: TypeId) -> Option<&TypeDescriptor> {
        self.inner.types.get(id.0)
    }

    pub fn field_descriptor(&self, id: FieldId) -> Option<&FieldDescriptor> {
        self.inner.fields.get(id.0)
    }

    /// Restartable iterator over every type currently in the pool, in slot
    /// order (§4.5: `iter_types`).
    pub fn iter_types(&self) -> impl Iterator<Item = TypeId> + '_ {
        self.inner.types.iter().map(|(i, _)| TypeId(i))
    }

    /// Finds-or-creates an empty type under `qname` (§4.5: `new_type` /
    /// "get_or_create_type"). If the name already exists, the existing
    /// descriptor is returned unchanged, regardless of `kind`.
    pub(crate) fn get_or_create_type(&mut self, qname: &str, kind_for_new: TypeKind) -> TypeId {
        if let Some(id) = self.inner.names.get(qname) {
            return *id;
        }
        let inner = Arc::make_mut(&mut self.inner);
        let interned = inner.strings.intern(qname);
        let basename = inner.strings.intern(basename_of(qname));
        let descriptor = TypeDescriptor {
            qname: interned.clone(),
            basename,
            kind: kind_for_new,
        };
        let id = TypeId(inner.types.insert(descriptor));
        inner.names.insert(interned, id);
        id
    }

    pub(crate) fn inner_mut(&mut self) -> &mut DescriptorPoolInner {
        Arc::make_mut(&mut self.inner)
    }

    /// Inserts a field descriptor into `type_id`'s tag/name indices,
    /// evicting (and freeing) whichever prior occupant(s) held either slot
    /// (§4.5: bijection-preserving insert). Returns the new field's
    /// [`FieldId`].
    pub(crate) fn insert_field(&mut self, type_id: TypeId, mut field: FieldDescriptor) -> FieldId {
        let inner = Arc::make_mut(&mut self.inner);
        let name = inner.strings.intern(&field.name);
        field.name = name.clone();
        let tag = field.number;
        let field_id = FieldId(inner.fields.insert(field));
        let ty = inner
            .types
            .get_mut(type_id.0)
            .and_then(TypeDescriptor::as_message_mut)
            .expect("insert_field called on a non-message type");
        let evicted = ty.insert_field(tag, name, field_id);
        for victim in evicted {
            inner.fields.remove(victim.0);
        }
        field_id
    }

    pub(crate) fn insert_enum_value(&mut self, type_id: TypeId, name: &str, number: i32) {
        let inner = Arc::make_mut(&mut self.inner);
        let interned = inner.strings.intern(name);
        let ty = inner
            .types
            .get_mut(type_id.0)
            .and_then(TypeDescriptor::as_enum_mut)
            .expect("insert_enum_value called on a non-enum type");
        ty.insert(interned, number);
    }

    /// Removes a type from the name table and frees its descriptor storage
    /// (§4.5: `del_type`). Field descriptors owned by the type are also
    /// freed.
    pub fn del_type(&mut self, qname: &str) -> bool {
        let Some(id) = self.get_type(qname) else {
            return false;
        };
        let inner = Arc::make_mut(&mut self.inner);
        if let Some(descriptor) = inner.types.remove(id.0) {
            inner.names.remove(&*descriptor.qname);
            if let TypeKind::Message(message) = descriptor.kind {
                for field_id in message.fields_in_order() {
                    inner.fields.remove(field_id.0);
                }
            }
            true
        } else {
            false
        }
    }

    /// Removes a single field from its owning type's indices and frees its
    /// slot (§4.5: `del_field`).
    pub fn del_field(&mut self, type_id: TypeId, tag: u32) -> bool {
        let inner = Arc::make_mut(&mut self.inner);
        let Some(ty) = inner.types.get_mut(type_id.0).and_then(TypeDescriptor::as_message_mut) else {
            return false;
        };
        let Some(field_id) = ty.get_by_tag(tag) else {
            return false;
        };
        ty.remove_field(field_id);
        inner.fields.remove(field_id.0);
        true
    }
}

static GLOBAL: Lazy<Mutex<DescriptorPool>> = Lazy::new(|| Mutex::new(DescriptorPool::new()));

impl DescriptorPool {
    /// Returns a clone of the process-wide pool, a convenient shared place
    /// for a host to register schemas it loads once and reads from many
    /// call sites. Mutations to the returned clone don't reach back into the
    /// global pool — use [`DescriptorPool::add_global_file_descriptor_set`]
    /// for that.
    pub fn global() -> DescriptorPool {
        GLOBAL.lock().unwrap().clone()
    }

    /// Merges `bytes` into the process-wide pool returned by
    /// [`DescriptorPool::global`].
    pub fn add_global_file_descriptor_set(bytes: &[u8]) -> Result<usize, DescriptorError> {
        GLOBAL.lock().unwrap().add_file_descriptor_set(bytes)
    }
}

pub(crate) fn placeholder_enum_type() -> TypeKind {
    TypeKind::Enum(EnumType::default())
}

pub(crate) fn placeholder_message_type() -> TypeKind {
    TypeKind::Message(MessageType::default())
}

/// A stub `MessageType` created only because an `extendee` reference named
/// it before its real definition arrived (§4.6's resolved open question:
/// `is_ext` stubs). Ignored by [`DescriptorPool::get_or_create_type`] if the
/// name already exists, so this marker only ever takes effect on first
/// creation.
pub(crate) fn placeholder_message_type_stub() -> TypeKind {
    TypeKind::Message(MessageType {
        is_extension_stub: true,
        ..MessageType::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_or_create_type_is_idempotent() {
        let mut pool = DescriptorPool::new();
        let a = pool.get_or_create_type("pkg.Foo", placeholder_message_type());
        let b = pool.get_or_create_type("pkg.Foo", placeholder_message_type());
        assert_eq!(a, b);
    }

    #[test]
    fn clone_is_copy_on_write() {
        let mut pool = DescriptorPool::new();
        let clone = pool.clone();
        pool.get_or_create_type("pkg.Foo", placeholder_message_type());
        assert!(clone.get_type("pkg.Foo").is_none());
        assert!(pool.get_type("pkg.Foo").is_some());
    }

    #[test]
    fn leading_dot_is_stripped_on_lookup() {
        let mut pool = DescriptorPool::new();
        pool.get_or_create_type("pkg.Foo", placeholder_message_type());
        assert!(pool.get_type(".pkg.Foo").is_some());
    }

    #[test]
    fn global_pool_is_independent_of_local_clones() {
        let before = DescriptorPool::global();
        assert!(before.get_type("pkg.GlobalOnly").is_none());
        let mut local = DescriptorPool::global();
        local.get_or_create_type("pkg.GlobalOnly", placeholder_message_type());
        assert!(DescriptorPool::global().get_type("pkg.GlobalOnly").is_none());
    }

    #[test]
    fn del_type_frees_its_fields() {
        let mut pool = DescriptorPool::new();
        let ty = pool.get_or_create_type("pkg.Foo", placeholder_message_type());
        pool.insert_field(
            ty,
            FieldDescriptor {
                name: Arc::from("bar"),
                number: 1,
                kind: super::super::types::Kind::Int32,
                repeated: false,
                packed: false,
                default_value: None,
                oneof_index: None,
            },
        );
        assert!(pool.del_type("pkg.Foo"));
        assert!(pool.get_type("pkg.Foo").is_none());
    }
}
