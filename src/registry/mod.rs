//! The schema registry: string interning, a tombstone-reusing slot arena,
//! the bijective tag/name indices each message type carries, the descriptor
//! loader that bootstraps all of it from `FileDescriptorSet` bytes, and the
//! public `MessageDescriptor`/`FieldDescriptor`/`EnumDescriptor` handles
//! hosts hold onto. Module layout mirrors the teacher's
//! `descriptor::{mod, error, types, api, build}` split, generalized from a
//! `prost`-derived schema to one built by this crate's own loader.

mod api;
mod arena;
mod error;
mod intern;
mod loader;
mod pool;
pub(crate) mod types;

pub use api::{
    EnumDescriptor, EnumValueDescriptor, FieldDescriptor, Kind, MessageDescriptor, OneofDescriptor,
};
pub use error::DescriptorError;
pub use pool::DescriptorPool;
pub(crate) use types::{FieldId, TypeId};
