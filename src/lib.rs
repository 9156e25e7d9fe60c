//! A protobuf codec driven at runtime by schemas loaded from compiled
//! `FileDescriptorSet` bytes, without a code-generation step.
//!
//! Four pieces compose into the public API: [`wire`] is the low-level
//! varint/fixed/length-delimited codec; [`registry`] is the schema store a
//! [`registry::DescriptorPool`] builds up by parsing descriptor bytes;
//! [`value`] defines the `ValueSource`/`ValueSink` traits a host implements
//! to bridge its own value representation to the codec; and [`codec`]
//! ([`encode`]/[`decode`]) walks a [`registry::MessageDescriptor`] against a
//! host value using those traits. [`format`] offers a lower-level
//! single-character DSL for ad-hoc wire packing independent of any schema,
//! and [`wire::Navigator`] lets a host walk a message's submessages by hand.
//!
//! ```
//! use dynapb::registry::DescriptorPool;
//!
//! let pool = DescriptorPool::new();
//! assert!(pool.get_message_by_name("pkg.Msg").is_none());
//! ```

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

#[cfg(feature = "serde")]
extern crate serde1 as serde;

pub mod codec;
pub mod format;
pub mod registry;
pub mod value;
pub mod wire;

pub use codec::{decode, decode_with_options, encode, encode_with_options, DecodeError, EncodeError};
pub use codec::{DecodeOptions, EncodeOptions};
pub use registry::{DescriptorError, DescriptorPool, FieldDescriptor, MessageDescriptor};
pub use value::{MapKey, Value, ValueSink, ValueSource};
