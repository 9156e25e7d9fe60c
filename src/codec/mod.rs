//! The typed encoder and decoder (C8/C9): walk a
//! [`MessageDescriptor`](crate::registry::MessageDescriptor) and a host
//! value (via the [`ValueSource`](crate::value::ValueSource)/
//! [`ValueSink`](crate::value::ValueSink) traits) to produce or consume
//! canonical protobuf bytes.

mod decode;
mod encode;
mod error;
mod options;

pub use decode::{decode, decode_with_options};
pub use encode::{encode, encode_with_options};
pub use error::{DecodeError, EncodeError};
pub use options::{DecodeOptions, EncodeOptions};
