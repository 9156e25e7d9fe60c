//! The wire-format codec: varint/fixed/length-delimited primitives, a
//! cursor-style [`Reader`]/[`Writer`] pair, and the [`Navigator`] used by
//! hosts that want to walk a message by hand instead of through the typed
//! decoder.

mod buffer;
mod cast;
mod codec;
mod navigator;
mod slice;
mod varint;

use std::fmt;

pub use buffer::Writer;
pub use cast::{
    decode_double, decode_float, decode_sint32, decode_sint64, encode_double, encode_float,
    encode_sint32, encode_sint64, expand_sign32,
};
pub use codec::{Tag, WireType};
pub use navigator::Navigator;
pub use slice::Reader;
pub use varint::{encoded_len_varint, read_varint, read_varint32, write_varint};

/// A failure while reading the wire format. Carries no offset of its own —
/// callers (the typed decoder, the descriptor loader) attach the absolute
/// offset from the slice they started with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireError {
    Truncated,
    MalformedVarint,
    LengthExceedsRemaining,
    UnmatchedGroup,
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireError::Truncated => write!(f, "unexpected end of buffer"),
            WireError::MalformedVarint => write!(f, "malformed varint"),
            WireError::LengthExceedsRemaining => {
                write!(f, "length-delimited value exceeds remaining bytes")
            }
            WireError::UnmatchedGroup => write!(f, "unmatched start/end group"),
        }
    }
}

impl std::error::Error for WireError {}
