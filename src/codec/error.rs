//! Error types for the typed encoder and decoder, in the same
//! enum-wrapped-in-a-struct shape as [`crate::registry::DescriptorError`]
//! (itself grounded on the teacher's `descriptor::error::DescriptorError`).

use std::error::Error;
use std::fmt;

use crate::wire::{WireError, WireType};

/// Failure while walking a [`crate::value::ValueSource`] against a schema
/// to produce wire bytes.
#[derive(Debug)]
pub struct EncodeError(EncodeErrorKind);

#[derive(Debug)]
enum EncodeErrorKind {
    /// The host value presented for `field` doesn't match its declared
    /// `Kind` (§4.7: "otherwise the encode fails with a type-mismatch error
    /// referencing the field name").
    TypeMismatch { field: String },
    /// An `EnumName` value named a constant the enum type doesn't have.
    UnknownEnumValue { field: String, name: String },
    /// Nesting exceeded the configured limit (§4.7: "stack-depth guard ...
    /// 100 nesting levels").
    RecursionLimit,
}

impl EncodeError {
    pub(crate) fn type_mismatch(field: &str) -> Self {
        EncodeError(EncodeErrorKind::TypeMismatch {
            field: field.to_string(),
        })
    }

    pub(crate) fn unknown_enum_value(field: &str, name: &str) -> Self {
        EncodeError(EncodeErrorKind::UnknownEnumValue {
            field: field.to_string(),
            name: name.to_string(),
        })
    }

    pub(crate) fn recursion_limit() -> Self {
        EncodeError(EncodeErrorKind::RecursionLimit)
    }
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            EncodeErrorKind::TypeMismatch { field } => {
                write!(f, "value for field `{field}` doesn't match its declared type")
            }
            EncodeErrorKind::UnknownEnumValue { field, name } => {
                write!(f, "`{name}` is not a value of the enum type of field `{field}`")
            }
            EncodeErrorKind::RecursionLimit => {
                write!(f, "message nesting exceeded the recursion limit")
            }
        }
    }
}

impl Error for EncodeError {}

/// Failure while walking wire bytes against a schema to drive a
/// [`crate::value::ValueSink`].
#[derive(Debug)]
pub struct DecodeError(DecodeErrorKind);

#[derive(Debug)]
enum DecodeErrorKind {
    /// A wire-format primitive failed to decode; `field` is the name of the
    /// field being read when known (absent for failures reading a raw tag
    /// before the field is identified).
    Wire {
        field: Option<String>,
        offset: usize,
        err: WireError,
    },
    /// The wiretype on the wire didn't match the one the field's declared
    /// type expects, and the field isn't a packable repeated scalar (§4.8:
    /// "a hard error for non-repeated scalars").
    WiretypeMismatch {
        field: String,
        offset: usize,
        expected: WireType,
        got: WireType,
    },
    RecursionLimit,
}

impl DecodeError {
    pub(crate) fn wire(field: Option<&str>, offset: usize, err: WireError) -> Self {
        DecodeError(DecodeErrorKind::Wire {
            field: field.map(ToString::to_string),
            offset,
            err,
        })
    }

    pub(crate) fn wiretype_mismatch(
        field: &str,
        offset: usize,
        expected: WireType,
        got: WireType,
    ) -> Self {
        DecodeError(DecodeErrorKind::WiretypeMismatch {
            field: field.to_string(),
            offset,
            expected,
            got,
        })
    }

    pub(crate) fn recursion_limit() -> Self {
        DecodeError(DecodeErrorKind::RecursionLimit)
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            DecodeErrorKind::Wire {
                field: Some(field),
                offset,
                err,
            } => write!(f, "at offset {offset}, decoding field `{field}`: {err}"),
            DecodeErrorKind::Wire {
                field: None,
                offset,
                err,
            } => write!(f, "at offset {offset}: {err}"),
            DecodeErrorKind::WiretypeMismatch {
                field,
                offset,
                expected,
                got,
            } => write!(
                f,
                "at offset {offset}, field `{field}` expected wiretype {expected:?} but found {got:?}"
            ),
            DecodeErrorKind::RecursionLimit => {
                write!(f, "message nesting exceeded the recursion limit")
            }
        }
    }
}

impl Error for DecodeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.0 {
            DecodeErrorKind::Wire { err, .. } => Some(err),
            _ => None,
        }
    }
}
