//! Errors raised while loading descriptors into a [`super::pool::DescriptorPool`].
//! Grounded on the teacher's `descriptor::error::DescriptorError` shape: an
//! opaque struct wrapping a private `kind` enum, with `pub(super)`/`pub(crate)`
//! constructors and a hand-rolled `Display` rather than a derive macro.

use std::fmt;

use crate::wire::WireError;

/// An error that may occur while loading a [`super::pool::DescriptorPool`].
#[derive(Debug)]
pub struct DescriptorError {
    kind: DescriptorErrorKind,
}

#[derive(Debug)]
enum DescriptorErrorKind {
    Decode { offset: usize, err: WireError },
    TypeNotFound { name: String },
    UnknownSyntax { syntax: String },
    GroupUnsupported { field: String },
    InvalidOneofIndex { message: String, field: String },
    EmptyEnum { name: String },
}

impl DescriptorError {
    pub(super) fn decode(offset: usize, err: WireError) -> Self {
        DescriptorError {
            kind: DescriptorErrorKind::Decode { offset, err },
        }
    }

    pub(super) fn type_not_found(name: impl Into<String>) -> Self {
        DescriptorError {
            kind: DescriptorErrorKind::TypeNotFound { name: name.into() },
        }
    }

    pub(super) fn unknown_syntax(syntax: impl Into<String>) -> Self {
        DescriptorError {
            kind: DescriptorErrorKind::UnknownSyntax {
                syntax: syntax.into(),
            },
        }
    }

    pub(super) fn group_unsupported(field: impl Into<String>) -> Self {
        DescriptorError {
            kind: DescriptorErrorKind::GroupUnsupported {
                field: field.into(),
            },
        }
    }

    pub(super) fn invalid_oneof_index(message: impl Into<String>, field: impl Into<String>) -> Self {
        DescriptorError {
            kind: DescriptorErrorKind::InvalidOneofIndex {
                message: message.into(),
                field: field.into(),
            },
        }
    }

    pub(super) fn empty_enum(name: impl Into<String>) -> Self {
        DescriptorError {
            kind: DescriptorErrorKind::EmptyEnum { name: name.into() },
        }
    }
}

impl fmt::Display for DescriptorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            DescriptorErrorKind::Decode { offset, err } => {
                write!(f, "failed to decode file descriptor set at offset {offset}: {err}")
            }
            DescriptorErrorKind::TypeNotFound { name } => {
                write!(f, "the message or enum type '{name}' was not found")
            }
            DescriptorErrorKind::UnknownSyntax { syntax } => {
                write!(f, "the syntax '{syntax}' is not recognized")
            }
            DescriptorErrorKind::GroupUnsupported { field } => {
                write!(f, "the field '{field}' uses the unsupported group wire type")
            }
            DescriptorErrorKind::InvalidOneofIndex { message, field } => {
                write!(
                    f,
                    "the oneof index for field '{field}' of message '{message}' is invalid"
                )
            }
            DescriptorErrorKind::EmptyEnum { name } => {
                write!(f, "enum '{name}' must declare at least one value")
            }
        }
    }
}

impl std::error::Error for DescriptorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            DescriptorErrorKind::Decode { err, .. } => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_offset_on_decode_errors() {
        let err = DescriptorError::decode(42, WireError::Truncated);
        assert!(err.to_string().contains("42"));
    }
}
