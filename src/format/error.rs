//! Errors raised by the format-string pack/unpack DSL, in the same
//! enum-wrapped-in-a-struct shape as [`crate::codec::DecodeError`].

use std::error::Error;
use std::fmt;

use crate::wire::WireError;

#[derive(Debug)]
pub struct FormatError(FormatErrorKind);

#[derive(Debug)]
enum FormatErrorKind {
    /// A format character not in §4.9's table (§6: `invalid_format_spec`).
    InvalidSpec { ch: char },
    /// A verb was reached with no corresponding argument left to consume.
    MissingArgument,
    /// An argument's `PackValue` variant didn't match what the verb needed.
    ArgumentTypeMismatch,
    /// `c`'s explicit length didn't match the byte argument's actual length.
    LengthMismatch { expected: usize, got: usize },
    /// `(` nesting exceeded `MAX_LEVEL`, or a `(`/`)` was left unmatched.
    LevelLimitExceeded,
    UnbalancedGroup,
    /// A wire-format primitive failed while unpacking.
    Wire(WireError),
    /// A `-` seek would move the cursor before the start of the buffer.
    SeekOutOfRange,
}

impl FormatError {
    pub(crate) fn invalid_spec(ch: char) -> Self {
        FormatError(FormatErrorKind::InvalidSpec { ch })
    }

    pub(crate) fn length_mismatch(expected: usize, got: usize) -> Self {
        FormatError(FormatErrorKind::LengthMismatch { expected, got })
    }
}

/// A verb ran out of arguments to consume (§6: `invalid_format_spec`'s
/// sibling failure mode — the spec itself was fine, the caller's argument
/// list wasn't long enough for it).
pub(crate) const fn missing_argument() -> FormatError {
    FormatError(FormatErrorKind::MissingArgument)
}

pub(crate) const fn argument_type_mismatch() -> FormatError {
    FormatError(FormatErrorKind::ArgumentTypeMismatch)
}

pub(crate) const fn level_limit_exceeded() -> FormatError {
    FormatError(FormatErrorKind::LevelLimitExceeded)
}

pub(crate) const fn unbalanced_group() -> FormatError {
    FormatError(FormatErrorKind::UnbalancedGroup)
}

pub(crate) const fn seek_out_of_range() -> FormatError {
    FormatError(FormatErrorKind::SeekOutOfRange)
}

impl From<WireError> for FormatError {
    fn from(err: WireError) -> Self {
        FormatError(FormatErrorKind::Wire(err))
    }
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            FormatErrorKind::InvalidSpec { ch } => write!(f, "'{ch}' is not a recognized format character"),
            FormatErrorKind::MissingArgument => write!(f, "format string expects more arguments than were given"),
            FormatErrorKind::ArgumentTypeMismatch => write!(f, "argument does not match the type its format verb expects"),
            FormatErrorKind::LengthMismatch { expected, got } => {
                write!(f, "'c' was given a {expected}-byte length but a {got}-byte argument")
            }
            FormatErrorKind::LevelLimitExceeded => write!(f, "group nesting exceeded the recursion limit"),
            FormatErrorKind::UnbalancedGroup => write!(f, "unbalanced '(' / ')' in format string"),
            FormatErrorKind::Wire(err) => write!(f, "{err}"),
            FormatErrorKind::SeekOutOfRange => write!(f, "seek would move before the start of the buffer"),
        }
    }
}

impl Error for FormatError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.0 {
            FormatErrorKind::Wire(err) => Some(err),
            _ => None,
        }
    }
}
