//! Errors reported by the binary protocol codec
//!
//! Encode and decode failures are separate hierarchies: the encoder can
//! only fail on values that do not conform to their spec, while the decoder
//! additionally contends with malformed or truncated input. Both report
//! synchronously to the caller; nothing is retried internally.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::string::FromUtf8Error;

use crate::spec::tag;

/// Enumerated error type for serialization failures.
#[derive(Clone, Debug, PartialEq)]
pub enum EncodeError {
    /// A required field with no default had no value at encode time
    MissingRequiredField { owner: String, field: String },
    /// A union had zero set fields (when empty is not allowed) or more
    /// than one
    UnionFieldCountInvalid { owner: String, count: usize },
    /// The value does not structurally conform to the spec it was encoded
    /// against
    ValueTypeMismatch {
        expected: String,
        actual: &'static str,
    },
}

impl Display for EncodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            EncodeError::MissingRequiredField { owner, field } => {
                write!(f, "required field \"{}.{}\" has no value", owner, field)
            }
            EncodeError::UnionFieldCountInvalid { owner, count } => {
                write!(
                    f,
                    "union \"{}\" has {} fields set; exactly one expected",
                    owner, count
                )
            }
            EncodeError::ValueTypeMismatch { expected, actual } => {
                write!(f, "expected a {} value, got {}", expected, actual)
            }
        }
    }
}

impl Error for EncodeError {}

/// Type alias for `Result` with an error type of [`EncodeError`]
pub type EncodeResult<T> = std::result::Result<T, EncodeError>;

/// Enumerated error type for deserialization failures.
#[derive(Debug)]
pub enum DecodeError {
    /// A read would pass the end of the input buffer
    UnexpectedEndOfInput { needed: usize, remaining: usize },
    /// A byte read in tag position is not a known wire type tag
    InvalidTypeTag(u8),
    /// A declared length or count is negative
    InvalidLength { declared: i32 },
    /// A field id known to the spec arrived with a different wire type
    /// than the spec declares
    FieldTypeMismatch {
        context: String,
        expected: u8,
        actual: u8,
    },
    /// A required field with no default was absent from the wire
    MissingRequiredField { owner: String, field: String },
    /// A union decoded with zero set fields (when empty is not allowed)
    /// or more than one
    UnionFieldCountInvalid { owner: String, count: usize },
    /// Values nest deeper than the decoder's recursion limit
    NestingTooDeep { limit: usize },
    /// A string field held bytes that are not valid UTF-8
    InvalidUtf8(FromUtf8Error),
    /// A message envelope did not start with the strict version marker
    EnvelopeVersionMismatch { word: u32 },
    /// An enum wire value outside the declared value set; only reported
    /// when the `strict_enum_decode` feature is enabled
    #[cfg(feature = "strict_enum_decode")]
    UnknownEnumValue { enum_name: String, value: i32 },
}

impl PartialEq for DecodeError {
    fn eq(&self, other: &Self) -> bool {
        use DecodeError::*;
        match (self, other) {
            (
                UnexpectedEndOfInput {
                    needed: a,
                    remaining: b,
                },
                UnexpectedEndOfInput {
                    needed: c,
                    remaining: d,
                },
            ) => a == c && b == d,
            (InvalidTypeTag(a), InvalidTypeTag(b)) => a == b,
            (InvalidLength { declared: a }, InvalidLength { declared: b }) => a == b,
            (
                FieldTypeMismatch {
                    context: a,
                    expected: b,
                    actual: c,
                },
                FieldTypeMismatch {
                    context: d,
                    expected: e,
                    actual: g,
                },
            ) => a == d && b == e && c == g,
            (
                MissingRequiredField { owner: a, field: b },
                MissingRequiredField { owner: c, field: d },
            ) => a == c && b == d,
            (
                UnionFieldCountInvalid { owner: a, count: b },
                UnionFieldCountInvalid { owner: c, count: d },
            ) => a == c && b == d,
            (NestingTooDeep { limit: a }, NestingTooDeep { limit: b }) => a == b,
            (InvalidUtf8(a), InvalidUtf8(b)) => a.utf8_error() == b.utf8_error(),
            (EnvelopeVersionMismatch { word: a }, EnvelopeVersionMismatch { word: b }) => a == b,
            #[cfg(feature = "strict_enum_decode")]
            (
                UnknownEnumValue {
                    enum_name: a,
                    value: b,
                },
                UnknownEnumValue {
                    enum_name: c,
                    value: d,
                },
            ) => a == c && b == d,
            _ => false,
        }
    }
}

impl Display for DecodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::UnexpectedEndOfInput { needed, remaining } => {
                write!(
                    f,
                    "unexpected end of input: needed {} bytes, {} remaining",
                    needed, remaining
                )
            }
            DecodeError::InvalidTypeTag(byte) => {
                write!(f, "invalid type tag 0x{:02x}", byte)
            }
            DecodeError::InvalidLength { declared } => {
                write!(f, "negative length {} declared on the wire", declared)
            }
            DecodeError::FieldTypeMismatch {
                context,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "{} declared as {} but encoded as {}",
                    context,
                    tag::name(*expected),
                    tag::name(*actual)
                )
            }
            DecodeError::MissingRequiredField { owner, field } => {
                write!(
                    f,
                    "required field \"{}.{}\" absent from the wire",
                    owner, field
                )
            }
            DecodeError::UnionFieldCountInvalid { owner, count } => {
                write!(
                    f,
                    "union \"{}\" decoded with {} fields set; exactly one expected",
                    owner, count
                )
            }
            DecodeError::NestingTooDeep { limit } => {
                write!(f, "input nests deeper than {} levels", limit)
            }
            DecodeError::InvalidUtf8(err) => {
                write!(f, "string field is not valid UTF-8: {}", err)
            }
            DecodeError::EnvelopeVersionMismatch { word } => {
                write!(
                    f,
                    "message envelope starts with 0x{:08x}, not the strict version marker",
                    word
                )
            }
            #[cfg(feature = "strict_enum_decode")]
            DecodeError::UnknownEnumValue { enum_name, value } => {
                write!(
                    f,
                    "value {} is not a declared member of enum \"{}\"",
                    value, enum_name
                )
            }
        }
    }
}

impl Error for DecodeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DecodeError::InvalidUtf8(err) => Some(err),
            _ => None,
        }
    }
}

impl From<FromUtf8Error> for DecodeError {
    fn from(err: FromUtf8Error) -> Self {
        DecodeError::InvalidUtf8(err)
    }
}

/// Type alias for `Result` with an error type of [`DecodeError`]
pub type DecodeResult<T> = std::result::Result<T, DecodeError>;
