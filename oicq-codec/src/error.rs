//! Codec-level error type.

use std::fmt;

use crate::jce::JceType;

/// Errors produced while encoding or decoding JCE / Wup data.
#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    /// Ran out of bytes before the value was fully read.
    TruncatedInput,
    /// A fixed-capacity writer had no room left.
    OutOfSpace,
    /// A field head carried a wire type the declared field cannot absorb.
    TypeMismatch { expected: JceType, got: JceType },
    /// A head byte carried a type nibble outside the JCE catalogue.
    UnknownType { raw: u8 },
    /// Field tags above 255 cannot be encoded in a head.
    TagTooLarge { tag: u32 },
    /// A non-optional field was absent from the wire.
    MissingField { name: &'static str },
    /// A string exceeded the writable limit.
    StringTooLong { len: usize },
    /// A decoded size field was negative or over the hard limit.
    InvalidSize { size: i64 },
    /// A decoded string was not valid UTF-8.
    InvalidUtf8,
    /// Attribute lookup found no entry under the requested name.
    AttributeNotFound { name: String },
    /// Attribute exists but was stored under a different type name.
    AttributeTypeMismatch { name: String, expected: String },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TruncatedInput => write!(f, "unexpected end of input"),
            Self::OutOfSpace => write!(f, "no space left in output buffer"),
            Self::TypeMismatch { expected, got } => {
                write!(f, "type mismatch: expected {expected}, got {got}")
            }
            Self::UnknownType { raw } => write!(f, "unknown jce type {raw:#04x}"),
            Self::TagTooLarge { tag } => write!(f, "tag {tag} does not fit in a head"),
            Self::MissingField { name } => {
                write!(f, "field \"{name}\" is not optional but absent")
            }
            Self::StringTooLong { len } => write!(f, "string of {len} bytes exceeds the limit"),
            Self::InvalidSize { size } => write!(f, "invalid size {size}"),
            Self::InvalidUtf8 => write!(f, "string payload is not valid utf-8"),
            Self::AttributeNotFound { name } => write!(f, "no attribute named \"{name}\""),
            Self::AttributeTypeMismatch { name, expected } => {
                write!(f, "attribute \"{name}\" holds no value of type {expected}")
            }
        }
    }
}

impl std::error::Error for Error {}

/// Specialized `Result` for codec operations.
pub type Result<T> = std::result::Result<T, Error>;
