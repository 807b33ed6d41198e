//! Error taxonomy for schema resolution, encoding and decoding.
//!
//! Unknown fields and wire-type mismatches are deliberately absent from this module: they are
//! skipped during decode and only reported through `tracing`.

use std::str::Utf8Error;

/// Errors that can occur while resolving a schema, encoding or decoding a message.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The type's schema could not be built.
    #[error(transparent)]
    Schema(#[from] SchemaError),
    /// The input bytes do not form a valid message.
    #[error(transparent)]
    Malformed(#[from] MalformedError),
    /// A configured quota was exceeded.
    #[error(transparent)]
    Quota(#[from] QuotaError),
    /// Reading or writing a field through its accessor failed.
    #[error("Failed to access field '{field}' (#{number}) of {type_name}: {source}")]
    FieldAccess {
        type_name: &'static str,
        field: &'static str,
        number: u32,
        #[source]
        source: AccessError,
    },
    /// A length or count does not fit the 31-bit length encoding.
    #[error("Length {0} does not fit the wire length encoding")]
    LengthOverflow(usize),
    /// The underlying source or sink failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// The result type used throughout this crate.
pub type Result<T> = std::result::Result<T, CodecError>;

/// Fatal schema errors, raised the first time a type is resolved.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("Field number {number} of {type_name}.{field} is outside 1..={max}")]
    InvalidFieldNumber {
        type_name: &'static str,
        field: &'static str,
        number: u32,
        max: u32,
    },
    #[error("Field number {number} is declared twice in {type_name} ('{first}' and '{second}')")]
    DuplicateFieldNumber {
        type_name: &'static str,
        number: u32,
        first: &'static str,
        second: &'static str,
    },
    #[error("Unsupported shape for {type_name}.{field}: {reason}")]
    UnsupportedShape {
        type_name: &'static str,
        field: &'static str,
        reason: &'static str,
    },
}

/// Decode-time errors caused by input that does not follow the wire format.
#[derive(Debug, thiserror::Error)]
pub enum MalformedError {
    #[error("Malformed varint: no terminating byte within {max_bytes} bytes")]
    MalformedVarint { max_bytes: usize },
    #[error("Varint does not fit in {bits} bits")]
    VarintOverflow { bits: u32 },
    #[error("Negative length or count: {0}")]
    NegativeSize(i32),
    #[error("Truncated message: needed {needed} bytes, {available} available")]
    Truncated { needed: usize, available: usize },
    #[error("Unknown wire type id {0}")]
    UnknownWireType(u32),
    #[error("Invalid UTF-8 in string payload: {0}")]
    InvalidUtf8(#[from] Utf8Error),
    #[error("Invalid char code point 0x{0:X}")]
    InvalidChar(u32),
}

/// A configured size quota was exceeded.
#[derive(Debug, thiserror::Error)]
pub enum QuotaError {
    #[error("Field payload of {size} bytes exceeds the limit of {limit} bytes")]
    FieldBytes { size: usize, limit: usize },
    #[error("Container of {count} elements exceeds the limit of {limit} elements")]
    ContainerLength { count: usize, limit: usize },
    #[error("Serialized message of {size} bytes exceeds the limit of {limit} bytes")]
    MessageBytes { size: usize, limit: usize },
    #[error("Nesting depth exceeds the limit of {limit}")]
    Depth { limit: usize },
}

/// Failures raised by a field accessor while converting between a field and a [`crate::Value`].
#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    #[error("expected a {expected} value, found {found}")]
    ShapeMismatch {
        expected: &'static str,
        found: &'static str,
    },
    #[error("unknown {enum_name} id {id}")]
    UnknownEnumId { enum_name: &'static str, id: i32 },
}

#[cold]
pub(crate) fn truncated(needed: usize, available: usize) -> CodecError {
    CodecError::Malformed(MalformedError::Truncated { needed, available })
}

#[cold]
pub(crate) fn shape_mismatch(expected: &'static str, found: &'static str) -> AccessError {
    AccessError::ShapeMismatch { expected, found }
}

impl CodecError {
    /// Returns true if the error was caused by an exceeded quota.
    pub fn is_quota(&self) -> bool {
        matches!(self, CodecError::Quota(_))
    }

    /// Returns true if the error was caused by malformed or truncated input.
    pub fn is_malformed(&self) -> bool {
        matches!(self, CodecError::Malformed(_))
    }
}
