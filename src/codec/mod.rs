//! The tagged field stream codec.
//!
//! An object is written as its present fields in ascending field-number order, each a tag
//! followed by a payload, and terminated by the stop tag. Decoding accepts any field order, skips
//! fields it does not know, and skips fields whose wire type disagrees with the local schema.
//!
//! Typed fields stream straight between the Rust value and the wire through
//! [`crate::FieldType`]; only `raw_field` accessors go through [`crate::Value`].

mod decode;
mod encode;
mod scalar;
mod skip;

pub(crate) use decode::{
    decode_message, read_bytes, read_collection, read_map, read_string, read_value,
};
pub use decode::{decode_nested, read_enum};
pub(crate) use encode::{encode_message, write_collection, write_map, write_value};
pub use encode::{encode_nested, write_enum};
pub(crate) use scalar::*;
pub use skip::skip_message;

use crate::error::{AccessError, CodecError, QuotaError};
use crate::limits::Limits;
use crate::schema::{FieldDescriptor, Registry};

/// Upper bound on elements preallocated for a container before any of them is read.
///
/// A declared count is only a claim; allocation beyond this grows as elements actually arrive.
pub(crate) const PREALLOCATION_CAP: usize = 1024;

/// State shared by one encode call.
pub struct EncodeContext<'r> {
    pub(crate) registry: &'r Registry,
}

/// State of one decode call: where nested descriptors come from, the quotas, and how deep the
/// reader currently is inside nested objects and containers.
pub struct DecodeContext<'r> {
    pub(crate) registry: &'r Registry,
    pub(crate) limits: &'r Limits,
    depth: usize,
}

impl<'r> DecodeContext<'r> {
    pub(crate) fn new(registry: &'r Registry, limits: &'r Limits) -> Self {
        DecodeContext {
            registry,
            limits,
            depth: 0,
        }
    }

    #[inline]
    pub(crate) fn enter(&mut self) -> Result<(), QuotaError> {
        self.depth += 1;
        self.limits.check_depth(self.depth)
    }

    #[inline]
    pub(crate) fn leave(&mut self) {
        self.depth -= 1;
    }
}

/// Identifies the field being processed, for error reporting and diagnostics.
#[derive(Debug, Clone, Copy)]
pub struct FieldIdent {
    pub(crate) type_name: &'static str,
    pub(crate) field: &'static str,
    pub(crate) number: u32,
}

impl FieldIdent {
    pub(crate) fn of<T>(type_name: &'static str, field: &FieldDescriptor<T>) -> Self {
        FieldIdent {
            type_name,
            field: field.name(),
            number: field.number(),
        }
    }

    #[cold]
    pub(crate) fn access_error(&self, source: AccessError) -> CodecError {
        CodecError::FieldAccess {
            type_name: self.type_name,
            field: self.field,
            number: self.number,
            source,
        }
    }
}
