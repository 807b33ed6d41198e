//! # tagwire
//!
//! A compact, tag-driven binary message codec with schema evolution.
//!
//! - Every field is written as a varint tag `(field_number << 4) | wire_type` followed by its
//!   payload, and every object ends with a zero stop tag
//! - Old readers skip fields they do not know; readers skip fields whose wire type changed
//! - Schemas are declared once per type with `#[derive(Message)]` (or by hand through
//!   [`Message::describe`]) and cached in a lock-free [`Registry`]
//! - Quotas on message size, field payload size, container length and nesting depth guard
//!   decoding of untrusted input
//!
//! ## Attributes
//!
//! - `#[tagwire(field = N)]`: Assigns the field number (1 to 2^28 - 1). Required on every
//!   serialized field, and must never change once data has been written.
//! - `#[tagwire(encoding = "varint" | "signed" | "fixed")]`: Selects the integer encoding for
//!   integral fields and the integral elements of container fields. `signed` is zigzag.
//! - `#[tagwire(getter = "path", setter = "path")]`: Routes access through functions instead of
//!   the field itself. The getter has the shape of the field's reference accessor.
//! - `#[tagwire(flatten)]`: Includes the fields of a nested message at this level.
//! - `#[tagwire(skip)]`: Never serialized; left at its default on decode.
//! - Container attributes `before_serialize`, `after_serialize`, `before_deserialize` and
//!   `after_deserialize` name lifecycle hooks.
//!
//! `Option<T>` fields are omitted when `None`. Other fields are always written, and fields
//! missing from the input keep their `Default` value.
//!
//! ## Feature Flags
//!
//! - `indexmap`: Enables `IndexMap` and `IndexSet` fields.

extern crate self as tagwire;

pub mod codec;
pub mod containers;
pub mod error;
pub mod io;
pub mod limits;
pub mod schema;
mod serializer;
pub mod wire;

use bytes::Bytes;

pub use containers::{IntMap, IntSet, LongMap, LongSet, PrimitiveMap, PrimitiveSet};
pub use error::{AccessError, CodecError, MalformedError, QuotaError, Result, SchemaError};
pub use io::{BufferReader, Reader, StreamReader, StreamWriter, Writer};
pub use limits::Limits;
pub use schema::{
    FieldType, IntEncoding, Message, ObjectRef, Registry, ScalarKind, SchemaBuilder, Shape,
    TypeDescriptor, Value, WireEnum,
};
pub use serializer::Serializer;
pub use tagwire_derive::{Message, WireEnum};
pub use wire::WireType;

/// Serializes `value` with the process-wide registry and default limits.
///
/// # Example
/// ```rust
/// use tagwire::{deserialize, serialize, Message};
///
/// #[derive(Message, Default, PartialEq, Debug)]
/// struct Point {
///     #[tagwire(field = 1, encoding = "signed")]
///     x: i32,
///     #[tagwire(field = 2, encoding = "signed")]
///     y: i32,
///     #[tagwire(field = 3)]
///     label: Option<String>,
/// }
///
/// let value = Point { x: -1, y: 2, label: None };
/// let bytes = serialize(&value).unwrap();
/// assert_eq!(&bytes[..], &[0x10, 0x01, 0x20, 0x04, 0x00]);
/// let decoded: Point = deserialize(&bytes).unwrap();
/// assert_eq!(value, decoded);
/// ```
pub fn serialize<T: Message>(value: &T) -> Result<Bytes> {
    Serializer::new().serialize(value)
}

/// Deserializes a `T` from `input` with the process-wide registry and default limits.
///
/// See [`serialize`] for an example.
pub fn deserialize<T: Message>(input: &[u8]) -> Result<T> {
    Serializer::new().deserialize(input)
}
