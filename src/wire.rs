//! Wire types and the tag bit layout.
//!
//! Every encoded field starts with a tag: `(field_number << 4) | wire_type`, written as a varint.
//! Field number `0` is reserved for the stop tag that terminates an object's field stream.

use crate::error::{MalformedError, Result};

/// Number of low bits in a tag that hold the wire type.
pub const TAG_TYPE_BITS: u32 = 4;
/// Mask selecting the wire type bits of a tag.
pub const TAG_TYPE_MASK: u32 = (1 << TAG_TYPE_BITS) - 1;
/// Smallest field number a real field may use.
pub const MIN_FIELD_NUMBER: u32 = 1;
/// Largest field number a real field may use (2^28 - 1).
pub const MAX_FIELD_NUMBER: u32 = (1 << (32 - TAG_TYPE_BITS)) - 1;
/// The end-of-object sentinel: field number 0, wire type VARINT.
pub const STOP_TAG: u32 = 0;

/// The on-the-wire shape of a value, independent of its semantic type.
///
/// The discriminants are part of the wire format and must never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum WireType {
    Varint = 0,
    Fixed8 = 1,
    Fixed16 = 2,
    Fixed32 = 3,
    Fixed64 = 4,
    /// Varint length prefix followed by raw bytes.
    Bytes = 5,
    /// Element wire type, count, then untagged elements.
    Collection = 6,
    /// Key wire type, value wire type, count, then untagged key/value pairs.
    Map = 7,
    /// A field stream terminated by its own stop tag.
    NestedObject = 8,
}

impl WireType {
    /// The numeric id stored in the low bits of a tag.
    #[inline]
    pub const fn id(self) -> u32 {
        self as u32
    }

    /// Looks up a wire type by its id.
    pub const fn from_id(id: u32) -> Option<WireType> {
        Some(match id {
            0 => WireType::Varint,
            1 => WireType::Fixed8,
            2 => WireType::Fixed16,
            3 => WireType::Fixed32,
            4 => WireType::Fixed64,
            5 => WireType::Bytes,
            6 => WireType::Collection,
            7 => WireType::Map,
            8 => WireType::NestedObject,
            _ => return None,
        })
    }

    /// Width in bytes for fixed-width wire types.
    pub const fn fixed_width(self) -> Option<usize> {
        match self {
            WireType::Fixed8 => Some(1),
            WireType::Fixed16 => Some(2),
            WireType::Fixed32 => Some(4),
            WireType::Fixed64 => Some(8),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            WireType::Varint => "VARINT",
            WireType::Fixed8 => "FIXED8",
            WireType::Fixed16 => "FIXED16",
            WireType::Fixed32 => "FIXED32",
            WireType::Fixed64 => "FIXED64",
            WireType::Bytes => "BYTES",
            WireType::Collection => "COLLECTION",
            WireType::Map => "MAP",
            WireType::NestedObject => "NESTED_OBJECT",
        }
    }
}

/// Parses a wire type id read from the input.
pub(crate) fn wire_type_from_input(id: u32) -> Result<WireType> {
    WireType::from_id(id).ok_or_else(|| MalformedError::UnknownWireType(id).into())
}

/// Returns true if `field_number` may be used by a real field.
#[inline]
pub const fn is_valid_field_number(field_number: u32) -> bool {
    field_number >= MIN_FIELD_NUMBER && field_number <= MAX_FIELD_NUMBER
}

/// Packs a field number and wire type into a tag.
///
/// Field numbers are validated when a schema is built, so this never fails.
#[inline]
pub const fn make_tag(field_number: u32, wire_type: WireType) -> u32 {
    (field_number << TAG_TYPE_BITS) | wire_type.id()
}

/// Extracts the field number from a tag.
#[inline]
pub const fn tag_field_number(tag: u32) -> u32 {
    tag >> TAG_TYPE_BITS
}

/// Extracts the raw wire type id from a tag.
#[inline]
pub const fn tag_wire_type(tag: u32) -> u32 {
    tag & TAG_TYPE_MASK
}

/// Splits a tag read from the input into its field number and wire type.
///
/// Fails when the wire type id is not one this format defines, since such a value cannot be
/// skipped.
pub fn split_tag(tag: u32) -> Result<(u32, WireType)> {
    Ok((tag_field_number(tag), wire_type_from_input(tag_wire_type(tag))?))
}
