use super::skip::{skip_value, skip_values};
use super::{scalar, DecodeContext, FieldIdent, PREALLOCATION_CAP};
use crate::error::{shape_mismatch, AccessError, Result};
use crate::io::Reader;
use crate::schema::{
    FieldType, IntEncoding, Message, ScalarKind, Shape, TypeDescriptor, Value, WireEnum,
};
use crate::wire;
use bytes::Bytes;
use std::borrow::Cow;
use tracing::{debug, warn};

/// Reads one object's field stream into a fresh `T`, consuming its stop tag.
pub(crate) fn decode_message<T: Message>(
    descriptor: &TypeDescriptor<T>,
    reader: &mut dyn Reader,
    cx: &mut DecodeContext<'_>,
) -> Result<T> {
    cx.enter()?;
    let mut instance = T::default();
    descriptor.hooks().before_deserialize(&mut instance);
    loop {
        let tag = reader.read_tag()?;
        if wire::tag_field_number(tag) == 0 {
            break;
        }
        let (number, wire_type) = wire::split_tag(tag)?;
        let Some(field) = descriptor.field(number) else {
            debug!(
                type_name = descriptor.type_name(),
                field_number = number,
                wire_type = wire_type.name(),
                "skipping unknown field"
            );
            skip_value(wire_type, reader, cx)?;
            continue;
        };
        if field.wire_type() != wire_type {
            warn!(
                type_name = descriptor.type_name(),
                field = field.name(),
                field_number = number,
                expected = field.wire_type().name(),
                found = wire_type.name(),
                "skipping field with mismatched wire type"
            );
            skip_value(wire_type, reader, cx)?;
            continue;
        }
        let at = FieldIdent::of(descriptor.type_name(), field);
        field.decode_field(&mut instance, reader, cx, &at)?;
    }
    descriptor.hooks().after_deserialize(&mut instance);
    cx.leave();
    Ok(instance)
}

/// Reads a nested message payload, resolving its descriptor on first use.
pub fn decode_nested<T: Message>(reader: &mut dyn Reader, cx: &mut DecodeContext<'_>) -> Result<T> {
    let descriptor = cx.registry.resolve::<T>()?;
    decode_message(&descriptor, reader, cx)
}

/// Reads a wire id with the integer encoding of `shape`.
///
/// An id with no matching constant is an error rather than a silent default.
pub fn read_enum<E: WireEnum>(
    shape: &Shape,
    reader: &mut dyn Reader,
    at: &FieldIdent,
) -> Result<E> {
    let id = scalar::read_int(shape.int_encoding(), reader)?;
    E::from_wire(id).ok_or_else(|| {
        at.access_error(AccessError::UnknownEnumId {
            enum_name: E::NAME,
            id,
        })
    })
}

/// Reads a length-prefixed string after checking its length against the field byte quota.
pub(crate) fn read_string(reader: &mut dyn Reader, cx: &DecodeContext<'_>) -> Result<String> {
    let size = reader.read_size()?;
    cx.limits.check_field_bytes(size)?;
    reader.read_string(size)
}

pub(crate) fn read_bytes(reader: &mut dyn Reader, cx: &DecodeContext<'_>) -> Result<Bytes> {
    let size = reader.read_size()?;
    cx.limits.check_field_bytes(size)?;
    reader.read_bytes(size)
}

/// Reads a collection header and returns its element count.
///
/// Returns `None` when the declared element wire type disagrees with `element`; the elements are
/// skipped and the field is left unset.
fn collection_header(
    element: &Shape,
    reader: &mut dyn Reader,
    cx: &mut DecodeContext<'_>,
    at: &FieldIdent,
) -> Result<Option<usize>> {
    let element_type = reader.read_wire_type()?;
    let count = reader.read_size()?;
    cx.limits.check_container_len(count)?;
    if element_type != element.wire_type() {
        warn!(
            type_name = at.type_name,
            field = at.field,
            field_number = at.number,
            expected = element.wire_type().name(),
            found = element_type.name(),
            "skipping collection with mismatched element wire type"
        );
        skip_values(element_type, count, reader, cx)?;
        return Ok(None);
    }
    Ok(Some(count))
}

fn map_header(
    key: &Shape,
    val: &Shape,
    reader: &mut dyn Reader,
    cx: &mut DecodeContext<'_>,
    at: &FieldIdent,
) -> Result<Option<usize>> {
    let key_type = reader.read_wire_type()?;
    let value_type = reader.read_wire_type()?;
    let count = reader.read_size()?;
    cx.limits.check_container_len(count)?;
    if key_type != key.wire_type() || value_type != val.wire_type() {
        warn!(
            type_name = at.type_name,
            field = at.field,
            field_number = at.number,
            expected_key = key.wire_type().name(),
            found_key = key_type.name(),
            expected_value = val.wire_type().name(),
            found_value = value_type.name(),
            "skipping map with mismatched entry wire types"
        );
        cx.enter()?;
        for _ in 0..count {
            skip_value(key_type, reader, cx)?;
            skip_value(value_type, reader, cx)?;
        }
        cx.leave();
        return Ok(None);
    }
    Ok(Some(count))
}

/// Reads a collection straight into the container built by `with_capacity` and filled by `push`.
///
/// The capacity hint is the declared count capped at [`PREALLOCATION_CAP`].
pub(crate) fn read_collection<T: FieldType, C>(
    shape: &Shape,
    reader: &mut dyn Reader,
    cx: &mut DecodeContext<'_>,
    at: &FieldIdent,
    with_capacity: impl FnOnce(usize) -> C,
    mut push: impl FnMut(&mut C, T),
) -> Result<Option<C>> {
    let Some(element) = shape.element() else {
        return Err(at.access_error(shape_mismatch("collection", shape.name())));
    };
    let Some(count) = collection_header(element, reader, cx, at)? else {
        return Ok(None);
    };
    cx.enter()?;
    let mut items = with_capacity(count.min(PREALLOCATION_CAP));
    let mut complete = true;
    for _ in 0..count {
        match T::decode_untagged(element, reader, cx, at)? {
            Some(item) => push(&mut items, item),
            None => complete = false,
        }
    }
    cx.leave();
    Ok(complete.then_some(items))
}

/// Reads a map straight into the container built by `with_capacity` and filled by `insert`.
pub(crate) fn read_map<K: FieldType, V: FieldType, C>(
    shape: &Shape,
    reader: &mut dyn Reader,
    cx: &mut DecodeContext<'_>,
    at: &FieldIdent,
    with_capacity: impl FnOnce(usize) -> C,
    mut insert: impl FnMut(&mut C, K, V),
) -> Result<Option<C>> {
    let Some((key, val)) = shape.entry() else {
        return Err(at.access_error(shape_mismatch("map", shape.name())));
    };
    let Some(count) = map_header(key, val, reader, cx, at)? else {
        return Ok(None);
    };
    cx.enter()?;
    let mut entries = with_capacity(count.min(PREALLOCATION_CAP));
    let mut complete = true;
    for _ in 0..count {
        let k = K::decode_untagged(key, reader, cx, at)?;
        let v = V::decode_untagged(val, reader, cx, at)?;
        match (k, v) {
            (Some(k), Some(v)) => insert(&mut entries, k, v),
            _ => complete = false,
        }
    }
    cx.leave();
    Ok(complete.then_some(entries))
}

/// Reads an untagged payload of `shape` into a [`Value`] for a raw field accessor.
///
/// Returns `None` when a container's element wire types disagree with the shape.
pub(crate) fn read_value(
    shape: &Shape,
    reader: &mut dyn Reader,
    cx: &mut DecodeContext<'_>,
    at: &FieldIdent,
) -> Result<Option<Value<'static>>> {
    let value = match shape {
        Shape::Scalar(kind, encoding) => read_scalar(*kind, *encoding, reader)?,
        Shape::Bytes => Value::Bytes(read_bytes(reader, cx)?),
        Shape::String => Value::Str(Cow::Owned(read_string(reader, cx)?)),
        Shape::List(element) | Shape::Set(element) | Shape::PrimitiveSet(element) => {
            let Some(count) = collection_header(element, reader, cx, at)? else {
                return Ok(None);
            };
            cx.enter()?;
            let mut items = Vec::with_capacity(count.min(PREALLOCATION_CAP));
            let mut complete = true;
            for _ in 0..count {
                match read_value(element, reader, cx, at)? {
                    Some(item) => items.push(item),
                    None => complete = false,
                }
            }
            cx.leave();
            if !complete {
                return Ok(None);
            }
            Value::Collection(items)
        }
        Shape::Map(key, val) | Shape::PrimitiveMap(key, val) => {
            let Some(count) = map_header(key, val, reader, cx, at)? else {
                return Ok(None);
            };
            cx.enter()?;
            let mut entries = Vec::with_capacity(count.min(PREALLOCATION_CAP));
            let mut complete = true;
            for _ in 0..count {
                let k = read_value(key, reader, cx, at)?;
                let v = read_value(val, reader, cx, at)?;
                match (k, v) {
                    (Some(k), Some(v)) => entries.push((k, v)),
                    _ => complete = false,
                }
            }
            cx.leave();
            if !complete {
                return Ok(None);
            }
            Value::Map(entries)
        }
        Shape::Object(_) => return Err(at.access_error(shape_mismatch("raw value", "object"))),
    };
    Ok(Some(value))
}

fn read_scalar(
    kind: ScalarKind,
    encoding: IntEncoding,
    reader: &mut dyn Reader,
) -> Result<Value<'static>> {
    Ok(match kind {
        ScalarKind::Byte => Value::Byte(scalar::read_byte(encoding, reader)?),
        ScalarKind::Short => Value::Short(scalar::read_short(encoding, reader)?),
        ScalarKind::Int => Value::Int(scalar::read_int(encoding, reader)?),
        ScalarKind::Enum => Value::Enum(scalar::read_int(encoding, reader)?),
        ScalarKind::Char => Value::Char(scalar::read_char(encoding, reader)?),
        ScalarKind::Long => Value::Long(scalar::read_long(encoding, reader)?),
        ScalarKind::Float => Value::Float(reader.read_float()?),
        ScalarKind::Double => Value::Double(reader.read_double()?),
        ScalarKind::Bool => Value::Bool(reader.read_bool()?),
    })
}
