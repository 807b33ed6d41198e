use super::{scalar, EncodeContext, FieldIdent};
use crate::error::{shape_mismatch, Result};
use crate::io::Writer;
use crate::schema::{
    FieldType, IntEncoding, Message, ScalarKind, Shape, TypeDescriptor, Value, WireEnum,
};

/// Writes every present field of `value` followed by the stop tag.
pub(crate) fn encode_message<T: Message>(
    descriptor: &TypeDescriptor<T>,
    value: &T,
    writer: &mut dyn Writer,
    cx: &EncodeContext<'_>,
) -> Result<()> {
    descriptor.hooks().before_serialize(value);
    for field in descriptor.fields() {
        let at = FieldIdent::of(descriptor.type_name(), field);
        field.encode_field(value, writer, cx, &at)?;
    }
    writer.write_stop_tag()?;
    descriptor.hooks().after_serialize(value);
    Ok(())
}

/// Writes a nested message as an untagged payload, resolving its descriptor on first use.
pub fn encode_nested<T: Message>(
    value: &T,
    writer: &mut dyn Writer,
    cx: &EncodeContext<'_>,
) -> Result<()> {
    let descriptor = cx.registry.resolve::<T>()?;
    encode_message(&descriptor, value, writer, cx)
}

/// Writes the wire id of `value` with the integer encoding of `shape`.
pub fn write_enum<E: WireEnum>(value: E, shape: &Shape, writer: &mut dyn Writer) -> Result<()> {
    scalar::write_int(value.to_wire(), shape.int_encoding(), writer)
}

/// Writes the element wire type and the count, then each element untagged.
///
/// `len` must be the number of items the iterator yields.
pub(crate) fn write_collection<'a, T: FieldType>(
    shape: &Shape,
    len: usize,
    items: impl Iterator<Item = &'a T>,
    writer: &mut dyn Writer,
    cx: &EncodeContext<'_>,
    at: &FieldIdent,
) -> Result<()> {
    let Some(element) = shape.element() else {
        return Err(at.access_error(shape_mismatch("collection", shape.name())));
    };
    writer.write_wire_type(element.wire_type())?;
    writer.write_size(len)?;
    for item in items {
        item.encode_untagged(element, writer, cx, at)?;
    }
    Ok(())
}

/// Writes the key and value wire types and the count, then each entry as key then value.
pub(crate) fn write_map<'a, K: FieldType, V: FieldType>(
    shape: &Shape,
    len: usize,
    entries: impl Iterator<Item = (&'a K, &'a V)>,
    writer: &mut dyn Writer,
    cx: &EncodeContext<'_>,
    at: &FieldIdent,
) -> Result<()> {
    let Some((key, val)) = shape.entry() else {
        return Err(at.access_error(shape_mismatch("map", shape.name())));
    };
    writer.write_wire_type(key.wire_type())?;
    writer.write_wire_type(val.wire_type())?;
    writer.write_size(len)?;
    for (k, v) in entries {
        k.encode_untagged(key, writer, cx, at)?;
        v.encode_untagged(val, writer, cx, at)?;
    }
    Ok(())
}

/// Writes an untagged [`Value`] produced by a raw field accessor.
pub(crate) fn write_value(
    shape: &Shape,
    value: &Value<'_>,
    writer: &mut dyn Writer,
    at: &FieldIdent,
) -> Result<()> {
    match (shape, value) {
        (Shape::Scalar(kind, encoding), _) => write_scalar(*kind, *encoding, value, writer, at),
        (Shape::Bytes, Value::Bytes(bytes)) => writer.write_bytes_no_tag(bytes),
        (Shape::String, Value::Str(s)) => writer.write_string_no_tag(s),
        (
            Shape::List(element) | Shape::Set(element) | Shape::PrimitiveSet(element),
            Value::Collection(items),
        ) => {
            writer.write_wire_type(element.wire_type())?;
            writer.write_size(items.len())?;
            for item in items {
                write_value(element, item, writer, at)?;
            }
            Ok(())
        }
        (Shape::Map(key, val) | Shape::PrimitiveMap(key, val), Value::Map(entries)) => {
            writer.write_wire_type(key.wire_type())?;
            writer.write_wire_type(val.wire_type())?;
            writer.write_size(entries.len())?;
            for (k, v) in entries {
                write_value(key, k, writer, at)?;
                write_value(val, v, writer, at)?;
            }
            Ok(())
        }
        (shape, value) => Err(at.access_error(shape_mismatch(shape.name(), value.kind_name()))),
    }
}

fn write_scalar(
    kind: ScalarKind,
    encoding: IntEncoding,
    value: &Value<'_>,
    writer: &mut dyn Writer,
    at: &FieldIdent,
) -> Result<()> {
    match (kind, value) {
        (ScalarKind::Byte, &Value::Byte(v)) => scalar::write_byte(v, encoding, writer),
        (ScalarKind::Short, &Value::Short(v)) => scalar::write_short(v, encoding, writer),
        (ScalarKind::Int, &Value::Int(v)) | (ScalarKind::Enum, &Value::Enum(v)) => {
            scalar::write_int(v, encoding, writer)
        }
        (ScalarKind::Char, &Value::Char(c)) => scalar::write_char(c, encoding, writer),
        (ScalarKind::Long, &Value::Long(v)) => scalar::write_long(v, encoding, writer),
        (ScalarKind::Float, &Value::Float(v)) => writer.write_float_no_tag(v),
        (ScalarKind::Double, &Value::Double(v)) => writer.write_double_no_tag(v),
        (ScalarKind::Bool, &Value::Bool(v)) => writer.write_bool_no_tag(v),
        _ => Err(at.access_error(shape_mismatch(kind.name(), value.kind_name()))),
    }
}
