use super::DecodeContext;
use crate::error::{CodecError, Result};
use crate::io::Reader;
use crate::limits::Limits;
use crate::schema::Registry;
use crate::wire::{self, WireType};

/// Consumes one complete object field stream, including its stop tag, without decoding it.
///
/// Payload lengths, container counts and nesting depth are still checked against `limits`.
pub fn skip_message(reader: &mut dyn Reader, limits: &Limits) -> Result<()> {
    let mut cx = skip_context(limits);
    skip_value(WireType::NestedObject, reader, &mut cx)
}

/// Skipping never resolves a descriptor, so the shared registry stands in.
fn skip_context(limits: &Limits) -> DecodeContext<'_> {
    DecodeContext::new(Registry::global(), limits)
}

/// Consumes one payload of `wire_type`.
pub(crate) fn skip_value(
    wire_type: WireType,
    reader: &mut dyn Reader,
    cx: &mut DecodeContext<'_>,
) -> Result<()> {
    match wire_type {
        WireType::Varint => {
            reader.read_raw_varint64()?;
        }
        WireType::Fixed8 => reader.skip_raw_bytes(1)?,
        WireType::Fixed16 => reader.skip_raw_bytes(2)?,
        WireType::Fixed32 => reader.skip_raw_bytes(4)?,
        WireType::Fixed64 => reader.skip_raw_bytes(8)?,
        WireType::Bytes => {
            let size = reader.read_size()?;
            cx.limits.check_field_bytes(size)?;
            reader.skip_raw_bytes(size)?;
        }
        WireType::Collection => {
            let element_type = reader.read_wire_type()?;
            let count = reader.read_size()?;
            cx.limits.check_container_len(count)?;
            skip_values(element_type, count, reader, cx)?;
        }
        WireType::Map => {
            let key_type = reader.read_wire_type()?;
            let value_type = reader.read_wire_type()?;
            let count = reader.read_size()?;
            cx.limits.check_container_len(count)?;
            cx.enter()?;
            for _ in 0..count {
                skip_value(key_type, reader, cx)?;
                skip_value(value_type, reader, cx)?;
            }
            cx.leave();
        }
        WireType::NestedObject => {
            cx.enter()?;
            loop {
                let tag = reader.read_tag()?;
                if wire::tag_field_number(tag) == 0 {
                    break;
                }
                let (_, field_type) = wire::split_tag(tag)?;
                skip_value(field_type, reader, cx)?;
            }
            cx.leave();
        }
    }
    Ok(())
}

/// Consumes `count` untagged payloads of `wire_type`. Fixed-width runs are skipped in one step.
pub(crate) fn skip_values(
    wire_type: WireType,
    count: usize,
    reader: &mut dyn Reader,
    cx: &mut DecodeContext<'_>,
) -> Result<()> {
    if let Some(width) = wire_type.fixed_width() {
        let total = width
            .checked_mul(count)
            .ok_or(CodecError::LengthOverflow(count))?;
        return reader.skip_raw_bytes(total);
    }
    cx.enter()?;
    for _ in 0..count {
        skip_value(wire_type, reader, cx)?;
    }
    cx.leave();
    Ok(())
}
