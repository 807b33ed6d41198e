use crate::error::{MalformedError, Result};
use crate::io::{Reader, Writer};
use crate::schema::IntEncoding;

#[inline]
fn write_int32(value: i32, encoding: IntEncoding, writer: &mut dyn Writer) -> Result<()> {
    match encoding {
        IntEncoding::SignedVarint => writer.write_sint32_no_tag(value),
        _ => writer.write_int32_no_tag(value),
    }
}

#[inline]
fn read_int32(encoding: IntEncoding, reader: &mut dyn Reader) -> Result<i32> {
    match encoding {
        IntEncoding::SignedVarint => reader.read_sint32(),
        _ => reader.read_int32(),
    }
}

pub(crate) fn write_byte(value: i8, encoding: IntEncoding, writer: &mut dyn Writer) -> Result<()> {
    match encoding {
        IntEncoding::Fixed => writer.write_raw_little_endian8(value as u8),
        _ => write_int32(value as i32, encoding, writer),
    }
}

pub(crate) fn read_byte(encoding: IntEncoding, reader: &mut dyn Reader) -> Result<i8> {
    match encoding {
        IntEncoding::Fixed => Ok(reader.read_raw_little_endian8()? as i8),
        _ => Ok(read_int32(encoding, reader)? as i8),
    }
}

pub(crate) fn write_short(
    value: i16,
    encoding: IntEncoding,
    writer: &mut dyn Writer,
) -> Result<()> {
    match encoding {
        IntEncoding::Fixed => writer.write_raw_little_endian16(value as u16),
        _ => write_int32(value as i32, encoding, writer),
    }
}

pub(crate) fn read_short(encoding: IntEncoding, reader: &mut dyn Reader) -> Result<i16> {
    match encoding {
        IntEncoding::Fixed => Ok(reader.read_raw_little_endian16()? as i16),
        _ => Ok(read_int32(encoding, reader)? as i16),
    }
}

/// Ints and enum ids.
pub(crate) fn write_int(value: i32, encoding: IntEncoding, writer: &mut dyn Writer) -> Result<()> {
    match encoding {
        IntEncoding::Fixed => writer.write_fixed32_no_tag(value as u32),
        _ => write_int32(value, encoding, writer),
    }
}

pub(crate) fn read_int(encoding: IntEncoding, reader: &mut dyn Reader) -> Result<i32> {
    match encoding {
        IntEncoding::Fixed => Ok(reader.read_fixed32()? as i32),
        _ => read_int32(encoding, reader),
    }
}

pub(crate) fn write_char(
    value: char,
    encoding: IntEncoding,
    writer: &mut dyn Writer,
) -> Result<()> {
    match encoding {
        IntEncoding::Fixed => writer.write_fixed32_no_tag(value as u32),
        _ => write_int32(value as i32, encoding, writer),
    }
}

/// Code points that are not Unicode scalar values are malformed input.
pub(crate) fn read_char(encoding: IntEncoding, reader: &mut dyn Reader) -> Result<char> {
    let code = match encoding {
        IntEncoding::Fixed => reader.read_fixed32()?,
        _ => read_int32(encoding, reader)? as u32,
    };
    Ok(char::from_u32(code).ok_or(MalformedError::InvalidChar(code))?)
}

pub(crate) fn write_long(value: i64, encoding: IntEncoding, writer: &mut dyn Writer) -> Result<()> {
    match encoding {
        IntEncoding::Varint => writer.write_int64_no_tag(value),
        IntEncoding::SignedVarint => writer.write_sint64_no_tag(value),
        IntEncoding::Fixed => writer.write_fixed64_no_tag(value as u64),
    }
}

pub(crate) fn read_long(encoding: IntEncoding, reader: &mut dyn Reader) -> Result<i64> {
    match encoding {
        IntEncoding::Varint => reader.read_int64(),
        IntEncoding::SignedVarint => reader.read_sint64(),
        IntEncoding::Fixed => Ok(reader.read_fixed64()? as i64),
    }
}
