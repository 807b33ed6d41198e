//! Byte-level read and write cursors.
//!
//! [`Writer`] and [`Reader`] each have exactly two required byte primitives (plus position
//! reporting); every varint, zigzag, fixed-width and length-prefixed operation is a provided
//! method built on top of them, so the buffer-backed and stream-backed backends share one
//! algorithmic contract.
//!
//! Both traits are object safe. The codec engine drives them as `&mut dyn Writer` /
//! `&mut dyn Reader`.

mod buffer;
mod stream;

pub use buffer::BufferReader;
pub use stream::{StreamReader, StreamWriter, DEFAULT_BUFFER_SIZE, MIN_BUFFER_SIZE};

use crate::error::{CodecError, MalformedError, Result};
use crate::wire::{self, WireType};
use bytes::Bytes;

/// Maximum bytes of a 32-bit varint written from a non-negative or unsigned value.
pub const MAX_VARINT32_BYTES: usize = 5;
/// Maximum bytes of any varint, including sign-extended negative 32-bit values.
pub const MAX_VARINT_BYTES: usize = 10;

/// Maps an `i32` to a `u32` so that small magnitudes, negative or not, stay small.
#[inline]
pub const fn encode_zig_zag32(n: i32) -> u32 {
    ((n << 1) ^ (n >> 31)) as u32
}

/// Maps an `i64` to a `u64` so that small magnitudes, negative or not, stay small.
#[inline]
pub const fn encode_zig_zag64(n: i64) -> u64 {
    ((n << 1) ^ (n >> 63)) as u64
}

/// Exact inverse of [`encode_zig_zag32`].
#[inline]
pub const fn decode_zig_zag32(n: u32) -> i32 {
    ((n >> 1) as i32) ^ -((n & 1) as i32)
}

/// Exact inverse of [`encode_zig_zag64`].
#[inline]
pub const fn decode_zig_zag64(n: u64) -> i64 {
    ((n >> 1) as i64) ^ -((n & 1) as i64)
}

/// Number of bytes [`Writer::write_raw_varint32`] emits for `value`.
#[inline]
pub const fn varint32_size(value: u32) -> usize {
    varint64_size(value as u64)
}

/// Number of bytes [`Writer::write_raw_varint64`] emits for `value`.
#[inline]
pub const fn varint64_size(value: u64) -> usize {
    let bits = 64 - (value | 1).leading_zeros() as usize;
    (bits + 6) / 7
}

/// Number of bytes [`Writer::write_int32_no_tag`] emits for `value`.
#[inline]
pub const fn int32_size(value: i32) -> usize {
    if value >= 0 {
        varint32_size(value as u32)
    } else {
        MAX_VARINT_BYTES
    }
}

/// A byte sink.
///
/// Implementations only provide [`Writer::write_raw_byte`], [`Writer::write_raw_bytes`] and
/// [`Writer::position`]; everything else is derived from them.
pub trait Writer {
    /// Writes a single byte.
    fn write_raw_byte(&mut self, value: u8) -> Result<()>;

    /// Writes all of `src`.
    fn write_raw_bytes(&mut self, src: &[u8]) -> Result<()>;

    /// Total number of bytes written so far.
    fn position(&self) -> u64;

    /// Pushes buffered bytes to the underlying sink, if any.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    /// Writes `value` 7 bits at a time, least significant group first.
    fn write_raw_varint32(&mut self, value: u32) -> Result<()> {
        self.write_raw_varint64(value as u64)
    }

    fn write_raw_varint64(&mut self, mut value: u64) -> Result<()> {
        if value < 0x80 {
            return self.write_raw_byte(value as u8);
        }
        let mut buf = [0u8; MAX_VARINT_BYTES];
        let mut len = 0;
        while value >= 0x80 {
            buf[len] = (value as u8) | 0x80;
            value >>= 7;
            len += 1;
        }
        buf[len] = value as u8;
        self.write_raw_bytes(&buf[..=len])
    }

    fn write_raw_little_endian8(&mut self, value: u8) -> Result<()> {
        self.write_raw_byte(value)
    }

    fn write_raw_little_endian16(&mut self, value: u16) -> Result<()> {
        self.write_raw_bytes(&value.to_le_bytes())
    }

    fn write_raw_little_endian32(&mut self, value: u32) -> Result<()> {
        self.write_raw_bytes(&value.to_le_bytes())
    }

    fn write_raw_little_endian64(&mut self, value: u64) -> Result<()> {
        self.write_raw_bytes(&value.to_le_bytes())
    }

    fn write_tag(&mut self, field_number: u32, wire_type: WireType) -> Result<()> {
        self.write_raw_varint32(wire::make_tag(field_number, wire_type))
    }

    /// Terminates the current object's field stream.
    fn write_stop_tag(&mut self) -> Result<()> {
        self.write_raw_varint32(wire::STOP_TAG)
    }

    fn write_wire_type(&mut self, wire_type: WireType) -> Result<()> {
        self.write_raw_varint32(wire_type.id())
    }

    /// Writes a length or count. Values above `i32::MAX` cannot be represented.
    fn write_size(&mut self, size: usize) -> Result<()> {
        if size > i32::MAX as usize {
            return Err(CodecError::LengthOverflow(size));
        }
        self.write_raw_varint32(size as u32)
    }

    /// Negative values are sign-extended to the 10-byte 64-bit form so that 32-bit and 64-bit
    /// readers agree on the same bytes.
    fn write_int32_no_tag(&mut self, value: i32) -> Result<()> {
        if value >= 0 {
            self.write_raw_varint32(value as u32)
        } else {
            self.write_raw_varint64(value as i64 as u64)
        }
    }

    fn write_sint32_no_tag(&mut self, value: i32) -> Result<()> {
        self.write_raw_varint32(encode_zig_zag32(value))
    }

    fn write_int64_no_tag(&mut self, value: i64) -> Result<()> {
        self.write_raw_varint64(value as u64)
    }

    fn write_sint64_no_tag(&mut self, value: i64) -> Result<()> {
        self.write_raw_varint64(encode_zig_zag64(value))
    }

    fn write_fixed32_no_tag(&mut self, value: u32) -> Result<()> {
        self.write_raw_little_endian32(value)
    }

    fn write_fixed64_no_tag(&mut self, value: u64) -> Result<()> {
        self.write_raw_little_endian64(value)
    }

    fn write_float_no_tag(&mut self, value: f32) -> Result<()> {
        self.write_raw_little_endian32(value.to_bits())
    }

    fn write_double_no_tag(&mut self, value: f64) -> Result<()> {
        self.write_raw_little_endian64(value.to_bits())
    }

    fn write_bool_no_tag(&mut self, value: bool) -> Result<()> {
        self.write_raw_byte(value as u8)
    }

    fn write_string_no_tag(&mut self, value: &str) -> Result<()> {
        self.write_bytes_no_tag(value.as_bytes())
    }

    fn write_bytes_no_tag(&mut self, value: &[u8]) -> Result<()> {
        self.write_size(value.len())?;
        self.write_raw_bytes(value)
    }

    fn write_int32(&mut self, field_number: u32, value: i32) -> Result<()> {
        self.write_tag(field_number, WireType::Varint)?;
        self.write_int32_no_tag(value)
    }

    fn write_sint32(&mut self, field_number: u32, value: i32) -> Result<()> {
        self.write_tag(field_number, WireType::Varint)?;
        self.write_sint32_no_tag(value)
    }

    fn write_int64(&mut self, field_number: u32, value: i64) -> Result<()> {
        self.write_tag(field_number, WireType::Varint)?;
        self.write_int64_no_tag(value)
    }

    fn write_sint64(&mut self, field_number: u32, value: i64) -> Result<()> {
        self.write_tag(field_number, WireType::Varint)?;
        self.write_sint64_no_tag(value)
    }

    fn write_fixed32(&mut self, field_number: u32, value: u32) -> Result<()> {
        self.write_tag(field_number, WireType::Fixed32)?;
        self.write_fixed32_no_tag(value)
    }

    fn write_fixed64(&mut self, field_number: u32, value: u64) -> Result<()> {
        self.write_tag(field_number, WireType::Fixed64)?;
        self.write_fixed64_no_tag(value)
    }

    fn write_float(&mut self, field_number: u32, value: f32) -> Result<()> {
        self.write_tag(field_number, WireType::Fixed32)?;
        self.write_float_no_tag(value)
    }

    fn write_double(&mut self, field_number: u32, value: f64) -> Result<()> {
        self.write_tag(field_number, WireType::Fixed64)?;
        self.write_double_no_tag(value)
    }

    fn write_bool(&mut self, field_number: u32, value: bool) -> Result<()> {
        self.write_tag(field_number, WireType::Varint)?;
        self.write_bool_no_tag(value)
    }

    fn write_string(&mut self, field_number: u32, value: &str) -> Result<()> {
        self.write_tag(field_number, WireType::Bytes)?;
        self.write_string_no_tag(value)
    }

    fn write_bytes(&mut self, field_number: u32, value: &[u8]) -> Result<()> {
        self.write_tag(field_number, WireType::Bytes)?;
        self.write_bytes_no_tag(value)
    }
}

/// A byte source.
///
/// Implementations only provide [`Reader::read_raw_byte`], [`Reader::read_raw_bytes`],
/// [`Reader::skip_raw_bytes`] and [`Reader::position`]. Running out of input is reported as
/// [`MalformedError::Truncated`].
pub trait Reader {
    /// Reads and consumes a single byte.
    fn read_raw_byte(&mut self) -> Result<u8>;

    /// Fills `dst` completely.
    fn read_raw_bytes(&mut self, dst: &mut [u8]) -> Result<()>;

    /// Consumes `len` bytes without copying them out.
    fn skip_raw_bytes(&mut self, len: usize) -> Result<()>;

    /// Total number of bytes consumed so far.
    fn position(&self) -> u64;

    /// Reads an unsigned varint of at most 5 bytes whose value fits in 32 bits.
    fn read_raw_varint32(&mut self) -> Result<u32> {
        read_varint32(self, false)
    }

    /// Reads a varint of at most 10 bytes whose value fits in 64 bits.
    fn read_raw_varint64(&mut self) -> Result<u64> {
        let mut result = 0u64;
        for shift in (0..63).step_by(7) {
            let byte = next_varint_byte(self)?;
            result |= ((byte & 0x7F) as u64) << shift;
            if byte & 0x80 == 0 {
                return Ok(result);
            }
        }
        match next_varint_byte(self)? {
            byte if byte & 0x80 != 0 => Err(malformed_varint()),
            byte if byte > 0x01 => Err(MalformedError::VarintOverflow { bits: 64 }.into()),
            byte => Ok(result | (byte as u64) << 63),
        }
    }

    fn read_raw_little_endian8(&mut self) -> Result<u8> {
        self.read_raw_byte()
    }

    fn read_raw_little_endian16(&mut self) -> Result<u16> {
        let mut bytes = [0u8; 2];
        self.read_raw_bytes(&mut bytes)?;
        Ok(u16::from_le_bytes(bytes))
    }

    fn read_raw_little_endian32(&mut self) -> Result<u32> {
        let mut bytes = [0u8; 4];
        self.read_raw_bytes(&mut bytes)?;
        Ok(u32::from_le_bytes(bytes))
    }

    fn read_raw_little_endian64(&mut self) -> Result<u64> {
        let mut bytes = [0u8; 8];
        self.read_raw_bytes(&mut bytes)?;
        Ok(u64::from_le_bytes(bytes))
    }

    fn read_tag(&mut self) -> Result<u32> {
        self.read_raw_varint32()
    }

    fn read_wire_type(&mut self) -> Result<WireType> {
        let id = self.read_raw_varint32()?;
        wire::wire_type_from_input(id)
    }

    /// Reads a length or count. The value is untrusted and must be checked against a quota
    /// before anything is allocated from it.
    fn read_size(&mut self) -> Result<usize> {
        let size = self.read_int32()?;
        if size < 0 {
            return Err(MalformedError::NegativeSize(size).into());
        }
        Ok(size as usize)
    }

    /// Accepts both the 5-byte form and the 10-byte sign-extended form of negative values.
    fn read_int32(&mut self) -> Result<i32> {
        Ok(read_varint32(self, true)? as i32)
    }

    fn read_sint32(&mut self) -> Result<i32> {
        Ok(decode_zig_zag32(self.read_raw_varint32()?))
    }

    fn read_int64(&mut self) -> Result<i64> {
        Ok(self.read_raw_varint64()? as i64)
    }

    fn read_sint64(&mut self) -> Result<i64> {
        Ok(decode_zig_zag64(self.read_raw_varint64()?))
    }

    fn read_fixed32(&mut self) -> Result<u32> {
        self.read_raw_little_endian32()
    }

    fn read_fixed64(&mut self) -> Result<u64> {
        self.read_raw_little_endian64()
    }

    fn read_float(&mut self) -> Result<f32> {
        Ok(f32::from_bits(self.read_raw_little_endian32()?))
    }

    fn read_double(&mut self) -> Result<f64> {
        Ok(f64::from_bits(self.read_raw_little_endian64()?))
    }

    fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_raw_varint64()? != 0)
    }

    /// Reads `size` bytes of UTF-8. `size` must already have passed the field byte quota.
    fn read_string(&mut self, size: usize) -> Result<String> {
        let buf = read_chunked(self, size)?;
        String::from_utf8(buf).map_err(|e| MalformedError::InvalidUtf8(e.utf8_error()).into())
    }

    /// Reads `size` raw bytes. `size` must already have passed the field byte quota.
    fn read_bytes(&mut self, size: usize) -> Result<Bytes> {
        Ok(Bytes::from(read_chunked(self, size)?))
    }
}

/// Largest step [`read_chunked`] grows its buffer by before the bytes behind it have arrived.
pub const READ_CHUNK_SIZE: usize = 64 * 1024;

/// Reads `size` bytes, growing the buffer one chunk at a time so a length prefix that promises
/// more than the source holds fails with a truncation before it can reserve that much memory.
fn read_chunked<R: Reader + ?Sized>(reader: &mut R, size: usize) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(size.min(READ_CHUNK_SIZE));
    while buf.len() < size {
        let start = buf.len();
        let step = (size - start).min(READ_CHUNK_SIZE);
        buf.resize(start + step, 0);
        reader.read_raw_bytes(&mut buf[start..])?;
    }
    Ok(buf)
}

/// Shared 32-bit varint decoder.
///
/// With `sign_extended`, a 5th byte carrying a continuation bit must begin the 64-bit sign
/// extension of a negative `int32`: bits 31 to 63 all set, ending in `0x01` at byte 10. Any other
/// value wider than 32 bits is an overflow.
fn read_varint32<R: Reader + ?Sized>(reader: &mut R, sign_extended: bool) -> Result<u32> {
    let mut result = 0u32;
    for shift in [0, 7, 14, 21] {
        let byte = next_varint_byte(reader)?;
        result |= ((byte & 0x7F) as u32) << shift;
        if byte & 0x80 == 0 {
            return Ok(result);
        }
    }
    let byte = next_varint_byte(reader)?;
    result |= ((byte & 0x0F) as u32) << 28;
    if byte & 0x80 == 0 {
        return match byte & 0x70 {
            0 => Ok(result),
            _ => Err(varint32_overflow()),
        };
    }
    if !sign_extended || byte & 0x78 != 0x78 {
        return Err(varint32_overflow());
    }
    for _ in MAX_VARINT32_BYTES..MAX_VARINT_BYTES - 1 {
        if next_varint_byte(reader)? != 0xFF {
            return Err(varint32_overflow());
        }
    }
    match next_varint_byte(reader)? {
        0x01 => Ok(result),
        byte if byte & 0x80 != 0 => Err(malformed_varint()),
        _ => Err(varint32_overflow()),
    }
}

#[cold]
fn malformed_varint() -> CodecError {
    MalformedError::MalformedVarint {
        max_bytes: MAX_VARINT_BYTES,
    }
    .into()
}

#[cold]
fn varint32_overflow() -> CodecError {
    MalformedError::VarintOverflow { bits: 32 }.into()
}

/// Running out of input in the middle of a varint is a malformed varint, not a plain truncation.
#[inline]
fn next_varint_byte<R: Reader + ?Sized>(reader: &mut R) -> Result<u8> {
    match reader.read_raw_byte() {
        Err(CodecError::Malformed(MalformedError::Truncated { .. })) => Err(malformed_varint()),
        other => other,
    }
}
