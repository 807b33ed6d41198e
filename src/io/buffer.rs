//! In-memory backends: [`BytesMut`] as a [`Writer`] and [`BufferReader`] over any [`Buf`].

use super::{Reader, Writer};
use crate::error::{truncated, MalformedError, Result};
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Growable in-memory sink. Writing never fails.
impl Writer for BytesMut {
    #[inline]
    fn write_raw_byte(&mut self, value: u8) -> Result<()> {
        self.put_u8(value);
        Ok(())
    }

    #[inline]
    fn write_raw_bytes(&mut self, src: &[u8]) -> Result<()> {
        self.put_slice(src);
        Ok(())
    }

    fn position(&self) -> u64 {
        self.len() as u64
    }

    fn write_raw_little_endian16(&mut self, value: u16) -> Result<()> {
        self.put_u16_le(value);
        Ok(())
    }

    fn write_raw_little_endian32(&mut self, value: u32) -> Result<()> {
        self.put_u32_le(value);
        Ok(())
    }

    fn write_raw_little_endian64(&mut self, value: u64) -> Result<()> {
        self.put_u64_le(value);
        Ok(())
    }
}

/// Reads from an in-memory buffer.
///
/// Backed by [`Bytes`], payloads returned by [`Reader::read_bytes`] share the input allocation
/// instead of copying it.
#[derive(Debug)]
pub struct BufferReader<B> {
    buf: B,
    start: usize,
}

impl<B: Buf> BufferReader<B> {
    pub fn new(buf: B) -> Self {
        let start = buf.remaining();
        BufferReader { buf, start }
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    /// Returns the underlying buffer, positioned after the last byte consumed.
    pub fn into_inner(self) -> B {
        self.buf
    }

    #[inline]
    fn ensure(&self, needed: usize) -> Result<()> {
        let available = self.buf.remaining();
        if available < needed {
            return Err(truncated(needed, available));
        }
        Ok(())
    }
}

impl<B: Buf> Reader for BufferReader<B> {
    #[inline]
    fn read_raw_byte(&mut self) -> Result<u8> {
        self.ensure(1)?;
        Ok(self.buf.get_u8())
    }

    fn read_raw_bytes(&mut self, dst: &mut [u8]) -> Result<()> {
        self.ensure(dst.len())?;
        self.buf.copy_to_slice(dst);
        Ok(())
    }

    fn skip_raw_bytes(&mut self, len: usize) -> Result<()> {
        self.ensure(len)?;
        self.buf.advance(len);
        Ok(())
    }

    fn position(&self) -> u64 {
        (self.start - self.buf.remaining()) as u64
    }

    fn read_raw_little_endian16(&mut self) -> Result<u16> {
        self.ensure(2)?;
        Ok(self.buf.get_u16_le())
    }

    fn read_raw_little_endian32(&mut self) -> Result<u32> {
        self.ensure(4)?;
        Ok(self.buf.get_u32_le())
    }

    fn read_raw_little_endian64(&mut self) -> Result<u64> {
        self.ensure(8)?;
        Ok(self.buf.get_u64_le())
    }

    fn read_string(&mut self, size: usize) -> Result<String> {
        self.ensure(size)?;
        let chunk = self.buf.chunk();
        if chunk.len() >= size {
            let value = std::str::from_utf8(&chunk[..size])
                .map_err(MalformedError::InvalidUtf8)?
                .to_owned();
            self.buf.advance(size);
            return Ok(value);
        }
        let bytes = self.buf.copy_to_bytes(size);
        let value = std::str::from_utf8(&bytes).map_err(MalformedError::InvalidUtf8)?;
        Ok(value.to_owned())
    }

    fn read_bytes(&mut self, size: usize) -> Result<Bytes> {
        self.ensure(size)?;
        Ok(self.buf.copy_to_bytes(size))
    }
}
