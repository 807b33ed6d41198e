//! Streaming backends over [`std::io::Read`] and [`std::io::Write`].

use super::{Reader, Writer};
use crate::error::{truncated, Result};
use std::io::{self, Read, Write};

/// Smallest internal buffer a stream backend accepts.
///
/// An 8-byte fixed64 must fit in one refill.
pub const MIN_BUFFER_SIZE: usize = 8;
/// Internal buffer size used by `new`.
pub const DEFAULT_BUFFER_SIZE: usize = 4096;

/// Buffered reader over a [`Read`] source.
///
/// The reader may pull bytes past the end of the current message into its buffer; use a
/// dedicated reader per framed message body.
pub struct StreamReader<R> {
    inner: R,
    buf: Box<[u8]>,
    pos: usize,
    limit: usize,
    consumed: u64,
}

impl<R: Read> StreamReader<R> {
    pub fn new(inner: R) -> Self {
        Self::with_capacity(DEFAULT_BUFFER_SIZE, inner)
    }

    /// Creates a reader with an internal buffer of `capacity` bytes (at least [`MIN_BUFFER_SIZE`]).
    pub fn with_capacity(capacity: usize, inner: R) -> Self {
        StreamReader {
            inner,
            buf: vec![0u8; capacity.max(MIN_BUFFER_SIZE)].into_boxed_slice(),
            pos: 0,
            limit: 0,
            consumed: 0,
        }
    }

    /// Bytes read from the source but not yet consumed.
    pub fn buffered(&self) -> &[u8] {
        &self.buf[self.pos..self.limit]
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    #[inline]
    fn available(&self) -> usize {
        self.limit - self.pos
    }

    /// Makes at least `needed` bytes available in the buffer. `needed` must not exceed its size.
    ///
    /// Fails with a truncation error when the source reports end of input first.
    fn refill(&mut self, needed: usize) -> Result<()> {
        debug_assert!(needed <= self.buf.len());
        if self.pos > 0 {
            self.buf.copy_within(self.pos..self.limit, 0);
            self.limit -= self.pos;
            self.pos = 0;
        }
        while self.limit < needed {
            match self.inner.read(&mut self.buf[self.limit..]) {
                Ok(0) => return Err(truncated(needed, self.limit)),
                Ok(n) => self.limit += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    #[inline]
    fn consume(&mut self, len: usize) {
        self.pos += len;
        self.consumed += len as u64;
    }
}

impl<R: Read> Reader for StreamReader<R> {
    #[inline]
    fn read_raw_byte(&mut self) -> Result<u8> {
        if self.pos == self.limit {
            self.refill(1)?;
        }
        let byte = self.buf[self.pos];
        self.consume(1);
        Ok(byte)
    }

    fn read_raw_bytes(&mut self, dst: &mut [u8]) -> Result<()> {
        let len = dst.len();
        if len <= self.available() {
            dst.copy_from_slice(&self.buf[self.pos..self.pos + len]);
            self.consume(len);
            return Ok(());
        }

        let head = self.available();
        dst[..head].copy_from_slice(&self.buf[self.pos..self.limit]);
        self.consume(head);
        let rest = &mut dst[head..];

        if rest.len() < self.buf.len() {
            self.refill(rest.len())?;
            rest.copy_from_slice(&self.buf[..rest.len()]);
            self.consume(rest.len());
            return Ok(());
        }

        let mut filled = 0;
        while filled < rest.len() {
            match self.inner.read(&mut rest[filled..]) {
                Ok(0) => return Err(truncated(len, head + filled)),
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
        self.consumed += filled as u64;
        Ok(())
    }

    fn skip_raw_bytes(&mut self, len: usize) -> Result<()> {
        let mut left = len;
        loop {
            let step = left.min(self.available());
            self.consume(step);
            left -= step;
            if left == 0 {
                return Ok(());
            }
            self.refill(left.min(self.buf.len()))?;
        }
    }

    fn position(&self) -> u64 {
        self.consumed
    }

    fn read_raw_little_endian32(&mut self) -> Result<u32> {
        if self.available() < 4 {
            self.refill(4)?;
        }
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&self.buf[self.pos..self.pos + 4]);
        self.consume(4);
        Ok(u32::from_le_bytes(bytes))
    }

    fn read_raw_little_endian64(&mut self) -> Result<u64> {
        if self.available() < 8 {
            self.refill(8)?;
        }
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&self.buf[self.pos..self.pos + 8]);
        self.consume(8);
        Ok(u64::from_le_bytes(bytes))
    }
}

/// Buffered writer over a [`Write`] sink.
///
/// Bytes are only guaranteed to reach the sink after [`Writer::flush`] or
/// [`StreamWriter::into_inner`].
pub struct StreamWriter<W: Write> {
    inner: W,
    buf: Vec<u8>,
    capacity: usize,
    written: u64,
}

impl<W: Write> StreamWriter<W> {
    pub fn new(inner: W) -> Self {
        Self::with_capacity(DEFAULT_BUFFER_SIZE, inner)
    }

    pub fn with_capacity(capacity: usize, inner: W) -> Self {
        let capacity = capacity.max(MIN_BUFFER_SIZE);
        StreamWriter {
            inner,
            buf: Vec::with_capacity(capacity),
            capacity,
            written: 0,
        }
    }

    /// Flushes and returns the sink.
    pub fn into_inner(mut self) -> Result<W> {
        self.flush_buffer()?;
        self.inner.flush()?;
        let StreamWriter { inner, .. } = self;
        Ok(inner)
    }

    fn flush_buffer(&mut self) -> Result<()> {
        if !self.buf.is_empty() {
            self.inner.write_all(&self.buf)?;
            self.buf.clear();
        }
        Ok(())
    }
}

impl<W: Write> Writer for StreamWriter<W> {
    #[inline]
    fn write_raw_byte(&mut self, value: u8) -> Result<()> {
        if self.buf.len() == self.capacity {
            self.flush_buffer()?;
        }
        self.buf.push(value);
        self.written += 1;
        Ok(())
    }

    fn write_raw_bytes(&mut self, src: &[u8]) -> Result<()> {
        if self.buf.len() + src.len() > self.capacity {
            self.flush_buffer()?;
        }
        if src.len() >= self.capacity {
            self.inner.write_all(src)?;
        } else {
            self.buf.extend_from_slice(src);
        }
        self.written += src.len() as u64;
        Ok(())
    }

    fn position(&self) -> u64 {
        self.written
    }

    fn flush(&mut self) -> Result<()> {
        self.flush_buffer()?;
        self.inner.flush()?;
        Ok(())
    }
}
