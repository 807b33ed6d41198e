//! The public entry point: serialize and deserialize whole messages.

use crate::codec::{self, DecodeContext, EncodeContext};
use crate::error::Result;
use crate::io::{BufferReader, Reader, StreamReader, StreamWriter, Writer};
use crate::limits::Limits;
use crate::schema::{Message, Registry};
use bytes::{Buf, Bytes, BytesMut};
use std::io::{Read, Write};
use std::sync::Arc;
use tracing::trace;

/// Serializes and deserializes [`Message`] types under a set of [`Limits`].
///
/// Cheap to clone and safe to share between threads. Instances created with [`Serializer::new`]
/// share the process-wide [`Registry`].
#[derive(Debug, Clone)]
pub struct Serializer {
    registry: Arc<Registry>,
    limits: Limits,
}

impl Default for Serializer {
    fn default() -> Self {
        Self::new()
    }
}

impl Serializer {
    pub fn new() -> Self {
        Serializer {
            registry: Arc::clone(Registry::global()),
            limits: Limits::default(),
        }
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Uses a private registry instead of the process-wide one.
    pub fn with_registry(mut self, registry: Arc<Registry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Serializes `value` into a new buffer.
    pub fn serialize<T: Message>(&self, value: &T) -> Result<Bytes> {
        let mut out = BytesMut::new();
        self.encode_to(value, &mut out)?;
        Ok(out.freeze())
    }

    /// Serializes `value` into `sink` and flushes it. Returns the number of bytes written.
    ///
    /// If the message exceeds `max_message_bytes`, part of it may already have reached the sink.
    pub fn serialize_into<T: Message, W: Write>(&self, value: &T, sink: W) -> Result<u64> {
        let mut writer = StreamWriter::new(sink);
        self.encode_to(value, &mut writer)?;
        writer.flush()?;
        Ok(writer.position())
    }

    /// Writes `value` to an arbitrary [`Writer`], checking the message byte quota afterwards.
    pub fn encode_to<T: Message>(&self, value: &T, writer: &mut dyn Writer) -> Result<()> {
        let descriptor = self.registry.resolve::<T>()?;
        let start = writer.position();
        let cx = EncodeContext {
            registry: &self.registry,
        };
        codec::encode_message(&descriptor, value, writer, &cx)?;
        let size = (writer.position() - start) as usize;
        self.limits.check_message_bytes(size)?;
        trace!(type_name = descriptor.type_name(), size, "serialized message");
        Ok(())
    }

    /// Deserializes a `T` from the front of `input`. Trailing bytes are ignored.
    pub fn deserialize<T: Message>(&self, input: &[u8]) -> Result<T> {
        self.decode_from(&mut BufferReader::new(input))
    }

    /// Deserializes a `T` from any [`Buf`]. Given a [`Bytes`], byte-array fields share its
    /// allocation.
    pub fn deserialize_buf<T: Message, B: Buf>(&self, input: B) -> Result<T> {
        self.decode_from(&mut BufferReader::new(input))
    }

    /// Deserializes a `T` from a byte stream.
    ///
    /// The internal buffer may read past the end of the message; give each message its own
    /// source.
    pub fn deserialize_from<T: Message, R: Read>(&self, source: R) -> Result<T> {
        self.decode_from(&mut StreamReader::new(source))
    }

    /// Reads one `T` from an arbitrary [`Reader`], leaving it positioned after the stop tag.
    pub fn decode_from<T: Message>(&self, reader: &mut dyn Reader) -> Result<T> {
        let descriptor = self.registry.resolve::<T>()?;
        let start = reader.position();
        let mut cx = DecodeContext::new(&self.registry, &self.limits);
        let value = codec::decode_message(&descriptor, reader, &mut cx)?;
        trace!(
            type_name = descriptor.type_name(),
            size = reader.position() - start,
            "deserialized message"
        );
        Ok(value)
    }
}
