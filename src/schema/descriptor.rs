use super::shape::{shape_of, IntEncoding, Shape};
use super::value::{FieldType, Value};
use crate::codec::{self, DecodeContext, EncodeContext, FieldIdent};
use crate::error::{AccessError, Result, SchemaError};
use crate::io::{Reader, Writer};
use crate::wire::{self, WireType};
use std::fmt;
use std::sync::Arc;

/// A type that can be written and read as a tagged message.
///
/// Usually implemented with `#[derive(Message)]`. The `Default` bound is how decoding constructs a
/// fresh instance before applying the fields present in the input.
pub trait Message: Default + Send + Sync + 'static {
    /// Declares the fields, included ancestors and lifecycle hooks of this type.
    fn describe(schema: &mut SchemaBuilder<Self>);
}

/// An enumeration carried on the wire by a stable `i32` id.
///
/// Usually implemented with `#[derive(WireEnum)]`.
pub trait WireEnum: Copy + Send + Sync + 'static {
    const NAME: &'static str;

    fn to_wire(self) -> i32;

    fn from_wire(id: i32) -> Option<Self>;
}

type Encode<T> = Box<
    dyn Fn(&T, &mut dyn Writer, &EncodeContext<'_>, &FieldIdent) -> Result<()> + Send + Sync,
>;
type Decode<T> = Box<
    dyn Fn(&mut T, &mut dyn Reader, &mut DecodeContext<'_>, &FieldIdent) -> Result<()>
        + Send
        + Sync,
>;

fn encoder<T, E>(encode: E) -> Encode<T>
where
    E: Fn(&T, &mut dyn Writer, &EncodeContext<'_>, &FieldIdent) -> Result<()>
        + Send
        + Sync
        + 'static,
{
    Box::new(encode)
}

fn decoder<T, D>(decode: D) -> Decode<T>
where
    D: Fn(&mut T, &mut dyn Reader, &mut DecodeContext<'_>, &FieldIdent) -> Result<()>
        + Send
        + Sync
        + 'static,
{
    Box::new(decode)
}

/// One resolved field of a message type.
pub struct FieldDescriptor<T> {
    number: u32,
    name: &'static str,
    shape: Arc<Shape>,
    wire_type: WireType,
    encode: Encode<T>,
    decode: Decode<T>,
}

impl<T> FieldDescriptor<T> {
    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Cached `shape().wire_type()`.
    pub fn wire_type(&self) -> WireType {
        self.wire_type
    }

    /// Writes the tag and payload of this field, or nothing when the field is absent.
    #[inline]
    pub(crate) fn encode_field(
        &self,
        instance: &T,
        writer: &mut dyn Writer,
        cx: &EncodeContext<'_>,
        at: &FieldIdent,
    ) -> Result<()> {
        (self.encode)(instance, writer, cx, at)
    }

    /// Reads the payload of this field, whose tag was already consumed, into `instance`.
    #[inline]
    pub(crate) fn decode_field(
        &self,
        instance: &mut T,
        reader: &mut dyn Reader,
        cx: &mut DecodeContext<'_>,
        at: &FieldIdent,
    ) -> Result<()> {
        (self.decode)(instance, reader, cx, at)
    }

    fn project<P: 'static>(
        self,
        project: fn(&P) -> &T,
        project_mut: fn(&mut P) -> &mut T,
    ) -> FieldDescriptor<P>
    where
        T: 'static,
    {
        let FieldDescriptor {
            number,
            name,
            shape,
            wire_type,
            encode,
            decode,
        } = self;
        FieldDescriptor {
            number,
            name,
            shape,
            wire_type,
            encode: encoder(move |outer: &P, writer, cx, at| {
                encode(project(outer), writer, cx, at)
            }),
            decode: decoder(move |outer: &mut P, reader, cx, at| {
                decode(project_mut(outer), reader, cx, at)
            }),
        }
    }
}

impl<T> fmt::Debug for FieldDescriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("number", &self.number)
            .field("name", &self.name)
            .field("shape", &self.shape)
            .finish()
    }
}

/// Lifecycle hooks. Hooks see the instance but cannot fail or alter the byte stream.
pub struct Hooks<T> {
    before_serialize: Option<fn(&T)>,
    after_serialize: Option<fn(&T)>,
    before_deserialize: Option<fn(&mut T)>,
    after_deserialize: Option<fn(&mut T)>,
}

impl<T> Default for Hooks<T> {
    fn default() -> Self {
        Hooks {
            before_serialize: None,
            after_serialize: None,
            before_deserialize: None,
            after_deserialize: None,
        }
    }
}

impl<T> Hooks<T> {
    #[inline]
    pub(crate) fn before_serialize(&self, instance: &T) {
        if let Some(hook) = self.before_serialize {
            hook(instance);
        }
    }

    #[inline]
    pub(crate) fn after_serialize(&self, instance: &T) {
        if let Some(hook) = self.after_serialize {
            hook(instance);
        }
    }

    #[inline]
    pub(crate) fn before_deserialize(&self, instance: &mut T) {
        if let Some(hook) = self.before_deserialize {
            hook(instance);
        }
    }

    #[inline]
    pub(crate) fn after_deserialize(&self, instance: &mut T) {
        if let Some(hook) = self.after_deserialize {
            hook(instance);
        }
    }
}

/// Collects the declaration of a [`Message`] type.
///
/// Errors are recorded rather than returned so `describe` stays infallible; the first one is
/// reported when the descriptor is built.
pub struct SchemaBuilder<T> {
    type_name: &'static str,
    fields: Vec<FieldDescriptor<T>>,
    hooks: Hooks<T>,
    errors: Vec<SchemaError>,
}

impl<T: Message> SchemaBuilder<T> {
    pub(crate) fn new() -> Self {
        SchemaBuilder {
            type_name: std::any::type_name::<T>(),
            fields: Vec::new(),
            hooks: Hooks::default(),
            errors: Vec::new(),
        }
    }

    /// Overrides the type name used in errors and logs.
    pub fn name(&mut self, name: &'static str) -> &mut Self {
        self.type_name = name;
        self
    }

    /// Declares a field backed by a Rust value of type `F`.
    ///
    /// `get` returns `None` for an absent field. `encoding` only applies to integral scalars,
    /// including those nested in containers.
    pub fn field<F: FieldType>(
        &mut self,
        number: u32,
        name: &'static str,
        encoding: IntEncoding,
        get: fn(&T) -> Option<&F>,
        set: fn(&mut T, F),
    ) -> &mut Self {
        let shape = shape_of::<F>(encoding);
        if encoding != IntEncoding::Varint && !shape.has_integral() {
            self.errors.push(SchemaError::UnsupportedShape {
                type_name: self.type_name,
                field: name,
                reason: "integer encodings only apply to integral fields",
            });
            return self;
        }
        let wire_type = shape.wire_type();
        let encode_shape = Arc::clone(&shape);
        let decode_shape = Arc::clone(&shape);
        self.push(
            number,
            name,
            shape,
            encoder(move |instance: &T, writer, cx, at| match get(instance) {
                Some(value) => {
                    writer.write_tag(number, wire_type)?;
                    value.encode_untagged(&encode_shape, writer, cx, at)
                }
                None => Ok(()),
            }),
            decoder(move |instance: &mut T, reader, cx, at| {
                if let Some(value) = F::decode_untagged(&decode_shape, reader, cx, at)? {
                    set(instance, value);
                }
                Ok(())
            }),
        )
    }

    /// Declares a field with an explicit shape and hand-written accessors.
    ///
    /// The accessors must produce and accept values that match `shape`; a mismatch surfaces as a
    /// [`crate::CodecError::FieldAccess`] at encode or decode time.
    pub fn raw_field<G, S>(
        &mut self,
        number: u32,
        name: &'static str,
        shape: Shape,
        get: G,
        set: S,
    ) -> &mut Self
    where
        G: for<'a> Fn(&'a T) -> Option<Value<'a>> + Send + Sync + 'static,
        S: Fn(&mut T, Value<'static>) -> std::result::Result<(), AccessError>
            + Send
            + Sync
            + 'static,
    {
        if shape.has_object() {
            self.errors.push(SchemaError::UnsupportedShape {
                type_name: self.type_name,
                field: name,
                reason: "raw fields cannot hold nested objects",
            });
            return self;
        }
        let shape = Arc::new(shape);
        let wire_type = shape.wire_type();
        let encode_shape = Arc::clone(&shape);
        let decode_shape = Arc::clone(&shape);
        self.push(
            number,
            name,
            shape,
            encoder(move |instance: &T, writer, _cx, at| match get(instance) {
                Some(value) => {
                    writer.write_tag(number, wire_type)?;
                    codec::write_value(&encode_shape, &value, writer, at)
                }
                None => Ok(()),
            }),
            decoder(move |instance: &mut T, reader, cx, at| {
                if let Some(value) = codec::read_value(&decode_shape, reader, cx, at)? {
                    set(instance, value).map_err(|source| at.access_error(source))?;
                }
                Ok(())
            }),
        )
    }

    /// Includes every field of `B`, reached through the projections. Hooks of `B` are not run.
    pub fn include<B: Message>(
        &mut self,
        project: fn(&T) -> &B,
        project_mut: fn(&mut T) -> &mut B,
    ) -> &mut Self {
        let mut base = SchemaBuilder::<B>::new();
        B::describe(&mut base);
        self.errors.append(&mut base.errors);
        self.fields.extend(
            base.fields
                .into_iter()
                .map(|field| field.project(project, project_mut)),
        );
        self
    }

    pub fn before_serialize(&mut self, hook: fn(&T)) -> &mut Self {
        self.hooks.before_serialize = Some(hook);
        self
    }

    pub fn after_serialize(&mut self, hook: fn(&T)) -> &mut Self {
        self.hooks.after_serialize = Some(hook);
        self
    }

    pub fn before_deserialize(&mut self, hook: fn(&mut T)) -> &mut Self {
        self.hooks.before_deserialize = Some(hook);
        self
    }

    pub fn after_deserialize(&mut self, hook: fn(&mut T)) -> &mut Self {
        self.hooks.after_deserialize = Some(hook);
        self
    }

    fn push(
        &mut self,
        number: u32,
        name: &'static str,
        shape: Arc<Shape>,
        encode: Encode<T>,
        decode: Decode<T>,
    ) -> &mut Self {
        if !wire::is_valid_field_number(number) {
            self.errors.push(SchemaError::InvalidFieldNumber {
                type_name: self.type_name,
                field: name,
                number,
                max: wire::MAX_FIELD_NUMBER,
            });
            return self;
        }
        if let Err(reason) = shape.validate() {
            self.errors.push(SchemaError::UnsupportedShape {
                type_name: self.type_name,
                field: name,
                reason,
            });
            return self;
        }
        self.fields.push(FieldDescriptor {
            number,
            name,
            wire_type: shape.wire_type(),
            shape,
            encode,
            decode,
        });
        self
    }

    /// Validates the declaration and produces a descriptor with fields sorted by number.
    pub(crate) fn build(self) -> std::result::Result<TypeDescriptor<T>, SchemaError> {
        let SchemaBuilder {
            type_name,
            mut fields,
            hooks,
            errors,
        } = self;
        if let Some(err) = errors.into_iter().next() {
            return Err(err);
        }
        fields.sort_by_key(|field| field.number);
        for pair in fields.windows(2) {
            if pair[0].number == pair[1].number {
                return Err(SchemaError::DuplicateFieldNumber {
                    type_name,
                    number: pair[0].number,
                    first: pair[0].name,
                    second: pair[1].name,
                });
            }
        }
        Ok(TypeDescriptor {
            type_name,
            fields,
            hooks,
        })
    }
}

/// The resolved schema of a [`Message`] type: its fields in ascending number order and its hooks.
pub struct TypeDescriptor<T> {
    type_name: &'static str,
    fields: Vec<FieldDescriptor<T>>,
    hooks: Hooks<T>,
}

impl<T: Message> TypeDescriptor<T> {
    /// Builds the descriptor from `T::describe`. Most callers want [`crate::Registry::resolve`].
    pub fn build() -> std::result::Result<Self, SchemaError> {
        let mut schema = SchemaBuilder::new();
        T::describe(&mut schema);
        schema.build()
    }
}

impl<T> TypeDescriptor<T> {
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn fields(&self) -> &[FieldDescriptor<T>] {
        &self.fields
    }

    pub fn field(&self, number: u32) -> Option<&FieldDescriptor<T>> {
        self.fields
            .binary_search_by_key(&number, |field| field.number)
            .ok()
            .map(|index| &self.fields[index])
    }

    pub fn hooks(&self) -> &Hooks<T> {
        &self.hooks
    }
}

impl<T> fmt::Debug for TypeDescriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("type_name", &self.type_name)
            .field("fields", &self.fields)
            .finish()
    }
}
