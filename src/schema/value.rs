use super::descriptor::Message;
use super::shape::{shape_of, IntEncoding, ObjectRef, ScalarKind, Shape};
use crate::codec::{self, DecodeContext, EncodeContext, FieldIdent};
use crate::error::Result;
use crate::io::{Reader, Writer};
use bytes::Bytes;
use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::hash::{BuildHasher, Hash};

/// A field value in transit through a `raw_field` accessor.
///
/// Encoding borrows from the instance being written; decoding produces owned values
/// (`Value<'static>`). Typed fields never go through this type.
#[derive(Debug)]
pub enum Value<'a> {
    Byte(i8),
    Char(char),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Bool(bool),
    Enum(i32),
    Bytes(Bytes),
    Str(Cow<'a, str>),
    Collection(Vec<Value<'a>>),
    Map(Vec<(Value<'a>, Value<'a>)>),
}

impl Value<'_> {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Byte(_) => "byte",
            Value::Char(_) => "char",
            Value::Short(_) => "short",
            Value::Int(_) => "int",
            Value::Long(_) => "long",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::Bool(_) => "bool",
            Value::Enum(_) => "enum",
            Value::Bytes(_) => "bytes",
            Value::Str(_) => "string",
            Value::Collection(_) => "collection",
            Value::Map(_) => "map",
        }
    }
}

/// A Rust type that can be stored in a message field.
///
/// Implemented for the scalar primitives, `String`, [`Bytes`], the standard collections and,
/// through the derive macros, for messages and enums. `Option<T>` is handled by the derive: a
/// `None` field is omitted from the output.
///
/// Values are written and read untagged: the caller has already written or consumed the tag, and
/// `shape` is the one [`shape_of`] built for this type.
pub trait FieldType: Sized + Send + Sync + 'static {
    /// Builds the shape of this type. Prefer [`shape_of`], which caches the result.
    fn build_shape(encoding: IntEncoding) -> Shape;

    fn encode_untagged(
        &self,
        shape: &Shape,
        writer: &mut dyn Writer,
        cx: &EncodeContext<'_>,
        at: &FieldIdent,
    ) -> Result<()>;

    /// Reads one value. `Ok(None)` means a nested container declared element wire types that
    /// disagree with `shape`; its payload has been consumed and the field should stay unset.
    fn decode_untagged(
        shape: &Shape,
        reader: &mut dyn Reader,
        cx: &mut DecodeContext<'_>,
        at: &FieldIdent,
    ) -> Result<Option<Self>>;
}

macro_rules! impl_integral_field {
    ($ty:ty, $kind:ident, $write:ident, $read:ident) => {
        impl FieldType for $ty {
            fn build_shape(encoding: IntEncoding) -> Shape {
                Shape::Scalar(ScalarKind::$kind, encoding)
            }

            #[inline]
            fn encode_untagged(
                &self,
                shape: &Shape,
                writer: &mut dyn Writer,
                _cx: &EncodeContext<'_>,
                _at: &FieldIdent,
            ) -> Result<()> {
                codec::$write(*self, shape.int_encoding(), writer)
            }

            #[inline]
            fn decode_untagged(
                shape: &Shape,
                reader: &mut dyn Reader,
                _cx: &mut DecodeContext<'_>,
                _at: &FieldIdent,
            ) -> Result<Option<Self>> {
                codec::$read(shape.int_encoding(), reader).map(Some)
            }
        }
    };
}

macro_rules! impl_plain_field {
    ($ty:ty, $kind:ident, $write:ident, $read:ident) => {
        impl FieldType for $ty {
            fn build_shape(_encoding: IntEncoding) -> Shape {
                Shape::Scalar(ScalarKind::$kind, IntEncoding::Varint)
            }

            #[inline]
            fn encode_untagged(
                &self,
                _shape: &Shape,
                writer: &mut dyn Writer,
                _cx: &EncodeContext<'_>,
                _at: &FieldIdent,
            ) -> Result<()> {
                writer.$write(*self)
            }

            #[inline]
            fn decode_untagged(
                _shape: &Shape,
                reader: &mut dyn Reader,
                _cx: &mut DecodeContext<'_>,
                _at: &FieldIdent,
            ) -> Result<Option<Self>> {
                reader.$read().map(Some)
            }
        }
    };
}

impl_integral_field!(i8, Byte, write_byte, read_byte);
impl_integral_field!(i16, Short, write_short, read_short);
impl_integral_field!(i32, Int, write_int, read_int);
impl_integral_field!(i64, Long, write_long, read_long);
impl_integral_field!(char, Char, write_char, read_char);
impl_plain_field!(f32, Float, write_float_no_tag, read_float);
impl_plain_field!(f64, Double, write_double_no_tag, read_double);
impl_plain_field!(bool, Bool, write_bool_no_tag, read_bool);

impl FieldType for String {
    fn build_shape(_encoding: IntEncoding) -> Shape {
        Shape::String
    }

    fn encode_untagged(
        &self,
        _shape: &Shape,
        writer: &mut dyn Writer,
        _cx: &EncodeContext<'_>,
        _at: &FieldIdent,
    ) -> Result<()> {
        writer.write_string_no_tag(self)
    }

    fn decode_untagged(
        _shape: &Shape,
        reader: &mut dyn Reader,
        cx: &mut DecodeContext<'_>,
        _at: &FieldIdent,
    ) -> Result<Option<Self>> {
        codec::read_string(reader, cx).map(Some)
    }
}

/// Byte arrays. Decoding from a [`Bytes`] input shares its allocation.
impl FieldType for Bytes {
    fn build_shape(_encoding: IntEncoding) -> Shape {
        Shape::Bytes
    }

    fn encode_untagged(
        &self,
        _shape: &Shape,
        writer: &mut dyn Writer,
        _cx: &EncodeContext<'_>,
        _at: &FieldIdent,
    ) -> Result<()> {
        writer.write_bytes_no_tag(self)
    }

    fn decode_untagged(
        _shape: &Shape,
        reader: &mut dyn Reader,
        cx: &mut DecodeContext<'_>,
        _at: &FieldIdent,
    ) -> Result<Option<Self>> {
        codec::read_bytes(reader, cx).map(Some)
    }
}

impl<T: FieldType> FieldType for Box<T> {
    fn build_shape(encoding: IntEncoding) -> Shape {
        T::build_shape(encoding)
    }

    fn encode_untagged(
        &self,
        shape: &Shape,
        writer: &mut dyn Writer,
        cx: &EncodeContext<'_>,
        at: &FieldIdent,
    ) -> Result<()> {
        (**self).encode_untagged(shape, writer, cx, at)
    }

    fn decode_untagged(
        shape: &Shape,
        reader: &mut dyn Reader,
        cx: &mut DecodeContext<'_>,
        at: &FieldIdent,
    ) -> Result<Option<Self>> {
        Ok(T::decode_untagged(shape, reader, cx, at)?.map(Box::new))
    }
}

impl<T: FieldType> FieldType for Vec<T> {
    fn build_shape(encoding: IntEncoding) -> Shape {
        Shape::List(shape_of::<T>(encoding))
    }

    fn encode_untagged(
        &self,
        shape: &Shape,
        writer: &mut dyn Writer,
        cx: &EncodeContext<'_>,
        at: &FieldIdent,
    ) -> Result<()> {
        codec::write_collection(shape, self.len(), self.iter(), writer, cx, at)
    }

    fn decode_untagged(
        shape: &Shape,
        reader: &mut dyn Reader,
        cx: &mut DecodeContext<'_>,
        at: &FieldIdent,
    ) -> Result<Option<Self>> {
        codec::read_collection(shape, reader, cx, at, Vec::with_capacity, Vec::push)
    }
}

impl<T: FieldType> FieldType for VecDeque<T> {
    fn build_shape(encoding: IntEncoding) -> Shape {
        Shape::List(shape_of::<T>(encoding))
    }

    fn encode_untagged(
        &self,
        shape: &Shape,
        writer: &mut dyn Writer,
        cx: &EncodeContext<'_>,
        at: &FieldIdent,
    ) -> Result<()> {
        codec::write_collection(shape, self.len(), self.iter(), writer, cx, at)
    }

    fn decode_untagged(
        shape: &Shape,
        reader: &mut dyn Reader,
        cx: &mut DecodeContext<'_>,
        at: &FieldIdent,
    ) -> Result<Option<Self>> {
        codec::read_collection(
            shape,
            reader,
            cx,
            at,
            VecDeque::with_capacity,
            VecDeque::push_back,
        )
    }
}

impl<T, S> FieldType for HashSet<T, S>
where
    T: FieldType + Eq + Hash,
    S: BuildHasher + Default + Send + Sync + 'static,
{
    fn build_shape(encoding: IntEncoding) -> Shape {
        Shape::Set(shape_of::<T>(encoding))
    }

    fn encode_untagged(
        &self,
        shape: &Shape,
        writer: &mut dyn Writer,
        cx: &EncodeContext<'_>,
        at: &FieldIdent,
    ) -> Result<()> {
        codec::write_collection(shape, self.len(), self.iter(), writer, cx, at)
    }

    fn decode_untagged(
        shape: &Shape,
        reader: &mut dyn Reader,
        cx: &mut DecodeContext<'_>,
        at: &FieldIdent,
    ) -> Result<Option<Self>> {
        codec::read_collection(
            shape,
            reader,
            cx,
            at,
            |capacity| HashSet::with_capacity_and_hasher(capacity, S::default()),
            |set, item| {
                set.insert(item);
            },
        )
    }
}

impl<T: FieldType + Ord> FieldType for BTreeSet<T> {
    fn build_shape(encoding: IntEncoding) -> Shape {
        Shape::Set(shape_of::<T>(encoding))
    }

    fn encode_untagged(
        &self,
        shape: &Shape,
        writer: &mut dyn Writer,
        cx: &EncodeContext<'_>,
        at: &FieldIdent,
    ) -> Result<()> {
        codec::write_collection(shape, self.len(), self.iter(), writer, cx, at)
    }

    fn decode_untagged(
        shape: &Shape,
        reader: &mut dyn Reader,
        cx: &mut DecodeContext<'_>,
        at: &FieldIdent,
    ) -> Result<Option<Self>> {
        codec::read_collection(
            shape,
            reader,
            cx,
            at,
            |_| BTreeSet::new(),
            |set, item| {
                set.insert(item);
            },
        )
    }
}

impl<K, V, S> FieldType for HashMap<K, V, S>
where
    K: FieldType + Eq + Hash,
    V: FieldType,
    S: BuildHasher + Default + Send + Sync + 'static,
{
    fn build_shape(encoding: IntEncoding) -> Shape {
        Shape::Map(shape_of::<K>(encoding), shape_of::<V>(encoding))
    }

    fn encode_untagged(
        &self,
        shape: &Shape,
        writer: &mut dyn Writer,
        cx: &EncodeContext<'_>,
        at: &FieldIdent,
    ) -> Result<()> {
        codec::write_map(shape, self.len(), self.iter(), writer, cx, at)
    }

    fn decode_untagged(
        shape: &Shape,
        reader: &mut dyn Reader,
        cx: &mut DecodeContext<'_>,
        at: &FieldIdent,
    ) -> Result<Option<Self>> {
        codec::read_map(
            shape,
            reader,
            cx,
            at,
            |capacity| HashMap::with_capacity_and_hasher(capacity, S::default()),
            |map, k, v| {
                map.insert(k, v);
            },
        )
    }
}

impl<K: FieldType + Ord, V: FieldType> FieldType for BTreeMap<K, V> {
    fn build_shape(encoding: IntEncoding) -> Shape {
        Shape::Map(shape_of::<K>(encoding), shape_of::<V>(encoding))
    }

    fn encode_untagged(
        &self,
        shape: &Shape,
        writer: &mut dyn Writer,
        cx: &EncodeContext<'_>,
        at: &FieldIdent,
    ) -> Result<()> {
        codec::write_map(shape, self.len(), self.iter(), writer, cx, at)
    }

    fn decode_untagged(
        shape: &Shape,
        reader: &mut dyn Reader,
        cx: &mut DecodeContext<'_>,
        at: &FieldIdent,
    ) -> Result<Option<Self>> {
        codec::read_map(
            shape,
            reader,
            cx,
            at,
            |_| BTreeMap::new(),
            |map, k, v| {
                map.insert(k, v);
            },
        )
    }
}

#[cfg(feature = "indexmap")]
impl<T, S> FieldType for indexmap::IndexSet<T, S>
where
    T: FieldType + Eq + Hash,
    S: BuildHasher + Default + Send + Sync + 'static,
{
    fn build_shape(encoding: IntEncoding) -> Shape {
        Shape::Set(shape_of::<T>(encoding))
    }

    fn encode_untagged(
        &self,
        shape: &Shape,
        writer: &mut dyn Writer,
        cx: &EncodeContext<'_>,
        at: &FieldIdent,
    ) -> Result<()> {
        codec::write_collection(shape, self.len(), self.iter(), writer, cx, at)
    }

    fn decode_untagged(
        shape: &Shape,
        reader: &mut dyn Reader,
        cx: &mut DecodeContext<'_>,
        at: &FieldIdent,
    ) -> Result<Option<Self>> {
        codec::read_collection(
            shape,
            reader,
            cx,
            at,
            |capacity| indexmap::IndexSet::with_capacity_and_hasher(capacity, S::default()),
            |set, item| {
                set.insert(item);
            },
        )
    }
}

#[cfg(feature = "indexmap")]
impl<K, V, S> FieldType for indexmap::IndexMap<K, V, S>
where
    K: FieldType + Eq + Hash,
    V: FieldType,
    S: BuildHasher + Default + Send + Sync + 'static,
{
    fn build_shape(encoding: IntEncoding) -> Shape {
        Shape::Map(shape_of::<K>(encoding), shape_of::<V>(encoding))
    }

    fn encode_untagged(
        &self,
        shape: &Shape,
        writer: &mut dyn Writer,
        cx: &EncodeContext<'_>,
        at: &FieldIdent,
    ) -> Result<()> {
        codec::write_map(shape, self.len(), self.iter(), writer, cx, at)
    }

    fn decode_untagged(
        shape: &Shape,
        reader: &mut dyn Reader,
        cx: &mut DecodeContext<'_>,
        at: &FieldIdent,
    ) -> Result<Option<Self>> {
        codec::read_map(
            shape,
            reader,
            cx,
            at,
            |capacity| indexmap::IndexMap::with_capacity_and_hasher(capacity, S::default()),
            |map, k, v| {
                map.insert(k, v);
            },
        )
    }
}

/// Shape of a nested message field.
pub fn message_shape<T: Message>() -> Shape {
    Shape::Object(ObjectRef::of::<T>())
}

/// Implements [`FieldType`] for a hand-written [`Message`] so it can be nested in other messages.
///
/// `#[derive(Message)]` emits the same impl.
#[macro_export]
macro_rules! message_field_type {
    ($ty:ty) => {
        impl $crate::FieldType for $ty {
            fn build_shape(_encoding: $crate::IntEncoding) -> $crate::Shape {
                $crate::schema::message_shape::<Self>()
            }

            fn encode_untagged(
                &self,
                _shape: &$crate::Shape,
                writer: &mut dyn $crate::Writer,
                cx: &$crate::codec::EncodeContext<'_>,
                _at: &$crate::codec::FieldIdent,
            ) -> $crate::Result<()> {
                $crate::codec::encode_nested(self, writer, cx)
            }

            fn decode_untagged(
                _shape: &$crate::Shape,
                reader: &mut dyn $crate::Reader,
                cx: &mut $crate::codec::DecodeContext<'_>,
                _at: &$crate::codec::FieldIdent,
            ) -> $crate::Result<::std::option::Option<Self>> {
                $crate::codec::decode_nested::<Self>(reader, cx).map(::std::option::Option::Some)
            }
        }
    };
}
