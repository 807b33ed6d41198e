use super::descriptor::Message;
use super::value::FieldType;
use super::InstallMap;
use crate::wire::WireType;
use std::any::TypeId;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// How an integral field is written on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IntEncoding {
    /// Plain varint; negative values always take the full 10 bytes.
    #[default]
    Varint,
    /// Zigzag varint, compact for values of small magnitude.
    SignedVarint,
    /// Little-endian fixed width matching the Rust type.
    Fixed,
}

/// Scalar semantic types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
    Bool,
    /// An enumeration, carried as its stable `i32` id.
    Enum,
}

impl ScalarKind {
    /// Kinds whose encoding may be chosen through [`IntEncoding`].
    pub const fn is_integral(self) -> bool {
        matches!(
            self,
            ScalarKind::Byte
                | ScalarKind::Char
                | ScalarKind::Short
                | ScalarKind::Int
                | ScalarKind::Long
                | ScalarKind::Enum
        )
    }

    pub const fn wire_type(self, encoding: IntEncoding) -> WireType {
        match (self, encoding) {
            (ScalarKind::Float, _) => WireType::Fixed32,
            (ScalarKind::Double, _) => WireType::Fixed64,
            (ScalarKind::Bool, _) => WireType::Varint,
            (ScalarKind::Byte, IntEncoding::Fixed) => WireType::Fixed8,
            (ScalarKind::Short, IntEncoding::Fixed) => WireType::Fixed16,
            (ScalarKind::Char | ScalarKind::Int | ScalarKind::Enum, IntEncoding::Fixed) => {
                WireType::Fixed32
            }
            (ScalarKind::Long, IntEncoding::Fixed) => WireType::Fixed64,
            _ => WireType::Varint,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            ScalarKind::Byte => "byte",
            ScalarKind::Char => "char",
            ScalarKind::Short => "short",
            ScalarKind::Int => "int",
            ScalarKind::Long => "long",
            ScalarKind::Float => "float",
            ScalarKind::Double => "double",
            ScalarKind::Bool => "bool",
            ScalarKind::Enum => "enum",
        }
    }
}

/// The resolved encoding recipe for a field or container element.
///
/// Sub-shapes are shared through [`Arc`] so the cached shape of `Vec<i32>` is reused by every
/// `Vec<Vec<i32>>` that contains it.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Scalar(ScalarKind, IntEncoding),
    Bytes,
    String,
    List(Arc<Shape>),
    Set(Arc<Shape>),
    Map(Arc<Shape>, Arc<Shape>),
    /// Map restricted to primitive keys.
    PrimitiveMap(Arc<Shape>, Arc<Shape>),
    /// Set restricted to primitive elements.
    PrimitiveSet(Arc<Shape>),
    Object(ObjectRef),
}

impl Shape {
    /// The wire type a value of this shape is written with.
    pub fn wire_type(&self) -> WireType {
        match self {
            Shape::Scalar(kind, encoding) => kind.wire_type(*encoding),
            Shape::Bytes | Shape::String => WireType::Bytes,
            Shape::List(_) | Shape::Set(_) | Shape::PrimitiveSet(_) => WireType::Collection,
            Shape::Map(..) | Shape::PrimitiveMap(..) => WireType::Map,
            Shape::Object(_) => WireType::NestedObject,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Shape::Scalar(kind, _) => kind.name(),
            Shape::Bytes => "bytes",
            Shape::String => "string",
            Shape::List(_) => "list",
            Shape::Set(_) => "set",
            Shape::Map(..) => "map",
            Shape::PrimitiveMap(..) => "primitive map",
            Shape::PrimitiveSet(_) => "primitive set",
            Shape::Object(_) => "object",
        }
    }

    /// Element shape of a list or set.
    pub fn element(&self) -> Option<&Shape> {
        match self {
            Shape::List(e) | Shape::Set(e) | Shape::PrimitiveSet(e) => Some(&**e),
            _ => None,
        }
    }

    /// Key and value shapes of a map.
    pub fn entry(&self) -> Option<(&Shape, &Shape)> {
        match self {
            Shape::Map(k, v) | Shape::PrimitiveMap(k, v) => Some((&**k, &**v)),
            _ => None,
        }
    }

    /// Integer encoding of a scalar shape; [`IntEncoding::Varint`] for every other shape.
    pub fn int_encoding(&self) -> IntEncoding {
        match self {
            Shape::Scalar(_, encoding) => *encoding,
            _ => IntEncoding::Varint,
        }
    }

    /// Returns true if any scalar reachable from this shape is integral.
    pub fn has_integral(&self) -> bool {
        match self {
            Shape::Scalar(kind, _) => kind.is_integral(),
            Shape::Bytes | Shape::String | Shape::Object(_) => false,
            Shape::List(e) | Shape::Set(e) | Shape::PrimitiveSet(e) => e.has_integral(),
            Shape::Map(k, v) | Shape::PrimitiveMap(k, v) => k.has_integral() || v.has_integral(),
        }
    }

    /// Returns true if a nested object is reachable from this shape.
    pub fn has_object(&self) -> bool {
        match self {
            Shape::Object(_) => true,
            Shape::Scalar(..) | Shape::Bytes | Shape::String => false,
            Shape::List(e) | Shape::Set(e) | Shape::PrimitiveSet(e) => e.has_object(),
            Shape::Map(k, v) | Shape::PrimitiveMap(k, v) => k.has_object() || v.has_object(),
        }
    }

    /// Checks structural rules that the Rust type system does not already enforce.
    pub(crate) fn validate(&self) -> std::result::Result<(), &'static str> {
        match self {
            Shape::Scalar(kind, encoding) => {
                if *encoding != IntEncoding::Varint && !kind.is_integral() {
                    return Err("integer encodings only apply to integral scalars");
                }
                Ok(())
            }
            Shape::Bytes | Shape::String | Shape::Object(_) => Ok(()),
            Shape::List(e) | Shape::Set(e) => e.validate(),
            Shape::Map(k, v) => {
                k.validate()?;
                v.validate()
            }
            Shape::PrimitiveSet(e) => {
                if !e.is_primitive_key() {
                    return Err("primitive sets need integral or bool elements");
                }
                e.validate()
            }
            Shape::PrimitiveMap(k, v) => {
                if !k.is_primitive_key() {
                    return Err("primitive maps need integral or bool keys");
                }
                k.validate()?;
                v.validate()
            }
        }
    }

    fn is_primitive_key(&self) -> bool {
        matches!(
            self,
            Shape::Scalar(
                ScalarKind::Byte
                    | ScalarKind::Char
                    | ScalarKind::Short
                    | ScalarKind::Int
                    | ScalarKind::Long
                    | ScalarKind::Bool,
                _
            )
        )
    }
}

/// Identity of a nested [`Message`] type.
///
/// Only the type identity is captured when a shape is built. The nested descriptor is resolved
/// through the registry by the field's own encode and decode path on first use, so
/// self-referential and mutually recursive types are fine.
#[derive(Clone, Copy)]
pub struct ObjectRef {
    type_id: TypeId,
    type_name: &'static str,
}

impl ObjectRef {
    pub fn of<T: Message>() -> Self {
        ObjectRef {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ObjectRef").field(&self.type_name).finish()
    }
}

type ShapeKey = (TypeId, IntEncoding);

fn shape_cache() -> &'static InstallMap<ShapeKey, Arc<Shape>> {
    static SHAPES: OnceLock<InstallMap<ShapeKey, Arc<Shape>>> = OnceLock::new();
    SHAPES.get_or_init(InstallMap::new)
}

/// Returns the shared shape of field type `F` under `encoding`, building it on first use.
///
/// Racing builders may each construct a shape; exactly one is installed and returned to all.
pub fn shape_of<F: FieldType>(encoding: IntEncoding) -> Arc<Shape> {
    let cache = shape_cache();
    let key = (TypeId::of::<F>(), encoding);
    if let Some(shape) = cache.get(&key) {
        return shape;
    }
    cache.install(key, Arc::new(F::build_shape(encoding)))
}
