//! Primitive-keyed containers and the capability traits their codecs are built on.
//!
//! [`PrimitiveMap`] and [`PrimitiveSet`] use the [`fxhash`] hasher, which is much faster than
//! SipHash for small integer keys. On the wire they look exactly like ordinary maps and sets.

use crate::codec::{self, DecodeContext, EncodeContext, FieldIdent};
use crate::error::Result;
use crate::io::{Reader, Writer};
use crate::schema::{shape_of, FieldType, IntEncoding, Shape};
use fxhash::{FxHashMap, FxHashSet};
use std::fmt;
use std::hash::Hash;

/// Key types accepted by [`PrimitiveMap`] and [`PrimitiveSet`].
pub trait PrimitiveKey: FieldType + Copy + Eq + Hash {}

impl PrimitiveKey for i8 {}
impl PrimitiveKey for i16 {}
impl PrimitiveKey for i32 {}
impl PrimitiveKey for i64 {}
impl PrimitiveKey for char {}
impl PrimitiveKey for bool {}

/// A map the codec can size, iterate, default-construct and fill.
pub trait KeyedContainer: Default + Send + Sync + 'static {
    type Key: PrimitiveKey;
    type Value: FieldType;

    fn size(&self) -> usize;

    fn entries(&self) -> Box<dyn Iterator<Item = (&Self::Key, &Self::Value)> + '_>;

    fn put(&mut self, key: Self::Key, value: Self::Value);
}

/// A set the codec can size, iterate, default-construct and fill.
pub trait ElementContainer: Default + Send + Sync + 'static {
    type Element: PrimitiveKey;

    fn size(&self) -> usize;

    fn elements(&self) -> Box<dyn Iterator<Item = &Self::Element> + '_>;

    fn add(&mut self, element: Self::Element);
}

pub fn keyed_shape<C: KeyedContainer>(encoding: IntEncoding) -> Shape {
    Shape::PrimitiveMap(shape_of::<C::Key>(encoding), shape_of::<C::Value>(encoding))
}

/// Writes a keyed container as a map payload.
pub fn encode_keyed<C: KeyedContainer>(
    container: &C,
    shape: &Shape,
    writer: &mut dyn Writer,
    cx: &EncodeContext<'_>,
    at: &FieldIdent,
) -> Result<()> {
    codec::write_map(shape, container.size(), container.entries(), writer, cx, at)
}

/// Reads a map payload into a fresh keyed container.
pub fn decode_keyed<C: KeyedContainer>(
    shape: &Shape,
    reader: &mut dyn Reader,
    cx: &mut DecodeContext<'_>,
    at: &FieldIdent,
) -> Result<Option<C>> {
    codec::read_map(shape, reader, cx, at, |_| C::default(), C::put)
}

pub fn element_shape<C: ElementContainer>(encoding: IntEncoding) -> Shape {
    Shape::PrimitiveSet(shape_of::<C::Element>(encoding))
}

/// Writes an element container as a collection payload.
pub fn encode_elements<C: ElementContainer>(
    container: &C,
    shape: &Shape,
    writer: &mut dyn Writer,
    cx: &EncodeContext<'_>,
    at: &FieldIdent,
) -> Result<()> {
    codec::write_collection(shape, container.size(), container.elements(), writer, cx, at)
}

/// Reads a collection payload into a fresh element container.
pub fn decode_elements<C: ElementContainer>(
    shape: &Shape,
    reader: &mut dyn Reader,
    cx: &mut DecodeContext<'_>,
    at: &FieldIdent,
) -> Result<Option<C>> {
    codec::read_collection(shape, reader, cx, at, |_| C::default(), C::add)
}

/// Hash map specialized for primitive keys.
#[derive(Clone)]
pub struct PrimitiveMap<K, V> {
    inner: FxHashMap<K, V>,
}

pub type IntMap<V> = PrimitiveMap<i32, V>;
pub type LongMap<V> = PrimitiveMap<i64, V>;

impl<K: PrimitiveKey, V> PrimitiveMap<K, V> {
    pub fn new() -> Self {
        PrimitiveMap {
            inner: FxHashMap::default(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        PrimitiveMap {
            inner: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn get(&self, key: K) -> Option<&V> {
        self.inner.get(&key)
    }

    pub fn get_mut(&mut self, key: K) -> Option<&mut V> {
        self.inner.get_mut(&key)
    }

    pub fn contains_key(&self, key: K) -> bool {
        self.inner.contains_key(&key)
    }

    /// Inserts, returning the previous value for `key`.
    pub fn put(&mut self, key: K, value: V) -> Option<V> {
        self.inner.insert(key, value)
    }

    pub fn remove(&mut self, key: K) -> Option<V> {
        self.inner.remove(&key)
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (K, &V)> + '_ {
        self.inner.iter().map(|(k, v)| (*k, v))
    }

    pub fn keys(&self) -> impl Iterator<Item = K> + '_ {
        self.inner.keys().copied()
    }

    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.inner.values()
    }
}

impl<K: PrimitiveKey, V> Default for PrimitiveMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: PrimitiveKey, V: PartialEq> PartialEq for PrimitiveMap<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl<K: PrimitiveKey, V: Eq> Eq for PrimitiveMap<K, V> {}

impl<K: PrimitiveKey + fmt::Debug, V: fmt::Debug> fmt::Debug for PrimitiveMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.inner.iter()).finish()
    }
}

impl<K: PrimitiveKey, V> FromIterator<(K, V)> for PrimitiveMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        PrimitiveMap {
            inner: iter.into_iter().collect(),
        }
    }
}

impl<K: PrimitiveKey, V: FieldType> KeyedContainer for PrimitiveMap<K, V> {
    type Key = K;
    type Value = V;

    fn size(&self) -> usize {
        self.inner.len()
    }

    fn entries(&self) -> Box<dyn Iterator<Item = (&K, &V)> + '_> {
        Box::new(self.inner.iter())
    }

    fn put(&mut self, key: K, value: V) {
        self.inner.insert(key, value);
    }
}

impl<K: PrimitiveKey, V: FieldType> FieldType for PrimitiveMap<K, V> {
    fn build_shape(encoding: IntEncoding) -> Shape {
        keyed_shape::<Self>(encoding)
    }

    fn encode_untagged(
        &self,
        shape: &Shape,
        writer: &mut dyn Writer,
        cx: &EncodeContext<'_>,
        at: &FieldIdent,
    ) -> Result<()> {
        encode_keyed(self, shape, writer, cx, at)
    }

    fn decode_untagged(
        shape: &Shape,
        reader: &mut dyn Reader,
        cx: &mut DecodeContext<'_>,
        at: &FieldIdent,
    ) -> Result<Option<Self>> {
        decode_keyed(shape, reader, cx, at)
    }
}

/// Hash set specialized for primitive elements.
#[derive(Clone)]
pub struct PrimitiveSet<K> {
    inner: FxHashSet<K>,
}

pub type IntSet = PrimitiveSet<i32>;
pub type LongSet = PrimitiveSet<i64>;

impl<K: PrimitiveKey> PrimitiveSet<K> {
    pub fn new() -> Self {
        PrimitiveSet {
            inner: FxHashSet::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Adds `element`, returning false if it was already present.
    pub fn add(&mut self, element: K) -> bool {
        self.inner.insert(element)
    }

    pub fn contains(&self, element: K) -> bool {
        self.inner.contains(&element)
    }

    pub fn remove(&mut self, element: K) -> bool {
        self.inner.remove(&element)
    }

    pub fn iter(&self) -> impl Iterator<Item = K> + '_ {
        self.inner.iter().copied()
    }
}

impl<K: PrimitiveKey> Default for PrimitiveSet<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: PrimitiveKey> PartialEq for PrimitiveSet<K> {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl<K: PrimitiveKey> Eq for PrimitiveSet<K> {}

impl<K: PrimitiveKey + fmt::Debug> fmt::Debug for PrimitiveSet<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.inner.iter()).finish()
    }
}

impl<K: PrimitiveKey> FromIterator<K> for PrimitiveSet<K> {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        PrimitiveSet {
            inner: iter.into_iter().collect(),
        }
    }
}

impl<K: PrimitiveKey> ElementContainer for PrimitiveSet<K> {
    type Element = K;

    fn size(&self) -> usize {
        self.inner.len()
    }

    fn elements(&self) -> Box<dyn Iterator<Item = &K> + '_> {
        Box::new(self.inner.iter())
    }

    fn add(&mut self, element: K) {
        self.inner.insert(element);
    }
}

impl<K: PrimitiveKey> FieldType for PrimitiveSet<K> {
    fn build_shape(encoding: IntEncoding) -> Shape {
        element_shape::<Self>(encoding)
    }

    fn encode_untagged(
        &self,
        shape: &Shape,
        writer: &mut dyn Writer,
        cx: &EncodeContext<'_>,
        at: &FieldIdent,
    ) -> Result<()> {
        encode_elements(self, shape, writer, cx, at)
    }

    fn decode_untagged(
        shape: &Shape,
        reader: &mut dyn Reader,
        cx: &mut DecodeContext<'_>,
        at: &FieldIdent,
    ) -> Result<Option<Self>> {
        decode_elements(shape, reader, cx, at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::BufferReader;
    use crate::limits::Limits;
    use crate::schema::{Registry, ScalarKind};
    use bytes::BytesMut;
    use std::sync::Arc;

    const AT: FieldIdent = FieldIdent {
        type_name: "Holder",
        field: "values",
        number: 1,
    };

    #[test]
    fn map_basics() {
        let mut map: IntMap<String> = PrimitiveMap::new();
        assert!(map.put(3, "three".into()).is_none());
        assert_eq!(map.put(3, "tres".into()).as_deref(), Some("three"));
        assert_eq!(map.get(3).map(String::as_str), Some("tres"));
        assert!(map.contains_key(3));
        assert_eq!(map.remove(3).as_deref(), Some("tres"));
        assert!(map.is_empty());
    }

    #[test]
    fn map_shape_is_primitive() {
        let shape = shape_of::<LongMap<bool>>(IntEncoding::SignedVarint);
        assert_eq!(
            *shape,
            Shape::PrimitiveMap(
                Arc::new(Shape::Scalar(ScalarKind::Long, IntEncoding::SignedVarint)),
                Arc::new(Shape::Scalar(ScalarKind::Bool, IntEncoding::Varint)),
            )
        );
    }

    #[test]
    fn map_streams_through_its_entries() {
        let map: IntMap<i64> = [(1, 10), (2, 20)].into_iter().collect();
        let shape = shape_of::<IntMap<i64>>(IntEncoding::Varint);
        let registry = Registry::new();
        let mut buf = BytesMut::new();
        let cx = EncodeContext {
            registry: &registry,
        };
        map.encode_untagged(&shape, &mut buf, &cx, &AT).unwrap();
        assert_eq!(&buf[..3], &[0x00, 0x00, 0x02]);

        let limits = Limits::default();
        let mut cx = DecodeContext::new(&registry, &limits);
        let mut reader = BufferReader::new(buf.freeze());
        let back = IntMap::<i64>::decode_untagged(&shape, &mut reader, &mut cx, &AT).unwrap();
        assert_eq!(back, Some(map));
    }

    #[test]
    fn set_basics() {
        let mut set = LongSet::new();
        assert!(set.add(5));
        assert!(!set.add(5));
        assert!(set.contains(5));

        let shape = shape_of::<LongSet>(IntEncoding::SignedVarint);
        let registry = Registry::new();
        let mut buf = BytesMut::new();
        let cx = EncodeContext {
            registry: &registry,
        };
        set.encode_untagged(&shape, &mut buf, &cx, &AT).unwrap();
        assert_eq!(&buf[..], &[0x00, 0x01, 0x0A]);

        let limits = Limits::default();
        let mut cx = DecodeContext::new(&registry, &limits);
        let mut reader = BufferReader::new(buf.freeze());
        let back = LongSet::decode_untagged(&shape, &mut reader, &mut cx, &AT).unwrap();
        assert_eq!(back, Some(set));
    }
}
