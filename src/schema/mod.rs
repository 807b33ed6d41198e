//! Schema model: field shapes, descriptors and the process-wide registry.
//!
//! A [`TypeDescriptor`] is built once per [`Message`] type from its
//! [`Message::describe`] declaration, then cached in a [`Registry`]. Container sub-descriptors
//! ([`Shape`]s) are memoized per Rust field type by [`shape_of`].

mod descriptor;
mod registry;
mod shape;
mod value;

pub use descriptor::{FieldDescriptor, Hooks, Message, SchemaBuilder, TypeDescriptor, WireEnum};
pub use registry::Registry;
pub use shape::{shape_of, IntEncoding, ObjectRef, ScalarKind, Shape};
pub use value::{message_shape, FieldType, Value};

use arc_swap::ArcSwap;
use fxhash::FxHashMap;
use std::hash::Hash;
use std::sync::Arc;

/// Copy-on-write map with a lock-free read path and compare-and-install writes.
///
/// Entries are never removed or replaced: the first value installed for a key wins, and
/// concurrent losers get the winner back.
pub(crate) struct InstallMap<K, V> {
    inner: ArcSwap<FxHashMap<K, V>>,
}

impl<K, V> InstallMap<K, V>
where
    K: Clone + Eq + Hash,
    V: Clone,
{
    pub(crate) fn new() -> Self {
        InstallMap {
            inner: ArcSwap::from_pointee(FxHashMap::default()),
        }
    }

    pub(crate) fn get(&self, key: &K) -> Option<V> {
        self.inner.load().get(key).cloned()
    }

    /// Installs `value` unless `key` is already present, and returns whichever value is in the map.
    pub(crate) fn install(&self, key: K, value: V) -> V {
        let mut winner = None;
        self.inner.rcu(|current| {
            if let Some(existing) = current.get(&key) {
                winner = Some(existing.clone());
                return Arc::clone(current);
            }
            winner = Some(value.clone());
            let mut next = FxHashMap::clone(current);
            next.insert(key.clone(), value.clone());
            Arc::new(next)
        });
        winner.unwrap_or(value)
    }

    pub(crate) fn len(&self) -> usize {
        self.inner.load().len()
    }
}
