use super::descriptor::{Message, TypeDescriptor};
use super::InstallMap;
use crate::error::Result;
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// Cache of resolved [`TypeDescriptor`]s, keyed by Rust type.
///
/// Reads never lock. Descriptors are built outside any lock and installed with
/// compare-and-install, so concurrent first use of a type may build it more than once but every
/// caller ends up sharing the same descriptor.
pub struct Registry {
    entries: InstallMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Registry {
            entries: InstallMap::new(),
        }
    }

    /// The process-wide registry used by [`crate::Serializer::new`].
    pub fn global() -> &'static Arc<Registry> {
        static GLOBAL: OnceLock<Arc<Registry>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(Registry::new()))
    }

    /// Returns the descriptor of `T`, building and installing it on first use.
    ///
    /// Schema errors are not cached: a type that fails to build fails again on every call.
    pub fn resolve<T: Message>(&self) -> Result<Arc<TypeDescriptor<T>>> {
        if let Some(descriptor) = self.cached::<T>() {
            return Ok(descriptor);
        }
        let descriptor = TypeDescriptor::<T>::build()?;
        debug!(
            type_name = descriptor.type_name(),
            fields = descriptor.fields().len(),
            "built type descriptor"
        );
        Ok(self.register(descriptor))
    }

    /// Installs a descriptor built by hand unless one is already present for `T`, and returns
    /// the one in use.
    pub fn register<T: Message>(&self, descriptor: TypeDescriptor<T>) -> Arc<TypeDescriptor<T>> {
        let descriptor = Arc::new(descriptor);
        let entry = Arc::clone(&descriptor) as Arc<dyn Any + Send + Sync>;
        let winner = self.entries.install(TypeId::of::<T>(), entry);
        winner.downcast().unwrap_or(descriptor)
    }

    /// Returns true if a descriptor for `T` is installed.
    pub fn contains<T: Message>(&self) -> bool {
        self.entries.get(&TypeId::of::<T>()).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn cached<T: Message>(&self) -> Option<Arc<TypeDescriptor<T>>> {
        self.entries
            .get(&TypeId::of::<T>())
            .and_then(|entry| entry.downcast().ok())
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("types", &self.len())
            .finish()
    }
}
