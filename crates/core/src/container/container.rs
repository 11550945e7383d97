use indexmap::IndexMap;
use std::any::Any;
use std::sync::{Arc, OnceLock};

use crate::container::Binding;
use crate::errors::BootstrapError;
use crate::types::{Instance, TypeDescriptor, TypeKey};

/// Resolved container, consulted by installers and the hosting application
pub trait Container: Send + Sync {
    /// Resolve the instance bound to `key`
    fn resolve(&self, key: TypeKey) -> Result<Instance, BootstrapError>;

    /// Descriptor of the implementation bound to `key`
    fn descriptor(&self, key: TypeKey) -> Option<&TypeDescriptor>;

    fn contains(&self, key: TypeKey) -> bool {
        self.descriptor(key).is_some()
    }

    /// Bound keys in declaration order
    fn keys(&self) -> Vec<TypeKey>;
}

impl dyn Container {
    /// Resolve and downcast to the concrete type
    pub fn get<T: Any + Send + Sync>(&self) -> Result<Arc<T>, BootstrapError> {
        let key = TypeKey::of::<T>();
        self.resolve(key)?.downcast::<T>().map_err(|_| {
            BootstrapError::container(key, "bound implementation has a different type")
        })
    }
}

/// Creates the container from collected bindings
pub trait ContainerFactory: Send + Sync {
    fn create(&self, bindings: Vec<Binding>) -> Result<Box<dyn Container>, BootstrapError>;
}

struct FactoryEntry {
    binding: Binding,
    instance: OnceLock<Instance>,
}

/// Minimal container: one shared instance per binding, created on first
/// resolve (or at creation for eager bindings).
pub struct FactoryContainer {
    entries: IndexMap<TypeKey, FactoryEntry>,
}

impl FactoryContainer {
    /// Create a container from bindings, instantiating eager ones
    pub fn new(bindings: Vec<Binding>) -> Result<Self, BootstrapError> {
        let entries = bindings
            .into_iter()
            .map(|binding| {
                (
                    binding.key,
                    FactoryEntry {
                        binding,
                        instance: OnceLock::new(),
                    },
                )
            })
            .collect::<IndexMap<_, _>>();
        let container = Self { entries };

        for entry in container.entries.values() {
            if entry.binding.eager && !entry.binding.lazy {
                container.resolve(entry.binding.key)?;
            }
        }
        Ok(container)
    }

    /// True when the binding already produced its instance
    pub fn is_instantiated(&self, key: TypeKey) -> bool {
        self.entries
            .get(&key)
            .map(|entry| entry.instance.get().is_some())
            .unwrap_or(false)
    }
}

impl Container for FactoryContainer {
    fn resolve(&self, key: TypeKey) -> Result<Instance, BootstrapError> {
        let entry = self
            .entries
            .get(&key)
            .ok_or_else(|| BootstrapError::container(key, "no binding declared"))?;
        if let Some(instance) = entry.instance.get() {
            return Ok(Arc::clone(instance));
        }
        let created = entry.binding.descriptor.instantiate()?;
        Ok(Arc::clone(entry.instance.get_or_init(|| created)))
    }

    fn descriptor(&self, key: TypeKey) -> Option<&TypeDescriptor> {
        self.entries.get(&key).map(|entry| &entry.binding.descriptor)
    }

    fn keys(&self) -> Vec<TypeKey> {
        self.entries.keys().copied().collect()
    }
}

impl std::fmt::Debug for FactoryContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FactoryContainer")
            .field("bindings", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Factory for [`FactoryContainer`]
#[derive(Debug, Default, Clone, Copy)]
pub struct FactoryContainerFactory;

impl ContainerFactory for FactoryContainerFactory {
    fn create(&self, bindings: Vec<Binding>) -> Result<Box<dyn Container>, BootstrapError> {
        Ok(Box::new(FactoryContainer::new(bindings)?))
    }
}
