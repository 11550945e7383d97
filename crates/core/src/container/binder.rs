use indexmap::IndexMap;
use std::fmt;

use crate::errors::BootstrapError;
use crate::registry::{ItemId, Scope};
use crate::types::{TypeDescriptor, TypeKey};

/// Origin of a container binding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingSource {
    /// Declared by a module's `configure`
    Module(ItemId),
    /// Declared by an installer for an extension
    Installer(TypeKey),
    /// Stub replacing a real binding
    Stub(Scope),
}

impl fmt::Display for BindingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindingSource::Module(id) => write!(f, "module {}", id),
            BindingSource::Installer(key) => write!(f, "installer {}", key),
            BindingSource::Stub(scope) => write!(f, "stub from {}", scope),
        }
    }
}

/// A declared binding: instances of `key` are produced by `descriptor`
#[derive(Debug, Clone)]
pub struct Binding {
    pub key: TypeKey,
    pub descriptor: TypeDescriptor,
    pub source: BindingSource,
    /// Instantiate when the container is created
    pub eager: bool,
    /// Never instantiate before first use
    pub lazy: bool,
    /// Replace any existing binding for `key`
    pub overriding: bool,
}

impl Binding {
    /// Binding of a type to itself
    pub fn to_self(descriptor: TypeDescriptor, source: BindingSource) -> Self {
        Self {
            key: descriptor.key(),
            descriptor,
            source,
            eager: false,
            lazy: false,
            overriding: false,
        }
    }

    pub fn eager(mut self) -> Self {
        self.eager = true;
        self
    }

    pub fn lazy(mut self) -> Self {
        self.lazy = true;
        self
    }
}

/// Declaration surface handed to modules
pub trait Binder {
    /// Bind `key` to instances produced by `descriptor`
    fn bind(&mut self, key: TypeKey, descriptor: TypeDescriptor) -> Result<(), BootstrapError>;

    /// Bind a type to itself
    fn bind_self(&mut self, descriptor: TypeDescriptor) -> Result<(), BootstrapError> {
        let key = descriptor.key();
        self.bind(key, descriptor)
    }

    /// Bind a type to itself, instantiated when the container is created
    fn bind_eager(&mut self, descriptor: TypeDescriptor) -> Result<(), BootstrapError>;

    fn is_bound(&self, key: TypeKey) -> bool;
}

/// Collects bindings before container creation
pub struct ContainerBuilder {
    bindings: IndexMap<TypeKey, Binding>,
    source: Option<BindingSource>,
    overriding: bool,
}

impl ContainerBuilder {
    /// Create a new container builder
    pub fn new() -> Self {
        Self {
            bindings: IndexMap::new(),
            source: None,
            overriding: false,
        }
    }

    /// Attribute subsequent `Binder` calls to a module
    pub(crate) fn enter_module(&mut self, module: ItemId, overriding: bool) {
        self.source = Some(BindingSource::Module(module));
        self.overriding = overriding;
    }

    pub(crate) fn leave_module(&mut self) {
        self.source = None;
        self.overriding = false;
    }

    /// Add a fully specified binding
    pub fn add(&mut self, binding: Binding) -> Result<(), BootstrapError> {
        let key = binding.key;
        let existing = self
            .bindings
            .get(&key)
            .map(|existing| (existing.source, existing.overriding));
        match existing {
            None => {
                tracing::debug!(target: "weave::container", "Bound {} by {}", key, binding.source);
                self.bindings.insert(key, binding);
                Ok(())
            }
            Some(_) if binding.overriding => {
                tracing::debug!(target: "weave::container", "Binding {} overridden by {}", key, binding.source);
                self.bindings.insert(key, binding);
                Ok(())
            }
            Some((source, true)) => {
                tracing::debug!(
                    target: "weave::container",
                    "Binding {} from {} ignored: overridden by {}",
                    key,
                    binding.source,
                    source
                );
                Ok(())
            }
            Some((source, false)) => Err(BootstrapError::registration(
                binding.source,
                key,
                format!("type is already bound by {}", source),
            )),
        }
    }

    pub fn binding(&self, key: TypeKey) -> Option<&Binding> {
        self.bindings.get(&key)
    }

    /// Bindings in declaration order
    pub fn bindings(&self) -> impl Iterator<Item = &Binding> {
        self.bindings.values()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn into_bindings(self) -> Vec<Binding> {
        self.bindings.into_values().collect()
    }

    fn module_binding(&self, key: TypeKey, descriptor: TypeDescriptor) -> Result<Binding, BootstrapError> {
        let source = self.source.ok_or_else(|| {
            BootstrapError::registration(
                Scope::Application,
                key,
                "bindings can only be declared from a module's configure",
            )
        })?;
        Ok(Binding {
            key,
            descriptor,
            source,
            eager: false,
            lazy: false,
            overriding: self.overriding,
        })
    }
}

impl Binder for ContainerBuilder {
    fn bind(&mut self, key: TypeKey, descriptor: TypeDescriptor) -> Result<(), BootstrapError> {
        let binding = self.module_binding(key, descriptor)?;
        self.add(binding)
    }

    fn bind_eager(&mut self, descriptor: TypeDescriptor) -> Result<(), BootstrapError> {
        let binding = self.module_binding(descriptor.key(), descriptor)?.eager();
        self.add(binding)
    }

    fn is_bound(&self, key: TypeKey) -> bool {
        self.bindings.contains_key(&key)
    }
}

impl Default for ContainerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ContainerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerBuilder")
            .field("bindings", &self.bindings.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Clock;
    #[derive(Default)]
    struct FakeClock;

    struct AppModule;
    struct TestModule;

    #[test]
    fn test_binder_requires_module_context() {
        let mut builder = ContainerBuilder::new();
        let err = builder
            .bind_self(TypeDescriptor::of::<Clock>().default_factory().build())
            .unwrap_err();
        assert!(err.is_registration());
    }

    #[test]
    fn test_duplicate_binding_rejected() {
        let mut builder = ContainerBuilder::new();
        builder.enter_module(ItemId::of::<AppModule>(), false);
        builder
            .bind_self(TypeDescriptor::of::<Clock>().default_factory().build())
            .unwrap();
        let err = builder
            .bind_self(TypeDescriptor::of::<Clock>().default_factory().build())
            .unwrap_err();
        assert!(err.to_string().contains("already bound"));
    }

    #[test]
    fn test_overriding_binding_wins_in_both_orders() {
        let clock = TypeKey::of::<Clock>();
        let mut builder = ContainerBuilder::new();

        builder.enter_module(ItemId::of::<AppModule>(), false);
        builder
            .bind_self(TypeDescriptor::of::<Clock>().default_factory().build())
            .unwrap();
        builder.enter_module(ItemId::of::<TestModule>(), true);
        builder
            .bind(clock, TypeDescriptor::of::<FakeClock>().default_factory().build())
            .unwrap();
        builder.leave_module();

        builder
            .add(Binding::to_self(
                TypeDescriptor::of::<Clock>().default_factory().build(),
                BindingSource::Installer(TypeKey::of::<String>()),
            ))
            .unwrap();

        let binding = builder.binding(clock).unwrap();
        assert_eq!(binding.descriptor.key(), TypeKey::of::<FakeClock>());
        assert_eq!(builder.len(), 1);
    }
}
