use serde::Serialize;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::errors::BootstrapError;
use crate::types::TypeKey;

/// Type-erased, shareable instance produced by a factory or a container
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Factory creating a fresh instance of a described type
pub type InstanceFactory = Arc<dyn Fn() -> Result<Instance, BootstrapError> + Send + Sync>;

/// Declarative markers attached to a type descriptor
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Marker {
    /// Never picked up by namespace scanning
    Invisible,
    /// Bound without eager instantiation
    Lazy,
    /// Instantiated when the container is created
    EagerSingleton,
    /// Ordering hint for installers and extensions
    Order(i32),
    /// Member of a named plugin group
    Plugin(String),
}

struct Capability {
    name: &'static str,
    cast: Arc<dyn Any + Send + Sync>,
}

impl Clone for Capability {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            cast: Arc::clone(&self.cast),
        }
    }
}

struct CapabilityCast<C: ?Sized>(Arc<dyn Fn(Instance) -> Option<Arc<C>> + Send + Sync>);

/// Static description of a type: what the scanner discovers, installers match
/// and containers instantiate.
#[derive(Clone)]
pub struct TypeDescriptor {
    key: TypeKey,
    markers: Vec<Marker>,
    nested: bool,
    factory: Option<InstanceFactory>,
    capabilities: HashMap<TypeId, Capability>,
}

impl TypeDescriptor {
    /// Start describing a type
    pub fn of<T: Any + Send + Sync>() -> DescriptorBuilder<T> {
        DescriptorBuilder {
            descriptor: TypeDescriptor {
                key: TypeKey::of::<T>(),
                markers: Vec::new(),
                nested: false,
                factory: None,
                capabilities: HashMap::new(),
            },
            _type: PhantomData,
        }
    }

    pub fn key(&self) -> TypeKey {
        self.key
    }

    pub fn name(&self) -> &'static str {
        self.key.name()
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn has_marker(&self, marker: &Marker) -> bool {
        self.markers.contains(marker)
    }

    pub fn is_lazy(&self) -> bool {
        self.has_marker(&Marker::Lazy)
    }

    pub fn is_invisible(&self) -> bool {
        self.has_marker(&Marker::Invisible)
    }

    /// Explicit order from an `Order` marker
    pub fn order(&self) -> Option<i32> {
        self.markers.iter().find_map(|m| match m {
            Marker::Order(order) => Some(*order),
            _ => None,
        })
    }

    /// Plugin group from a `Plugin` marker
    pub fn plugin_group(&self) -> Option<&str> {
        self.markers.iter().find_map(|m| match m {
            Marker::Plugin(group) => Some(group.as_str()),
            _ => None,
        })
    }

    /// Nested helper types can't be instantiated on their own
    pub fn is_nested(&self) -> bool {
        self.nested
    }

    /// A type is instantiable when it has a factory and is not nested
    pub fn is_instantiable(&self) -> bool {
        self.factory.is_some() && !self.nested
    }

    /// Create a new instance through the registered factory
    pub fn instantiate(&self) -> Result<Instance, BootstrapError> {
        match &self.factory {
            Some(factory) => factory(),
            None => Err(BootstrapError::container(
                self.key,
                "type has no factory and can't be instantiated",
            )),
        }
    }

    /// Check whether the type declared an implementation of `C`
    pub fn has_capability<C: ?Sized + 'static>(&self) -> bool {
        self.capabilities.contains_key(&TypeId::of::<C>())
    }

    /// View an instance of this type through the declared capability `C`
    pub fn cast<C: ?Sized + 'static>(&self, instance: Instance) -> Option<Arc<C>> {
        let capability = self.capabilities.get(&TypeId::of::<C>())?;
        let cast = capability.cast.downcast_ref::<CapabilityCast<C>>()?;
        (cast.0)(instance)
    }

    /// Names of all declared capabilities, sorted
    pub fn capability_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.capabilities.values().map(|c| c.name).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("key", &self.key)
            .field("markers", &self.markers)
            .field("nested", &self.nested)
            .field("instantiable", &self.is_instantiable())
            .field("capabilities", &self.capability_names())
            .finish()
    }
}

/// Typed builder for [`TypeDescriptor`]
pub struct DescriptorBuilder<T> {
    descriptor: TypeDescriptor,
    _type: PhantomData<fn() -> T>,
}

impl<T: Any + Send + Sync> DescriptorBuilder<T> {
    /// Instances are created by calling `factory`
    pub fn factory<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.descriptor.factory = Some(Arc::new(move || Ok(Arc::new(factory()) as Instance)));
        self
    }

    /// Instances are created by a fallible factory
    pub fn try_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Result<T, BootstrapError> + Send + Sync + 'static,
    {
        self.descriptor.factory = Some(Arc::new(move || Ok(Arc::new(factory()?) as Instance)));
        self
    }

    /// Instances are created with `T::default()`
    pub fn default_factory(self) -> Self
    where
        T: Default,
    {
        self.factory(T::default)
    }

    pub fn marker(mut self, marker: Marker) -> Self {
        if !self.descriptor.markers.contains(&marker) {
            self.descriptor.markers.push(marker);
        }
        self
    }

    /// Mark the type as a nested helper, hidden from scanning
    pub fn nested(mut self) -> Self {
        self.descriptor.nested = true;
        self
    }

    /// Declare that `T` can be viewed as `C`, usually `.implements::<dyn Trait>(|it| it)`
    pub fn implements<C: ?Sized + 'static>(mut self, cast: fn(Arc<T>) -> Arc<C>) -> Self {
        let caster = CapabilityCast::<C>(Arc::new(move |instance: Instance| {
            instance.downcast::<T>().ok().map(cast)
        }));
        self.descriptor.capabilities.insert(
            TypeId::of::<C>(),
            Capability {
                name: std::any::type_name::<C>(),
                cast: Arc::new(caster),
            },
        );
        self
    }

    pub fn build(self) -> TypeDescriptor {
        self.descriptor
    }
}

impl<T> From<DescriptorBuilder<T>> for TypeDescriptor {
    fn from(builder: DescriptorBuilder<T>) -> Self {
        builder.descriptor
    }
}
