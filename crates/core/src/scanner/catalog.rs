use std::fmt;

use crate::errors::BootstrapError;
use crate::types::{Namespace, TypeDescriptor};

/// Source of scannable types
pub trait TypeSource: Send + Sync {
    /// Every type declared under `namespace` (visible or not), in discovery order
    fn locate(&self, namespace: &Namespace) -> Result<Vec<TypeDescriptor>, BootstrapError>;
}

/// Explicit type list; discovery order is registration order
#[derive(Debug, Clone, Default)]
pub struct TypeCatalog {
    types: Vec<TypeDescriptor>,
}

impl TypeCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a type to the catalog
    pub fn with(mut self, descriptor: impl Into<TypeDescriptor>) -> Self {
        self.add(descriptor);
        self
    }

    pub fn add(&mut self, descriptor: impl Into<TypeDescriptor>) {
        let descriptor = descriptor.into();
        if !self.types.iter().any(|known| known.key() == descriptor.key()) {
            self.types.push(descriptor);
        }
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl TypeSource for TypeCatalog {
    fn locate(&self, namespace: &Namespace) -> Result<Vec<TypeDescriptor>, BootstrapError> {
        Ok(self
            .types
            .iter()
            .filter(|descriptor| namespace.contains_path(descriptor.key().module_path()))
            .cloned()
            .collect())
    }
}

impl FromIterator<TypeDescriptor> for TypeCatalog {
    fn from_iter<I: IntoIterator<Item = TypeDescriptor>>(iter: I) -> Self {
        let mut catalog = TypeCatalog::new();
        for descriptor in iter {
            catalog.add(descriptor);
        }
        catalog
    }
}

/// Link-time registration of a scannable type, see [`discoverable!`](crate::discoverable)
pub struct TypeRegistration {
    describe: fn() -> TypeDescriptor,
}

impl TypeRegistration {
    pub const fn new(describe: fn() -> TypeDescriptor) -> Self {
        Self { describe }
    }

    pub fn describe(&self) -> TypeDescriptor {
        (self.describe)()
    }
}

impl fmt::Debug for TypeRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistration").finish_non_exhaustive()
    }
}

inventory::collect!(TypeRegistration);

/// Types submitted with [`discoverable!`](crate::discoverable) anywhere in the binary.
///
/// Link order is not stable, so discovery order is by type name.
#[derive(Debug, Default, Clone, Copy)]
pub struct InventoryCatalog;

impl TypeSource for InventoryCatalog {
    fn locate(&self, namespace: &Namespace) -> Result<Vec<TypeDescriptor>, BootstrapError> {
        let mut found = Vec::new();
        for registration in inventory::iter::<TypeRegistration> {
            let descriptor = registration.describe();
            if namespace.contains_path(descriptor.key().module_path()) {
                found.push(descriptor);
            }
        }
        found.sort_by(|a, b| a.key().cmp(&b.key()));
        found.dedup_by(|a, b| a.key() == b.key());
        Ok(found)
    }
}

/// Register a scannable type at link time.
///
/// ```ignore
/// weave_core::discoverable!(|| TypeDescriptor::of::<AuditTask>().default_factory().build());
/// ```
#[macro_export]
macro_rules! discoverable {
    ($describe:expr) => {
        $crate::inventory::submit! {
            $crate::scanner::TypeRegistration::new($describe)
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    mod plugins {
        #[derive(Default)]
        pub struct Exporter;

        pub mod nested {
            #[derive(Default)]
            pub struct Importer;
        }
    }

    #[derive(Default)]
    struct Outside;

    fn namespace_of<T: 'static>() -> Namespace {
        Namespace::parse(crate::types::TypeKey::of::<T>().module_path()).unwrap()
    }

    #[test]
    fn test_catalog_locates_by_namespace_in_order() {
        let catalog: TypeCatalog = vec![
            TypeDescriptor::of::<plugins::nested::Importer>().build(),
            TypeDescriptor::of::<Outside>().build(),
            TypeDescriptor::of::<plugins::Exporter>().build(),
            TypeDescriptor::of::<plugins::Exporter>().build(),
        ]
        .into_iter()
        .collect();
        assert_eq!(catalog.len(), 3);

        let found = catalog.locate(&namespace_of::<plugins::Exporter>()).unwrap();
        let names: Vec<_> = found.iter().map(|d| d.key().simple_name()).collect();
        assert_eq!(names, vec!["Importer", "Exporter"]);
    }

    #[test]
    fn test_catalog_empty_namespace() {
        let catalog = TypeCatalog::new().with(TypeDescriptor::of::<Outside>());
        let found = catalog.locate(&Namespace::parse("nowhere").unwrap()).unwrap();
        assert!(found.is_empty());
    }
}
