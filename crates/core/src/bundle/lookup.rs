use std::fmt;
use std::sync::Arc;

use crate::bundle::BundleEntry;

/// External source of bundles resolved before explicit ones are processed.
///
/// Must return immediately and in a deterministic order. Duplicates are
/// allowed; they are collapsed by the resolver.
pub trait BundleLookup: Send + Sync {
    fn lookup(&self) -> Vec<BundleEntry>;
}

/// Link-time registration of a lookup bundle, see [`lookup_bundle!`](crate::lookup_bundle)
pub struct BundleRegistration {
    create: fn() -> BundleEntry,
}

impl BundleRegistration {
    pub const fn new(create: fn() -> BundleEntry) -> Self {
        Self { create }
    }

    pub fn create(&self) -> BundleEntry {
        (self.create)()
    }
}

impl fmt::Debug for BundleRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BundleRegistration").finish_non_exhaustive()
    }
}

inventory::collect!(BundleRegistration);

/// Bundles submitted with [`lookup_bundle!`](crate::lookup_bundle), ordered by type name
#[derive(Debug, Default, Clone, Copy)]
pub struct ServiceLookup;

impl BundleLookup for ServiceLookup {
    fn lookup(&self) -> Vec<BundleEntry> {
        let mut found = Vec::new();
        for registration in inventory::iter::<BundleRegistration> {
            found.push(registration.create());
        }
        found.sort_by(|a, b| a.key().cmp(&b.key()));
        found
    }
}

/// Fixed bundle list
#[derive(Clone, Default)]
pub struct StaticLookup {
    factories: Vec<Arc<dyn Fn() -> BundleEntry + Send + Sync>>,
}

impl StaticLookup {
    /// Create an empty lookup
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a bundle; a fresh instance is created on every lookup
    pub fn with<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> BundleEntry + Send + Sync + 'static,
    {
        self.factories.push(Arc::new(factory));
        self
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl BundleLookup for StaticLookup {
    fn lookup(&self) -> Vec<BundleEntry> {
        self.factories.iter().map(|factory| factory()).collect()
    }
}

impl fmt::Debug for StaticLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticLookup")
            .field("bundles", &self.factories.len())
            .finish()
    }
}

/// Concatenation of several lookups in order
#[derive(Clone, Default)]
pub struct CompositeLookup {
    lookups: Vec<Arc<dyn BundleLookup>>,
}

impl CompositeLookup {
    pub fn new(lookups: Vec<Arc<dyn BundleLookup>>) -> Self {
        Self { lookups }
    }

    pub fn with(mut self, lookup: impl BundleLookup + 'static) -> Self {
        self.lookups.push(Arc::new(lookup));
        self
    }
}

impl BundleLookup for CompositeLookup {
    fn lookup(&self) -> Vec<BundleEntry> {
        self.lookups.iter().flat_map(|lookup| lookup.lookup()).collect()
    }
}

impl fmt::Debug for CompositeLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeLookup")
            .field("lookups", &self.lookups.len())
            .finish()
    }
}

/// Register a bundle for [`ServiceLookup`] at link time.
///
/// ```ignore
/// weave_core::lookup_bundle!(|| BundleEntry::new(MetricsBundle::default()));
/// ```
#[macro_export]
macro_rules! lookup_bundle {
    ($create:expr) => {
        $crate::inventory::submit! {
            $crate::bundle::BundleRegistration::new($create)
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bootstrap::BundleBootstrap;
    use crate::bundle::Bundle;
    use crate::errors::BootstrapError;
    use crate::types::TypeKey;

    struct Metrics;
    struct Tracing;

    impl Bundle for Metrics {
        fn initialize(&self, _bootstrap: &mut BundleBootstrap<'_>) -> Result<(), BootstrapError> {
            Ok(())
        }
    }

    impl Bundle for Tracing {
        fn initialize(&self, _bootstrap: &mut BundleBootstrap<'_>) -> Result<(), BootstrapError> {
            Ok(())
        }
    }

    #[test]
    fn test_composite_keeps_order_and_duplicates() {
        let lookup = CompositeLookup::default()
            .with(StaticLookup::new().with(|| BundleEntry::new(Tracing)))
            .with(
                StaticLookup::new()
                    .with(|| BundleEntry::new(Metrics))
                    .with(|| BundleEntry::new(Tracing)),
            );

        let keys: Vec<TypeKey> = lookup.lookup().iter().map(BundleEntry::key).collect();
        assert_eq!(
            keys,
            vec![TypeKey::of::<Tracing>(), TypeKey::of::<Metrics>(), TypeKey::of::<Tracing>()]
        );
    }

    #[test]
    fn test_static_lookup_creates_fresh_instances() {
        let lookup = StaticLookup::new().with(|| BundleEntry::new(Metrics));
        let first = lookup.lookup();
        let second = lookup.lookup();
        assert!(!Arc::ptr_eq(first[0].instance(), second[0].instance()));
    }
}
