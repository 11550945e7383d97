//! Discovery through link-time registrations: `discoverable!` types found by
//! the default namespace scan and `lookup_bundle!` bundles found by the
//! default lookup.

use std::sync::Arc;

use weave_core::{
    Bootstrap, BootstrapError, Bundle, BundleBootstrap, BundleEntry, CoreOption, ItemFilter, ItemId, ItemKind,
    Managed, RuntimeEnvironment, TypeDescriptor, TypeKey,
};

mod reporting {
    use super::*;

    #[derive(Default)]
    pub struct DailyDigest;

    impl Managed for DailyDigest {
        fn start(&self) -> Result<(), BootstrapError> {
            Ok(())
        }
    }

    #[derive(Default)]
    pub struct DigestFormatter;

    pub fn digest() -> TypeDescriptor {
        TypeDescriptor::of::<DailyDigest>()
            .default_factory()
            .implements::<dyn Managed>(|it| it)
            .build()
    }

    pub fn formatter() -> TypeDescriptor {
        TypeDescriptor::of::<DigestFormatter>().default_factory().build()
    }
}

mod elsewhere {
    use super::*;

    #[derive(Default)]
    pub struct Unrelated;

    impl Managed for Unrelated {
        fn start(&self) -> Result<(), BootstrapError> {
            Ok(())
        }
    }

    pub fn unrelated() -> TypeDescriptor {
        TypeDescriptor::of::<Unrelated>()
            .default_factory()
            .implements::<dyn Managed>(|it| it)
            .build()
    }
}

weave_core::discoverable!(reporting::digest);
weave_core::discoverable!(reporting::formatter);
weave_core::discoverable!(elsewhere::unrelated);

struct AuditBundle;

impl Bundle for AuditBundle {
    fn initialize(&self, _bootstrap: &mut BundleBootstrap<'_>) -> Result<(), BootstrapError> {
        Ok(())
    }
}

fn audit_bundle() -> BundleEntry {
    BundleEntry::new(AuditBundle)
}

weave_core::lookup_bundle!(audit_bundle);

#[test]
fn test_scan_finds_only_types_in_namespace() {
    let namespace = TypeKey::of::<reporting::DailyDigest>().module_path();
    let mut env = RuntimeEnvironment::new();
    let bootstrapped = Bootstrap::builder()
        .scan_namespaces([namespace])
        .unwrap()
        .build()
        .run(&mut env)
        .unwrap();

    let digest = bootstrapped.info.info(ItemId::of::<reporting::DailyDigest>()).unwrap();
    assert!(digest.is_from_scan());
    assert!(bootstrapped.info.info(ItemId::of::<elsewhere::Unrelated>()).is_none());
    assert_eq!(env.managed_names(), vec![TypeKey::of::<reporting::DailyDigest>().name()]);
}

#[test]
fn test_default_lookup_finds_submitted_bundles() {
    let mut env = RuntimeEnvironment::new();
    let bootstrapped = Bootstrap::builder().build().run(&mut env).unwrap();

    let found = bootstrapped.info.find(&ItemFilter::lookup_bundles());
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].key(), TypeKey::of::<AuditBundle>());
    assert_eq!(bootstrapped.info.enabled(ItemKind::Bundle).len(), 1);
}

#[test]
fn test_lookup_disabled_skips_submitted_bundles() {
    let mut env = RuntimeEnvironment::new();
    let bootstrapped = Bootstrap::builder()
        .option(CoreOption::BundlesLookup, false)
        .unwrap()
        .build()
        .run(&mut env)
        .unwrap();

    assert!(bootstrapped.info.find(&ItemFilter::lookup_bundles()).is_empty());
}

#[test]
fn test_container_serves_scanned_extension() {
    let namespace = TypeKey::of::<reporting::DailyDigest>().module_path();
    let mut env = RuntimeEnvironment::new();
    let bootstrapped = Bootstrap::builder()
        .scan_namespaces([namespace])
        .unwrap()
        .build()
        .run(&mut env)
        .unwrap();

    let digest: Arc<reporting::DailyDigest> = bootstrapped.container.get().unwrap();
    let again = bootstrapped.container.get::<reporting::DailyDigest>().unwrap();
    assert!(Arc::ptr_eq(&digest, &again));
}
