//! Bundle resolution benchmarks
//!
//! Measures a full bootstrap run over transitive bundle trees of growing
//! size, plus filter queries over a populated registry.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use weave_core::{
    Bootstrap, BootstrapError, Bundle, BundleBootstrap, BundleEntry, CoreOption, ItemFilter, ItemKind, ItemRegistry,
    RuntimeEnvironment, Scope, TypeKey,
};

/// Root of a two-level tree: `width` branches, each registering `width` leaves
struct Tree {
    width: usize,
}

struct Branch {
    index: usize,
    width: usize,
}

/// Leaves are shared between branches, so most registrations are duplicates
struct Leaf(usize);

impl Bundle for Tree {
    fn initialize(&self, bootstrap: &mut BundleBootstrap<'_>) -> Result<(), BootstrapError> {
        let width = self.width;
        bootstrap.bundles((0..width).map(|index| BundleEntry::new(Branch { index, width })))?;
        Ok(())
    }
}

impl Bundle for Branch {
    fn initialize(&self, bootstrap: &mut BundleBootstrap<'_>) -> Result<(), BootstrapError> {
        bootstrap.bundles((0..self.width).map(|i| BundleEntry::new(Leaf(i))))?;
        Ok(())
    }

    fn dedup_key(&self) -> Option<String> {
        Some(self.index.to_string())
    }
}

impl Bundle for Leaf {
    fn initialize(&self, _bootstrap: &mut BundleBootstrap<'_>) -> Result<(), BootstrapError> {
        Ok(())
    }

    fn dedup_key(&self) -> Option<String> {
        Some(self.0.to_string())
    }
}

fn run(entries: Vec<BundleEntry>) -> usize {
    let mut env = RuntimeEnvironment::new();
    let bootstrapped = Bootstrap::builder()
        .option(CoreOption::BundlesLookup, false)
        .and_then(|builder| builder.option(CoreOption::UseCoreInstallers, false))
        .map(|builder| builder.bundles(entries).build())
        .and_then(|bootstrap| bootstrap.run(&mut env))
        .unwrap();
    bootstrapped.info.enabled(ItemKind::Bundle).len()
}

fn benchmark_transitive_tree(c: &mut Criterion) {
    let mut group = c.benchmark_group("transitive_tree");

    for width in [4, 16, 32, 64].iter() {
        group.bench_with_input(BenchmarkId::new("width", width), width, |b, &width| {
            b.iter(|| black_box(run(vec![BundleEntry::new(Tree { width })])));
        });
    }

    group.finish();
}

fn benchmark_direct_registrations(c: &mut Criterion) {
    let mut group = c.benchmark_group("direct_registrations");

    for count in [10, 100, 1000].iter() {
        group.bench_with_input(BenchmarkId::new("leaves", count), count, |b, &count| {
            b.iter(|| black_box(run((0..count).map(|i| BundleEntry::new(Leaf(i))).collect())));
        });
    }

    group.finish();
}

fn benchmark_registry_filters(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry_filters");

    for count in [100, 1000, 10000].iter() {
        let mut registry = ItemRegistry::new();
        let key = TypeKey::of::<Leaf>();
        for _ in 0..*count {
            let registration = registry.register_instance(ItemKind::Bundle, key, Scope::Application, |_| false);
            registry.mark_collected(registration.id);
        }
        let filter = ItemFilter::kind(ItemKind::Bundle).and(ItemFilter::enabled());

        group.bench_with_input(BenchmarkId::new("find_enabled", count), &registry, |b, registry| {
            b.iter(|| black_box(registry.find(&filter).len()));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_transitive_tree,
    benchmark_direct_registrations,
    benchmark_registry_filters
);
criterion_main!(benches);
