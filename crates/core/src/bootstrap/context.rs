use indexmap::IndexMap;
use std::sync::Arc;

use crate::bootstrap::shared::SharedState;
use crate::bundle::{BundleEntry, BundleResolver, Candidate, DefaultDuplicates, DuplicateDetector};
use crate::container::{Binding, BindingSource, ModuleEntry};
use crate::errors::BootstrapError;
use crate::installer::InstallerEntry;
use crate::lifecycle::{LifecycleBroadcaster, LifecycleEvent, ListenerEntry};
use crate::options::OptionsStore;
use crate::registry::{ItemFilter, ItemId, ItemInfo, ItemKind, ItemRegistry, Scope};
use crate::stats::{Stat, StatsTracker};
use crate::types::{TypeDescriptor, TypeKey};

/// Registration recorded by the builder and applied when the pipeline starts
pub(crate) enum Declaration {
    Bundles(Vec<BundleEntry>),
    Modules { entries: Vec<ModuleEntry>, overriding: bool },
    Installers(Vec<InstallerEntry>),
    Extensions { descriptors: Vec<TypeDescriptor>, optional: bool },
    Disable { kind: ItemKind, keys: Vec<TypeKey> },
    DisableMatching(ItemFilter),
    Listener(ListenerEntry),
    Stub { target: TypeKey, descriptor: TypeDescriptor },
}

/// Predicate deciding whether a scanned type is considered at all
pub(crate) type ScanFilter = Arc<dyn Fn(&TypeDescriptor) -> bool + Send + Sync>;

/// Mutable state of one bootstrap run, threaded through every phase.
///
/// Owned by the pipeline; hooks and bundles reach it only through their
/// scoped registration contexts.
pub(crate) struct BootstrapContext {
    pub(crate) registry: ItemRegistry,
    pub(crate) options: OptionsStore,
    pub(crate) stats: StatsTracker,
    pub(crate) lifecycle: LifecycleBroadcaster,
    pub(crate) duplicates: Arc<dyn DuplicateDetector>,
    pub(crate) bundles: BundleResolver,
    pub(crate) modules: IndexMap<ItemId, ModuleEntry>,
    pub(crate) installers: IndexMap<TypeKey, InstallerEntry>,
    pub(crate) extensions: IndexMap<TypeKey, TypeDescriptor>,
    pub(crate) stubs: IndexMap<TypeKey, Binding>,
    pub(crate) shared: SharedState,
    pub(crate) scan_filters: Vec<ScanFilter>,
}

impl BootstrapContext {
    pub(crate) fn new() -> Self {
        Self {
            registry: ItemRegistry::new(),
            options: OptionsStore::new(),
            stats: StatsTracker::new(),
            lifecycle: LifecycleBroadcaster::new(),
            duplicates: Arc::new(DefaultDuplicates),
            bundles: BundleResolver::new(),
            modules: IndexMap::new(),
            installers: IndexMap::new(),
            extensions: IndexMap::new(),
            stubs: IndexMap::new(),
            shared: SharedState::new(),
            scan_filters: Vec::new(),
        }
    }

    pub(crate) fn apply(&mut self, declaration: Declaration, scope: Scope) -> Result<(), BootstrapError> {
        match declaration {
            Declaration::Bundles(entries) => {
                for entry in entries {
                    self.register_bundle(entry, scope, false)?;
                }
            }
            Declaration::Modules { entries, overriding } => {
                for entry in entries {
                    self.register_module(entry, scope, overriding);
                }
            }
            Declaration::Installers(entries) => {
                for entry in entries {
                    self.register_installer(entry, scope);
                }
            }
            Declaration::Extensions { descriptors, optional } => {
                for descriptor in descriptors {
                    self.register_extension(descriptor, scope, optional);
                }
            }
            Declaration::Disable { kind, keys } => {
                for key in keys {
                    self.disable(kind, key, scope);
                }
            }
            Declaration::DisableMatching(filter) => self.registry.disable_matching(filter, scope),
            Declaration::Listener(entry) => {
                self.listen(entry, scope)?;
            }
            Declaration::Stub { target, descriptor } => self.add_stub(target, descriptor, scope)?,
        }
        Ok(())
    }

    pub(crate) fn register_bundle(
        &mut self,
        entry: BundleEntry,
        scope: Scope,
        from_lookup: bool,
    ) -> Result<ItemId, BootstrapError> {
        self.bundles
            .register(&mut self.registry, self.duplicates.as_ref(), entry, scope, from_lookup)
    }

    pub(crate) fn register_module(&mut self, entry: ModuleEntry, scope: Scope, overriding: bool) -> ItemId {
        let detector = self.duplicates.as_ref();
        let candidate = Candidate {
            kind: ItemKind::Module,
            key: entry.key(),
            dedup_key: entry.module().dedup_key(),
            instance: entry.instance(),
        };
        let modules = &self.modules;
        let registration = self
            .registry
            .register_instance(ItemKind::Module, entry.key(), scope, |existing| {
                modules
                    .get(&existing)
                    .map(|known| {
                        let registered = Candidate {
                            kind: ItemKind::Module,
                            key: known.key(),
                            dedup_key: known.module().dedup_key(),
                            instance: known.instance(),
                        };
                        detector.is_duplicate(&registered, &candidate)
                    })
                    .unwrap_or(false)
            });
        if registration.is_duplicate() {
            return registration.id;
        }

        let id = registration.id;
        if let Some(details) = self.registry.info_mut(id).and_then(ItemInfo::module_mut) {
            details.overriding = overriding;
        }
        self.registry.mark_collected(id);
        self.modules.insert(id, entry);
        id
    }

    pub(crate) fn register_installer(&mut self, entry: InstallerEntry, scope: Scope) -> ItemId {
        let key = entry.key();
        let id = ItemId::ByClass(key);
        let name = entry.installer().name().to_string();
        let order = entry.installer().order();

        let info = self.registry.register(id, ItemKind::Installer, scope);
        if info.registration_attempts() > 1 {
            return id;
        }
        if let Some(details) = info.installer_mut() {
            details.name = name;
            details.order = order;
        }
        self.registry.mark_collected(id);
        self.installers.insert(key, entry);
        id
    }

    /// Record a manually declared extension; completed once classified
    pub(crate) fn register_extension(&mut self, descriptor: TypeDescriptor, scope: Scope, optional: bool) -> ItemId {
        let key = descriptor.key();
        let id = ItemId::ByClass(key);
        let lazy = descriptor.is_lazy();

        let info = self.registry.register(id, ItemKind::Extension, scope);
        let first = info.registration_attempts() == 1;
        if let Some(details) = info.extension_mut() {
            if first {
                details.optional = optional;
                details.lazy = lazy;
            } else if !optional {
                details.optional = false;
            }
        }
        self.extensions.entry(key).or_insert(descriptor);
        id
    }

    pub(crate) fn disable(&mut self, kind: ItemKind, key: TypeKey, scope: Scope) {
        self.registry.disable(ItemId::ByClass(key), kind, scope);
    }

    pub(crate) fn listen(&mut self, entry: ListenerEntry, scope: Scope) -> Result<bool, BootstrapError> {
        self.stats.start(Stat::ListenersTime);
        let result = self.lifecycle.register(entry, scope);
        self.stats.stop(Stat::ListenersTime);
        result
    }

    pub(crate) fn broadcast(&mut self, event: LifecycleEvent) -> Result<(), BootstrapError> {
        self.stats.start(Stat::ListenersTime);
        let result = self.lifecycle.broadcast(event);
        self.stats.stop(Stat::ListenersTime);
        result
    }

    /// Replace `target` in the container with `descriptor`; one stub per target
    pub(crate) fn add_stub(
        &mut self,
        target: TypeKey,
        descriptor: TypeDescriptor,
        scope: Scope,
    ) -> Result<(), BootstrapError> {
        if let Some(existing) = self.stubs.get(&target) {
            return Err(BootstrapError::registration(
                scope,
                target,
                format!("stub is already registered by {}", existing.source),
            ));
        }
        tracing::debug!(target: "weave::bootstrap", "Stub {} registered by {}", target, scope);
        self.stubs.insert(
            target,
            Binding {
                key: target,
                descriptor,
                source: BindingSource::Stub(scope),
                eager: false,
                lazy: false,
                overriding: true,
            },
        );
        Ok(())
    }

    /// Registered items of a kind that are still enabled
    pub(crate) fn enabled(&self, kind: ItemKind) -> Vec<ItemId> {
        self.registry.enabled_items(kind)
    }
}
