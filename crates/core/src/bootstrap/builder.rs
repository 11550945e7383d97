use std::any::Any;
use std::sync::Arc;

use crate::bootstrap::context::{BootstrapContext, Declaration};
use crate::bootstrap::registration::{ConfigurationHook, HookEntry};
use crate::bundle::{BundleEntry, BundleLookup, DuplicateDetector, ServiceLookup};
use crate::container::{ContainerFactory, FactoryContainerFactory, ModuleEntry};
use crate::errors::BootstrapError;
use crate::installer::InstallerEntry;
use crate::lifecycle::{LifecycleListener, ListenerEntry};
use crate::options::{CoreOption, OptionKey, OptionValue};
use crate::registry::{ItemFilter, ItemKind, Scope};
use crate::scanner::{InventoryCatalog, TypeSource};
use crate::types::{TypeDescriptor, TypeKey};

/// Configured bootstrap pipeline, ready to [`run`](Bootstrap::run)
pub struct Bootstrap {
    pub(crate) ctx: BootstrapContext,
    pub(crate) declarations: Vec<Declaration>,
    pub(crate) hooks: Vec<HookEntry>,
    pub(crate) type_source: Arc<dyn TypeSource>,
    pub(crate) lookup: Arc<dyn BundleLookup>,
    pub(crate) container_factory: Box<dyn ContainerFactory>,
}

impl Bootstrap {
    /// Start configuring a bootstrap
    pub fn builder() -> BootstrapBuilder {
        BootstrapBuilder::new()
    }
}

impl std::fmt::Debug for Bootstrap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bootstrap")
            .field("declarations", &self.declarations.len())
            .field("hooks", &self.hooks.len())
            .finish()
    }
}

/// Application-level registration API.
///
/// Registrations are applied in declaration order when the pipeline starts,
/// attributed to `Scope::Application`. Options are checked immediately.
pub struct BootstrapBuilder {
    bootstrap: Bootstrap,
}

impl BootstrapBuilder {
    /// Create a new bootstrap builder
    pub fn new() -> Self {
        Self {
            bootstrap: Bootstrap {
                ctx: BootstrapContext::new(),
                declarations: Vec::new(),
                hooks: Vec::new(),
                type_source: Arc::new(InventoryCatalog),
                lookup: Arc::new(ServiceLookup),
                container_factory: Box::new(FactoryContainerFactory),
            },
        }
    }

    pub fn bundles(self, bundles: impl IntoIterator<Item = BundleEntry>) -> Self {
        self.declare(Declaration::Bundles(bundles.into_iter().collect()))
    }

    pub fn modules(self, modules: impl IntoIterator<Item = ModuleEntry>) -> Self {
        self.declare(Declaration::Modules {
            entries: modules.into_iter().collect(),
            overriding: false,
        })
    }

    /// Modules whose bindings replace bindings of regular modules
    pub fn modules_override(self, modules: impl IntoIterator<Item = ModuleEntry>) -> Self {
        self.declare(Declaration::Modules {
            entries: modules.into_iter().collect(),
            overriding: true,
        })
    }

    pub fn installers(self, installers: impl IntoIterator<Item = InstallerEntry>) -> Self {
        self.declare(Declaration::Installers(installers.into_iter().collect()))
    }

    pub fn extensions(self, extensions: impl IntoIterator<Item = TypeDescriptor>) -> Self {
        self.declare(Declaration::Extensions {
            descriptors: extensions.into_iter().collect(),
            optional: false,
        })
    }

    /// Extensions silently disabled when no installer recognizes them
    pub fn extensions_optional(self, extensions: impl IntoIterator<Item = TypeDescriptor>) -> Self {
        self.declare(Declaration::Extensions {
            descriptors: extensions.into_iter().collect(),
            optional: true,
        })
    }

    pub fn disable_bundles(self, keys: impl IntoIterator<Item = TypeKey>) -> Self {
        self.disable_kind(ItemKind::Bundle, keys)
    }

    pub fn disable_modules(self, keys: impl IntoIterator<Item = TypeKey>) -> Self {
        self.disable_kind(ItemKind::Module, keys)
    }

    pub fn disable_installers(self, keys: impl IntoIterator<Item = TypeKey>) -> Self {
        self.disable_kind(ItemKind::Installer, keys)
    }

    pub fn disable_extensions(self, keys: impl IntoIterator<Item = TypeKey>) -> Self {
        self.disable_kind(ItemKind::Extension, keys)
    }

    /// Disable every item matching `filter`, including items registered later
    pub fn disable(self, filter: ItemFilter) -> Self {
        self.declare(Declaration::DisableMatching(filter))
    }

    pub fn listen<L: LifecycleListener>(self, listener: L) -> Self {
        self.declare(Declaration::Listener(ListenerEntry::new(listener)))
    }

    /// Replace the container binding of `target` with `descriptor`
    pub fn stub(self, target: TypeKey, descriptor: impl Into<TypeDescriptor>) -> Self {
        self.declare(Declaration::Stub {
            target,
            descriptor: descriptor.into(),
        })
    }

    /// Set an option; fails on a value of the wrong type
    pub fn option(self, key: impl OptionKey, value: impl Into<OptionValue>) -> Result<Self, BootstrapError> {
        self.bootstrap.ctx.options.set(key, value)?;
        Ok(self)
    }

    /// Namespaces scanned for extensions
    pub fn scan_namespaces<S: Into<String>>(self, namespaces: impl IntoIterator<Item = S>) -> Result<Self, BootstrapError> {
        let namespaces: Vec<String> = namespaces.into_iter().map(Into::into).collect();
        self.option(CoreOption::ScanNamespaces, OptionValue::List(namespaces))
    }

    /// Skip scanned types rejected by `filter`; all filters must accept a type
    pub fn scan_filter(mut self, filter: impl Fn(&TypeDescriptor) -> bool + Send + Sync + 'static) -> Self {
        self.bootstrap.ctx.scan_filters.push(Arc::new(filter));
        self
    }

    /// Define shared state before any hook runs, attributed to `Scope::Application`
    pub fn share_state<T: Any + Send + Sync>(mut self, value: T) -> Result<Self, BootstrapError> {
        self.bootstrap.ctx.shared.put(Scope::Application, value)?;
        Ok(self)
    }

    pub fn hook<H: ConfigurationHook>(mut self, hook: H) -> Self {
        self.bootstrap.hooks.push(HookEntry::new(hook));
        self
    }

    /// Source of scannable types (defaults to link-time registrations)
    pub fn type_source(mut self, source: impl TypeSource + 'static) -> Self {
        self.bootstrap.type_source = Arc::new(source);
        self
    }

    /// Lookup of additional bundles (defaults to link-time registrations)
    pub fn bundle_lookup(mut self, lookup: impl BundleLookup + 'static) -> Self {
        self.bootstrap.lookup = Arc::new(lookup);
        self
    }

    /// Policy for merging equal bundle and module instances
    pub fn duplicate_detector(mut self, detector: impl DuplicateDetector + 'static) -> Self {
        self.bootstrap.ctx.duplicates = Arc::new(detector);
        self
    }

    pub fn container_factory(mut self, factory: impl ContainerFactory + 'static) -> Self {
        self.bootstrap.container_factory = Box::new(factory);
        self
    }

    pub fn build(self) -> Bootstrap {
        self.bootstrap
    }

    fn declare(mut self, declaration: Declaration) -> Self {
        self.bootstrap.declarations.push(declaration);
        self
    }

    fn disable_kind(self, kind: ItemKind, keys: impl IntoIterator<Item = TypeKey>) -> Self {
        self.declare(Declaration::Disable {
            kind,
            keys: keys.into_iter().collect(),
        })
    }
}

impl Default for BootstrapBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BootstrapBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapBuilder")
            .field("bootstrap", &self.bootstrap)
            .finish()
    }
}
