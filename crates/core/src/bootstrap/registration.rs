use std::any::Any;
use std::sync::Arc;

use crate::bootstrap::context::BootstrapContext;
use crate::bundle::BundleEntry;
use crate::container::{Environment, ModuleEntry};
use crate::errors::BootstrapError;
use crate::installer::InstallerEntry;
use crate::lifecycle::ListenerEntry;
use crate::options::{OptionKey, OptionValue, OptionsStore};
use crate::registry::{ItemFilter, ItemKind, Scope};
use crate::types::{TypeDescriptor, TypeKey};

/// Configuration callback run before any bundle, with its own scope
pub trait ConfigurationHook: Send + 'static {
    /// Get hook name (defaults to type name)
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    fn configure(&self, registration: &mut HookRegistration<'_>) -> Result<(), BootstrapError>;
}

/// Registered hook with its type identity
pub(crate) struct HookEntry {
    pub(crate) key: TypeKey,
    pub(crate) hook: Box<dyn ConfigurationHook>,
}

impl HookEntry {
    pub(crate) fn new<H: ConfigurationHook>(hook: H) -> Self {
        Self {
            key: TypeKey::of::<H>(),
            hook: Box::new(hook),
        }
    }
}

/// Registration methods common to hook and bundle initialization
macro_rules! registration_methods {
    () => {
        pub fn scope(&self) -> Scope {
            self.scope
        }

        /// Register bundles; they are initialized in the next resolution round
        pub fn bundles(&mut self, bundles: impl IntoIterator<Item = BundleEntry>) -> Result<&mut Self, BootstrapError> {
            for entry in bundles {
                self.ctx.register_bundle(entry, self.scope, false)?;
            }
            Ok(self)
        }

        pub fn modules(&mut self, modules: impl IntoIterator<Item = ModuleEntry>) -> &mut Self {
            for entry in modules {
                self.ctx.register_module(entry, self.scope, false);
            }
            self
        }

        pub fn modules_override(&mut self, modules: impl IntoIterator<Item = ModuleEntry>) -> &mut Self {
            for entry in modules {
                self.ctx.register_module(entry, self.scope, true);
            }
            self
        }

        pub fn installers(&mut self, installers: impl IntoIterator<Item = InstallerEntry>) -> &mut Self {
            for entry in installers {
                self.ctx.register_installer(entry, self.scope);
            }
            self
        }

        pub fn extensions(&mut self, extensions: impl IntoIterator<Item = TypeDescriptor>) -> &mut Self {
            for descriptor in extensions {
                self.ctx.register_extension(descriptor, self.scope, false);
            }
            self
        }

        pub fn extensions_optional(&mut self, extensions: impl IntoIterator<Item = TypeDescriptor>) -> &mut Self {
            for descriptor in extensions {
                self.ctx.register_extension(descriptor, self.scope, true);
            }
            self
        }

        pub fn disable_bundles(&mut self, keys: impl IntoIterator<Item = TypeKey>) -> &mut Self {
            self.disable_kind(ItemKind::Bundle, keys)
        }

        pub fn disable_modules(&mut self, keys: impl IntoIterator<Item = TypeKey>) -> &mut Self {
            self.disable_kind(ItemKind::Module, keys)
        }

        pub fn disable_installers(&mut self, keys: impl IntoIterator<Item = TypeKey>) -> &mut Self {
            self.disable_kind(ItemKind::Installer, keys)
        }

        pub fn disable_extensions(&mut self, keys: impl IntoIterator<Item = TypeKey>) -> &mut Self {
            self.disable_kind(ItemKind::Extension, keys)
        }

        /// Disable every item matching `filter`, including items registered later
        pub fn disable(&mut self, filter: ItemFilter) -> &mut Self {
            self.ctx.registry.disable_matching(filter, self.scope);
            self
        }

        pub fn listen(&mut self, listener: ListenerEntry) -> Result<&mut Self, BootstrapError> {
            self.ctx.listen(listener, self.scope)?;
            Ok(self)
        }

        fn disable_kind(&mut self, kind: ItemKind, keys: impl IntoIterator<Item = TypeKey>) -> &mut Self {
            for key in keys {
                self.ctx.disable(kind, key, self.scope);
            }
            self
        }
    };
}

/// Access to the run's [`SharedState`](crate::bootstrap::shared::SharedState), attributed to the current scope
macro_rules! shared_state_methods {
    () => {
        /// Define the shared value for `T`; each type can be defined once per run
        pub fn share_state<T: Any + Send + Sync>(&mut self, value: T) -> Result<Arc<T>, BootstrapError> {
            self.ctx.shared.put(self.scope, value)
        }

        pub fn shared_state<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
            self.ctx.shared.get()
        }

        /// Shared value for `T`, defining it with `init` when absent
        pub fn shared_state_or_init<T: Any + Send + Sync>(&mut self, init: impl FnOnce() -> T) -> Arc<T> {
            self.ctx.shared.get_or_init(self.scope, init)
        }

        /// Shared value for `T`; a configuration error with `message` when absent
        pub fn shared_state_or_fail<T: Any + Send + Sync>(&self, message: &str) -> Result<Arc<T>, BootstrapError> {
            self.ctx.shared.get_or_fail(message)
        }
    };
}

/// Registration API handed to a [`ConfigurationHook`]
pub struct HookRegistration<'a> {
    ctx: &'a mut BootstrapContext,
    scope: Scope,
}

impl<'a> HookRegistration<'a> {
    pub(crate) fn new(ctx: &'a mut BootstrapContext, scope: Scope) -> Self {
        Self { ctx, scope }
    }

    registration_methods!();
    shared_state_methods!();

    /// Options are still writable while hooks run
    pub fn option(&mut self, key: impl OptionKey, value: impl Into<OptionValue>) -> Result<&mut Self, BootstrapError> {
        self.ctx.options.set(key, value)?;
        Ok(self)
    }

    /// Replace the container binding of `target` with `descriptor`
    pub fn stub(&mut self, target: TypeKey, descriptor: impl Into<TypeDescriptor>) -> Result<&mut Self, BootstrapError> {
        self.ctx.add_stub(target, descriptor.into(), self.scope)?;
        Ok(self)
    }
}

/// Registration API handed to [`Bundle::initialize`](crate::bundle::Bundle::initialize)
pub struct BundleBootstrap<'a> {
    ctx: &'a mut BootstrapContext,
    scope: Scope,
}

impl<'a> BundleBootstrap<'a> {
    pub(crate) fn new(ctx: &'a mut BootstrapContext, scope: Scope) -> Self {
        Self { ctx, scope }
    }

    registration_methods!();
    shared_state_methods!();

    /// Options are locked at this point; reads mark them used
    pub fn options(&self) -> &OptionsStore {
        &self.ctx.options
    }
}

/// Registration API handed to [`Bundle::run`](crate::bundle::Bundle::run).
///
/// Only container-level items can still be registered; the environment is
/// available for direct runtime setup.
pub struct BundleRun<'a> {
    ctx: &'a mut BootstrapContext,
    env: &'a mut dyn Environment,
    scope: Scope,
}

impl<'a> BundleRun<'a> {
    pub(crate) fn new(ctx: &'a mut BootstrapContext, env: &'a mut dyn Environment, scope: Scope) -> Self {
        Self { ctx, env, scope }
    }

    shared_state_methods!();

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn modules(&mut self, modules: impl IntoIterator<Item = ModuleEntry>) -> &mut Self {
        for entry in modules {
            self.ctx.register_module(entry, self.scope, false);
        }
        self
    }

    pub fn modules_override(&mut self, modules: impl IntoIterator<Item = ModuleEntry>) -> &mut Self {
        for entry in modules {
            self.ctx.register_module(entry, self.scope, true);
        }
        self
    }

    pub fn disable_modules(&mut self, keys: impl IntoIterator<Item = TypeKey>) -> &mut Self {
        for key in keys {
            self.ctx.disable(ItemKind::Module, key, self.scope);
        }
        self
    }

    pub fn disable_extensions(&mut self, keys: impl IntoIterator<Item = TypeKey>) -> &mut Self {
        for key in keys {
            self.ctx.disable(ItemKind::Extension, key, self.scope);
        }
        self
    }

    pub fn listen(&mut self, listener: ListenerEntry) -> Result<&mut Self, BootstrapError> {
        self.ctx.listen(listener, self.scope)?;
        Ok(self)
    }

    pub fn options(&self) -> &OptionsStore {
        &self.ctx.options
    }

    pub fn environment(&mut self) -> &mut dyn Environment {
        &mut *self.env
    }
}
