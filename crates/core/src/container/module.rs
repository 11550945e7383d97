use std::sync::Arc;

use crate::container::Binder;
use crate::errors::BootstrapError;
use crate::types::{Instance, TypeKey};

/// Unit of container configuration
pub trait Module: Send + Sync + 'static {
    /// Get module name (defaults to type name)
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Declare bindings
    fn configure(&self, binder: &mut dyn Binder) -> Result<(), BootstrapError>;

    /// Fields distinguishing instances of the same module type.
    ///
    /// `None` makes every instance of the type equal.
    fn dedup_key(&self) -> Option<String> {
        None
    }
}

/// Registered module instance with its type identity
#[derive(Clone)]
pub struct ModuleEntry {
    key: TypeKey,
    module: Arc<dyn Module>,
    instance: Instance,
}

impl ModuleEntry {
    pub fn new<M: Module>(module: M) -> Self {
        let module = Arc::new(module);
        Self {
            key: TypeKey::of::<M>(),
            module: module.clone(),
            instance: module,
        }
    }

    pub fn key(&self) -> TypeKey {
        self.key
    }

    pub fn module(&self) -> &dyn Module {
        self.module.as_ref()
    }

    /// Type-erased view for duplicate detection
    pub fn instance(&self) -> &Instance {
        &self.instance
    }
}

impl std::fmt::Debug for ModuleEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleEntry")
            .field("key", &self.key)
            .field("dedup_key", &self.module.dedup_key())
            .finish()
    }
}
