use std::sync::Arc;

use crate::bootstrap::{BundleBootstrap, BundleRun};
use crate::errors::BootstrapError;
use crate::types::{Instance, TypeKey};

/// Unit registering further items, including other bundles.
///
/// `initialize` runs while bundles are resolved; `run` runs after
/// initialization finished, with access to the serving environment.
pub trait Bundle: Send + Sync + 'static {
    /// Get bundle name (defaults to type name)
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Register items during bundle resolution
    fn initialize(&self, bootstrap: &mut BundleBootstrap<'_>) -> Result<(), BootstrapError>;

    /// Register items once all bundles are initialized
    fn run(&self, run: &mut BundleRun<'_>) -> Result<(), BootstrapError> {
        let _ = run;
        Ok(())
    }

    /// Fields distinguishing instances of the same bundle type.
    ///
    /// `None` makes every instance of the type equal.
    fn dedup_key(&self) -> Option<String> {
        None
    }
}

/// Registered bundle instance with its type identity
#[derive(Clone)]
pub struct BundleEntry {
    key: TypeKey,
    bundle: Arc<dyn Bundle>,
    instance: Instance,
}

impl BundleEntry {
    pub fn new<B: Bundle>(bundle: B) -> Self {
        let bundle = Arc::new(bundle);
        Self {
            key: TypeKey::of::<B>(),
            bundle: bundle.clone(),
            instance: bundle,
        }
    }

    pub fn key(&self) -> TypeKey {
        self.key
    }

    pub fn bundle(&self) -> &Arc<dyn Bundle> {
        &self.bundle
    }

    /// Type-erased view for duplicate detection
    pub fn instance(&self) -> &Instance {
        &self.instance
    }
}

impl std::fmt::Debug for BundleEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BundleEntry")
            .field("key", &self.key)
            .field("dedup_key", &self.bundle.dedup_key())
            .finish()
    }
}
