//! # weave-core
//!
//! Extension registry and staged bootstrap pipeline for modular
//! applications. Items (bundles, modules, installers and extensions) are
//! registered directly, discovered by namespace scanning or contributed
//! transitively by bundles; every registration and disable action is
//! recorded with its provenance.
//!
//! ```ignore
//! use weave_core::{Bootstrap, BundleEntry, RuntimeEnvironment};
//!
//! let mut env = RuntimeEnvironment::new();
//! let bootstrapped = Bootstrap::builder()
//!     .bundles([BundleEntry::new(AuditBundle)])
//!     .scan_namespaces(["inventory::tasks"])?
//!     .build()
//!     .run(&mut env)?;
//! println!("{}", bootstrapped.info.report().to_text());
//! ```

pub mod bootstrap;
pub mod bundle;
pub mod container;
pub mod errors;
pub mod installer;
pub mod lifecycle;
pub mod logging;
pub mod options;
pub mod registry;
pub mod scanner;
pub mod stats;
pub mod types;

pub use bootstrap::{
    Bootstrap, BootstrapBuilder, Bootstrapped, BundleBootstrap, BundleRun, ConfigurationHook,
    ConfigurationInfo, ConfigurationReport, HookRegistration, SharedState,
};
pub use bundle::{Bundle, BundleEntry, BundleLookup, DuplicateDetector};
pub use container::{
    Binder, Container, ContainerBuilder, ContainerFactory, Environment, Managed, Module, ModuleEntry,
    RuntimeEnvironment,
};
pub use errors::{BootstrapError, Result};
pub use installer::{Installer, InstallerEntry};
pub use lifecycle::{listener_fn, LifecycleEvent, LifecycleListener, LifecyclePhase, ListenerEntry};
pub use logging::{init_logging, LoggingConfig};
pub use options::{CoreOption, OptionKey, OptionValue, OptionsStore};
pub use registry::{ItemFilter, ItemId, ItemInfo, ItemKind, ItemRegistry, Scope};
pub use stats::{Stat, StatsSnapshot};
pub use types::{Marker, Namespace, TypeDescriptor, TypeKey};

#[doc(hidden)]
pub use inventory;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library version
pub fn version() -> &'static str {
    VERSION
}
