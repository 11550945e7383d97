//! Staged bootstrap pipeline.
//!
//! Collects declarations from the application, configuration hooks, the
//! bundle lookup and namespace scanning, resolves bundles and installers,
//! creates the container and activates extensions in the runtime
//! environment. Every phase boundary is broadcast to lifecycle listeners.

pub mod builder;
pub(crate) mod context;
pub mod info;
pub mod pipeline;
pub mod registration;
pub mod shared;

pub use builder::{Bootstrap, BootstrapBuilder};
pub use info::{Bootstrapped, ConfigurationInfo, ConfigurationReport};
pub use registration::{BundleBootstrap, BundleRun, ConfigurationHook, HookRegistration};
pub use shared::SharedState;
