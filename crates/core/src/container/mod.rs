//! Collaborator interfaces around the dependency-injection container and the
//! serving runtime, plus minimal default implementations.

pub mod binder;
#[allow(clippy::module_inception)]
pub mod container;
pub mod environment;
pub mod module;

pub use binder::{Binder, Binding, BindingSource, ContainerBuilder};
pub use container::{Container, ContainerFactory, FactoryContainer, FactoryContainerFactory};
pub use environment::{Environment, Managed, RuntimeEnvironment};
pub use module::{Module, ModuleEntry};
