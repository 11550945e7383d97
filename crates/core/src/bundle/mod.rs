//! Bundles and the resolver expanding them into their transitive closure.

#[allow(clippy::module_inception)]
pub mod bundle;
pub mod duplicates;
pub mod lookup;
pub mod resolver;

pub use bundle::*;
pub use duplicates::*;
pub use lookup::*;
pub use resolver::*;
