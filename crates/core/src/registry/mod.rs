//! Canonical store of registration facts per item identity.
//!
//! Every registration and disable attempt is recorded with its provenance
//! scope. Records are created lazily, mutated only during bootstrap and read
//! by diagnostics afterwards.

pub mod filters;
pub mod id;
pub mod info;
pub mod store;

pub use filters::*;
pub use id::*;
pub use info::*;
pub use store::*;
