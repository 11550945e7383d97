pub mod core;

pub use self::core::*;

/// Result alias used across the crate
pub type Result<T, E = BootstrapError> = std::result::Result<T, E>;
