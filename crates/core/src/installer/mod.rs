//! Installer SPI and the classification engine matching candidate types to
//! the single installer responsible for them.

pub mod builtin;
pub mod classifier;
pub mod installer;

pub use builtin::*;
pub use classifier::*;
pub use installer::*;
