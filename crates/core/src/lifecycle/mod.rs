//! Phase-boundary events and their ordered dispatch.

pub mod broadcaster;
pub mod listener;
pub mod phase;

pub use broadcaster::*;
pub use listener::*;
pub use phase::*;
