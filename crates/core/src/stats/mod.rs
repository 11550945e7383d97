pub mod stat;
pub mod tracker;

pub use stat::*;
pub use tracker::*;
