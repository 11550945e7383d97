pub mod catalog;
pub mod scanner;

pub use catalog::*;
pub use scanner::*;
