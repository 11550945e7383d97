pub mod descriptor;
pub mod key;
pub mod namespace;

pub use descriptor::*;
pub use key::*;
pub use namespace::*;
